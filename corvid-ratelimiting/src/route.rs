//! Route-key derivation: the client-side synthetic bucket identity used
//! before a server `X-RateLimit-Bucket` hash is known (spec.md §4.3 step 1,
//! §GLOSSARY "Route key"/"Major parameter").

use http::Method;
use std::fmt::{self, Display, Formatter};

/// Segment keywords after which the *next* numeric ID is a major parameter
/// and must be preserved verbatim in the route key; IDs anywhere else are
/// minor and collapsed to a placeholder.
const MAJOR_PARENTS: &[&str] = &["channels", "guilds", "webhooks"];

/// A client-side route key: HTTP method plus a path with minor IDs
/// collapsed and major IDs (channel/guild/webhook) preserved.
///
/// This is the initial [`super::Bucket`] lookup key, used until a response
/// supplies an `X-RateLimit-Bucket` hash to rebind to (spec.md §4.3 step 2).
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RouteKey {
    method: Method,
    normalized_path: String,
}

impl RouteKey {
    /// Derive a route key from a method and a request path.
    ///
    /// `path` is expected to already have its query string stripped.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut normalized = String::with_capacity(path.len());
        let mut preserve_next_id = false;

        for segment in segments {
            normalized.push('/');

            if preserve_next_id && is_snowflake(segment) {
                normalized.push_str(segment);
                preserve_next_id = false;
                continue;
            }

            preserve_next_id = MAJOR_PARENTS.contains(&segment);

            if is_snowflake(segment) {
                // Minor ID (message ID, role ID inside a membership route,
                // emoji codepoint, etc): collapse so all such routes share
                // a bucket.
                normalized.push_str(":id");
            } else {
                normalized.push_str(segment);
            }
        }

        Self {
            method,
            normalized_path: normalized,
        }
    }

    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn normalized_path(&self) -> &str {
        &self.normalized_path
    }
}

impl Display for RouteKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.normalized_path)
    }
}

fn is_snowflake(segment: &str) -> bool {
    !segment.is_empty() && segment.len() >= 15 && segment.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::RouteKey;
    use http::Method;

    #[test]
    fn preserves_channel_major_collapses_message_minor() {
        let key = RouteKey::new(
            Method::DELETE,
            "/channels/123456789012345678/messages/987654321098765432",
        );
        assert_eq!(
            key.normalized_path(),
            "/channels/123456789012345678/messages/:id"
        );
    }

    #[test]
    fn two_routes_differing_only_by_minor_id_share_a_key() {
        let a = RouteKey::new(
            Method::GET,
            "/channels/123456789012345678/messages/111111111111111111",
        );
        let b = RouteKey::new(
            Method::GET,
            "/channels/123456789012345678/messages/222222222222222222",
        );
        assert_eq!(a, b);
    }

    #[test]
    fn two_routes_differing_by_major_id_do_not_share_a_key() {
        let a = RouteKey::new(Method::GET, "/channels/111111111111111111/messages");
        let b = RouteKey::new(Method::GET, "/channels/222222222222222222/messages");
        assert_ne!(a, b);
    }
}
