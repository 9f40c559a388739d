//! Parse the rate-limit headers Discord sends back on every response
//! (spec.md §6).

use http::HeaderMap;
use std::{
    error::Error,
    fmt::{Display, Formatter, Result as FmtResult},
    str::Utf8Error,
};

/// The rate-limit scope carried in `X-RateLimit-Scope`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RatelimitScope {
    /// This bucket alone is paused.
    User,
    /// Every bucket on this client is paused.
    Global,
    /// Paused, but shared with other bots/resources and not attributable to
    /// this client's own behavior — does not count as a circuit-breaker
    /// failure (spec.md §4.1).
    Shared,
}

impl RatelimitScope {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "user" => Some(Self::User),
            "global" => Some(Self::Global),
            "shared" => Some(Self::Shared),
            _ => None,
        }
    }
}

/// Typed view over the rate-limit headers of a response.
#[derive(Clone, Debug)]
pub struct RatelimitHeaders {
    pub bucket: Option<String>,
    pub limit: Option<u64>,
    pub remaining: Option<u64>,
    pub reset_after: Option<f64>,
    pub global: bool,
    pub scope: Option<RatelimitScope>,
    /// Present only on 429 responses (and sometimes, redundantly, alongside
    /// `reset_after`).
    pub retry_after: Option<f64>,
}

impl RatelimitHeaders {
    /// Parse all known rate-limit headers out of a response's header map.
    ///
    /// Unlike looking keys up one at a time, this never fails: any header
    /// that is missing, non-UTF8, or non-numeric is simply `None` rather
    /// than aborting the whole parse, because most responses only carry a
    /// subset of these headers (`[http::HeaderMap]` lookups are already
    /// case-insensitive, per spec.md §6).
    #[must_use]
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, HeaderParsingError> {
        Ok(Self {
            bucket: parse_str(headers, "x-ratelimit-bucket")?,
            limit: parse_num(headers, "x-ratelimit-limit")?,
            remaining: parse_num(headers, "x-ratelimit-remaining")?,
            reset_after: parse_float(headers, "x-ratelimit-reset-after")?,
            global: parse_str(headers, "x-ratelimit-global")?
                .map(|v| v == "true")
                .unwrap_or(false),
            scope: parse_str(headers, "x-ratelimit-scope")?
                .as_deref()
                .and_then(RatelimitScope::parse),
            retry_after: parse_float(headers, "retry-after")?,
        })
    }
}

fn parse_str(headers: &HeaderMap, name: &'static str) -> Result<Option<String>, HeaderParsingError> {
    let Some(value) = headers.get(name) else {
        return Ok(None);
    };

    let text = std::str::from_utf8(value.as_bytes())
        .map_err(|source| HeaderParsingError::not_utf8(name, value.as_bytes().to_vec(), source))?;

    Ok(Some(text.to_owned()))
}

fn parse_num(headers: &HeaderMap, name: &'static str) -> Result<Option<u64>, HeaderParsingError> {
    let Some(text) = parse_str(headers, name)? else {
        return Ok(None);
    };

    // Discord sends `-remaining` as a plain integer but has been observed to
    // send `-limit` as a float-looking string in edge cases; truncate via
    // f64 to stay tolerant rather than failing the whole response parse.
    let value = text
        .parse::<f64>()
        .map_err(|source| HeaderParsingError::parsing(name, text, source))?;

    Ok(Some(value as u64))
}

fn parse_float(headers: &HeaderMap, name: &'static str) -> Result<Option<f64>, HeaderParsingError> {
    let Some(text) = parse_str(headers, name)? else {
        return Ok(None);
    };

    let value = text
        .parse::<f64>()
        .map_err(|source| HeaderParsingError::parsing(name, text, source))?;

    Ok(Some(value))
}

/// Error parsing a rate-limit header.
#[derive(Debug)]
pub struct HeaderParsingError {
    kind: HeaderParsingErrorType,
    source: Option<Box<dyn Error + Send + Sync>>,
}

#[derive(Debug)]
enum HeaderParsingErrorType {
    NotUtf8 { name: &'static str },
    Parsing { name: &'static str, value: String },
}

impl HeaderParsingError {
    fn not_utf8(name: &'static str, _value: Vec<u8>, source: Utf8Error) -> Self {
        Self {
            kind: HeaderParsingErrorType::NotUtf8 { name },
            source: Some(Box::new(source)),
        }
    }

    fn parsing(name: &'static str, value: String, source: std::num::ParseFloatError) -> Self {
        Self {
            kind: HeaderParsingErrorType::Parsing { name, value },
            source: Some(Box::new(source)),
        }
    }
}

impl Display for HeaderParsingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match &self.kind {
            HeaderParsingErrorType::NotUtf8 { name } => {
                write!(f, "header '{name}' is not valid UTF-8")
            }
            HeaderParsingErrorType::Parsing { name, value } => {
                write!(f, "header '{name}' value '{value}' could not be parsed")
            }
        }
    }
}

impl Error for HeaderParsingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::{RatelimitHeaders, RatelimitScope};
    use http::{HeaderMap, HeaderValue};

    #[test]
    fn parses_a_typical_response() {
        let mut headers = HeaderMap::new();
        headers.insert("X-RateLimit-Limit", HeaderValue::from_static("5"));
        headers.insert("X-RateLimit-Remaining", HeaderValue::from_static("4"));
        headers.insert(
            "X-RateLimit-Reset-After",
            HeaderValue::from_static("1.250"),
        );
        headers.insert("X-RateLimit-Bucket", HeaderValue::from_static("abcd1234"));
        headers.insert("X-RateLimit-Scope", HeaderValue::from_static("user"));

        let parsed = RatelimitHeaders::from_headers(&headers).unwrap();
        assert_eq!(parsed.limit, Some(5));
        assert_eq!(parsed.remaining, Some(4));
        assert_eq!(parsed.reset_after, Some(1.25));
        assert_eq!(parsed.bucket.as_deref(), Some("abcd1234"));
        assert_eq!(parsed.scope, Some(RatelimitScope::User));
        assert!(!parsed.global);
    }

    #[test]
    fn missing_headers_are_none_not_errors() {
        let parsed = RatelimitHeaders::from_headers(&HeaderMap::new()).unwrap();
        assert_eq!(parsed.limit, None);
        assert_eq!(parsed.bucket, None);
        assert!(!parsed.global);
    }

    #[test]
    fn scenario_4_429_with_user_scope_and_retry_after() {
        let mut headers = HeaderMap::new();
        headers.insert("Retry-After", HeaderValue::from_static("1.5"));
        headers.insert("X-RateLimit-Scope", HeaderValue::from_static("user"));

        let parsed = RatelimitHeaders::from_headers(&headers).unwrap();
        assert_eq!(parsed.retry_after, Some(1.5));
        assert_eq!(parsed.scope, Some(RatelimitScope::User));
    }
}
