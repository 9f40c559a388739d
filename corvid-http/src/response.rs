//! [`Response`]: the result of a successful round trip (spec.md §3
//! "HttpResponse").

use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// A completed REST response, already decompressed.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub duration: Duration,
    pub from_cache: bool,
}

impl Response {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`serde_json::Error`] if the body is not valid JSON for `T`.
    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// Look up a header case-insensitively and decode it as UTF-8, per
    /// spec.md §3's "headers (case-insensitive lookup)".
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let mut headers = HeaderMap::new();
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));

        let response = Response {
            status: StatusCode::OK,
            headers,
            body: Vec::new(),
            duration: Duration::ZERO,
            from_cache: false,
        };

        assert_eq!(response.header("content-type"), Some("application/json"));
    }
}
