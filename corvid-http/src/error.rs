//! Error taxonomy for the REST engine (spec.md §7).

use std::{
    error::Error as StdError,
    fmt::{self, Display, Formatter},
};

/// The kind of failure a [`Error`] represents.
///
/// Each variant lines up with spec.md §7's taxonomy so callers can match on
/// it without inspecting message text.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Network,
    Timeout,
    RateLimit,
    Auth,
    Validation,
    Parse,
    Cancelled,
    Redirect,
    Compression,
    Tls,
    CircuitOpen,
    PoolExhausted,
}

impl ErrorKind {
    /// Whether an error of this kind is worth retrying automatically.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Network | Self::Timeout | Self::RateLimit)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Network => "network",
            Self::Timeout => "timeout",
            Self::RateLimit => "rate limit",
            Self::Auth => "auth",
            Self::Validation => "validation",
            Self::Parse => "parse",
            Self::Cancelled => "cancelled",
            Self::Redirect => "redirect",
            Self::Compression => "compression",
            Self::Tls => "tls",
            Self::CircuitOpen => "circuit open",
            Self::PoolExhausted => "pool exhausted",
        };
        f.write_str(name)
    }
}

/// Extra context carried alongside every error: the request that failed, and
/// which attempt it was.
#[derive(Clone, Debug, Default)]
pub struct ErrorContext {
    pub route: Option<String>,
    pub attempt: u32,
    pub retry_after: Option<f64>,
}

/// An error returned by the REST engine.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: Option<http::StatusCode>,
    context: ErrorContext,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            context: ErrorContext::default(),
            source: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: http::StatusCode) -> Self {
        self.status = Some(status);
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = context;
        self
    }

    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub const fn status(&self) -> Option<http::StatusCode> {
        self.status
    }

    #[must_use]
    pub const fn context(&self) -> &ErrorContext {
        &self.context
    }

    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind.is_retryable()
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} ({status}): {}", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| &**e as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_and_network_and_timeout_are_retryable() {
        assert!(ErrorKind::RateLimit.is_retryable());
        assert!(ErrorKind::Network.is_retryable());
        assert!(ErrorKind::Timeout.is_retryable());
    }

    #[test]
    fn auth_and_validation_are_not_retryable() {
        assert!(!ErrorKind::Auth.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
        assert!(!ErrorKind::CircuitOpen.is_retryable());
    }
}
