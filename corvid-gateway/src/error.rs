//! Error taxonomy for the gateway engine (spec.md §7: `GATEWAY_FATAL` and
//! `GATEWAY_RECONNECT` are the only two kinds the engine ever surfaces to
//! user code — everything else it recovers from internally).

use crate::closecode::CloseCode;
use std::fmt::{self, Display, Formatter};

/// What kind of failure this is, mirroring the taxonomy in spec.md §7
/// restricted to the two gateway-relevant variants plus the connection
/// failures that precede a session existing at all.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// The gateway closed with a code spec.md §4.5 classifies as
    /// non-reconnectable.
    GatewayFatal,
    /// A transient fault the engine already retried/reconnected past; only
    /// surfaced via the `reconnect` event, never returned from a method.
    GatewayReconnect,
    /// Establishing the initial WebSocket connection failed.
    Connecting,
    /// A payload didn't deserialize as the opcode its envelope claimed.
    Deserializing,
    /// `zlib-stream` inflation failed.
    Compression,
    /// Sending a command failed because the socket is not currently open.
    NotConnected,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: &'static str,
    close_code: Option<CloseCode>,
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    #[must_use]
    pub fn new(kind: ErrorKind, message: &'static str) -> Self {
        Self {
            kind,
            message,
            close_code: None,
            source: None,
        }
    }

    #[must_use]
    pub fn with_close_code(mut self, code: CloseCode) -> Self {
        self.close_code = Some(code);
        self
    }

    #[must_use]
    pub fn with_source(
        mut self,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub const fn close_code(&self) -> Option<CloseCode> {
        self.close_code
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(code) = self.close_code {
            write!(f, " (close code {})", code.as_u16())?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|s| &**s as &(dyn std::error::Error + 'static))
    }
}
