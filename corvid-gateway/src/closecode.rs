//! Discord-specific WebSocket close codes (spec.md §4.5 "Close-code
//! policy" / §6 "Close codes").

/// A close code received on the gateway socket, classified by whether the
/// session may reconnect.
///
/// Promoted to a named enum (the teacher — twilight-rs/twilight's
/// `shard/processor/error.rs` — inlines this as a match over raw `u16`s in
/// `should_reconnect`), matching `twilight-model`'s preference for typed
/// enums over bare integers at API boundaries.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum CloseCode {
    UnknownError,
    UnknownOpcode,
    DecodeError,
    NotAuthenticated,
    AuthenticationFailed,
    AlreadyAuthenticated,
    InvalidSeq,
    RateLimited,
    SessionTimedOut,
    InvalidShard,
    ShardingRequired,
    InvalidApiVersion,
    InvalidIntents,
    DisallowedIntents,
    /// A close code this crate doesn't special-case; carries the raw value
    /// so it can still be logged.
    Other(u16),
}

impl CloseCode {
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            4000 => Self::UnknownError,
            4001 => Self::UnknownOpcode,
            4002 => Self::DecodeError,
            4003 => Self::NotAuthenticated,
            4004 => Self::AuthenticationFailed,
            4005 => Self::AlreadyAuthenticated,
            4007 => Self::InvalidSeq,
            4008 => Self::RateLimited,
            4009 => Self::SessionTimedOut,
            4010 => Self::InvalidShard,
            4011 => Self::ShardingRequired,
            4012 => Self::InvalidApiVersion,
            4013 => Self::InvalidIntents,
            4014 => Self::DisallowedIntents,
            other => Self::Other(other),
        }
    }

    /// Whether spec.md §4.5 classifies this close as fatal (no reconnect).
    #[must_use]
    pub const fn is_fatal(self) -> bool {
        matches!(
            self,
            Self::AuthenticationFailed
                | Self::InvalidShard
                | Self::ShardingRequired
                | Self::InvalidApiVersion
                | Self::InvalidIntents
                | Self::DisallowedIntents
        )
    }

    #[must_use]
    pub const fn as_u16(self) -> u16 {
        match self {
            Self::UnknownError => 4000,
            Self::UnknownOpcode => 4001,
            Self::DecodeError => 4002,
            Self::NotAuthenticated => 4003,
            Self::AuthenticationFailed => 4004,
            Self::AlreadyAuthenticated => 4005,
            Self::InvalidSeq => 4007,
            Self::RateLimited => 4008,
            Self::SessionTimedOut => 4009,
            Self::InvalidShard => 4010,
            Self::ShardingRequired => 4011,
            Self::InvalidApiVersion => 4012,
            Self::InvalidIntents => 4013,
            Self::DisallowedIntents => 4014,
            Self::Other(code) => code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CloseCode;

    #[test]
    fn fatal_codes_match_spec_table() {
        for code in [4004, 4010, 4011, 4012, 4013, 4014] {
            assert!(CloseCode::from_code(code).is_fatal(), "{code} should be fatal");
        }
    }

    #[test]
    fn zombie_close_is_not_fatal() {
        assert!(!CloseCode::from_code(4000).is_fatal());
    }

    #[test]
    fn unknown_code_round_trips() {
        let code = CloseCode::from_code(1006);
        assert_eq!(code.as_u16(), 1006);
        assert!(!code.is_fatal());
    }
}
