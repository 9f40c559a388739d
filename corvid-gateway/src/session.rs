//! Session state (spec.md §3 "GatewaySession").

use corvid_model::gateway::presence::UpdatePresencePayload;

/// Lifecycle stage of a [`crate::shard::Shard`], per spec.md §3.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Status {
    Disconnected,
    Connecting,
    Identifying,
    Resuming,
    Ready,
    Reconnecting,
    Disconnecting,
}

impl Status {
    #[must_use]
    pub const fn is_ready(self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// The mutable session record a [`crate::shard::Shard`] owns exclusively.
///
/// Every field here is read and written only from the task that owns the
/// shard (spec.md §5 "its state ... is never touched from elsewhere").
#[derive(Clone, Debug, Default)]
pub struct Session {
    pub session_id: Option<String>,
    pub resume_gateway_url: Option<String>,
    pub sequence: Option<u64>,
    pub heartbeat_interval_ms: Option<u64>,
    pub last_heartbeat_ack: bool,
    pub presence: Option<UpdatePresencePayload>,
}

impl Session {
    /// Whether this session has enough state to attempt a RESUME (spec.md
    /// §4.5 "Resume sequence").
    #[must_use]
    pub fn can_resume(&self) -> bool {
        self.session_id.is_some()
    }

    /// Clear everything a fresh IDENTIFY needs to re-establish (spec.md
    /// §4.5 "Invalid Session, cannot resume" scenario 3).
    pub fn clear(&mut self) {
        self.session_id = None;
        self.resume_gateway_url = None;
        self.sequence = None;
    }

    /// Record a DISPATCH's sequence number, enforcing spec.md §8's
    /// monotonicity invariant: "received `s` values are non-decreasing".
    pub fn observe_sequence(&mut self, s: u64) {
        debug_assert!(
            self.sequence.is_none_or_not_greater_than(s),
            "gateway sequence went backwards: {:?} -> {s}",
            self.sequence
        );
        self.sequence = Some(s);
    }
}

trait SequenceCheck {
    fn is_none_or_not_greater_than(self, s: u64) -> bool;
}

impl SequenceCheck for Option<u64> {
    fn is_none_or_not_greater_than(self, s: u64) -> bool {
        self.map_or(true, |prev| prev <= s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_drops_resumable_state() {
        let mut session = Session {
            session_id: Some("abc".to_owned()),
            resume_gateway_url: Some("wss://gw".to_owned()),
            sequence: Some(42),
            ..Session::default()
        };

        session.clear();

        assert!(!session.can_resume());
        assert_eq!(session.sequence, None);
    }

    #[test]
    fn observe_sequence_advances() {
        let mut session = Session::default();
        session.observe_sequence(1);
        session.observe_sequence(43);
        assert_eq!(session.sequence, Some(43));
    }
}
