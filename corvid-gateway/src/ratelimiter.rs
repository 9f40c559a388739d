//! Outbound command rate limiting (spec.md §4.5 "Backpressure": "rate-limit
//! gateway commands at ≤ 120 commands / 60 s per connection").
//!
//! Reused nearly verbatim from the teacher's `gateway/src/ratelimiter.rs`.

use leaky_bucket_lite::LeakyBucket;
use std::time::{Duration, Instant};

const RESET_DURATION_MILLISECONDS: u64 = 60_000;
const COMMANDS_PER_RESET: u8 = 120;

/// Token bucket gating how often a shard may send commands over its
/// socket, reserving headroom for heartbeats so a busy command queue can
/// never starve liveness.
#[derive(Debug)]
pub struct CommandRatelimiter {
    bucket: LeakyBucket,
}

impl CommandRatelimiter {
    #[must_use]
    pub fn new(heartbeat_interval_ms: u64) -> Self {
        let allotted = u32::from(available_commands_per_interval(heartbeat_interval_ms));

        let bucket = LeakyBucket::builder()
            .max(allotted)
            .tokens(allotted)
            .refill_interval(Duration::from_millis(RESET_DURATION_MILLISECONDS))
            .refill_amount(allotted)
            .build();

        Self { bucket }
    }

    #[must_use]
    pub fn available(&self) -> u32 {
        self.bucket.tokens()
    }

    #[must_use]
    pub fn max(&self) -> u32 {
        self.bucket.max()
    }

    #[must_use]
    pub fn next_refill(&self) -> Instant {
        self.bucket.next_refill().into_std()
    }

    /// Wait for a token, suspending the caller (spec.md §5 lists this among
    /// the engine's cancellable suspension points).
    pub async fn acquire_one(&self) {
        self.bucket.acquire_one().await;
    }
}

/// Reserve twice the commands a heartbeat cycle could need (Discord may
/// both send us a HEARTBEAT and expect one back) and allot the remainder.
fn available_commands_per_interval(heartbeat_interval_ms: u64) -> u8 {
    const ALLOT_ON_FAIL: u8 = COMMANDS_PER_RESET - 10;

    if heartbeat_interval_ms == 0 {
        return ALLOT_ON_FAIL;
    }

    let mut heartbeats = RESET_DURATION_MILLISECONDS / heartbeat_interval_ms;
    if RESET_DURATION_MILLISECONDS % heartbeat_interval_ms > 0 {
        heartbeats = heartbeats.saturating_add(1);
    }

    let heartbeats: u8 = heartbeats.try_into().unwrap_or_else(|_| {
        tracing::warn!(heartbeat_interval_ms, "implausibly small heartbeat interval");
        ALLOT_ON_FAIL
    });

    COMMANDS_PER_RESET.saturating_sub(heartbeats.saturating_mul(2))
}

#[cfg(test)]
mod tests {
    use super::available_commands_per_interval;

    #[test]
    fn typical_interval_reserves_headroom_for_heartbeats() {
        assert_eq!(available_commands_per_interval(41_250), 116);
    }

    #[test]
    fn zero_interval_falls_back_to_conservative_allotment() {
        assert_eq!(available_commands_per_interval(0), 110);
    }
}
