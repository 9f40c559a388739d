//! Heartbeat liveness tracking (spec.md §4.5 step 3, §8 "Heartbeat
//! liveness").
//!
//! Grounded in the teacher's `gateway/src/shard/processor/heartbeat.rs`
//! `Heartbeats`/`Latency` pair, collapsed onto the single-task cooperative
//! model spec.md §5 requires instead of a separately spawned task.

use rand::Rng;
use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

const RECENT_CAPACITY: usize = 5;

/// Rolling latency statistics exposed via [`crate::shard::Shard::latency`].
#[derive(Clone, Debug, Default)]
pub struct Latency {
    heartbeats: u32,
    total: Duration,
    recent: VecDeque<Duration>,
}

impl Latency {
    #[must_use]
    pub fn average(&self) -> Option<Duration> {
        (self.heartbeats > 0).then(|| self.total / self.heartbeats)
    }

    #[must_use]
    pub fn heartbeats(&self) -> u32 {
        self.heartbeats
    }

    #[must_use]
    pub fn recent(&self) -> &VecDeque<Duration> {
        &self.recent
    }
}

/// Drives the "expect an ACK before the next scheduled send, else the
/// socket is a zombie" rule spec.md §4.5 step 3 and §8 specify.
#[derive(Debug)]
pub struct Heartbeater {
    interval: Duration,
    next_due: Instant,
    sent_at: Option<Instant>,
    acked: bool,
    latency: Latency,
}

impl Heartbeater {
    /// Build a heartbeater for a freshly received HELLO, jittering the
    /// first tick by `U(0,1)` of the interval (spec.md §4.5 step 3).
    #[must_use]
    pub fn new(interval_ms: u64) -> Self {
        let interval = Duration::from_millis(interval_ms);
        let jitter = rand::thread_rng().gen_range(0.0..1.0);
        let first_delay = interval.mul_f64(jitter);

        Self {
            interval,
            next_due: Instant::now() + first_delay,
            sent_at: None,
            acked: true,
            latency: Latency::default(),
        }
    }

    /// Duration until the next heartbeat must be sent; zero if overdue.
    #[must_use]
    pub fn time_until_due(&self) -> Duration {
        self.next_due.saturating_duration_since(Instant::now())
    }

    /// Whether an ACK is outstanding for a heartbeat sent last cycle: the
    /// zombie condition from spec.md §4.5 step 3.
    #[must_use]
    pub fn is_zombie(&self) -> bool {
        !self.acked
    }

    /// Mark that a heartbeat was just sent, per spec.md: "Set
    /// `last_heartbeat_ack = false` before sending".
    pub fn record_send(&mut self) {
        self.acked = false;
        self.sent_at = Some(Instant::now());
        self.next_due = Instant::now() + self.interval;
    }

    /// Mark that HEARTBEAT_ACK arrived, recording round-trip latency.
    pub fn record_ack(&mut self) {
        self.acked = true;

        if let Some(sent_at) = self.sent_at.take() {
            let rtt = sent_at.elapsed();
            self.latency.heartbeats += 1;
            self.latency.total += rtt;

            if self.latency.recent.len() == RECENT_CAPACITY {
                self.latency.recent.pop_front();
            }
            self.latency.recent.push_back(rtt);
        }
    }

    #[must_use]
    pub fn latency(&self) -> &Latency {
        &self.latency
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_heartbeater_is_not_a_zombie() {
        let hb = Heartbeater::new(41_250);
        assert!(!hb.is_zombie());
    }

    #[test]
    fn unacked_send_becomes_zombie() {
        let mut hb = Heartbeater::new(41_250);
        hb.record_send();
        assert!(hb.is_zombie());
    }

    #[test]
    fn ack_clears_zombie_and_records_latency() {
        let mut hb = Heartbeater::new(41_250);
        hb.record_send();
        hb.record_ack();
        assert!(!hb.is_zombie());
        assert_eq!(hb.latency().heartbeats(), 1);
    }
}
