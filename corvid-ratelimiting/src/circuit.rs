//! [`CircuitBreaker`]: per-host failure tracking, per spec.md §4.2.
//!
//! Trimmed down from the sliding-window design in
//! `tower-resilience-circuitbreaker` to the consecutive-counter policy
//! spec.md actually calls for: no windowed failure rate, just a run of
//! consecutive failures/successes driving the state transition.

use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

/// Circuit state, numbered to match spec.md §4.2's state table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[repr(u8)]
pub enum CircuitState {
    /// Requests flow normally.
    Closed = 0,
    /// Requests are rejected outright until `open_timeout` elapses.
    Open = 1,
    /// A single probe request is allowed through to test recovery.
    HalfOpen = 2,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    opened_at: Option<Instant>,
    half_open_probe_in_flight: bool,
}

/// Tracks a single host's health so a run of failures stops sending it
/// traffic rather than piling retries onto something that's down.
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    failure_threshold: u32,
    success_threshold: u32,
    open_timeout: Duration,
}

/// Snapshot of a breaker's counters, for introspection/tests.
#[derive(Clone, Copy, Debug)]
pub struct CircuitMetrics {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub consecutive_successes: u32,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(failure_threshold: u32, success_threshold: u32, open_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                opened_at: None,
                half_open_probe_in_flight: false,
            }),
            failure_threshold: failure_threshold.max(1),
            success_threshold: success_threshold.max(1),
            open_timeout,
        }
    }

    /// Whether a request may be attempted right now. `OPEN` rejects unless
    /// `open_timeout` has elapsed, in which case the breaker moves to
    /// `HALF_OPEN` and allows exactly one probe through.
    pub fn can_execute(&self) -> bool {
        let mut inner = self.inner.lock().expect("circuit breaker poisoned");

        match inner.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                if inner.half_open_probe_in_flight {
                    false
                } else {
                    inner.half_open_probe_in_flight = true;
                    true
                }
            }
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed() >= self.open_timeout)
                    .unwrap_or(false);

                if elapsed {
                    inner.state = CircuitState::HalfOpen;
                    inner.half_open_probe_in_flight = true;
                    inner.consecutive_successes = 0;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Record a successful response.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker poisoned");
        inner.consecutive_failures = 0;
        inner.half_open_probe_in_flight = false;

        match inner.state {
            CircuitState::Closed => {}
            CircuitState::HalfOpen => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.success_threshold {
                    inner.state = CircuitState::Closed;
                    inner.consecutive_successes = 0;
                    inner.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed response. A probe failing while `HALF_OPEN`
    /// immediately reopens the circuit, per spec.md §4.2.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker poisoned");
        inner.half_open_probe_in_flight = false;
        inner.consecutive_successes = 0;

        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.consecutive_failures = self.failure_threshold;
            }
            CircuitState::Open => {}
        }
    }

    /// Force the breaker closed, discarding counters (operator override).
    pub fn reset(&self) {
        let mut inner = self.inner.lock().expect("circuit breaker poisoned");
        inner.state = CircuitState::Closed;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.opened_at = None;
        inner.half_open_probe_in_flight = false;
    }

    #[must_use]
    pub fn metrics(&self) -> CircuitMetrics {
        let inner = self.inner.lock().expect("circuit breaker poisoned");
        CircuitMetrics {
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
            consecutive_successes: inner.consecutive_successes,
        }
    }

    #[must_use]
    pub fn state(&self) -> CircuitState {
        self.inner.lock().expect("circuit breaker poisoned").state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(3, 1, Duration::from_secs(30));
        for _ in 0..2 {
            assert!(breaker.can_execute());
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Closed);

        assert!(breaker.can_execute());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.can_execute());
    }

    #[test]
    fn half_open_probe_failure_reopens_immediately() {
        let breaker = CircuitBreaker::new(1, 2, Duration::from_millis(0));
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        assert!(breaker.can_execute());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn half_open_closes_after_success_threshold() {
        let breaker = CircuitBreaker::new(1, 2, Duration::from_millis(0));
        breaker.record_failure();
        assert!(breaker.can_execute());
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);

        assert!(breaker.can_execute());
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn a_success_in_closed_state_resets_failure_streak() {
        let breaker = CircuitBreaker::new(3, 1, Duration::from_secs(30));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        assert_eq!(breaker.metrics().consecutive_failures, 0);
    }
}
