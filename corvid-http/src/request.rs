//! [`Request`]: an immutable-by-convention description of a single REST
//! call, plus the small set of fields that mutate across attempts
//! (spec.md §3 "HttpRequest").

use corvid_ratelimiting::Priority;
use http::{HeaderMap, Method};
use std::{
    sync::atomic::{AtomicBool, AtomicU32, Ordering},
    time::{Duration, Instant},
};

/// Connect/read/total deadlines for a single request.
#[derive(Clone, Copy, Debug)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
    pub total: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            read: Duration::from_secs(30),
            total: Duration::from_secs(60),
        }
    }
}

/// How many times, and on what schedule, a failed request is retried.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            backoff_factor: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Delay before the attempt numbered `attempt` (0-indexed).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
        let factor = if self.jitter {
            fastrand::f64() * 1.0 + 0.5 // U(0.5, 1.5)
        } else {
            1.0
        };
        Duration::from_secs_f64(scaled * factor)
    }
}

/// A single REST call, independent of transport.
///
/// Everything but `attempt`/`started_at`/`completed_at`/`cancelled` is set
/// once at construction and never mutated, matching spec.md §3's
/// "Immutable except for `attempt`, `started_at`, `completed_at`,
/// `cancelled`".
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub timeouts: Timeouts,
    pub retry: RetryPolicy,
    pub priority: Priority,
    pub audit_log_reason: Option<String>,
    pub tags: Vec<String>,
    pub follow_redirects: bool,
    pub max_redirects: u32,

    attempt: AtomicU32,
    redirects_followed: AtomicU32,
    started_at: Instant,
    cancelled: AtomicBool,
}

impl Request {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            body: None,
            timeouts: Timeouts::default(),
            retry: RetryPolicy::default(),
            priority: Priority::default(),
            audit_log_reason: None,
            tags: Vec::new(),
            follow_redirects: true,
            max_redirects: 5,
            attempt: AtomicU32::new(0),
            redirects_followed: AtomicU32::new(0),
            started_at: Instant::now(),
            cancelled: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn with_audit_log_reason(mut self, reason: impl Into<String>) -> Self {
        self.audit_log_reason = Some(reason.into());
        self
    }

    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Acquire)
    }

    pub(crate) fn advance_attempt(&self) -> u32 {
        self.attempt.fetch_add(1, Ordering::AcqRel)
    }

    #[must_use]
    pub fn redirects_followed(&self) -> u32 {
        self.redirects_followed.load(Ordering::Acquire)
    }

    pub(crate) fn advance_redirect(&self) -> u32 {
        self.redirects_followed.fetch_add(1, Ordering::AcqRel)
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// The path with its query string appended, used to derive the route
    /// key and the eventual request URI.
    #[must_use]
    pub fn path_and_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }

        let encoded: Vec<String> = self
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        format!("{}?{}", self.path, encoded.join("&"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_grows_with_backoff_factor() {
        let policy = RetryPolicy {
            jitter: false,
            ..RetryPolicy::default()
        };
        assert!(policy.delay_for(1) > policy.delay_for(0));
        assert!(policy.delay_for(2) > policy.delay_for(1));
    }

    #[test]
    fn redirects_default_to_following_up_to_five() {
        let request = Request::new(Method::GET, "/users/@me");
        assert!(request.follow_redirects);
        assert_eq!(request.max_redirects, 5);
        assert_eq!(request.redirects_followed(), 0);

        request.advance_redirect();
        assert_eq!(request.redirects_followed(), 1);
    }

    #[test]
    fn cancel_is_observable() {
        let request = Request::new(Method::GET, "/users/@me");
        assert!(!request.is_cancelled());
        request.cancel();
        assert!(request.is_cancelled());
    }
}
