//! [`Bucket`]: per-route token-bucket state with priority queueing and a
//! burst reserve, per spec.md §3/§4.1.

use crate::{
    headers::RatelimitHeaders,
    priority::Priority,
    ticket::{self, TicketNotifier},
};
use rand::Rng;
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::{Duration, Instant},
};
use tokio::sync::Notify;

/// Read-only snapshot of a bucket's counters, for introspection/tests.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Stats {
    pub granted: u64,
    pub burst_granted: u64,
    pub queued: u64,
    pub rejected: u64,
    pub too_many_requests: u64,
}

/// A single entry waiting in one of a bucket's five priority FIFOs.
struct Queued {
    notifier: TicketNotifier,
}

struct State {
    limit: u64,
    remaining: u64,
    reset_at: Instant,
    reset_after: Duration,
    burst_capacity: u64,
    burst_used: u64,
    queues: [VecDeque<Queued>; Priority::COUNT],
    queued_len: usize,
    stats: Stats,
}

/// Configuration knobs that don't change over a bucket's lifetime.
#[derive(Clone, Copy, Debug)]
pub struct BucketConfig {
    pub max_queue_size: usize,
    pub drop_on_limit: bool,
    pub jitter_factor: f64,
}

impl Default for BucketConfig {
    fn default() -> Self {
        Self {
            max_queue_size: 10_000,
            drop_on_limit: false,
            jitter_factor: 0.1,
        }
    }
}

/// Ratelimiting state for one Discord bucket, keyed externally by either a
/// [`crate::route::RouteKey`] or a server-supplied bucket hash (spec.md
/// §3 "RateLimitBucket").
///
/// Invariants upheld internally:
/// * `0 <= remaining <= limit`
/// * `burst_used <= burst_capacity`
/// * at most one in-flight request at a time (`processing`, enforced by the
///   worker loop being the only place that pops a queue entry and by it
///   awaiting the ticket's response before popping the next).
pub struct Bucket {
    state: Mutex<State>,
    processing: AtomicBool,
    notify: Notify,
    config: BucketConfig,
    global: Arc<GlobalLock>,
}

/// Whether the whole client (every bucket) is currently paused, because a
/// `429` came back with `X-RateLimit-Scope: global` (spec.md §4.1).
#[derive(Default)]
pub struct GlobalLock {
    locked: AtomicBool,
    notify: Notify,
}

impl GlobalLock {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn lock_for(self: &Arc<Self>, duration: Duration) {
        self.locked.store(true, Ordering::Release);
        let this = Arc::clone(self);

        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            this.locked.store(false, Ordering::Release);
            this.notify.notify_waiters();
        });
    }

    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Acquire)
    }

    async fn wait_until_unlocked(&self) {
        while self.is_locked() {
            self.notify.notified().await;
        }
    }
}

impl Bucket {
    #[must_use]
    pub fn new(limit: u64, burst_capacity: u64, config: BucketConfig, global: Arc<GlobalLock>) -> Arc<Self> {
        let now = Instant::now();

        let bucket = Arc::new(Self {
            state: Mutex::new(State {
                limit: limit.max(1),
                remaining: limit.max(1),
                reset_at: now,
                reset_after: Duration::ZERO,
                burst_capacity,
                burst_used: 0,
                queues: Default::default(),
                queued_len: 0,
                stats: Stats::default(),
            }),
            processing: AtomicBool::new(false),
            notify: Notify::new(),
            config,
            global,
        });

        let worker = Arc::clone(&bucket);
        tokio::spawn(async move { worker.run().await });

        bucket
    }

    /// Request a ticket to send through this bucket at the given priority.
    ///
    /// Returns immediately with a [`ticket::TicketReceiver`] the caller must
    /// await; the receiver resolves once the bucket has granted (or, if the
    /// queue was full and `drop_on_limit` is set, the ticket may never
    /// resolve because it was evicted — callers should apply their own
    /// request-level timeout).
    pub fn ticket(self: &Arc<Self>, priority: Priority) -> ticket::TicketReceiver {
        let (tx, rx) = ticket::channel();
        let mut state = self.state.lock().expect("bucket poisoned");

        if state.queued_len >= self.config.max_queue_size {
            if self.config.drop_on_limit {
                state.stats.rejected += 1;
                drop(state);
                drop(tx); // receiver will observe a closed channel.
                return rx;
            }

            // Evict the tail of the lowest-priority non-empty queue.
            if let Some(queue) = state.queues.iter_mut().rev().find(|q| !q.is_empty()) {
                queue.pop_back();
                state.queued_len -= 1;
                state.stats.rejected += 1;
            }
        }

        state.queues[priority.index()].push_back(Queued { notifier: tx });
        state.queued_len += 1;
        state.stats.queued += 1;
        drop(state);

        self.notify.notify_one();

        rx
    }

    /// Update bucket state from a response's rate-limit headers (spec.md
    /// §4.1 "Response-driven update"). Must be applied before the result is
    /// surfaced to the caller so concurrent waiters see fresh state.
    pub fn release(&self, headers: &RatelimitHeaders) {
        let mut state = self.state.lock().expect("bucket poisoned");

        if let Some(limit) = headers.limit {
            state.limit = limit.max(1);
        }

        if let Some(remaining) = headers.remaining {
            state.remaining = remaining.min(state.limit);
        }

        if let Some(reset_after) = headers.reset_after {
            let reset_after = Duration::from_secs_f64(reset_after.max(0.0));
            state.reset_after = reset_after;
            state.reset_at = Instant::now() + reset_after;
        }

        if headers.retry_after.is_some() {
            state.stats.too_many_requests += 1;
        }

        self.notify.notify_one();
    }

    /// Current counters, for tests and introspection.
    #[must_use]
    pub fn stats(&self) -> Stats {
        self.state.lock().expect("bucket poisoned").stats
    }

    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.state.lock().expect("bucket poisoned").remaining
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.state.lock().expect("bucket poisoned").limit
    }

    async fn run(self: Arc<Self>) {
        loop {
            self.global.wait_until_unlocked().await;

            let next = {
                let mut state = self.state.lock().expect("bucket poisoned");
                let now = Instant::now();

                if now >= state.reset_at && state.reset_after > Duration::ZERO {
                    state.remaining = state.limit;
                    state.burst_used = 0;
                    state.reset_at = now + state.reset_after;
                }

                state.queues.iter().position(|q| !q.is_empty())
            };

            let Some(priority_index) = next else {
                self.notify.notified().await;
                continue;
            };

            let (granted, wait) = {
                let mut state = self.state.lock().expect("bucket poisoned");

                if state.remaining > 0 {
                    state.remaining -= 1;
                    state.stats.granted += 1;
                    (true, None)
                } else if priority_for_index(priority_index).is_burst_eligible()
                    && state.burst_used < state.burst_capacity
                {
                    state.burst_used += 1;
                    state.stats.burst_granted += 1;
                    (true, None)
                } else {
                    let base_wait = state.reset_at.saturating_duration_since(Instant::now());
                    let jitter = jittered(base_wait, self.config.jitter_factor);
                    (false, Some(base_wait + jitter))
                }
            };

            if granted {
                self.processing.store(true, Ordering::Release);

                let queued = {
                    let mut state = self.state.lock().expect("bucket poisoned");
                    let entry = state.queues[priority_index].pop_front();
                    if entry.is_some() {
                        state.queued_len -= 1;
                    }
                    entry
                };

                if let Some(queued) = queued {
                    if let Some(headers_future) = queued.notifier.available() {
                        // Single-flight: wait for this ticket's response
                        // before popping the next one.
                        if let Ok(Some(headers)) = headers_future.await {
                            self.release(&headers);
                        }
                    }
                }

                self.processing.store(false, Ordering::Release);
            } else if let Some(wait) = wait {
                tokio::time::sleep(wait).await;
            }
        }
    }
}

fn priority_for_index(index: usize) -> Priority {
    match index {
        0 => Priority::Critical,
        1 => Priority::High,
        2 => Priority::Normal,
        3 => Priority::Low,
        _ => Priority::Background,
    }
}

fn jittered(base: Duration, factor: f64) -> Duration {
    if base.is_zero() || factor <= 0.0 {
        return Duration::ZERO;
    }

    let spread = base.as_secs_f64() * factor;
    let delta = rand::thread_rng().gen_range(-spread..=spread);
    Duration::from_secs_f64((delta).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::RatelimitHeaders;

    fn headers_with_remaining(remaining: u64, reset_after: f64) -> RatelimitHeaders {
        RatelimitHeaders {
            bucket: None,
            limit: Some(5),
            remaining: Some(remaining),
            reset_after: Some(reset_after),
            global: false,
            scope: None,
            retry_after: None,
        }
    }

    #[tokio::test]
    async fn immediate_grant_when_remaining_available() {
        let bucket = Bucket::new(5, 0, BucketConfig::default(), GlobalLock::new());
        let rx = bucket.ticket(Priority::Normal);
        let sender = rx.await.expect("ticket granted");
        assert_eq!(bucket.stats().granted, 1);
        let _ = sender.headers(Some(headers_with_remaining(4, 10.0)));
    }

    #[tokio::test]
    async fn burst_used_tracks_high_priority_overflow() {
        let bucket = Bucket::new(1, 2, BucketConfig::default(), GlobalLock::new());

        // Drain the normal window.
        let rx1 = bucket.ticket(Priority::Normal);
        let sender1 = rx1.await.unwrap();
        let _ = sender1.headers(Some(headers_with_remaining(0, 60.0)));

        // High priority should now draw from burst instead of queueing.
        let rx2 = bucket.ticket(Priority::High);
        let sender2 = rx2.await.unwrap();
        assert_eq!(bucket.stats().burst_granted, 1);
        let _ = sender2.headers(None);
    }

    #[tokio::test]
    async fn remaining_never_exceeds_limit_after_release() {
        let bucket = Bucket::new(5, 0, BucketConfig::default(), GlobalLock::new());
        bucket.release(&headers_with_remaining(999, 1.0));
        assert!(bucket.remaining() <= bucket.limit());
    }
}
