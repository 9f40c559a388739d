//! Hierarchical per-route rate limiting for Discord's REST API: token
//! buckets keyed by route, a priority-fair queue per bucket, an emergency
//! burst reserve, and per-host circuit breaking.
//!
//! Grounded in `twilight-http-ratelimiting`'s `Ratelimiter` trait and
//! `InMemoryRatelimiter`, generalized from Discord's fixed bucket shape to
//! the priority/burst/circuit-breaker policy this client adds on top.

pub mod bucket;
pub mod circuit;
pub mod headers;
pub mod priority;
pub mod route;
pub mod ticket;

pub use bucket::{Bucket, BucketConfig, GlobalLock};
pub use circuit::{CircuitBreaker, CircuitMetrics, CircuitState};
pub use headers::{HeaderParsingError, RatelimitHeaders, RatelimitScope};
pub use priority::Priority;
pub use route::RouteKey;
pub use ticket::TicketReceiver;

use futures_util::future::BoxFuture;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{debug, trace};

/// Boxed error type used where the exact cause doesn't matter to callers,
/// matching `twilight-http-ratelimiting`'s `GenericError` alias.
pub type GenericError = Box<dyn std::error::Error + Send + Sync>;

type GetBucketFuture<'a> = BoxFuture<'a, Option<Arc<Bucket>>>;
type GetTicketFuture<'a> = BoxFuture<'a, Result<TicketReceiver, GenericError>>;

/// Behavior required of anything that gates outbound REST requests.
///
/// A trait (rather than a concrete type) so tests and alternative backends
/// can swap in a no-op or pre-programmed ratelimiter, mirroring
/// `twilight_http_ratelimiting::Ratelimiter`.
pub trait Ratelimiter: Send + Sync {
    /// Look up the bucket currently bound to a route key, if one exists.
    fn bucket(&self, key: &RouteKey) -> GetBucketFuture<'_>;

    /// Whether any bucket is tracked for this route key yet.
    fn has(&self, key: &RouteKey) -> bool;

    /// Request a ticket to send through the bucket for `key`, creating the
    /// bucket with default limits if this is the first time it's seen.
    fn ticket(&self, key: RouteKey, priority: Priority) -> GetTicketFuture<'_>;
}

/// Default window size assumed for a brand-new route before its first
/// response tells us the real limit (spec.md §4.3 step 1).
const DEFAULT_LIMIT: u64 = 1;
const DEFAULT_BURST_CAPACITY: u64 = 0;

/// The in-process [`Ratelimiter`] implementation: one [`Bucket`] per route
/// key, rebound to the server's `X-RateLimit-Bucket` hash the first time a
/// response reveals it, plus a [`GlobalLock`] shared by every bucket.
///
/// Grounded in `twilight-http-ratelimiting`'s `InMemoryRatelimiter`
/// (`GlobalLockPair` + `HashMap<Path, Arc<Bucket>>` + a per-bucket worker
/// task), extended with a hash→bucket map and a route→hash map so multiple
/// route keys that turn out to share a server-assigned bucket hash converge
/// onto one [`Bucket`].
pub struct InMemoryRatelimiter {
    buckets: Mutex<HashMap<RouteKey, Arc<Bucket>>>,
    hash_buckets: Mutex<HashMap<String, Arc<Bucket>>>,
    route_hashes: Mutex<HashMap<RouteKey, String>>,
    global: Arc<GlobalLock>,
    config: BucketConfig,
}

impl std::fmt::Debug for InMemoryRatelimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryRatelimiter").finish_non_exhaustive()
    }
}

impl Default for InMemoryRatelimiter {
    fn default() -> Self {
        Self::new(BucketConfig::default())
    }
}

impl InMemoryRatelimiter {
    #[must_use]
    pub fn new(config: BucketConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            hash_buckets: Mutex::new(HashMap::new()),
            route_hashes: Mutex::new(HashMap::new()),
            global: GlobalLock::new(),
            config,
        }
    }

    /// Look up (or create) the bucket for `key`, consulting any previously
    /// learned hash binding first so a route key that has already been
    /// rebound by [`Self::apply_headers`] resolves to the shared bucket
    /// rather than its own stale, per-route one.
    fn bucket_for(&self, key: &RouteKey) -> Arc<Bucket> {
        if let Some(hash) = self.route_hashes.lock().expect("ratelimiter poisoned").get(key).cloned() {
            if let Some(bucket) = self.hash_buckets.lock().expect("ratelimiter poisoned").get(&hash) {
                let bucket = Arc::clone(bucket);
                self.buckets
                    .lock()
                    .expect("ratelimiter poisoned")
                    .insert(key.clone(), Arc::clone(&bucket));
                return bucket;
            }
        }

        let mut buckets = self.buckets.lock().expect("ratelimiter poisoned");

        if let Some(bucket) = buckets.get(key) {
            return Arc::clone(bucket);
        }

        let bucket = Bucket::new(
            DEFAULT_LIMIT,
            DEFAULT_BURST_CAPACITY,
            self.config,
            Arc::clone(&self.global),
        );
        buckets.insert(key.clone(), Arc::clone(&bucket));
        bucket
    }

    /// Apply a response's rate-limit headers to the bucket for `key`
    /// (spec.md §4.3 step 2: "Response-driven update").
    ///
    /// The first time a bucket hash is observed for a route key, that key is
    /// rebound to the canonical bucket already registered under the hash (if
    /// any other route got there first), so every route key Discord groups
    /// under the same `X-RateLimit-Bucket` hash converges onto one [`Bucket`]
    /// instead of each keeping its own independent counters.
    pub fn apply_headers(&self, key: &RouteKey, headers: &RatelimitHeaders) {
        let bucket = self.bucket_for(key);
        bucket.release(headers);

        if let Some(hash) = &headers.bucket {
            let canonical = {
                let mut hash_buckets = self.hash_buckets.lock().expect("ratelimiter poisoned");
                Arc::clone(hash_buckets.entry(hash.clone()).or_insert_with(|| Arc::clone(&bucket)))
            };

            self.route_hashes
                .lock()
                .expect("ratelimiter poisoned")
                .insert(key.clone(), hash.clone());

            if !Arc::ptr_eq(&bucket, &canonical) {
                self.buckets
                    .lock()
                    .expect("ratelimiter poisoned")
                    .insert(key.clone(), canonical);
            }
        }

        if headers.global {
            if let Some(retry_after) = headers.retry_after {
                debug!(retry_after, "global rate limit hit, pausing all buckets");
                self.global.lock_for(Duration::from_secs_f64(retry_after.max(0.0)));
            }
        }
    }

    #[must_use]
    pub fn is_globally_locked(&self) -> bool {
        self.global.is_locked()
    }
}

impl Ratelimiter for InMemoryRatelimiter {
    fn bucket(&self, key: &RouteKey) -> GetBucketFuture<'_> {
        let bucket = self.buckets.lock().expect("ratelimiter poisoned").get(key).cloned();
        Box::pin(async move { bucket })
    }

    fn has(&self, key: &RouteKey) -> bool {
        self.buckets.lock().expect("ratelimiter poisoned").contains_key(key)
    }

    fn ticket(&self, key: RouteKey, priority: Priority) -> GetTicketFuture<'_> {
        Box::pin(async move {
            trace!(%key, ?priority, "requesting ticket");
            let bucket = self.bucket_for(&key);
            Ok(bucket.ticket(priority))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[tokio::test]
    async fn unknown_route_gets_a_fresh_bucket_on_first_ticket() {
        let limiter = InMemoryRatelimiter::default();
        let key = RouteKey::new(Method::GET, "/users/@me");
        assert!(!limiter.has(&key));

        let _rx = limiter.ticket(key.clone(), Priority::Normal).await.unwrap();
        assert!(limiter.has(&key));
    }

    #[tokio::test]
    async fn headers_with_global_scope_locks_every_bucket() {
        let limiter = InMemoryRatelimiter::default();
        let key = RouteKey::new(Method::POST, "/channels/123456789012345678/messages");

        let headers = RatelimitHeaders {
            bucket: Some("abc".to_owned()),
            limit: Some(5),
            remaining: Some(0),
            reset_after: Some(1.0),
            global: true,
            scope: Some(RatelimitScope::Global),
            retry_after: Some(0.05),
        };

        limiter.apply_headers(&key, &headers);
        assert!(limiter.is_globally_locked());
    }

    #[tokio::test]
    async fn two_route_keys_sharing_a_hash_converge_on_one_bucket() {
        let limiter = InMemoryRatelimiter::default();
        let a = RouteKey::new(Method::POST, "/channels/111111111111111111/messages");
        let b = RouteKey::new(Method::POST, "/channels/222222222222222222/messages");

        let headers = RatelimitHeaders {
            bucket: Some("shared-hash".to_owned()),
            limit: Some(5),
            remaining: Some(4),
            reset_after: Some(1.0),
            global: false,
            scope: None,
            retry_after: None,
        };

        limiter.apply_headers(&a, &headers);
        limiter.apply_headers(&b, &headers);

        let bucket_a = limiter.bucket(&a).await.unwrap();
        let bucket_b = limiter.bucket(&b).await.unwrap();
        assert!(Arc::ptr_eq(&bucket_a, &bucket_b));
    }

    #[tokio::test]
    async fn a_route_key_rebinds_to_a_hash_learned_by_another_key_first() {
        let limiter = InMemoryRatelimiter::default();
        let a = RouteKey::new(Method::GET, "/channels/111111111111111111/messages");
        let b = RouteKey::new(Method::GET, "/channels/222222222222222222/messages");

        // `a` sees the hash first and becomes canonical for it.
        limiter.apply_headers(
            &a,
            &RatelimitHeaders {
                bucket: Some("shared-hash".to_owned()),
                limit: Some(5),
                remaining: Some(4),
                reset_after: Some(1.0),
                global: false,
                scope: None,
                retry_after: None,
            },
        );
        let canonical = limiter.bucket(&a).await.unwrap();

        // `b` starts on its own provisional bucket before its first response.
        let provisional = limiter.ticket(b.clone(), Priority::Normal).await.unwrap();
        drop(provisional);

        // Once `b`'s response reveals the same hash, it rebinds onto `a`'s bucket.
        limiter.apply_headers(
            &b,
            &RatelimitHeaders {
                bucket: Some("shared-hash".to_owned()),
                limit: Some(5),
                remaining: Some(3),
                reset_after: Some(1.0),
                global: false,
                scope: None,
                retry_after: None,
            },
        );

        let bucket_b = limiter.bucket(&b).await.unwrap();
        assert!(Arc::ptr_eq(&canonical, &bucket_b));
    }
}
