//! The top-level facade (spec.md §3 "Ownership": "the client owns exactly
//! one GatewayEngine, one RestEngine, and the caches").
//!
//! Grounded in how the teacher's `twilight` advertisement crate composes
//! `twilight-http::Client`, `twilight-gateway::Shard`, and
//! `twilight-cache-inmemory::InMemoryCache` in its own doc examples — here
//! made into real, owned wiring instead of documentation prose, since
//! spec.md asks for a client that actually runs the dispatch loop.

use crate::event_bus::EventBus;
use corvid_cache_inmemory::InMemoryCache;
use corvid_gateway::{Error as GatewayError, ErrorKind as GatewayErrorKind, GatewayEvent, Shard, ShardConfig};
use corvid_http::Client as RestClient;
use std::sync::Arc;

/// Owns one REST engine, one Gateway shard, and one cache, and drives the
/// dispatch loop connecting them (spec.md §2 data-flow diagram: "gateway
/// frame → decoder → opcode demux → dispatch handler → Cache update →
/// EventBus.emit → user listeners").
pub struct Corvid {
    rest: RestClient,
    shard: Shard,
    cache: InMemoryCache,
    events: Arc<EventBus>,
}

impl Corvid {
    #[must_use]
    pub fn new(rest: RestClient, shard_config: ShardConfig) -> Self {
        Self::with_cache(rest, shard_config, InMemoryCache::new())
    }

    #[must_use]
    pub fn with_cache(rest: RestClient, shard_config: ShardConfig, cache: InMemoryCache) -> Self {
        Self {
            rest,
            shard: Shard::new(shard_config),
            cache,
            events: Arc::new(EventBus::new()),
        }
    }

    #[must_use]
    pub const fn rest(&self) -> &RestClient {
        &self.rest
    }

    #[must_use]
    pub const fn cache(&self) -> &InMemoryCache {
        &self.cache
    }

    #[must_use]
    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    /// Runs the Gateway→Cache→EventBus pipeline until the shard closes
    /// fatally (spec.md §7: `GATEWAY_FATAL` is the only close this loop
    /// doesn't retry past internally).
    ///
    /// # Errors
    ///
    /// Returns the [`GatewayError`] the shard gave up on. Anything it can
    /// reconnect past (a dropped socket, a non-fatal close code) it already
    /// retried before this returns.
    pub async fn run(&mut self) -> Result<(), GatewayError> {
        loop {
            match self.shard.next_event().await {
                Ok(GatewayEvent::Dispatch(_sequence, dispatch)) => {
                    self.cache.update(&dispatch);
                    self.events.emit_dispatch(&dispatch);
                }
                Ok(_) => {
                    // HELLO/HEARTBEAT(_ACK)/RECONNECT/INVALID_SESSION are
                    // fully handled inside the shard (spec.md §4.5 "Inbound
                    // handling"); nothing for the bus to re-emit.
                }
                Err(err) if err.kind() == GatewayErrorKind::GatewayFatal => return Err(err),
                Err(err) => {
                    tracing::warn!(kind = ?err.kind(), error = %err, "gateway error, retrying");
                }
            }
        }
    }

    /// Disconnects the shard, sending a clean WebSocket close if one is open.
    pub async fn shutdown(&mut self) {
        self.shard.shutdown().await;
    }
}

#[cfg(test)]
mod tests {
    use super::Corvid;

    #[test]
    fn corvid_is_send() {
        static_assertions::assert_impl_all!(Corvid: Send);
    }
}
