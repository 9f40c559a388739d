//! Shard configuration (spec.md §3 "GatewaySession" fields set at
//! construction), grounded in the teacher's `gateway/src/shard/builder.rs`.

use crate::queue::{LocalQueue, Queue};
use corvid_model::gateway::{intents::Intents, presence::UpdatePresencePayload};
use std::sync::Arc;

const DEFAULT_GATEWAY_URL: &str = "wss://gateway.discord.gg";
const DEFAULT_LARGE_THRESHOLD: u64 = 50;

/// Immutable per-shard configuration, built once and handed to
/// [`crate::shard::Shard::new`].
#[derive(Clone)]
pub struct ShardConfig {
    pub(crate) token: String,
    pub(crate) gateway_url: String,
    pub(crate) intents: Intents,
    pub(crate) shard: [u64; 2],
    pub(crate) large_threshold: u64,
    pub(crate) presence: Option<UpdatePresencePayload>,
    pub(crate) compress: bool,
    pub(crate) queue: Arc<dyn Queue>,
}

impl ShardConfig {
    #[must_use]
    pub fn builder(token: impl Into<String>, intents: Intents) -> ShardConfigBuilder {
        ShardConfigBuilder::new(token, intents)
    }
}

/// Builder for [`ShardConfig`], matching the teacher's `ShardBuilder`
/// fluent-setter shape.
pub struct ShardConfigBuilder(ShardConfig);

impl ShardConfigBuilder {
    #[must_use]
    pub fn new(token: impl Into<String>, intents: Intents) -> Self {
        Self(ShardConfig {
            token: token.into(),
            gateway_url: DEFAULT_GATEWAY_URL.to_owned(),
            intents,
            shard: [0, 1],
            large_threshold: DEFAULT_LARGE_THRESHOLD,
            presence: None,
            compress: true,
            queue: Arc::new(LocalQueue::new()),
        })
    }

    #[must_use]
    pub fn gateway_url(mut self, url: impl Into<String>) -> Self {
        self.0.gateway_url = url.into();
        self
    }

    #[must_use]
    pub fn shard(mut self, id: u64, total: u64) -> Self {
        self.0.shard = [id, total];
        self
    }

    #[must_use]
    pub fn large_threshold(mut self, threshold: u64) -> Self {
        self.0.large_threshold = threshold;
        self
    }

    #[must_use]
    pub fn presence(mut self, presence: UpdatePresencePayload) -> Self {
        self.0.presence = Some(presence);
        self
    }

    #[must_use]
    pub fn compress(mut self, enabled: bool) -> Self {
        self.0.compress = enabled;
        self
    }

    #[must_use]
    pub fn queue(mut self, queue: Arc<dyn Queue>) -> Self {
        self.0.queue = queue;
        self
    }

    #[must_use]
    pub fn build(self) -> ShardConfig {
        self.0
    }
}
