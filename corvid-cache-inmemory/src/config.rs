//! Cache configuration (spec.md §9 open question #2: default-avatar
//! indexing; SPEC_FULL.md's decision to carry both branches behind a
//! flag).

use bitflags::bitflags;

bitflags! {
    /// Which kinds of resource to actually cache.
    ///
    /// Grounded in the teacher's `cache/in-memory/src/config.rs`
    /// `ResourceType` bitflags, trimmed to the resources this cache's
    /// dispatch handlers populate.
    #[derive(Default)]
    pub struct ResourceType: u64 {
        const CHANNEL = 1;
        const GUILD = 1 << 1;
        const MEMBER = 1 << 2;
        const MESSAGE = 1 << 3;
        const PRESENCE = 1 << 4;
        const ROLE = 1 << 5;
        const USER = 1 << 6;
        const VOICE_STATE = 1 << 7;
    }
}

/// Configuration for an [`crate::InMemoryCache`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    pub(crate) resource_types: ResourceType,
    pub(crate) message_cache_size: usize,
    /// spec.md §9 open question #2: when `true`, [`corvid_model::user::User::default_avatar_index`]
    /// is computed from `discriminator` (legacy); when `false` (default),
    /// from the snowflake (new username system).
    pub(crate) legacy_discriminator: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resource_types: ResourceType::all(),
            message_cache_size: 100,
            legacy_discriminator: false,
        }
    }
}

impl Config {
    #[must_use]
    pub const fn resource_types(&self) -> ResourceType {
        self.resource_types
    }

    #[must_use]
    pub const fn message_cache_size(&self) -> usize {
        self.message_cache_size
    }

    #[must_use]
    pub const fn legacy_discriminator(&self) -> bool {
        self.legacy_discriminator
    }
}

/// Builder for [`Config`].
#[derive(Clone, Debug, Default)]
pub struct ConfigBuilder(Config);

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self(Config::default())
    }

    #[must_use]
    pub fn resource_types(mut self, resource_types: ResourceType) -> Self {
        self.0.resource_types = resource_types;
        self
    }

    #[must_use]
    pub fn message_cache_size(mut self, size: usize) -> Self {
        self.0.message_cache_size = size;
        self
    }

    #[must_use]
    pub fn legacy_discriminator(mut self, enabled: bool) -> Self {
        self.0.legacy_discriminator = enabled;
        self
    }

    #[must_use]
    pub fn build(self) -> Config {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::{Config, ResourceType};

    #[test]
    fn defaults_cache_everything_with_a_hundred_messages() {
        let config = Config::default();
        assert_eq!(config.resource_types(), ResourceType::all());
        assert_eq!(config.message_cache_size(), 100);
        assert!(!config.legacy_discriminator());
    }
}
