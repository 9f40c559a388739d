//! An in-process-memory cache updated from gateway dispatches (spec.md §3
//! "Cache entries", §4.5 "Inbound handling").
//!
//! Grounded in the teacher's `twilight-cache-inmemory`: sharded
//! [`DashMap`]s keyed by snowflake, one store per resource kind, written
//! only from [`InMemoryCache::update`] (the gateway task) and read freely
//! from anywhere else.

mod config;
mod stats;
mod update;

pub use config::{Config, ConfigBuilder, ResourceType};
pub use stats::InMemoryCacheStats;

use corvid_model::{
    channel::{message::Message, Channel},
    gateway::presence::PresenceUpdate,
    guild::{Guild, Role},
    id::{
        marker::{ChannelMarker, GuildMarker, RoleMarker, UserMarker},
        Id,
    },
    user::{Member, User},
    voice::VoiceState,
};
use dashmap::{mapref::one::Ref, DashMap};
use std::{collections::VecDeque, sync::RwLock};

/// The in-memory cache.
///
/// No entry expires except through the explicit DELETE dispatches spec.md
/// §3 names; there is no TTL sweep.
pub struct InMemoryCache {
    config: Config,
    guilds: DashMap<Id<GuildMarker>, Guild>,
    channels: DashMap<Id<ChannelMarker>, Channel>,
    users: DashMap<Id<UserMarker>, User>,
    members: DashMap<(Id<GuildMarker>, Id<UserMarker>), Member>,
    roles: DashMap<Id<RoleMarker>, Role>,
    guild_roles: DashMap<Id<GuildMarker>, Vec<Id<RoleMarker>>>,
    presences: DashMap<(Id<GuildMarker>, Id<UserMarker>), PresenceUpdate>,
    voice_states: DashMap<(Id<GuildMarker>, Id<UserMarker>), VoiceState>,
    messages: DashMap<Id<ChannelMarker>, VecDeque<Message>>,
    current_user: RwLock<Option<User>>,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCache {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    #[must_use]
    pub fn with_config(config: Config) -> Self {
        Self {
            config,
            guilds: DashMap::new(),
            channels: DashMap::new(),
            users: DashMap::new(),
            members: DashMap::new(),
            roles: DashMap::new(),
            guild_roles: DashMap::new(),
            presences: DashMap::new(),
            voice_states: DashMap::new(),
            messages: DashMap::new(),
            current_user: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn stats(&self) -> InMemoryCacheStats<'_> {
        InMemoryCacheStats::new(self)
    }

    #[must_use]
    pub fn guild(&self, id: Id<GuildMarker>) -> Option<Ref<'_, Id<GuildMarker>, Guild>> {
        self.guilds.get(&id)
    }

    #[must_use]
    pub fn channel(&self, id: Id<ChannelMarker>) -> Option<Ref<'_, Id<ChannelMarker>, Channel>> {
        self.channels.get(&id)
    }

    #[must_use]
    pub fn user(&self, id: Id<UserMarker>) -> Option<Ref<'_, Id<UserMarker>, User>> {
        self.users.get(&id)
    }

    /// Populated by `GUILD_MEMBER_*`/`GUILD_MEMBERS_CHUNK` dispatches,
    /// which spec.md's minimal dispatch set doesn't enumerate among its
    /// worked examples; the store exists so a fuller member-event
    /// implementation has somewhere to write.
    #[must_use]
    pub fn member(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> Option<Ref<'_, (Id<GuildMarker>, Id<UserMarker>), Member>> {
        self.members.get(&(guild_id, user_id))
    }

    #[must_use]
    pub fn role(&self, id: Id<RoleMarker>) -> Option<Ref<'_, Id<RoleMarker>, Role>> {
        self.roles.get(&id)
    }

    #[must_use]
    pub fn guild_roles(&self, guild_id: Id<GuildMarker>) -> Vec<Id<RoleMarker>> {
        self.guild_roles.get(&guild_id).map(|r| r.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn presence(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> Option<Ref<'_, (Id<GuildMarker>, Id<UserMarker>), PresenceUpdate>> {
        self.presences.get(&(guild_id, user_id))
    }

    #[must_use]
    pub fn voice_state(
        &self,
        guild_id: Id<GuildMarker>,
        user_id: Id<UserMarker>,
    ) -> Option<Ref<'_, (Id<GuildMarker>, Id<UserMarker>), VoiceState>> {
        self.voice_states.get(&(guild_id, user_id))
    }

    #[must_use]
    pub fn channel_messages(&self, channel_id: Id<ChannelMarker>) -> Vec<Message> {
        self.messages
            .get(&channel_id)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// The bot's own user, cached from `READY` (spec.md §4.5 scenario 1).
    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.current_user.read().expect("current_user poisoned").clone()
    }

    fn set_current_user(&self, user: User) {
        *self.current_user.write().expect("current_user poisoned") = Some(user);
    }
}

#[cfg(test)]
mod lib_tests {
    use super::InMemoryCache;

    #[test]
    fn cache_is_send_and_sync() {
        static_assertions::assert_impl_all!(InMemoryCache: Send, Sync);
    }
}
