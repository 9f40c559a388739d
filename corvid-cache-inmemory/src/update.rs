//! Dispatch → cache mutation (spec.md §4.5 "Inbound handling": "cache
//! updates for a given dispatch complete before listeners run").
//!
//! SPEC_FULL.md's decision on spec.md §9's "unknown-field preservation"
//! open question: updates are applied as typed whole-record
//! replacement — deserializing the new payload and overwriting exactly
//! the fields its type defines, never a blind merge of arbitrary JSON.

use crate::{config::ResourceType, InMemoryCache};
use corvid_gateway::event::DispatchEvent;

impl InMemoryCache {
    /// Apply one demultiplexed dispatch to the cache.
    pub fn update(&self, event: &DispatchEvent) {
        match event {
            DispatchEvent::Ready(ready) => self.update_ready(ready),
            DispatchEvent::Resumed | DispatchEvent::Unknown { .. } => {}
            DispatchEvent::GuildCreate(guild) | DispatchEvent::GuildUpdate(guild) => {
                self.update_guild(guild);
            }
            DispatchEvent::GuildDelete(unavailable) => self.update_guild_delete(unavailable),
            DispatchEvent::ChannelCreate(channel) | DispatchEvent::ChannelUpdate(channel) => {
                self.update_channel(channel);
            }
            DispatchEvent::ChannelDelete(channel) => self.update_channel_delete(channel),
            DispatchEvent::MessageCreate(message) | DispatchEvent::MessageUpdate(message) => {
                self.update_message(message);
            }
            DispatchEvent::MessageDelete { id, channel_id } => {
                self.update_message_delete(*channel_id, *id);
            }
            DispatchEvent::PresenceUpdate(presence) => self.update_presence(presence),
            DispatchEvent::VoiceStateUpdate(state) => self.update_voice_state(state),
        }
    }

    fn wants(&self, resource: ResourceType) -> bool {
        self.config.resource_types.contains(resource)
    }

    fn update_ready(&self, ready: &corvid_model::gateway::payload::Ready) {
        if self.wants(ResourceType::USER) {
            self.set_current_user(ready.user.clone());
            self.users.insert(ready.user.id, ready.user.clone());
        }

        if self.wants(ResourceType::GUILD) {
            for unavailable in &ready.guilds {
                self.guilds.entry(unavailable.id).or_insert_with(|| corvid_model::guild::Guild {
                    id: unavailable.id,
                    name: String::new(),
                    icon: None,
                    owner_id: ready.user.id,
                    afk_channel_id: None,
                    afk_timeout: 0,
                    roles: Vec::new(),
                    emojis: Vec::new(),
                    features: Vec::new(),
                    unavailable: true,
                    member_count: None,
                });
            }
        }
    }

    fn update_guild(&self, guild: &corvid_model::guild::Guild) {
        if self.wants(ResourceType::ROLE) {
            let role_ids = guild.roles.iter().map(|r| r.id).collect();
            for role in &guild.roles {
                self.roles.insert(role.id, role.clone());
            }
            self.guild_roles.insert(guild.id, role_ids);
        }

        if self.wants(ResourceType::GUILD) {
            self.guilds.insert(guild.id, guild.clone());
        }
    }

    fn update_guild_delete(&self, unavailable: &corvid_model::guild::UnavailableGuild) {
        if !self.wants(ResourceType::GUILD) {
            return;
        }

        if unavailable.unavailable {
            if let Some(mut guild) = self.guilds.get_mut(&unavailable.id) {
                guild.unavailable = true;
            }
            return;
        }

        // A genuine removal (spec.md §9 design note: `unavailable: false`
        // or absent means the bot was actually removed from the guild).
        if let Some((_, roles)) = self.guild_roles.remove(&unavailable.id) {
            for role_id in roles {
                self.roles.remove(&role_id);
            }
        }
        self.guilds.remove(&unavailable.id);
        self.members.retain(|(guild_id, _), _| *guild_id != unavailable.id);
        self.voice_states.retain(|(guild_id, _), _| *guild_id != unavailable.id);
        self.presences.retain(|(guild_id, _), _| *guild_id != unavailable.id);
    }

    fn update_channel(&self, channel: &corvid_model::channel::Channel) {
        if self.wants(ResourceType::CHANNEL) {
            self.channels.insert(channel.id, channel.clone());
        }
    }

    fn update_channel_delete(&self, channel: &corvid_model::channel::Channel) {
        if self.wants(ResourceType::CHANNEL) {
            self.channels.remove(&channel.id);
            self.messages.remove(&channel.id);
        }
    }

    fn update_message(&self, message: &corvid_model::channel::message::Message) {
        if !self.wants(ResourceType::MESSAGE) {
            return;
        }

        self.users.entry(message.author.id).or_insert_with(|| message.author.clone());

        let mut entry = self.messages.entry(message.channel_id).or_default();

        if let Some(existing) = entry.iter_mut().find(|m| m.id == message.id) {
            *existing = message.clone();
            return;
        }

        entry.push_front(message.clone());
        while entry.len() > self.config.message_cache_size {
            entry.pop_back();
        }
    }

    fn update_message_delete(
        &self,
        channel_id: corvid_model::id::Id<corvid_model::id::marker::ChannelMarker>,
        message_id: corvid_model::id::Id<corvid_model::id::marker::MessageMarker>,
    ) {
        if !self.wants(ResourceType::MESSAGE) {
            return;
        }

        if let Some(mut messages) = self.messages.get_mut(&channel_id) {
            messages.retain(|m| m.id != message_id);
        }
    }

    fn update_presence(&self, presence: &corvid_model::gateway::presence::PresenceUpdate) {
        if self.wants(ResourceType::PRESENCE) {
            self.presences.insert((presence.guild_id, presence.user.id), presence.clone());
        }
        if self.wants(ResourceType::USER) {
            self.users.entry(presence.user.id).or_insert_with(|| presence.user.clone());
        }
    }

    fn update_voice_state(&self, state: &corvid_model::voice::VoiceState) {
        if !self.wants(ResourceType::VOICE_STATE) {
            return;
        }

        let Some(guild_id) = state.guild_id else { return };
        let key = (guild_id, state.user_id);

        if state.channel_id.is_some() {
            self.voice_states.insert(key, state.clone());
        } else {
            self.voice_states.remove(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corvid_gateway::event::DispatchEvent;
    use corvid_model::{
        guild::{Guild, Role, Permissions},
        id::Id,
        user::User,
        voice::VoiceState,
    };

    fn user(id: u64) -> User {
        User {
            id: Id::new(id),
            username: "alice".to_owned(),
            discriminator: "0".to_owned(),
            avatar: None,
            bot: false,
            system: false,
            public_flags: None,
        }
    }

    fn role(id: u64) -> Role {
        Role {
            id: Id::new(id),
            name: "mod".to_owned(),
            color: 0,
            hoist: false,
            position: 1,
            permissions: Permissions::empty(),
            managed: false,
            mentionable: true,
        }
    }

    #[test]
    fn guild_create_caches_guild_and_its_roles() {
        let cache = InMemoryCache::new();
        let guild = Guild {
            id: Id::new(10),
            name: "test".to_owned(),
            icon: None,
            owner_id: Id::new(1),
            afk_channel_id: None,
            afk_timeout: 0,
            roles: vec![role(11)],
            emojis: Vec::new(),
            features: Vec::new(),
            unavailable: false,
            member_count: Some(1),
        };

        cache.update(&DispatchEvent::GuildCreate(Box::new(guild)));

        assert!(cache.guild(Id::new(10)).is_some());
        assert!(cache.role(Id::new(11)).is_some());
        assert_eq!(cache.guild_roles(Id::new(10)), vec![Id::new(11)]);
    }

    #[test]
    fn guild_delete_with_unavailable_marks_outage_not_removal() {
        let cache = InMemoryCache::new();
        let guild = Guild {
            id: Id::new(10),
            name: "test".to_owned(),
            icon: None,
            owner_id: Id::new(1),
            afk_channel_id: None,
            afk_timeout: 0,
            roles: Vec::new(),
            emojis: Vec::new(),
            features: Vec::new(),
            unavailable: false,
            member_count: Some(1),
        };
        cache.update(&DispatchEvent::GuildCreate(Box::new(guild)));

        cache.update(&DispatchEvent::GuildDelete(corvid_model::guild::UnavailableGuild {
            id: Id::new(10),
            unavailable: true,
        }));

        assert!(cache.guild(Id::new(10)).unwrap().unavailable);
    }

    #[test]
    fn guild_delete_without_unavailable_removes_guild() {
        let cache = InMemoryCache::new();
        let guild = Guild {
            id: Id::new(10),
            name: "test".to_owned(),
            icon: None,
            owner_id: Id::new(1),
            afk_channel_id: None,
            afk_timeout: 0,
            roles: Vec::new(),
            emojis: Vec::new(),
            features: Vec::new(),
            unavailable: false,
            member_count: Some(1),
        };
        cache.update(&DispatchEvent::GuildCreate(Box::new(guild)));

        cache.update(&DispatchEvent::GuildDelete(corvid_model::guild::UnavailableGuild {
            id: Id::new(10),
            unavailable: false,
        }));

        assert!(cache.guild(Id::new(10)).is_none());
    }

    #[test]
    fn voice_state_with_no_channel_evicts_entry() {
        let cache = InMemoryCache::new();
        let joined = VoiceState {
            guild_id: Some(Id::new(1)),
            channel_id: Some(Id::new(2)),
            user_id: Id::new(3),
            deaf: false,
            mute: false,
            self_deaf: false,
            self_mute: false,
        };
        cache.update(&DispatchEvent::VoiceStateUpdate(Box::new(joined.clone())));
        assert!(cache.voice_state(Id::new(1), Id::new(3)).is_some());

        let left = VoiceState {
            channel_id: None,
            ..joined
        };
        cache.update(&DispatchEvent::VoiceStateUpdate(Box::new(left)));
        assert!(cache.voice_state(Id::new(1), Id::new(3)).is_none());
    }

    #[test]
    fn message_cache_respects_configured_size() {
        let config = crate::ConfigBuilder::new().message_cache_size(2).build();
        let cache = InMemoryCache::with_config(config);

        for i in 1..=3u64 {
            let message = corvid_model::channel::message::Message {
                id: Id::new(i),
                channel_id: Id::new(100),
                guild_id: None,
                author: user(1),
                content: format!("msg {i}"),
                kind: corvid_model::channel::message::MessageType::Regular,
                timestamp: "now".to_owned(),
                edited_timestamp: None,
                pinned: false,
                tts: false,
            };
            cache.update(&DispatchEvent::MessageCreate(Box::new(message)));
        }

        assert_eq!(cache.channel_messages(Id::new(100)).len(), 2);
    }
}
