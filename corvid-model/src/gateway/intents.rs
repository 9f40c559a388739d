use bitflags::bitflags;
use serde::{
    de::{Deserialize, Deserializer},
    ser::{Serialize, Serializer},
};

bitflags! {
    /// Bitmask telling the gateway which dispatch categories to stream to
    /// this connection.
    ///
    /// `DEFAULT` excludes the three privileged intents (`MESSAGE_CONTENT`,
    /// `GUILD_MEMBERS`, `GUILD_PRESENCES`), which Discord requires to be
    /// explicitly enabled in the developer portal before a bot may request
    /// them. `ALL` is the bitwise-OR of every known bit, computed once at
    /// const-eval time rather than duplicated as a literal.
    #[derive(Default)]
    pub struct Intents: u32 {
        const GUILDS = 1 << 0;
        const GUILD_MEMBERS = 1 << 1;
        const GUILD_BANS = 1 << 2;
        const GUILD_EMOJIS_AND_STICKERS = 1 << 3;
        const GUILD_INTEGRATIONS = 1 << 4;
        const GUILD_WEBHOOKS = 1 << 5;
        const GUILD_INVITES = 1 << 6;
        const GUILD_VOICE_STATES = 1 << 7;
        const GUILD_PRESENCES = 1 << 8;
        const GUILD_MESSAGES = 1 << 9;
        const GUILD_MESSAGE_REACTIONS = 1 << 10;
        const GUILD_MESSAGE_TYPING = 1 << 11;
        const DIRECT_MESSAGES = 1 << 12;
        const DIRECT_MESSAGE_REACTIONS = 1 << 13;
        const DIRECT_MESSAGE_TYPING = 1 << 14;
        const MESSAGE_CONTENT = 1 << 15;
        const GUILD_SCHEDULED_EVENTS = 1 << 16;

        const ALL = Self::GUILDS.bits
            | Self::GUILD_MEMBERS.bits
            | Self::GUILD_BANS.bits
            | Self::GUILD_EMOJIS_AND_STICKERS.bits
            | Self::GUILD_INTEGRATIONS.bits
            | Self::GUILD_WEBHOOKS.bits
            | Self::GUILD_INVITES.bits
            | Self::GUILD_VOICE_STATES.bits
            | Self::GUILD_PRESENCES.bits
            | Self::GUILD_MESSAGES.bits
            | Self::GUILD_MESSAGE_REACTIONS.bits
            | Self::GUILD_MESSAGE_TYPING.bits
            | Self::DIRECT_MESSAGES.bits
            | Self::DIRECT_MESSAGE_REACTIONS.bits
            | Self::DIRECT_MESSAGE_TYPING.bits
            | Self::MESSAGE_CONTENT.bits
            | Self::GUILD_SCHEDULED_EVENTS.bits;

        const PRIVILEGED = Self::MESSAGE_CONTENT.bits
            | Self::GUILD_MEMBERS.bits
            | Self::GUILD_PRESENCES.bits;

        const DEFAULT = Self::ALL.bits & !Self::PRIVILEGED.bits;
    }
}

impl Intents {
    /// Whether this set requests at least one privileged intent.
    #[must_use]
    pub const fn is_privileged(self) -> bool {
        self.intersects(Self::PRIVILEGED)
    }
}

impl<'de> Deserialize<'de> for Intents {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self::from_bits_truncate(u32::deserialize(deserializer)?))
    }
}

impl Serialize for Intents {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::Intents;

    #[test]
    fn default_excludes_privileged() {
        assert!(!Intents::DEFAULT.contains(Intents::MESSAGE_CONTENT));
        assert!(!Intents::DEFAULT.contains(Intents::GUILD_MEMBERS));
        assert!(!Intents::DEFAULT.contains(Intents::GUILD_PRESENCES));
        assert!(Intents::DEFAULT.contains(Intents::GUILDS));
    }

    #[test]
    fn all_is_privileged_plus_default() {
        assert_eq!(Intents::ALL, Intents::DEFAULT | Intents::PRIVILEGED);
    }

    #[test]
    fn scenario_1_intents_513_is_guilds_and_guild_messages() {
        let intents = Intents::from_bits_truncate(513);
        assert_eq!(intents, Intents::GUILDS | Intents::GUILD_MESSAGES);
    }
}
