//! Guild records.

pub mod permissions;

pub use permissions::Permissions;

use crate::id::{
    marker::{ChannelMarker, EmojiMarker, GuildMarker, RoleMarker, UserMarker},
    Id,
};
use serde::{Deserialize, Serialize};

/// A role within a guild.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Role {
    pub id: Id<RoleMarker>,
    pub name: String,
    pub color: u32,
    pub hoist: bool,
    pub position: i64,
    pub permissions: Permissions,
    pub managed: bool,
    pub mentionable: bool,
}

/// A custom guild emoji.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Emoji {
    pub id: Id<EmojiMarker>,
    pub name: Option<String>,
    #[serde(default)]
    pub animated: bool,
    #[serde(default)]
    pub managed: bool,
    #[serde(default)]
    pub require_colons: bool,
    #[serde(default)]
    pub roles: Vec<Id<RoleMarker>>,
}

/// A full guild payload, as delivered via `GUILD_CREATE`/`GUILD_UPDATE`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Guild {
    pub id: Id<GuildMarker>,
    pub name: String,
    pub icon: Option<String>,
    pub owner_id: Id<UserMarker>,
    pub afk_channel_id: Option<Id<ChannelMarker>>,
    pub afk_timeout: u64,
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub emojis: Vec<Emoji>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub unavailable: bool,
    pub member_count: Option<u64>,
}

/// A guild the gateway reports as unavailable (a `GUILD_DELETE` whose `d`
/// carries `unavailable: true` means "outage", not "removed"; carrying
/// `unavailable: false`/absent means the bot was actually removed).
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct UnavailableGuild {
    pub id: Id<GuildMarker>,
    #[serde(default)]
    pub unavailable: bool,
}
