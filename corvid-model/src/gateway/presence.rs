use crate::{id::marker::GuildMarker, id::Id, user::User};
use serde::{Deserialize, Serialize};

/// A user's online status.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Online,
    Dnd,
    Idle,
    Invisible,
    Offline,
}

/// An activity entry within a [`Presence`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Activity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: u8,
}

/// A `PRESENCE_UPDATE` dispatch payload.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PresenceUpdate {
    pub guild_id: Id<GuildMarker>,
    pub user: User,
    pub status: Status,
    #[serde(default)]
    pub activities: Vec<Activity>,
}

/// The outgoing `PRESENCE_UPDATE` command payload (opcode 3), used to set
/// this shard's own presence.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct UpdatePresencePayload {
    pub since: Option<u64>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    pub status: Option<Status>,
    pub afk: bool,
}
