//! Channel and message records.

pub mod message;

pub use message::Message;

use crate::id::{
    marker::{ChannelMarker, GuildMarker},
    Id,
};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Discriminates the kind of a [`Channel`].
#[derive(Clone, Copy, Debug, Deserialize_repr, Eq, PartialEq, Serialize_repr)]
#[repr(u8)]
pub enum ChannelType {
    GuildText = 0,
    Dm = 1,
    GuildVoice = 2,
    GroupDm = 3,
    GuildCategory = 4,
    GuildAnnouncement = 5,
    AnnouncementThread = 10,
    PublicThread = 11,
    PrivateThread = 12,
    GuildStageVoice = 13,
    GuildForum = 15,
}

/// A Discord channel.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Channel {
    pub id: Id<ChannelMarker>,
    #[serde(rename = "type")]
    pub kind: ChannelType,
    pub guild_id: Option<Id<GuildMarker>>,
    pub name: Option<String>,
    pub position: Option<i64>,
    pub parent_id: Option<Id<ChannelMarker>>,
    #[serde(default)]
    pub nsfw: bool,
    pub last_message_id: Option<Id<crate::id::marker::MessageMarker>>,
}
