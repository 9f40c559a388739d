//! Message records.

use crate::{
    id::{
        marker::{ChannelMarker, GuildMarker, MessageMarker},
        Id,
    },
    user::User,
};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

/// Discriminates the kind of a [`Message`].
#[derive(Clone, Copy, Debug, Deserialize_repr, Eq, PartialEq, Serialize_repr)]
#[repr(u8)]
pub enum MessageType {
    Regular = 0,
    RecipientAdd = 1,
    RecipientRemove = 2,
    Call = 3,
    ChannelNameChange = 4,
    ChannelIconChange = 5,
    Reply = 19,
    ChatInputCommand = 20,
}

/// A message sent in a [`Channel`][`super::Channel`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Message {
    pub id: Id<MessageMarker>,
    pub channel_id: Id<ChannelMarker>,
    pub guild_id: Option<Id<GuildMarker>>,
    pub author: User,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub timestamp: String,
    pub edited_timestamp: Option<String>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub tts: bool,
}

/// The boundary constraints an embed builder must enforce, tested in
/// spec.md §8. The builder itself is out of scope (spec.md §1); these
/// constants are kept here because validation of wire payloads against them
/// is in-scope for the REST engine.
pub mod embed_limits {
    pub const TITLE: usize = 256;
    pub const DESCRIPTION: usize = 4096;
    pub const FIELD_COUNT: usize = 25;
    pub const FIELD_NAME: usize = 256;
    pub const FIELD_VALUE: usize = 1024;
    pub const FOOTER_TEXT: usize = 2048;
    pub const AUTHOR_NAME: usize = 256;
    pub const TOTAL: usize = 6000;
}
