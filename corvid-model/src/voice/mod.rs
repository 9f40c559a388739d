//! Voice state records.
//!
//! RTP/UDP voice transport itself is out of scope (spec.md §1 Non-goals);
//! this is only the gateway-delivered state object the cache tracks.

use crate::id::{
    marker::{ChannelMarker, GuildMarker, UserMarker},
    Id,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct VoiceState {
    pub guild_id: Option<Id<GuildMarker>>,
    pub channel_id: Option<Id<ChannelMarker>>,
    pub user_id: Id<UserMarker>,
    #[serde(default)]
    pub deaf: bool,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub self_deaf: bool,
    #[serde(default)]
    pub self_mute: bool,
}
