//! Gateway command and event payload bodies (the `d` field).

use super::{intents::Intents, presence::UpdatePresencePayload};
use crate::id::{
    marker::{ChannelMarker, GuildMarker, UserMarker},
    Id,
};
use serde::{Deserialize, Serialize};

/// `d` of opcode 10 (HELLO).
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct Hello {
    pub heartbeat_interval: u64,
}

/// `properties` object nested in [`Identify`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct IdentifyProperties {
    pub os: String,
    pub browser: String,
    pub device: String,
}

impl IdentifyProperties {
    #[must_use]
    pub fn new(browser: &str) -> Self {
        Self {
            os: std::env::consts::OS.to_owned(),
            browser: browser.to_owned(),
            device: browser.to_owned(),
        }
    }
}

/// `d` of opcode 2 (IDENTIFY).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Identify {
    pub token: String,
    pub properties: IdentifyProperties,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compress: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub large_threshold: Option<u64>,
    pub shard: Option<[u64; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence: Option<UpdatePresencePayload>,
    pub intents: Intents,
}

/// `d` of opcode 6 (RESUME).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Resume {
    pub token: String,
    pub session_id: String,
    pub seq: u64,
}

/// `d` of opcode 1 (HEARTBEAT): the last-seen sequence number, or `None`
/// before any DISPATCH has been received.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Heartbeat {
    pub seq: Option<u64>,
}

/// `d` of opcode 8 (REQUEST_GUILD_MEMBERS).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct RequestGuildMembers {
    pub guild_id: Id<GuildMarker>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub limit: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presences: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<Id<UserMarker>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

/// `d` of opcode 4 (VOICE_STATE_UPDATE).
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct UpdateVoiceState {
    pub guild_id: Id<GuildMarker>,
    pub channel_id: Option<Id<ChannelMarker>>,
    pub self_mute: bool,
    pub self_deaf: bool,
}

/// `d` of the `READY` dispatch.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Ready {
    pub v: u8,
    pub user: crate::user::User,
    pub guilds: Vec<crate::guild::UnavailableGuild>,
    pub session_id: String,
    pub resume_gateway_url: String,
    pub shard: Option<[u64; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heartbeat_with_null_seq_round_trips() {
        let hb = Heartbeat { seq: None };
        let json = serde_json::to_string(&hb).unwrap();
        assert_eq!(json, "null");

        let decoded: Heartbeat = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, hb);
    }
}
