//! Opcode demultiplexing: turning a raw `{op, d, s, t}` envelope into a
//! typed [`GatewayEvent`] (spec.md §4.5 "Opcodes handled" / §6).
//!
//! `corvid-model::gateway` owns the payload shapes; this module owns the
//! demux, matching how the teacher splits `twilight-model::gateway` from
//! `twilight-gateway::event` (see `corvid-model::gateway`'s module doc).

use corvid_model::{
    channel::{message::Message, Channel},
    gateway::{
        opcode::OpCode,
        payload::{Hello, Ready},
        presence::PresenceUpdate,
    },
    guild::{Guild, UnavailableGuild},
    id::{
        marker::{ChannelMarker, MessageMarker},
        Id,
    },
    voice::VoiceState,
};
use serde::Deserialize;
use serde_json::value::RawValue;

/// The wire envelope every gateway frame arrives as.
#[derive(Debug, Deserialize)]
pub struct Envelope<'a> {
    pub op: u8,
    #[serde(borrow)]
    pub d: Option<&'a RawValue>,
    pub s: Option<u64>,
    pub t: Option<String>,
}

/// A fully demultiplexed gateway frame, ready for the shard's state machine
/// to act on (spec.md §4.5 "Inbound handling").
#[derive(Debug)]
pub enum GatewayEvent {
    Dispatch(u64, Box<DispatchEvent>),
    Heartbeat(Option<u64>),
    HeartbeatAck,
    Reconnect,
    InvalidSession { resumable: bool },
    Hello(Hello),
}

/// The `t`-tagged payloads this engine understands well enough to update
/// the cache; anything else is preserved as [`DispatchEvent::Unknown`] so
/// the event bus can still re-emit it for user code (spec.md's "Unknown
/// fields from the server" decision in SPEC_FULL.md applies the same way
/// at the dispatch-type level: unrecognized `t` values are surfaced, not
/// dropped).
#[derive(Debug)]
pub enum DispatchEvent {
    Ready(Box<Ready>),
    Resumed,
    GuildCreate(Box<Guild>),
    GuildUpdate(Box<Guild>),
    GuildDelete(UnavailableGuild),
    ChannelCreate(Box<Channel>),
    ChannelUpdate(Box<Channel>),
    ChannelDelete(Box<Channel>),
    MessageCreate(Box<Message>),
    MessageUpdate(Box<Message>),
    MessageDelete {
        id: Id<MessageMarker>,
        channel_id: Id<ChannelMarker>,
    },
    PresenceUpdate(Box<PresenceUpdate>),
    VoiceStateUpdate(Box<VoiceState>),
    Unknown {
        name: String,
        data: serde_json::Value,
    },
}

/// Demux a raw JSON payload into a [`GatewayEvent`].
///
/// # Errors
///
/// Returns the underlying `serde_json` error if the envelope or a known
/// `d` body fails to parse.
pub fn decode(json: &str) -> Result<GatewayEvent, serde_json::Error> {
    let envelope: Envelope<'_> = serde_json::from_str(json)?;
    let d = envelope.d.map(RawValue::get).unwrap_or("null");

    let event = match OpCode::try_from_u8(envelope.op) {
        Some(OpCode::Dispatch) => {
            let sequence = envelope.s.unwrap_or_default();
            let name = envelope.t.unwrap_or_default();
            let dispatch = decode_dispatch(&name, d)?;
            GatewayEvent::Dispatch(sequence, Box::new(dispatch))
        }
        Some(OpCode::Heartbeat) => {
            GatewayEvent::Heartbeat(serde_json::from_str::<Option<u64>>(d)?)
        }
        Some(OpCode::HeartbeatAck) => GatewayEvent::HeartbeatAck,
        Some(OpCode::Reconnect) => GatewayEvent::Reconnect,
        Some(OpCode::InvalidSession) => GatewayEvent::InvalidSession {
            resumable: serde_json::from_str::<bool>(d).unwrap_or(false),
        },
        Some(OpCode::Hello) => GatewayEvent::Hello(serde_json::from_str(d)?),
        _ => GatewayEvent::InvalidSession { resumable: false },
    };

    Ok(event)
}

fn decode_dispatch(name: &str, d: &str) -> Result<DispatchEvent, serde_json::Error> {
    Ok(match name {
        "READY" => DispatchEvent::Ready(Box::new(serde_json::from_str(d)?)),
        "RESUMED" => DispatchEvent::Resumed,
        "GUILD_CREATE" => DispatchEvent::GuildCreate(Box::new(serde_json::from_str(d)?)),
        "GUILD_UPDATE" => DispatchEvent::GuildUpdate(Box::new(serde_json::from_str(d)?)),
        "GUILD_DELETE" => DispatchEvent::GuildDelete(serde_json::from_str(d)?),
        "CHANNEL_CREATE" => DispatchEvent::ChannelCreate(Box::new(serde_json::from_str(d)?)),
        "CHANNEL_UPDATE" => DispatchEvent::ChannelUpdate(Box::new(serde_json::from_str(d)?)),
        "CHANNEL_DELETE" => DispatchEvent::ChannelDelete(Box::new(serde_json::from_str(d)?)),
        "MESSAGE_CREATE" => DispatchEvent::MessageCreate(Box::new(serde_json::from_str(d)?)),
        "MESSAGE_UPDATE" => DispatchEvent::MessageUpdate(Box::new(serde_json::from_str(d)?)),
        "MESSAGE_DELETE" => {
            #[derive(Deserialize)]
            struct MessageDelete {
                id: Id<MessageMarker>,
                channel_id: Id<ChannelMarker>,
            }
            let payload: MessageDelete = serde_json::from_str(d)?;
            DispatchEvent::MessageDelete {
                id: payload.id,
                channel_id: payload.channel_id,
            }
        }
        "PRESENCE_UPDATE" => DispatchEvent::PresenceUpdate(Box::new(serde_json::from_str(d)?)),
        "VOICE_STATE_UPDATE" => DispatchEvent::VoiceStateUpdate(Box::new(serde_json::from_str(d)?)),
        other => DispatchEvent::Unknown {
            name: other.to_owned(),
            data: serde_json::from_str(d).unwrap_or(serde_json::Value::Null),
        },
    })
}

trait OpCodeExt: Sized {
    fn try_from_u8(op: u8) -> Option<Self>;
}

impl OpCodeExt for OpCode {
    fn try_from_u8(op: u8) -> Option<Self> {
        serde_json::from_value(serde_json::Value::from(op)).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_decodes_heartbeat_interval() {
        let json = r#"{"op":10,"d":{"heartbeat_interval":41250}}"#;
        match decode(json).unwrap() {
            GatewayEvent::Hello(hello) => assert_eq!(hello.heartbeat_interval, 41_250),
            other => panic!("expected Hello, got {other:?}"),
        }
    }

    #[test]
    fn invalid_session_carries_resumable_flag() {
        let json = r#"{"op":9,"d":false}"#;
        match decode(json).unwrap() {
            GatewayEvent::InvalidSession { resumable } => assert!(!resumable),
            other => panic!("expected InvalidSession, got {other:?}"),
        }
    }

    #[test]
    fn unknown_dispatch_type_is_preserved() {
        let json = r#"{"op":0,"d":{"foo":1},"s":7,"t":"THREAD_CREATE"}"#;
        match decode(json).unwrap() {
            GatewayEvent::Dispatch(seq, dispatch) => {
                assert_eq!(seq, 7);
                match *dispatch {
                    DispatchEvent::Unknown { name, .. } => assert_eq!(name, "THREAD_CREATE"),
                    other => panic!("expected Unknown, got {other:?}"),
                }
            }
            other => panic!("expected Dispatch, got {other:?}"),
        }
    }
}
