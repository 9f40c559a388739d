//! The Discord Gateway session engine (spec.md §4.5 "GatewayEngine").
//!
//! [`Shard`] is a single WebSocket session: HELLO/IDENTIFY/RESUME
//! handshake, heartbeat liveness, sequence tracking, the reconnect ladder,
//! and `zlib-stream` inflation. It is intentionally not `Sync` — spec.md
//! §5 pins one shard to one task.

pub mod closecode;
pub mod config;
pub mod error;
pub mod event;
pub mod heartbeat;
#[cfg(feature = "compression")]
pub mod inflater;
pub mod queue;
pub mod ratelimiter;
pub mod session;
pub mod shard;

pub use closecode::CloseCode;
pub use config::{ShardConfig, ShardConfigBuilder};
pub use error::{Error, ErrorKind};
pub use event::{DispatchEvent, GatewayEvent};
pub use session::{Session, Status};
pub use shard::Shard;
