//! Gateway wire types: opcodes and payload bodies.
//!
//! The opcode-to-payload demultiplexing (building a `GatewayEvent` out of
//! `{op, d, s, t}`) lives in `corvid-gateway`, not here — this crate only
//! owns the shapes of the payloads themselves, mirroring how the teacher
//! splits `twilight-model::gateway` from `twilight-gateway::event`.

pub mod intents;
pub mod opcode;
pub mod payload;
pub mod presence;

pub use intents::Intents;
pub use opcode::OpCode;
