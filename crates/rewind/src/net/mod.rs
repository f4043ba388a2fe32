//! Wire-level pieces the core shares with the transport: message ids,
//! length-delimited envelopes, world images and a lossy link for testing.

mod envelope;
pub mod link;
mod message;
mod world;

pub use envelope::{ENVELOPE_HEADER_LEN, Envelope, MAX_PAYLOAD, decode_stream, encode_stream};
pub use link::{LinkConditions, LinkSimulator, LinkStats};
pub use message::{BASE_PROTOCOL_HIGHEST, MessageType};
pub use world::{ObjectRecord, WorldError, WorldImage};
