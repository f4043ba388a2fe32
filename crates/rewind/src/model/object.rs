use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

use crate::codec::{ByteReader, ByteWriter, CodecError, Decode, Encode};

/// Lookup key for an object whose storage and lifetime belong to the host.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[rkyv(derive(Debug))]
pub struct ObjectId(pub u32);

impl ObjectId {
    pub fn id(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl Encode for ObjectId {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u32(self.0);
    }
}

impl Decode for ObjectId {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        reader.read_u32().map(Self)
    }
}
