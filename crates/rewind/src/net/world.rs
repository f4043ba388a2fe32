use rkyv::{Archive, Deserialize, Serialize, rancor};

use crate::codec::{CodecError, Decode, Encode};
use crate::model::ObjectId;
use crate::registry::KindId;

#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    #[error("serialization failed: {0}")]
    Serialize(rancor::Error),
    #[error("deserialization failed: {0}")]
    Deserialize(rancor::Error),
    #[error("object {object} state: {source}")]
    State {
        object: ObjectId,
        #[source]
        source: CodecError,
    },
}

/// Encoded state of one object inside a [`WorldImage`].
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct ObjectRecord {
    pub object: ObjectId,
    pub kind: u16,
    pub frame: u32,
    pub state: Vec<u8>,
}

/// Whole-world dump carried by the world (de)serialization messages, e.g.
/// for a client joining mid-level.
#[derive(Debug, Clone, Default, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub struct WorldImage {
    pub level: String,
    pub frame: u32,
    pub objects: Vec<ObjectRecord>,
}

impl WorldImage {
    pub fn new(level: impl Into<String>, frame: u32) -> Self {
        Self {
            level: level.into(),
            frame,
            objects: Vec::new(),
        }
    }

    pub fn push<S: Encode>(&mut self, object: ObjectId, kind: KindId, frame: u32, state: &S) {
        self.objects.push(ObjectRecord {
            object,
            kind: kind.0,
            frame,
            state: state.to_bytes(),
        });
    }

    pub fn record(&self, object: ObjectId) -> Option<&ObjectRecord> {
        self.objects.iter().find(|record| record.object == object)
    }

    pub fn decode_state<S: Decode>(&self, object: ObjectId) -> Option<Result<S, WorldError>> {
        self.record(object).map(|record| {
            S::from_bytes(&record.state).map_err(|source| WorldError::State { object, source })
        })
    }

    pub fn serialize(&self) -> Result<Vec<u8>, WorldError> {
        rkyv::to_bytes::<rancor::Error>(self)
            .map(|aligned| aligned.into_vec())
            .map_err(WorldError::Serialize)
    }

    pub fn deserialize(data: &[u8]) -> Result<Self, WorldError> {
        rkyv::from_bytes::<Self, rancor::Error>(data).map_err(WorldError::Deserialize)
    }
}
