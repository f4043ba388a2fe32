use crate::codec::{ByteReader, ByteWriter, CodecError, Decode, Encode};

/// Highest id reserved by the base transport protocol.
pub const BASE_PROTOCOL_HIGHEST: u16 = 47;

/// Message ids appended after the base protocol. Values are part of the wire
/// format: append new ones at the end, never insert or reorder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u16)]
pub enum MessageType {
    LevelLoadBegin = BASE_PROTOCOL_HIGHEST + 1,
    LevelLoadReady,
    LevelLoadComplete,
    WorldSerialize,
    WorldDeserialize,
    ObjectCreate,
    ObjectUpdateState,
    ObjectDelete,
    ObjectQuery,
    EntityQuery,
    InputSample,
    SimulationResult,
}

impl MessageType {
    pub const ALL: [Self; 12] = [
        Self::LevelLoadBegin,
        Self::LevelLoadReady,
        Self::LevelLoadComplete,
        Self::WorldSerialize,
        Self::WorldDeserialize,
        Self::ObjectCreate,
        Self::ObjectUpdateState,
        Self::ObjectDelete,
        Self::ObjectQuery,
        Self::EntityQuery,
        Self::InputSample,
        Self::SimulationResult,
    ];

    pub const fn id(self) -> u16 {
        self as u16
    }

    pub const fn first() -> u16 {
        Self::ALL[0].id()
    }

    pub const fn last() -> u16 {
        Self::ALL[Self::ALL.len() - 1].id()
    }
}

impl TryFrom<u16> for MessageType {
    type Error = CodecError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        value
            .checked_sub(Self::first())
            .and_then(|index| Self::ALL.get(index as usize))
            .copied()
            .ok_or(CodecError::UnknownValue {
                what: "message type",
                value: value as u32,
            })
    }
}

impl Encode for MessageType {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_u16(self.id());
    }
}

impl Decode for MessageType {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Self::try_from(reader.read_u16()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_a_contiguous_block_after_the_base() {
        assert_eq!(MessageType::first(), 48);
        for (offset, kind) in MessageType::ALL.iter().enumerate() {
            assert_eq!(kind.id(), 48 + offset as u16);
        }
        assert_eq!(MessageType::last(), 59);
    }

    #[test]
    fn wire_values_are_stable() {
        assert_eq!(MessageType::LevelLoadBegin.id(), 48);
        assert_eq!(MessageType::WorldSerialize.id(), 51);
        assert_eq!(MessageType::ObjectCreate.id(), 53);
        assert_eq!(MessageType::ObjectUpdateState.id(), 54);
        assert_eq!(MessageType::EntityQuery.id(), 57);
    }

    #[test]
    fn unknown_ids_rejected() {
        assert!(MessageType::try_from(47).is_err());
        assert!(MessageType::try_from(60).is_err());
        assert_eq!(MessageType::try_from(55), Ok(MessageType::ObjectDelete));
    }
}
