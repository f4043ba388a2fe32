use super::message::MessageType;
use crate::codec::{ByteReader, ByteWriter, CodecError, Decode, Encode};
use crate::model::ObjectId;

/// Type id, object id and frame.
pub const ENVELOPE_HEADER_LEN: usize = 2 + 4 + 4 + 2;
pub const MAX_PAYLOAD: usize = u16::MAX as usize - ENVELOPE_HEADER_LEN;

/// One core message: which object and frame it concerns, plus an encoded
/// payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    kind: MessageType,
    object: ObjectId,
    frame: u32,
    payload: Vec<u8>,
}

impl Envelope {
    pub fn new<T: Encode>(
        kind: MessageType,
        object: ObjectId,
        frame: u32,
        payload: &T,
    ) -> Result<Self, CodecError> {
        Self::from_raw(kind, object, frame, payload.to_bytes())
    }

    pub fn from_raw(
        kind: MessageType,
        object: ObjectId,
        frame: u32,
        payload: Vec<u8>,
    ) -> Result<Self, CodecError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(CodecError::PayloadTooLarge(payload.len()));
        }
        Ok(Self {
            kind,
            object,
            frame,
            payload,
        })
    }

    pub fn kind(&self) -> MessageType {
        self.kind
    }

    pub fn object(&self) -> ObjectId {
        self.object
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn decode_payload<T: Decode>(&self) -> Result<T, CodecError> {
        T::from_bytes(&self.payload)
    }
}

impl Encode for Envelope {
    fn encode(&self, writer: &mut ByteWriter) {
        self.kind.encode(writer);
        self.object.encode(writer);
        writer.write_u32(self.frame);
        // Bounded by MAX_PAYLOAD at construction.
        writer.write_u16(self.payload.len() as u16);
        writer.write_slice(&self.payload);
    }
}

impl Decode for Envelope {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        let kind = MessageType::decode(reader)?;
        let object = ObjectId::decode(reader)?;
        let frame = reader.read_u32()?;
        let payload = reader.read_bytes()?.to_vec();
        Ok(Self {
            kind,
            object,
            frame,
            payload,
        })
    }
}

/// Writes each envelope behind a `u16` length prefix.
pub fn encode_stream(envelopes: &[Envelope]) -> Vec<u8> {
    let mut writer = ByteWriter::new();
    for envelope in envelopes {
        let body = envelope.to_bytes();
        writer.write_u16(body.len() as u16);
        writer.write_slice(&body);
    }
    writer.into_inner()
}

/// Decodes every length-delimited envelope in `bytes`. A malformed envelope
/// yields an error in its slot and decoding resumes at the next one; a
/// truncated length prefix ends the stream.
pub fn decode_stream(bytes: &[u8]) -> Vec<Result<Envelope, CodecError>> {
    let mut reader = ByteReader::new(bytes);
    let mut out = Vec::new();

    while reader.remaining() > 0 {
        match reader.read_bytes() {
            Ok(frame) => out.push(Envelope::from_bytes(frame)),
            Err(err) => {
                log::debug!("stream truncated at byte {}: {err}", reader.position());
                out.push(Err(err));
                break;
            }
        }
    }

    out
}
