use crate::codec::{ByteReader, ByteWriter, CodecError, Decode, Encode};
use crate::model::ObjectId;

/// Client input tagged with the client tick it was sampled at.
#[derive(Debug, Clone, PartialEq)]
pub struct InputMessage<I> {
    pub object: ObjectId,
    pub client_frame: u32,
    pub input: I,
}

/// Authoritative result for the given frame of one object.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMessage<R> {
    pub object: ObjectId,
    pub frame: u32,
    pub result: R,
}

impl<I: Encode> Encode for InputMessage<I> {
    fn encode(&self, writer: &mut ByteWriter) {
        self.object.encode(writer);
        writer.write_u32(self.client_frame);
        self.input.encode(writer);
    }
}

impl<I: Decode> Decode for InputMessage<I> {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            object: ObjectId::decode(reader)?,
            client_frame: reader.read_u32()?,
            input: I::decode(reader)?,
        })
    }
}

impl<R: Encode> Encode for ResultMessage<R> {
    fn encode(&self, writer: &mut ByteWriter) {
        self.object.encode(writer);
        writer.write_u32(self.frame);
        self.result.encode(writer);
    }
}

impl<R: Decode> Decode for ResultMessage<R> {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            object: ObjectId::decode(reader)?,
            frame: reader.read_u32()?,
            result: R::decode(reader)?,
        })
    }
}
