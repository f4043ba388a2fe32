//! Little-endian binary codec for the values that cross the network boundary.
//!
//! Reads and writes are synchronous, bounded and stateless per call. A failed
//! read leaves the reader where it was, so a caller decoding several
//! length-delimited messages can skip the bad one and keep going.

mod color;
mod reader;
mod writer;

use glam::{EulerRot, Quat, Vec2, Vec3};

pub use color::Color;
pub use reader::ByteReader;
pub use writer::ByteWriter;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    #[error("unexpected end of data: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEnd { needed: usize, remaining: usize },
    #[error("invalid bool byte {0:#04x}")]
    InvalidBool(u8),
    #[error("unknown {what} value {value}")]
    UnknownValue { what: &'static str, value: u32 },
    #[error("{0} trailing bytes after message body")]
    TrailingBytes(usize),
    #[error("payload of {0} bytes exceeds the u16 length prefix")]
    PayloadTooLarge(usize),
}

pub trait Encode {
    fn encode(&self, writer: &mut ByteWriter);

    fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::new();
        self.encode(&mut writer);
        writer.into_inner()
    }
}

pub trait Decode: Sized {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError>;

    /// Decodes a value that must consume `bytes` exactly.
    fn from_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut reader = ByteReader::new(bytes);
        let value = Self::decode(&mut reader)?;
        match reader.remaining() {
            0 => Ok(value),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

macro_rules! primitive_codec {
    ($($ty:ty => $write:ident, $read:ident;)*) => {
        $(
            impl Encode for $ty {
                fn encode(&self, writer: &mut ByteWriter) {
                    writer.$write(*self);
                }
            }

            impl Decode for $ty {
                fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
                    reader.$read()
                }
            }
        )*
    };
}

primitive_codec! {
    u8 => write_u8, read_u8;
    i8 => write_i8, read_i8;
    u16 => write_u16, read_u16;
    i16 => write_i16, read_i16;
    u32 => write_u32, read_u32;
    i32 => write_i32, read_i32;
    u64 => write_u64, read_u64;
    i64 => write_i64, read_i64;
    f32 => write_f32, read_f32;
    f64 => write_f64, read_f64;
    bool => write_bool, read_bool;
    Vec2 => write_vec2, read_vec2;
    Vec3 => write_vec3, read_vec3;
    Quat => write_rotation, read_rotation;
}

impl Encode for Color {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_color_rgba(*self);
    }
}

impl Decode for Color {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        reader.read_color_rgba()
    }
}

/// Rotation order used on the wire: yaw about Y, then pitch about X, then
/// roll about Z.
const WIRE_EULER: EulerRot = EulerRot::YXZ;

/// Euler angles in degrees, `(x, y, z)`, as they are written on the wire.
///
/// The encoding cannot express more than one revolution and loses which of the
/// equivalent angle triples produced a rotation. Only the rotation itself
/// survives a round trip, up to float error.
pub fn rotation_to_euler_degrees(rotation: Quat) -> Vec3 {
    let (yaw, pitch, roll) = rotation.normalize().to_euler(WIRE_EULER);
    Vec3::new(pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees())
}

pub fn euler_degrees_to_rotation(angles: Vec3) -> Quat {
    Quat::from_euler(
        WIRE_EULER,
        angles.y.to_radians(),
        angles.x.to_radians(),
        angles.z.to_radians(),
    )
}
