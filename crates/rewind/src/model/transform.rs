use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{Amount, BlendPolicy, Snapshot, lerp_clamped, slerp_shortest};
use crate::codec::{ByteReader, ByteWriter, CodecError, Decode, Encode};

/// Position, rotation and scale of one object.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TransformSnapshot {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for TransformSnapshot {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl TransformSnapshot {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }
}

impl Snapshot for TransformSnapshot {
    fn interpolate(prev: &Self, next: &Self, amount: Amount) -> Self {
        let t = amount.resolve(BlendPolicy::Clamped);
        Self {
            position: lerp_clamped(prev.position, next.position, t),
            rotation: slerp_shortest(prev.rotation, next.rotation, t),
            scale: lerp_clamped(prev.scale, next.scale, t),
        }
    }
}

impl Encode for TransformSnapshot {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_vec3(self.position);
        writer.write_rotation(self.rotation);
        writer.write_vec3(self.scale);
    }
}

impl Decode for TransformSnapshot {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            position: reader.read_vec3()?,
            rotation: reader.read_rotation()?,
            scale: reader.read_vec3()?,
        })
    }
}
