//! A kinematic mover implementing the simulation hooks: the reference host
//! object used by the harness and the scenario tests.

use glam::{Quat, Vec3};

use crate::codec::{ByteReader, ByteWriter, CodecError, Decode, Encode};
use crate::lagcomp::ColliderPose;
use crate::model::TransformSnapshot;
use crate::simulation::{Simulated, SimulationResult};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MoveInput {
    /// Desired direction; lengths above one are clamped.
    pub direction: Vec3,
    pub yaw: f32,
    pub sprint: bool,
}

impl MoveInput {
    pub fn towards(direction: Vec3) -> Self {
        Self {
            direction,
            ..Default::default()
        }
    }
}

impl Encode for MoveInput {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_vec3(self.direction);
        writer.write_f32(self.yaw);
        writer.write_bool(self.sprint);
    }
}

impl Decode for MoveInput {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            direction: reader.read_vec3()?,
            yaw: reader.read_f32()?,
            sprint: reader.read_bool()?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoveResult {
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
}

impl SimulationResult for MoveResult {
    fn compare(&self, other: &Self) -> f32 {
        self.position.distance(other.position)
    }
}

impl Encode for MoveResult {
    fn encode(&self, writer: &mut ByteWriter) {
        writer.write_vec3(self.position);
        writer.write_vec3(self.velocity);
        writer.write_rotation(self.rotation);
    }
}

impl Decode for MoveResult {
    fn decode(reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            position: reader.read_vec3()?,
            velocity: reader.read_vec3()?,
            rotation: reader.read_rotation()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct KinematicBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub rotation: Quat,
    pub speed: f32,
    pub sprint_multiplier: f32,
    input: MoveInput,
}

impl KinematicBody {
    pub fn new(position: Vec3, speed: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            speed,
            sprint_multiplier: 2.0,
            input: MoveInput::default(),
        }
    }

    /// Input the next `collect_input` returns.
    pub fn set_input(&mut self, input: MoveInput) {
        self.input = input;
    }

    pub fn input(&self) -> MoveInput {
        self.input
    }

    pub fn result(&self) -> MoveResult {
        MoveResult {
            position: self.position,
            velocity: self.velocity,
            rotation: self.rotation,
        }
    }
}

impl Simulated for KinematicBody {
    type Input = MoveInput;
    type Result = MoveResult;
    type Snapshot = TransformSnapshot;

    fn collect_input(&mut self, _frame: u32) -> MoveInput {
        self.input
    }

    fn apply_input(&mut self, input: &MoveInput, dt: f32) -> MoveResult {
        let direction = input.direction.clamp_length_max(1.0);
        let speed = if input.sprint {
            self.speed * self.sprint_multiplier
        } else {
            self.speed
        };

        self.velocity = direction * speed;
        self.position += self.velocity * dt;
        self.rotation = Quat::from_rotation_y(input.yaw);
        self.result()
    }

    fn reset_to(&mut self, authoritative: &MoveResult) {
        self.position = authoritative.position;
        self.velocity = authoritative.velocity;
        self.rotation = authoritative.rotation;
    }

    fn snapshot(&self) -> TransformSnapshot {
        TransformSnapshot {
            position: self.position,
            rotation: self.rotation,
            scale: Vec3::ONE,
        }
    }

    fn collider_pose(&self) -> ColliderPose {
        ColliderPose::new(self.position, self.rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moves_along_input() {
        let mut body = KinematicBody::new(Vec3::ZERO, 6.0);
        let result = body.apply_input(&MoveInput::towards(Vec3::X), 0.5);
        assert!((result.position - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);

        let sprint = MoveInput {
            direction: Vec3::Z * 5.0,
            yaw: 0.0,
            sprint: true,
        };
        let result = body.apply_input(&sprint, 0.5);
        assert!((result.velocity - Vec3::new(0.0, 0.0, 12.0)).length() < 1e-5);
    }

    #[test]
    fn compare_is_positional_distance() {
        let mut a = KinematicBody::new(Vec3::ZERO, 1.0).result();
        let b = KinematicBody::new(Vec3::new(3.0, 4.0, 0.0), 1.0).result();
        assert_eq!(a.compare(&b), 5.0);
        a.velocity = Vec3::X;
        assert_eq!(a.compare(&a), 0.0);
    }

    #[test]
    fn input_wire_roundtrip() {
        let input = MoveInput {
            direction: Vec3::new(0.5, 0.0, -1.0),
            yaw: 1.25,
            sprint: true,
        };
        assert_eq!(MoveInput::from_bytes(&input.to_bytes()).unwrap(), input);
    }
}
