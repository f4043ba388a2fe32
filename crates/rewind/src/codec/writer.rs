use byteorder::{ByteOrder, LittleEndian};
use glam::{Quat, Vec2, Vec3};

use super::{Color, CodecError, rotation_to_euler_degrees};

#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    fn extend(&mut self, n: usize) -> &mut [u8] {
        let start = self.buf.len();
        self.buf.resize(start + n, 0);
        &mut self.buf[start..]
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.buf.push(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        LittleEndian::write_u16(self.extend(2), value);
    }

    pub fn write_i16(&mut self, value: i16) {
        LittleEndian::write_i16(self.extend(2), value);
    }

    pub fn write_u32(&mut self, value: u32) {
        LittleEndian::write_u32(self.extend(4), value);
    }

    pub fn write_i32(&mut self, value: i32) {
        LittleEndian::write_i32(self.extend(4), value);
    }

    pub fn write_u64(&mut self, value: u64) {
        LittleEndian::write_u64(self.extend(8), value);
    }

    pub fn write_i64(&mut self, value: i64) {
        LittleEndian::write_i64(self.extend(8), value);
    }

    pub fn write_f32(&mut self, value: f32) {
        LittleEndian::write_f32(self.extend(4), value);
    }

    pub fn write_f64(&mut self, value: f64) {
        LittleEndian::write_f64(self.extend(8), value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    pub fn write_vec2(&mut self, value: Vec2) {
        self.write_f32(value.x);
        self.write_f32(value.y);
    }

    pub fn write_vec3(&mut self, value: Vec3) {
        self.write_f32(value.x);
        self.write_f32(value.y);
        self.write_f32(value.z);
    }

    /// Writes the rotation as three Euler angles in degrees. Lossy, see
    /// [`rotation_to_euler_degrees`].
    pub fn write_rotation(&mut self, value: Quat) {
        self.write_vec3(rotation_to_euler_degrees(value));
    }

    pub fn write_color_rgb(&mut self, value: Color) {
        self.write_f32(value.r);
        self.write_f32(value.g);
        self.write_f32(value.b);
    }

    pub fn write_color_rgba(&mut self, value: Color) {
        self.write_color_rgb(value);
        self.write_f32(value.a);
    }

    /// Appends bytes as they are, without a length prefix.
    pub fn write_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a `u16` length prefix followed by the bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        let len =
            u16::try_from(bytes.len()).map_err(|_| CodecError::PayloadTooLarge(bytes.len()))?;
        self.write_u16(len);
        self.buf.extend_from_slice(bytes);
        Ok(())
    }
}
