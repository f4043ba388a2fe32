use byteorder::{ByteOrder, LittleEndian};
use glam::{Quat, Vec2, Vec3};

use super::{Color, CodecError, euler_degrees_to_rotation};

/// Cursor over a borrowed byte slice.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.remaining();
        if remaining < n {
            return Err(CodecError::UnexpectedEnd {
                needed: n,
                remaining,
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8, CodecError> {
        Ok(self.take(1)?[0] as i8)
    }

    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        self.take(2).map(LittleEndian::read_u16)
    }

    pub fn read_i16(&mut self) -> Result<i16, CodecError> {
        self.take(2).map(LittleEndian::read_i16)
    }

    pub fn read_u32(&mut self) -> Result<u32, CodecError> {
        self.take(4).map(LittleEndian::read_u32)
    }

    pub fn read_i32(&mut self) -> Result<i32, CodecError> {
        self.take(4).map(LittleEndian::read_i32)
    }

    pub fn read_u64(&mut self) -> Result<u64, CodecError> {
        self.take(8).map(LittleEndian::read_u64)
    }

    pub fn read_i64(&mut self) -> Result<i64, CodecError> {
        self.take(8).map(LittleEndian::read_i64)
    }

    pub fn read_f32(&mut self) -> Result<f32, CodecError> {
        self.take(4).map(LittleEndian::read_f32)
    }

    pub fn read_f64(&mut self) -> Result<f64, CodecError> {
        self.take(8).map(LittleEndian::read_f64)
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => {
                self.pos -= 1;
                Err(CodecError::InvalidBool(other))
            }
        }
    }

    pub fn read_vec2(&mut self) -> Result<Vec2, CodecError> {
        let bytes = self.take(8)?;
        Ok(Vec2::new(
            LittleEndian::read_f32(&bytes[0..4]),
            LittleEndian::read_f32(&bytes[4..8]),
        ))
    }

    pub fn read_vec3(&mut self) -> Result<Vec3, CodecError> {
        let bytes = self.take(12)?;
        Ok(Vec3::new(
            LittleEndian::read_f32(&bytes[0..4]),
            LittleEndian::read_f32(&bytes[4..8]),
            LittleEndian::read_f32(&bytes[8..12]),
        ))
    }

    pub fn read_rotation(&mut self) -> Result<Quat, CodecError> {
        self.read_vec3().map(euler_degrees_to_rotation)
    }

    pub fn read_color_rgb(&mut self) -> Result<Color, CodecError> {
        let rgb = self.read_vec3()?;
        Ok(Color::rgb(rgb.x, rgb.y, rgb.z))
    }

    pub fn read_color_rgba(&mut self) -> Result<Color, CodecError> {
        let bytes = self.take(16)?;
        Ok(Color::rgba(
            LittleEndian::read_f32(&bytes[0..4]),
            LittleEndian::read_f32(&bytes[4..8]),
            LittleEndian::read_f32(&bytes[8..12]),
            LittleEndian::read_f32(&bytes[12..16]),
        ))
    }

    /// Reads a `u16` length prefix and borrows that many bytes.
    pub fn read_bytes(&mut self) -> Result<&'a [u8], CodecError> {
        let start = self.pos;
        let len = self.read_u16()? as usize;
        self.take(len).inspect_err(|_| self.pos = start)
    }
}
