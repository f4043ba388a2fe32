use std::collections::VecDeque;

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Collider transform at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColliderPose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for ColliderPose {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl ColliderPose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub frame: u32,
    pub pose: ColliderPose,
}

/// How a requested frame was resolved against the retained history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseLookup {
    Exact(u32),
    /// Frame not recorded; nearest earlier frame used.
    Earlier(u32),
    /// Frame older than everything retained; oldest frame used.
    Underrun(u32),
}

impl PoseLookup {
    pub fn frame(self) -> u32 {
        match self {
            Self::Exact(frame) | Self::Earlier(frame) | Self::Underrun(frame) => frame,
        }
    }

    pub fn is_underrun(self) -> bool {
        matches!(self, Self::Underrun(_))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HistoryError {
    #[error("pose frame {frame} does not follow archived frame {newest}")]
    NonIncreasingFrame { frame: u32, newest: u32 },
}

/// Fixed-depth, frame-ordered pose history for one hit target.
#[derive(Debug, Clone)]
pub struct PoseHistory {
    samples: VecDeque<PoseSample>,
    depth: usize,
}

impl PoseHistory {
    pub fn new(depth: usize) -> Self {
        let depth = depth.max(1);
        Self {
            samples: VecDeque::with_capacity(depth),
            depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn push(&mut self, frame: u32, pose: ColliderPose) -> Result<(), HistoryError> {
        if let Some(newest) = self.samples.back() {
            if frame <= newest.frame {
                return Err(HistoryError::NonIncreasingFrame {
                    frame,
                    newest: newest.frame,
                });
            }
        }

        if self.samples.len() >= self.depth {
            self.samples.pop_front();
        }
        self.samples.push_back(PoseSample { frame, pose });
        Ok(())
    }

    pub fn get(&self, frame: u32) -> Option<&PoseSample> {
        self.samples
            .binary_search_by_key(&frame, |sample| sample.frame)
            .ok()
            .map(|i| &self.samples[i])
    }

    pub fn latest_before(&self, frame: u32) -> Option<&PoseSample> {
        self.samples.iter().rev().find(|sample| sample.frame < frame)
    }

    /// Resolves `frame` to the pose the world had then, as closely as the
    /// retained history allows. `None` only when nothing is archived.
    pub fn lookup(&self, frame: u32) -> Option<(PoseLookup, ColliderPose)> {
        if let Some(sample) = self.get(frame) {
            return Some((PoseLookup::Exact(frame), sample.pose));
        }
        if let Some(sample) = self.latest_before(frame) {
            return Some((PoseLookup::Earlier(sample.frame), sample.pose));
        }
        self.samples
            .front()
            .map(|oldest| (PoseLookup::Underrun(oldest.frame), oldest.pose))
    }

    pub fn newest(&self) -> Option<&PoseSample> {
        self.samples.back()
    }

    pub fn oldest(&self) -> Option<&PoseSample> {
        self.samples.front()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}
