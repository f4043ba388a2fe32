use serde::{Deserialize, Serialize};

use crate::interpolation::DEFAULT_INTERPOLATION_CAPACITY;
use crate::lagcomp::DEFAULT_HISTORY_DEPTH;
use crate::simulation::InputFallback;

pub const DEFAULT_TICK_RATE: u32 = 60;
pub const DEFAULT_PREDICTION_CAPACITY: usize = 128;
pub const DEFAULT_MISMATCH_THRESHOLD: f32 = 0.01;

/// Sizes and policies shared by client and server sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub tick_rate: u32,
    /// States kept per object for render interpolation.
    pub interpolation_capacity: usize,
    /// Predicted ticks kept per owned object for replay.
    pub prediction_capacity: usize,
    /// Archived collider poses kept per hit target.
    pub hit_history_depth: usize,
    /// Divergence above which a prediction is corrected.
    pub mismatch_threshold: f32,
    pub input_fallback: InputFallback,
    /// Future inputs the server queues per object before dropping.
    pub max_pending_inputs: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_rate: DEFAULT_TICK_RATE,
            interpolation_capacity: DEFAULT_INTERPOLATION_CAPACITY,
            prediction_capacity: DEFAULT_PREDICTION_CAPACITY,
            hit_history_depth: DEFAULT_HISTORY_DEPTH,
            mismatch_threshold: DEFAULT_MISMATCH_THRESHOLD,
            input_fallback: InputFallback::RepeatLast,
            max_pending_inputs: 64,
        }
    }
}

impl SyncConfig {
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_rate.max(1) as f32
    }
}
