use crate::codec::{Decode, Encode};
use crate::lagcomp::ColliderPose;
use crate::model::Snapshot;

/// Client input for one tick. `Default` is the neutral input.
pub trait InputSample: Clone + Default + Encode + Decode {}

impl<T: Clone + Default + Encode + Decode> InputSample for T {}

/// Outcome of applying one input to one object for one tick.
pub trait SimulationResult: Clone + Encode + Decode {
    /// Divergence between two results of the same tick, e.g. positional
    /// distance. Zero means identical.
    fn compare(&self, other: &Self) -> f32;
}

/// Hooks a host object implements. The core calls them in tick order and
/// knows nothing of what they do.
pub trait Simulated {
    type Input: InputSample;
    type Result: SimulationResult;
    type Snapshot: Snapshot;

    fn collect_input(&mut self, frame: u32) -> Self::Input;

    /// Must be deterministic: the same input on the same state produces the
    /// same result, or replay cannot converge.
    fn apply_input(&mut self, input: &Self::Input, dt: f32) -> Self::Result;

    fn reset_to(&mut self, authoritative: &Self::Result);

    fn snapshot(&self) -> Self::Snapshot;

    fn collider_pose(&self) -> ColliderPose;
}

/// Whether a divergence forces a correction. The boundary is exclusive: a
/// distance exactly at the threshold keeps the prediction.
#[inline]
pub fn diverges(distance: f32, threshold: f32) -> bool {
    distance > threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_boundary_is_exclusive() {
        assert!(!diverges(0.5, 0.5));
        assert!(diverges(0.500_001, 0.5));
        assert!(!diverges(0.0, 0.0));
        assert!(diverges(f32::INFINITY, 1.0));
    }
}
