//! Hit-testing against where objects were, not where they are.

mod compensator;
mod history;
mod mask;

pub use compensator::{DEFAULT_HISTORY_DEPTH, Hit, LagCompensator};
pub use history::{ColliderPose, HistoryError, PoseHistory, PoseLookup, PoseSample};
pub use mask::HitMask;
