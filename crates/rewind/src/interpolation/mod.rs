mod engine;

pub use engine::{DEFAULT_INTERPOLATION_CAPACITY, Interpolator, InterpolatorStats, StateRejected};
