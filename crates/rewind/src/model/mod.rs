mod object;
mod snapshot;
mod state;
mod transform;

pub use object::ObjectId;
pub use snapshot::{Amount, BlendPolicy, Snapshot, lerp_clamped, lerp_unclamped, slerp_shortest};
pub use state::{InterpolationResult, State};
pub use transform::TransformSnapshot;
