//! Per-tick object simulation: input sampling, client prediction,
//! authoritative simulation and reconciliation.

mod authority;
mod history;
mod hooks;
mod message;
mod predictor;

pub use authority::{Authority, InputFallback};
pub use history::{PredictedTick, PredictionError, PredictionHistory};
pub use hooks::{InputSample, Simulated, SimulationResult, diverges};
pub use message::{InputMessage, ResultMessage};
pub use predictor::{Predictor, ReconcileError, ReconcileOutcome};
