pub mod clock;
pub mod codec;
pub mod config;
pub mod interpolation;
pub mod kinematic;
pub mod lagcomp;
pub mod model;
pub mod net;
pub mod registry;
pub mod session;
pub mod simulation;

pub use clock::{FixedTimestep, SimulationClock, TickContext, TickLoop};
pub use codec::{ByteReader, ByteWriter, CodecError, Color, Decode, Encode};
pub use config::{
    DEFAULT_MISMATCH_THRESHOLD, DEFAULT_PREDICTION_CAPACITY, DEFAULT_TICK_RATE, SyncConfig,
};
pub use interpolation::{Interpolator, InterpolatorStats, StateRejected};
pub use kinematic::{KinematicBody, MoveInput, MoveResult};
pub use lagcomp::{
    ColliderPose, Hit, HitMask, HistoryError, LagCompensator, PoseHistory, PoseLookup,
};
pub use model::{
    Amount, BlendPolicy, InterpolationResult, ObjectId, Snapshot, State, TransformSnapshot,
};
pub use net::{Envelope, LinkConditions, LinkSimulator, MessageType, WorldError, WorldImage};
pub use registry::{KindId, Registry, RegistryBuilder, RegistryError};
pub use session::{ClientSession, SceneHost, ServerSession, SessionError, TickReport};
pub use simulation::{
    Authority, InputFallback, InputMessage, InputSample, Predictor, ReconcileError,
    ReconcileOutcome, ResultMessage, Simulated, SimulationResult,
};
