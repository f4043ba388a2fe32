use super::Snapshot;

/// A timestamped, frame-numbered snapshot. Never mutated once stored.
#[derive(Debug, Clone, PartialEq)]
pub struct State<S> {
    pub snapshot: S,
    /// Seconds on the simulation clock at capture.
    pub time: f64,
    pub frame: u32,
    pub is_valid: bool,
}

impl<S> State<S> {
    pub fn new(snapshot: S, time: f64, frame: u32) -> Self {
        Self {
            snapshot,
            time,
            frame,
            is_valid: true,
        }
    }
}

impl<S: Default> State<S> {
    /// Marker a producer emits when it has nothing for this tick.
    pub fn invalid() -> Self {
        Self {
            snapshot: S::default(),
            time: 0.0,
            frame: 0,
            is_valid: false,
        }
    }
}

/// Output of blending `prev` and `next` by `amount`.
///
/// `interpolated.frame` and `interpolated.time` are informational; the payload
/// is the blended snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolationResult<S> {
    pub interpolated: State<S>,
    pub prev: State<S>,
    pub next: State<S>,
    /// Always within `[0, 1]`.
    pub amount: f32,
    pub raw_amount: f32,
}

impl<S: Snapshot> InterpolationResult<S> {
    pub fn snapshot(&self) -> &S {
        &self.interpolated.snapshot
    }
}
