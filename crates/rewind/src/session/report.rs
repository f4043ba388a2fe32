use crate::interpolation::StateRejected;
use crate::lagcomp::HistoryError;
use crate::model::ObjectId;
use crate::simulation::{PredictionError, ReconcileError, ReconcileOutcome};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("object {0} is not spawned in this session")]
    UnknownObject(ObjectId),
    #[error("object {0} did not resolve in the scene")]
    Unresolved(ObjectId),
    #[error("object {object}: {source}")]
    State {
        object: ObjectId,
        #[source]
        source: StateRejected,
    },
    #[error("object {object}: {source}")]
    Prediction {
        object: ObjectId,
        #[source]
        source: PredictionError,
    },
    #[error("object {object}: {source}")]
    Reconcile {
        object: ObjectId,
        #[source]
        source: ReconcileError,
    },
    #[error("object {object}: {source}")]
    History {
        object: ObjectId,
        #[source]
        source: HistoryError,
    },
}

impl SessionError {
    pub fn object(&self) -> ObjectId {
        match self {
            Self::UnknownObject(object) | Self::Unresolved(object) => *object,
            Self::State { object, .. }
            | Self::Prediction { object, .. }
            | Self::Reconcile { object, .. }
            | Self::History { object, .. } => *object,
        }
    }
}

/// What happened during one tick. Errors here never stop the tick; the
/// affected object is skipped for the failed phase only.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub frame: u32,
    /// Objects that ran their input this tick.
    pub simulated: usize,
    pub outcomes: Vec<(ObjectId, ReconcileOutcome)>,
    pub errors: Vec<SessionError>,
}

impl TickReport {
    pub fn new(frame: u32) -> Self {
        Self {
            frame,
            ..Default::default()
        }
    }

    pub fn corrections(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| outcome.is_correction())
            .count()
    }

    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn fail(&mut self, error: SessionError) {
        log::warn!("frame {}: {error}", self.frame);
        self.errors.push(error);
    }
}
