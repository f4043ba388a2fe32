use super::history::{PredictionError, PredictionHistory};
use super::hooks::{Simulated, SimulationResult, diverges};
use super::message::InputMessage;
use crate::model::ObjectId;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconcileOutcome {
    /// Already reconciled at or past this frame; nothing changed.
    Stale { frame: u32 },
    /// Prediction within threshold and kept as is.
    Confirmed { frame: u32, distance: f32 },
    /// Host reset to the authoritative result and later ticks replayed.
    Corrected {
        frame: u32,
        distance: f32,
        replayed: usize,
    },
}

impl ReconcileOutcome {
    pub fn is_correction(&self) -> bool {
        matches!(self, Self::Corrected { .. })
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ReconcileError {
    /// The server referenced a tick with no retained prediction. The host has
    /// been reset to the authoritative value without replay; predictions for
    /// later frames are kept and reconciled as their results arrive.
    #[error("no retained prediction for frame {frame} (oldest retained: {oldest:?})")]
    MissingPrediction { frame: u32, oldest: Option<u32> },
}

/// Client-side prediction state for one locally owned object.
pub struct Predictor<H: Simulated> {
    history: PredictionHistory<H::Input, H::Result>,
    threshold: f32,
    last_predicted: Option<u32>,
    last_reconciled: Option<u32>,
    corrections: u64,
}

impl<H: Simulated> Predictor<H> {
    pub fn new(capacity: usize, threshold: f32) -> Self {
        Self {
            history: PredictionHistory::new(capacity),
            threshold,
            last_predicted: None,
            last_reconciled: None,
            corrections: 0,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn history(&self) -> &PredictionHistory<H::Input, H::Result> {
        &self.history
    }

    pub fn corrections(&self) -> u64 {
        self.corrections
    }

    pub fn last_reconciled(&self) -> Option<u32> {
        self.last_reconciled
    }

    /// Samples input for `frame` and applies it locally right away.
    pub fn predict(
        &mut self,
        host: &mut H,
        object: ObjectId,
        frame: u32,
        dt: f32,
    ) -> Result<InputMessage<H::Input>, PredictionError> {
        if let Some(newest) = self.last_predicted.filter(|&newest| frame <= newest) {
            return Err(PredictionError::NonIncreasingFrame { frame, newest });
        }

        let input = host.collect_input(frame);
        let result = host.apply_input(&input, dt);
        self.history.push(frame, input.clone(), result)?;
        self.last_predicted = Some(frame);

        Ok(InputMessage {
            object,
            client_frame: frame,
            input,
        })
    }

    pub fn reconcile(
        &mut self,
        host: &mut H,
        frame: u32,
        authoritative: &H::Result,
        dt: f32,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        if self.last_reconciled.is_some_and(|last| frame <= last) {
            return Ok(ReconcileOutcome::Stale { frame });
        }
        self.last_reconciled = Some(frame);

        let Some(predicted) = self.history.get(frame) else {
            let oldest = self.history.oldest_frame();
            log::warn!(
                "no retained prediction for frame {frame} (oldest {oldest:?}); taking authoritative state without replay"
            );
            host.reset_to(authoritative);
            self.history.release_through(frame);
            return Err(ReconcileError::MissingPrediction { frame, oldest });
        };

        let distance = predicted.result.compare(authoritative);
        if !diverges(distance, self.threshold) {
            self.history.release_through(frame);
            return Ok(ReconcileOutcome::Confirmed { frame, distance });
        }

        host.reset_to(authoritative);
        if let Some(tick) = self.history.get_mut(frame) {
            tick.result = authoritative.clone();
        }

        let mut replayed = 0;
        for tick in self.history.after_mut(frame) {
            tick.result = host.apply_input(&tick.input, dt);
            replayed += 1;
        }

        self.history.release_through(frame);
        self.corrections += 1;
        log::debug!("frame {frame} diverged by {distance:.4}; replayed {replayed} ticks");

        Ok(ReconcileOutcome::Corrected {
            frame,
            distance,
            replayed,
        })
    }

    /// Drops all in-flight prediction state, e.g. after a teleport. Results
    /// for frames predicted before the clear are then stale.
    pub fn clear(&mut self) {
        self.history.clear();
        if self.last_predicted > self.last_reconciled {
            self.last_reconciled = self.last_predicted;
        }
    }
}
