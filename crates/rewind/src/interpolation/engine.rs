use std::collections::VecDeque;

use crate::model::{Amount, InterpolationResult, Snapshot, State};

pub const DEFAULT_INTERPOLATION_CAPACITY: usize = 32;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StateRejected {
    #[error("state is marked invalid")]
    Invalid,
    #[error("frame {frame} does not follow newest buffered frame {newest}")]
    NonIncreasingFrame { frame: u32, newest: u32 },
    #[error("time {time} is earlier than newest buffered time {newest}")]
    TimeWentBackwards { time: f64, newest: f64 },
}

/// Bounded history of states for one object, sampled at arbitrary render
/// times without running ahead of the newest state.
#[derive(Debug, Clone)]
pub struct Interpolator<S> {
    states: VecDeque<State<S>>,
    capacity: usize,
    active: bool,
}

impl<S: Snapshot> Default for Interpolator<S> {
    fn default() -> Self {
        Self::new(DEFAULT_INTERPOLATION_CAPACITY)
    }
}

impl<S: Snapshot> Interpolator<S> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            states: VecDeque::with_capacity(capacity),
            capacity,
            active: true,
        }
    }

    pub fn push(&mut self, state: State<S>) -> Result<(), StateRejected> {
        if !state.is_valid {
            return Err(StateRejected::Invalid);
        }

        if !self.active {
            self.active = true;
            self.reset(state);
            return Ok(());
        }

        let Some(newest) = self.states.back() else {
            self.reset(state);
            return Ok(());
        };

        if state.frame <= newest.frame {
            return Err(StateRejected::NonIncreasingFrame {
                frame: state.frame,
                newest: newest.frame,
            });
        }
        if state.time < newest.time {
            return Err(StateRejected::TimeWentBackwards {
                time: state.time,
                newest: newest.time,
            });
        }

        self.states.push_back(state);
        while self.states.len() > self.capacity {
            self.states.pop_front();
        }
        Ok(())
    }

    /// Snaps the held history to `from`, so the next blend starts there
    /// instead of sweeping through a discontinuity.
    pub fn reset(&mut self, from: State<S>) {
        self.states.clear();
        self.states.push_back(from);
    }

    /// The next push after this replaces the whole history.
    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn evaluate(&self, render_time: f64) -> Option<InterpolationResult<S>> {
        let newest = self.states.back()?;
        let oldest = self.states.front()?;

        if render_time >= newest.time {
            let raw = self.raw_past_newest(render_time);
            return Some(self.result(newest, newest, Amount::with_raw(1.0, raw)));
        }
        if render_time < oldest.time {
            return Some(self.result(oldest, oldest, Amount::with_raw(0.0, 0.0)));
        }

        // Newest first: render times sit near the head of the buffer.
        let index = self
            .states
            .iter()
            .rposition(|state| state.time <= render_time)?;
        let prev = &self.states[index];
        let next = self.states.get(index + 1).unwrap_or(prev);

        let span = next.time - prev.time;
        let raw = if span > 0.0 {
            ((render_time - prev.time) / span) as f32
        } else {
            1.0
        };
        Some(self.result(prev, next, Amount::new(raw)))
    }

    fn raw_past_newest(&self, render_time: f64) -> f32 {
        let len = self.states.len();
        if len < 2 {
            return 1.0;
        }
        let prev = &self.states[len - 2];
        let next = &self.states[len - 1];
        let span = next.time - prev.time;
        if span > 0.0 {
            ((render_time - prev.time) / span) as f32
        } else {
            1.0
        }
    }

    fn result(&self, prev: &State<S>, next: &State<S>, amount: Amount) -> InterpolationResult<S> {
        let (time, frame) = if amount.clamped() < 1.0 {
            (
                prev.time + (next.time - prev.time) * amount.clamped() as f64,
                prev.frame,
            )
        } else {
            (next.time, next.frame)
        };

        // Past the newest state both ends are the newest state; the raw
        // fraction is still measured against the previous one so that
        // overshoot-tolerant fields have something to extend along.
        let len = self.states.len();
        let (from, to) = if std::ptr::eq(prev, next) && len >= 2 && amount.raw() > 1.0 {
            (&self.states[len - 2], &self.states[len - 1])
        } else {
            (prev, next)
        };
        let snapshot = S::interpolate(&from.snapshot, &to.snapshot, amount);

        InterpolationResult {
            interpolated: State::new(snapshot, time, frame),
            prev: prev.clone(),
            next: next.clone(),
            amount: amount.clamped(),
            raw_amount: amount.raw(),
        }
    }

    pub fn newest(&self) -> Option<&State<S>> {
        self.states.back()
    }

    pub fn oldest(&self) -> Option<&State<S>> {
        self.states.front()
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn clear(&mut self) {
        self.states.clear();
    }

    pub fn stats(&self) -> InterpolatorStats {
        InterpolatorStats {
            buffered: self.states.len(),
            newest_frame: self.states.back().map(|s| s.frame),
            span_secs: match (self.states.front(), self.states.back()) {
                (Some(oldest), Some(newest)) => newest.time - oldest.time,
                _ => 0.0,
            },
            active: self.active,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatorStats {
    pub buffered: usize,
    pub newest_frame: Option<u32>,
    pub span_secs: f64,
    pub active: bool,
}
