use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("predicted frame {frame} does not follow retained frame {newest}")]
    NonIncreasingFrame { frame: u32, newest: u32 },
}

/// One retained prediction: the input applied at `frame` and what it
/// produced.
#[derive(Debug, Clone)]
pub struct PredictedTick<I, R> {
    pub frame: u32,
    pub input: I,
    pub result: R,
}

/// Bounded, frame-ordered history of predicted ticks kept for replay.
#[derive(Debug, Clone)]
pub struct PredictionHistory<I, R> {
    ticks: VecDeque<PredictedTick<I, R>>,
    capacity: usize,
}

impl<I, R> PredictionHistory<I, R> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ticks: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, frame: u32, input: I, result: R) -> Result<(), PredictionError> {
        if let Some(newest) = self.ticks.back() {
            if frame <= newest.frame {
                return Err(PredictionError::NonIncreasingFrame {
                    frame,
                    newest: newest.frame,
                });
            }
        }

        while self.ticks.len() >= self.capacity {
            if let Some(evicted) = self.ticks.pop_front() {
                log::debug!("prediction for frame {} evicted unacknowledged", evicted.frame);
            }
        }
        self.ticks.push_back(PredictedTick {
            frame,
            input,
            result,
        });
        Ok(())
    }

    fn index_of(&self, frame: u32) -> Option<usize> {
        self.ticks
            .binary_search_by_key(&frame, |tick| tick.frame)
            .ok()
    }

    pub fn get(&self, frame: u32) -> Option<&PredictedTick<I, R>> {
        self.index_of(frame).map(|i| &self.ticks[i])
    }

    pub fn get_mut(&mut self, frame: u32) -> Option<&mut PredictedTick<I, R>> {
        self.index_of(frame).map(|i| &mut self.ticks[i])
    }

    /// Retained ticks after `frame`, oldest first.
    pub fn after_mut(&mut self, frame: u32) -> impl Iterator<Item = &mut PredictedTick<I, R>> {
        self.ticks.iter_mut().filter(move |tick| tick.frame > frame)
    }

    /// Drops every tick at or before `frame`.
    pub fn release_through(&mut self, frame: u32) {
        while self.ticks.front().is_some_and(|tick| tick.frame <= frame) {
            self.ticks.pop_front();
        }
    }

    pub fn newest(&self) -> Option<&PredictedTick<I, R>> {
        self.ticks.back()
    }

    pub fn oldest_frame(&self) -> Option<u32> {
        self.ticks.front().map(|tick| tick.frame)
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_and_release() {
        let mut history = PredictionHistory::new(16);
        for frame in 10..20u32 {
            history.push(frame, (), frame * 2).unwrap();
        }

        assert_eq!(history.get(15).unwrap().result, 30);
        assert!(history.get(25).is_none());
        assert_eq!(history.after_mut(17).count(), 2);

        history.release_through(14);
        assert_eq!(history.oldest_frame(), Some(15));
        assert_eq!(history.len(), 5);
    }

    #[test]
    fn bounded_by_capacity() {
        let mut history = PredictionHistory::new(4);
        for frame in 0..10u32 {
            history.push(frame, (), ()).unwrap();
        }
        assert_eq!(history.len(), 4);
        assert_eq!(history.oldest_frame(), Some(6));
    }

    #[test]
    fn frames_must_increase() {
        let mut history = PredictionHistory::new(4);
        history.push(3, (), ()).unwrap();
        assert_eq!(
            history.push(3, (), ()),
            Err(PredictionError::NonIncreasingFrame { frame: 3, newest: 3 })
        );
    }
}
