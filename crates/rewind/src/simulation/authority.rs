use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::hooks::Simulated;
use super::message::ResultMessage;
use crate::model::ObjectId;

/// Input used for a frame whose sample never arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum InputFallback {
    #[default]
    RepeatLast,
    Neutral,
}

/// Server-side simulation state for one object.
///
/// Frames are simulated contiguously from the first input received; a frame
/// whose input has not arrived in time runs on the fallback input.
pub struct Authority<H: Simulated> {
    pending: BTreeMap<u32, H::Input>,
    last_input: Option<H::Input>,
    next_frame: Option<u32>,
    fallback: InputFallback,
    max_pending: usize,
    fallback_frames: u64,
    late_inputs: u64,
    overflowed_inputs: u64,
}

impl<H: Simulated> Authority<H> {
    pub fn new(fallback: InputFallback, max_pending: usize) -> Self {
        Self {
            pending: BTreeMap::new(),
            last_input: None,
            next_frame: None,
            fallback,
            max_pending: max_pending.max(1),
            fallback_frames: 0,
            late_inputs: 0,
            overflowed_inputs: 0,
        }
    }

    pub fn started(&self) -> bool {
        self.next_frame.is_some()
    }

    pub fn next_frame(&self) -> Option<u32> {
        self.next_frame
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn fallback_frames(&self) -> u64 {
        self.fallback_frames
    }

    pub fn late_inputs(&self) -> u64 {
        self.late_inputs
    }

    /// Inputs dropped because too many future frames were already queued.
    pub fn overflowed_inputs(&self) -> u64 {
        self.overflowed_inputs
    }

    /// Queues an input for its client frame. Returns `false` if the frame has
    /// already been simulated or the queue is full and this is its furthest
    /// frame.
    pub fn receive(&mut self, client_frame: u32, input: H::Input) -> bool {
        match self.next_frame {
            Some(next) if client_frame < next => {
                self.late_inputs += 1;
                log::warn!("dropping late input for frame {client_frame} (next {next})");
                return false;
            }
            None => self.next_frame = Some(client_frame),
            Some(_) => {}
        }

        self.pending.insert(client_frame, input);
        while self.pending.len() > self.max_pending {
            if let Some((dropped, _)) = self.pending.pop_last() {
                self.overflowed_inputs += 1;
                log::warn!(
                    "input queue full ({} frames); dropping input for frame {dropped}",
                    self.max_pending
                );
            }
        }
        self.pending.contains_key(&client_frame)
    }

    /// Starts the frame sequence without an input, for objects the server
    /// drives on its own.
    pub fn start_at(&mut self, frame: u32) {
        if self.next_frame.is_none() {
            self.next_frame = Some(frame);
        }
    }

    /// Simulates the next frame. `None` until the sequence has started.
    pub fn simulate(
        &mut self,
        host: &mut H,
        object: ObjectId,
        dt: f32,
    ) -> Option<ResultMessage<H::Result>> {
        let frame = self.next_frame?;

        let input = match self.pending.remove(&frame) {
            Some(input) => input,
            None => {
                self.fallback_frames += 1;
                match (self.fallback, &self.last_input) {
                    (InputFallback::RepeatLast, Some(last)) => last.clone(),
                    _ => H::Input::default(),
                }
            }
        };

        let result = host.apply_input(&input, dt);
        self.last_input = Some(input);
        self.next_frame = Some(frame.wrapping_add(1));

        Some(ResultMessage {
            object,
            frame,
            result,
        })
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::kinematic::{KinematicBody, MoveInput};

    const DT: f32 = 0.5;

    fn forward() -> MoveInput {
        MoveInput::towards(Vec3::X)
    }

    #[test]
    fn waits_for_first_input() {
        let mut body = KinematicBody::new(Vec3::ZERO, 1.0);
        let mut authority = Authority::<KinematicBody>::new(InputFallback::RepeatLast, 8);

        assert!(authority.simulate(&mut body, ObjectId(1), DT).is_none());
        assert!(!authority.started());

        authority.receive(5, forward());
        let result = authority.simulate(&mut body, ObjectId(1), DT).unwrap();
        assert_eq!(result.frame, 5);
        assert_eq!(result.result.position.x, 0.5);
    }

    #[test]
    fn missing_inputs_repeat_last_and_keep_frames_contiguous() {
        let mut body = KinematicBody::new(Vec3::ZERO, 1.0);
        let mut authority = Authority::<KinematicBody>::new(InputFallback::RepeatLast, 8);

        authority.receive(0, forward());
        authority.receive(3, forward());

        let frames: Vec<u32> = (0..4)
            .map(|_| authority.simulate(&mut body, ObjectId(1), DT).unwrap().frame)
            .collect();
        assert_eq!(frames, vec![0, 1, 2, 3]);
        assert_eq!(authority.fallback_frames(), 2);
        assert_eq!(body.position.x, 2.0);
    }

    #[test]
    fn neutral_fallback_stands_still() {
        let mut body = KinematicBody::new(Vec3::ZERO, 1.0);
        let mut authority = Authority::<KinematicBody>::new(InputFallback::Neutral, 8);

        authority.receive(0, forward());
        authority.simulate(&mut body, ObjectId(1), DT);
        authority.simulate(&mut body, ObjectId(1), DT);
        assert_eq!(body.position.x, 0.5);
    }

    #[test]
    fn late_inputs_dropped() {
        let mut body = KinematicBody::new(Vec3::ZERO, 1.0);
        let mut authority = Authority::<KinematicBody>::new(InputFallback::RepeatLast, 8);

        authority.receive(0, forward());
        authority.simulate(&mut body, ObjectId(1), DT);
        authority.simulate(&mut body, ObjectId(1), DT);

        assert!(!authority.receive(1, forward()));
        assert_eq!(authority.late_inputs(), 1);
        assert_eq!(authority.next_frame(), Some(2));
    }

    #[test]
    fn full_queue_drops_furthest_frame() {
        let mut body = KinematicBody::new(Vec3::ZERO, 1.0);
        let mut authority = Authority::<KinematicBody>::new(InputFallback::RepeatLast, 2);

        assert!(authority.receive(0, forward()));
        assert!(authority.receive(1, forward()));
        assert!(!authority.receive(2, forward()));
        assert_eq!(authority.overflowed_inputs(), 1);
        assert_eq!(authority.pending(), 2);

        authority.simulate(&mut body, ObjectId(1), DT);
        assert!(authority.receive(3, forward()));
        // Frame 2 is nearer than the queued frame 3, so 3 goes instead.
        assert!(authority.receive(2, forward()));
        assert_eq!(authority.overflowed_inputs(), 2);
        assert_eq!(authority.pending(), 2);
        assert_eq!(authority.late_inputs(), 0);
    }

    #[test]
    fn start_at_drives_without_input() {
        let mut body = KinematicBody::new(Vec3::ZERO, 1.0);
        let mut authority = Authority::<KinematicBody>::new(InputFallback::RepeatLast, 8);
        authority.start_at(40);
        let result = authority.simulate(&mut body, ObjectId(2), DT).unwrap();
        assert_eq!(result.frame, 40);
        assert_eq!(result.result.position, Vec3::ZERO);
    }
}
