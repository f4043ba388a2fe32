use std::collections::{BTreeMap, VecDeque};

use glam::Vec3;
use rapier3d::prelude::SharedShape;

use super::report::{SessionError, TickReport};
use super::scene::SceneHost;
use crate::clock::SimulationClock;
use crate::codec::Encode;
use crate::config::SyncConfig;
use crate::interpolation::Interpolator;
use crate::lagcomp::{ColliderPose, Hit, HitMask, LagCompensator};
use crate::model::{InterpolationResult, ObjectId, State};
use crate::net::WorldImage;
use crate::registry::KindId;
use crate::simulation::{Authority, InputMessage, ResultMessage, Simulated};

struct ServerObject<H: Simulated> {
    authority: Authority<H>,
    interpolator: Interpolator<H::Snapshot>,
    inbox: VecDeque<InputMessage<H::Input>>,
}

/// Authoritative side of the tick loop. Every object advances one frame per
/// tick on the inputs its owner sent, or on the fallback input when none
/// arrived in time.
pub struct ServerSession<H: Simulated> {
    config: SyncConfig,
    clock: SimulationClock,
    hits: LagCompensator,
    objects: BTreeMap<ObjectId, ServerObject<H>>,
    outbox: Vec<ResultMessage<H::Result>>,
}

impl<H: Simulated> ServerSession<H> {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            clock: SimulationClock::new(config.tick_rate),
            hits: LagCompensator::new(config.hit_history_depth),
            objects: BTreeMap::new(),
            outbox: Vec::new(),
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn clock_mut(&mut self) -> &mut SimulationClock {
        &mut self.clock
    }

    pub fn frame(&self) -> u32 {
        self.clock.frame()
    }

    pub fn lag_compensator(&self) -> &LagCompensator {
        &self.hits
    }

    pub fn contains(&self, object: ObjectId) -> bool {
        self.objects.contains_key(&object)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Spawns an object the server drives itself, starting this frame.
    pub fn spawn(
        &mut self,
        object: ObjectId,
        shape: SharedShape,
        mask: HitMask,
        pose: ColliderPose,
    ) {
        let mut authority = self.new_authority();
        authority.start_at(self.clock.frame());
        self.insert(object, shape, mask, pose, authority);
    }

    /// Spawns an object a client owns. It holds still until the first input
    /// arrives and then follows the client's frame numbering.
    pub fn spawn_owned(
        &mut self,
        object: ObjectId,
        shape: SharedShape,
        mask: HitMask,
        pose: ColliderPose,
    ) {
        let authority = self.new_authority();
        self.insert(object, shape, mask, pose, authority);
    }

    fn new_authority(&self) -> Authority<H> {
        Authority::new(self.config.input_fallback, self.config.max_pending_inputs)
    }

    fn insert(
        &mut self,
        object: ObjectId,
        shape: SharedShape,
        mask: HitMask,
        pose: ColliderPose,
        authority: Authority<H>,
    ) {
        self.objects.insert(
            object,
            ServerObject {
                authority,
                interpolator: Interpolator::new(self.config.interpolation_capacity),
                inbox: VecDeque::new(),
            },
        );
        self.hits.register(object, shape, mask, pose);
        log::info!("spawned {object} at frame {}", self.clock.frame());
    }

    pub fn despawn(&mut self, object: ObjectId) -> bool {
        let removed = self.objects.remove(&object).is_some();
        self.hits.remove(object);
        if removed {
            log::info!("despawned {object} at frame {}", self.clock.frame());
        }
        removed
    }

    pub fn authority(&self, object: ObjectId) -> Option<&Authority<H>> {
        self.objects.get(&object).map(|entry| &entry.authority)
    }

    pub fn interpolator(&self, object: ObjectId) -> Option<&Interpolator<H::Snapshot>> {
        self.objects.get(&object).map(|entry| &entry.interpolator)
    }

    /// Queues a client input; it is handed to the object's authority at the
    /// start of the next tick.
    pub fn receive_input(
        &mut self,
        message: InputMessage<H::Input>,
    ) -> Result<(), SessionError> {
        let object = message.object;
        self.objects
            .get_mut(&object)
            .ok_or(SessionError::UnknownObject(object))?
            .inbox
            .push_back(message);
        Ok(())
    }

    pub fn tick<S: SceneHost<H>>(&mut self, scene: &mut S) -> TickReport {
        let ctx = self.clock.context();
        let mut report = TickReport::new(ctx.frame);

        for (&object, entry) in &mut self.objects {
            for message in entry.inbox.drain(..) {
                entry.authority.receive(message.client_frame, message.input);
            }

            let Some(host) = scene.resolve(object) else {
                report.fail(SessionError::Unresolved(object));
                continue;
            };

            if let Some(result) = entry.authority.simulate(host, object, ctx.dt) {
                self.outbox.push(result);
                report.simulated += 1;
            }

            let state = State::new(host.snapshot(), ctx.time, ctx.frame);
            if let Err(source) = entry.interpolator.push(state) {
                report.fail(SessionError::State { object, source });
            }
            if let Err(source) = self.hits.archive(object, ctx.frame, host.collider_pose()) {
                report.fail(SessionError::History { object, source });
            }
        }

        self.clock.advance();
        report
    }

    /// Moves `object` to `result` outside the normal tick flow.
    pub fn teleport<S: SceneHost<H>>(
        &mut self,
        scene: &mut S,
        object: ObjectId,
        result: &H::Result,
    ) -> Result<(), SessionError> {
        let entry = self
            .objects
            .get_mut(&object)
            .ok_or(SessionError::UnknownObject(object))?;
        let host = scene.resolve(object).ok_or(SessionError::Unresolved(object))?;

        host.reset_to(result);
        let snapped = State::new(host.snapshot(), self.clock.time(), self.clock.frame());
        entry.interpolator.reset(snapped);
        entry.interpolator.deactivate();
        self.hits.set_current(object, host.collider_pose());
        log::debug!("teleported {object} at frame {}", self.clock.frame());
        Ok(())
    }

    pub fn evaluate(
        &self,
        object: ObjectId,
        render_time: f64,
    ) -> Option<InterpolationResult<H::Snapshot>> {
        self.objects.get(&object)?.interpolator.evaluate(render_time)
    }

    /// Result messages produced since the last call, in tick order.
    pub fn take_outbox(&mut self) -> Vec<ResultMessage<H::Result>> {
        std::mem::take(&mut self.outbox)
    }

    /// Ray test against every object as it stood at `at_frame`, the frame
    /// the shooter was seeing when they fired.
    pub fn server_query(
        &self,
        at_frame: u32,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: HitMask,
    ) -> Vec<Hit> {
        self.hits
            .server_query(at_frame, origin, direction, max_distance, mask)
    }

    /// Dumps the current snapshot of every resolvable object.
    pub fn capture_world<S: SceneHost<H>>(
        &self,
        scene: &mut S,
        level: &str,
        kind: KindId,
    ) -> WorldImage
    where
        H::Snapshot: Encode,
    {
        let frame = self.clock.frame();
        let mut image = WorldImage::new(level, frame);
        for &object in self.objects.keys() {
            if let Some(host) = scene.resolve(object) {
                image.push(object, kind, frame, &host.snapshot());
            }
        }
        image
    }
}
