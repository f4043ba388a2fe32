use std::collections::{BTreeMap, VecDeque};

use glam::Vec3;
use rapier3d::prelude::SharedShape;

use super::report::{SessionError, TickReport};
use super::scene::SceneHost;
use crate::clock::SimulationClock;
use crate::config::SyncConfig;
use crate::interpolation::Interpolator;
use crate::lagcomp::{ColliderPose, Hit, HitMask, LagCompensator};
use crate::model::{InterpolationResult, ObjectId, State};
use crate::simulation::{InputMessage, Predictor, ResultMessage, Simulated};

struct ClientObject<H: Simulated> {
    interpolator: Interpolator<H::Snapshot>,
    predictor: Option<Predictor<H>>,
    inbox: VecDeque<ResultMessage<H::Result>>,
}

/// Client side of the tick loop: predicts locally owned objects, reconciles
/// them against server results and buffers remote objects for rendering.
pub struct ClientSession<H: Simulated> {
    config: SyncConfig,
    clock: SimulationClock,
    hits: LagCompensator,
    objects: BTreeMap<ObjectId, ClientObject<H>>,
    outbox: Vec<InputMessage<H::Input>>,
}

impl<H: Simulated> ClientSession<H> {
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

    /// Tracks an object another peer simulates. Its states arrive through
    /// [`Self::push_remote_state`].
    pub fn spawn(
        &mut self,
        object: ObjectId,
        shape: SharedShape,
        mask: HitMask,
        pose: ColliderPose,
    ) {
        self.insert(object, shape, mask, pose, None);
    }

    /// Tracks an object this client predicts.
    pub fn spawn_owned(
        &mut self,
        object: ObjectId,
        shape: SharedShape,
        mask: HitMask,
        pose: ColliderPose,
    ) {
        let predictor = Predictor::new(
            self.config.prediction_capacity,
            self.config.mismatch_threshold,
        );
        self.insert(object, shape, mask, pose, Some(predictor));
    }

    fn insert(
        &mut self,
        object: ObjectId,
        shape: SharedShape,
        mask: HitMask,
        pose: ColliderPose,
        predictor: Option<Predictor<H>>,
    ) {
        let owned = predictor.is_some();
        let replaced = self
            .objects
            .insert(
                object,
                ClientObject {
                    interpolator: Interpolator::new(self.config.interpolation_capacity),
                    predictor,
                    inbox: VecDeque::new(),
                },
            )
            .is_some();
        self.hits.register(object, shape, mask, pose);

        if replaced {
            log::debug!("respawned {object}; previous histories dropped");
        }
        log::info!("spawned {object} (owned: {owned}) at frame {}", self.clock.frame());
    }

    /// Drops every history kept for `object`.
    pub fn despawn(&mut self, object: ObjectId) -> bool {
        let removed = self.objects.remove(&object).is_some();
        self.hits.remove(object);
        if removed {
            log::info!("despawned {object} at frame {}", self.clock.frame());
        }
        removed
    }

    pub fn is_owned(&self, object: ObjectId) -> bool {
        self.objects
            .get(&object)
            .is_some_and(|entry| entry.predictor.is_some())
    }

    pub fn interpolator(&self, object: ObjectId) -> Option<&Interpolator<H::Snapshot>> {
        self.objects.get(&object).map(|entry| &entry.interpolator)
    }

    pub fn predictor(&self, object: ObjectId) -> Option<&Predictor<H>> {
        self.objects.get(&object)?.predictor.as_ref()
    }

    /// Queues a server result; it is applied at the start of the next tick.
    pub fn receive_result(
        &mut self,
        message: ResultMessage<H::Result>,
    ) -> Result<(), SessionError> {
        let object = message.object;
        let entry = self
            .objects
            .get_mut(&object)
            .ok_or(SessionError::UnknownObject(object))?;
        if entry.predictor.is_none() {
            log::debug!("ignoring result for {object}, which this client does not predict");
            return Ok(());
        }
        entry.inbox.push_back(message);
        Ok(())
    }

    /// Buffers a state of an object this client does not predict. A repeat
    /// of the newest state is ignored.
    pub fn push_remote_state(
        &mut self,
        object: ObjectId,
        state: State<H::Snapshot>,
    ) -> Result<(), SessionError> {
        let entry = self
            .objects
            .get_mut(&object)
            .ok_or(SessionError::UnknownObject(object))?;
        if entry
            .interpolator
            .newest()
            .is_some_and(|newest| newest.frame == state.frame && entry.interpolator.is_active())
        {
            return Ok(());
        }
        entry
            .interpolator
            .push(state)
            .map_err(|source| SessionError::State { object, source })
    }

    /// Runs one tick: queued results, then prediction, then commit. The clock
    /// advances once every object has committed.
    pub fn tick<S: SceneHost<H>>(&mut self, scene: &mut S) -> TickReport {
        let ctx = self.clock.context();
        let mut report = TickReport::new(ctx.frame);

        for (&object, entry) in &mut self.objects {
            let Some(host) = scene.resolve(object) else {
                entry.inbox.clear();
                report.fail(SessionError::Unresolved(object));
                continue;
            };

            let Some(predictor) = entry.predictor.as_mut() else {
                if let Err(source) = self.hits.archive(object, ctx.frame, host.collider_pose()) {
                    report.fail(SessionError::History { object, source });
                }
                continue;
            };

            while let Some(message) = entry.inbox.pop_front() {
                match predictor.reconcile(host, message.frame, &message.result, ctx.dt) {
                    Ok(outcome) => report.outcomes.push((object, outcome)),
                    Err(source) => report.fail(SessionError::Reconcile { object, source }),
                }
            }

            match predictor.predict(host, object, ctx.frame, ctx.dt) {
                Ok(message) => {
                    self.outbox.push(message);
                    report.simulated += 1;
                }
                Err(source) => report.fail(SessionError::Prediction { object, source }),
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

    /// Moves `object` to `result` outside the normal tick flow. Pending
    /// predictions and queued results are dropped. Interpolation snaps to the
    /// new pose right away and restarts from the next committed state.
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
        if let Some(predictor) = entry.predictor.as_mut() {
            predictor.clear();
        }
        entry.inbox.clear();
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

    /// Input messages produced since the last call, in tick order.
    pub fn take_outbox(&mut self) -> Vec<InputMessage<H::Input>> {
        std::mem::take(&mut self.outbox)
    }

    /// Ray test against current poses, for immediate local feedback. The
    /// server's rewound query decides what actually hit.
    pub fn client_query(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: HitMask,
    ) -> Vec<Hit> {
        self.hits.client_query(origin, direction, max_distance, mask)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::kinematic::{KinematicBody, MoveInput, MoveResult};
    use crate::model::TransformSnapshot;
    use crate::simulation::ReconcileOutcome;

    const PLAYER: ObjectId = ObjectId(1);
    const REMOTE: ObjectId = ObjectId(2);

    fn config() -> SyncConfig {
        SyncConfig {
            tick_rate: 10,
            ..Default::default()
        }
    }

    fn scene() -> HashMap<ObjectId, KinematicBody> {
        let mut player = KinematicBody::new(Vec3::ZERO, 1.0);
        player.set_input(MoveInput::towards(Vec3::X));
        HashMap::from([(PLAYER, player), (REMOTE, KinematicBody::new(Vec3::Z, 1.0))])
    }

    fn session() -> ClientSession<KinematicBody> {
        let mut session = ClientSession::new(config());
        let ball = SharedShape::ball(0.5);
        session.spawn_owned(PLAYER, ball.clone(), HitMask::PLAYER, ColliderPose::default());
        session.spawn(REMOTE, ball, HitMask::PLAYER, ColliderPose::at(Vec3::Z));
        session
    }

    fn result_at(x: f32) -> MoveResult {
        MoveResult {
            position: Vec3::new(x, 0.0, 0.0),
            velocity: Vec3::X,
            rotation: glam::Quat::IDENTITY,
        }
    }

    #[test]
    fn tick_predicts_and_commits() {
        let mut scene = scene();
        let mut session = session();

        let report = session.tick(&mut scene);
        assert_eq!(report.frame, 0);
        assert_eq!(report.simulated, 1);
        assert!(report.is_clean());
        assert_eq!(session.frame(), 1);

        let outbox = session.take_outbox();
        assert_eq!(outbox.len(), 1);
        assert_eq!(outbox[0].client_frame, 0);
        assert!(session.take_outbox().is_empty());

        assert_eq!(session.interpolator(PLAYER).unwrap().len(), 1);
        let history = session.lag_compensator().history(REMOTE).unwrap();
        assert_eq!(history.newest().unwrap().frame, 0);
    }

    #[test]
    fn results_apply_on_next_tick() {
        let mut scene = scene();
        let mut session = session();
        for _ in 0..3 {
            session.tick(&mut scene);
        }

        session
            .receive_result(ResultMessage {
                object: PLAYER,
                frame: 0,
                result: result_at(0.5),
            })
            .unwrap();
        assert!((scene[&PLAYER].position.x - 0.3).abs() < 1e-5);

        let report = session.tick(&mut scene);
        assert_eq!(report.corrections(), 1);
        assert!(matches!(
            report.outcomes[0],
            (PLAYER, ReconcileOutcome::Corrected { frame: 0, replayed: 2, .. })
        ));
        // 0.5 at frame 0, two replayed steps, then this tick's step.
        assert!((scene[&PLAYER].position.x - 0.8).abs() < 1e-5);
    }

    #[test]
    fn unknown_objects_are_rejected() {
        let mut session = session();
        let err = session
            .receive_result(ResultMessage {
                object: ObjectId(99),
                frame: 0,
                result: result_at(0.0),
            })
            .unwrap_err();
        assert_eq!(err, SessionError::UnknownObject(ObjectId(99)));
    }

    #[test]
    fn remote_states_interpolate() {
        let mut session = session();
        let snapshot = |x: f32| TransformSnapshot::at(Vec3::new(x, 0.0, 0.0));
        session
            .push_remote_state(REMOTE, State::new(snapshot(0.0), 0.0, 0))
            .unwrap();
        session
            .push_remote_state(REMOTE, State::new(snapshot(2.0), 0.1, 1))
            .unwrap();
        // Duplicate delivery.
        session
            .push_remote_state(REMOTE, State::new(snapshot(2.0), 0.1, 1))
            .unwrap();

        let result = session.evaluate(REMOTE, 0.05).unwrap();
        assert!((result.snapshot().position.x - 1.0).abs() < 1e-5);
        assert_eq!(session.interpolator(REMOTE).unwrap().len(), 2);
    }

    #[test]
    fn unresolved_objects_are_reported() {
        let mut scene = scene();
        scene.remove(&REMOTE);
        let mut session = session();

        let report = session.tick(&mut scene);
        assert_eq!(report.errors, vec![SessionError::Unresolved(REMOTE)]);
        assert_eq!(report.simulated, 1);
    }

    #[test]
    fn despawn_drops_every_history() {
        let mut scene = scene();
        let mut session = session();
        session.tick(&mut scene);

        assert!(session.despawn(PLAYER));
        assert!(!session.contains(PLAYER));
        assert!(session.interpolator(PLAYER).is_none());
        assert!(session.predictor(PLAYER).is_none());
        assert!(session.lag_compensator().history(PLAYER).is_none());
        assert!(!session.despawn(PLAYER));
    }

    #[test]
    fn teleport_restarts_interpolation() {
        let mut scene = scene();
        let mut session = session();
        for _ in 0..3 {
            session.tick(&mut scene);
        }
        session
            .receive_result(ResultMessage {
                object: PLAYER,
                frame: 1,
                result: result_at(40.0),
            })
            .unwrap();

        session.teleport(&mut scene, PLAYER, &result_at(10.0)).unwrap();
        assert_eq!(scene[&PLAYER].position.x, 10.0);
        assert!(session.predictor(PLAYER).unwrap().history().is_empty());
        for render_time in [0.0, 0.15, 1.0] {
            let view = session.evaluate(PLAYER, render_time).unwrap();
            assert_eq!(view.snapshot().position.x, 10.0);
        }

        let report = session.tick(&mut scene);
        assert!(report.outcomes.is_empty());
        let interpolator = session.interpolator(PLAYER).unwrap();
        assert_eq!(interpolator.len(), 1);
        assert!((interpolator.newest().unwrap().snapshot.position.x - 10.1).abs() < 1e-5);
    }
}
