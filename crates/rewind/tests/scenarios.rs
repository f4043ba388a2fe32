use std::collections::HashMap;

use glam::Vec3;
use rapier3d::prelude::SharedShape;

use rewind::net::{decode_stream, encode_stream};
use rewind::{
    ClientSession, ColliderPose, Envelope, HitMask, InputMessage, Interpolator, KinematicBody,
    LagCompensator, LinkConditions, LinkSimulator, MessageType, MoveInput, MoveResult, ObjectId,
    PoseLookup, ReconcileError, ReconcileOutcome, ResultMessage, ServerSession, SessionError,
    Simulated, State, SyncConfig, TickReport, TransformSnapshot,
};

const PLAYER: ObjectId = ObjectId(1);
/// 0.1 units per tick at 60 Hz.
const SPEED: f32 = 6.0;
const STEP: f32 = 0.1;

fn player() -> KinematicBody {
    let mut body = KinematicBody::new(Vec3::ZERO, SPEED);
    body.set_input(MoveInput::towards(Vec3::X));
    body
}

/// Client and server sessions joined by two simulated links. Messages cross
/// them as encoded envelope streams.
struct Harness {
    client: ClientSession<KinematicBody>,
    server: ServerSession<KinematicBody>,
    client_scene: HashMap<ObjectId, KinematicBody>,
    server_scene: HashMap<ObjectId, KinematicBody>,
    uplink: LinkSimulator<Vec<u8>>,
    downlink: LinkSimulator<Vec<u8>>,
    reports: Vec<TickReport>,
}

impl Harness {
    fn new(config: SyncConfig, result_latency: u32) -> Self {
        let mut client = ClientSession::new(config.clone());
        let mut server = ServerSession::new(config);
        let shape = SharedShape::ball(0.5);
        client.spawn_owned(PLAYER, shape.clone(), HitMask::PLAYER, ColliderPose::default());
        server.spawn_owned(PLAYER, shape, HitMask::PLAYER, ColliderPose::default());

        Self {
            client,
            server,
            client_scene: HashMap::from([(PLAYER, player())]),
            server_scene: HashMap::from([(PLAYER, player())]),
            uplink: LinkSimulator::new(LinkConditions::perfect(), 1),
            downlink: LinkSimulator::new(LinkConditions::latency(result_latency), 2),
            reports: Vec::new(),
        }
    }

    fn client_half(&mut self, drop_input: impl Fn(u32) -> bool) {
        let now = self.client.frame();
        self.reports.push(self.client.tick(&mut self.client_scene));

        let envelopes: Vec<Envelope> = self
            .client
            .take_outbox()
            .into_iter()
            .filter(|message| !drop_input(message.client_frame))
            .map(|message| {
                Envelope::new(
                    MessageType::InputSample,
                    message.object,
                    message.client_frame,
                    &message,
                )
                .unwrap()
            })
            .collect();
        if !envelopes.is_empty() {
            self.uplink.send(now, encode_stream(&envelopes));
        }

        for datagram in self.uplink.deliver(now) {
            for envelope in decode_stream(&datagram) {
                let envelope = envelope.unwrap();
                assert_eq!(envelope.kind(), MessageType::InputSample);
                let message: InputMessage<MoveInput> = envelope.decode_payload().unwrap();
                self.server.receive_input(message).unwrap();
            }
        }
    }

    fn server_half(&mut self) {
        let now = self.server.frame();
        let report = self.server.tick(&mut self.server_scene);
        assert!(report.is_clean(), "{:?}", report.errors);

        let envelopes: Vec<Envelope> = self
            .server
            .take_outbox()
            .iter()
            .map(|message| {
                Envelope::new(
                    MessageType::SimulationResult,
                    message.object,
                    message.frame,
                    message,
                )
                .unwrap()
            })
            .collect();
        if !envelopes.is_empty() {
            self.downlink.send(now, encode_stream(&envelopes));
        }

        for datagram in self.downlink.deliver(now) {
            for envelope in decode_stream(&datagram) {
                let message: ResultMessage<MoveResult> =
                    envelope.unwrap().decode_payload().unwrap();
                self.client.receive_result(message).unwrap();
            }
        }
    }

    fn step(&mut self) {
        self.client_half(|_| false);
        self.server_half();
    }

    fn client_position(&self) -> Vec3 {
        self.client_scene[&PLAYER].position
    }

    fn server_position(&self) -> Vec3 {
        self.server_scene[&PLAYER].position
    }

    fn outcomes(&self) -> Vec<ReconcileOutcome> {
        self.reports
            .iter()
            .flat_map(|report| report.outcomes.iter().map(|(_, outcome)| *outcome))
            .collect()
    }
}

#[test]
fn test_prediction_survives_input_loss_without_correction() {
    let mut harness = Harness::new(SyncConfig::default(), 0);

    for _ in 0..10 {
        harness.client_half(|frame| frame == 3 || frame == 6);
        harness.server_half();
    }

    assert!((harness.client_position() - Vec3::X).length() < 1e-4);
    assert_eq!(harness.client_position(), harness.server_position());

    let outcomes = harness.outcomes();
    assert_eq!(outcomes.len(), 9);
    for outcome in outcomes {
        assert!(
            matches!(outcome, ReconcileOutcome::Confirmed { distance, .. } if distance == 0.0),
            "{outcome:?}"
        );
    }
    assert!(harness.reports.iter().all(|report| report.is_clean()));
    assert_eq!(harness.client.predictor(PLAYER).unwrap().corrections(), 0);
    assert_eq!(harness.server.authority(PLAYER).unwrap().fallback_frames(), 2);
}

#[test]
fn test_divergence_resets_and_replays() {
    let mut harness = Harness::new(SyncConfig::default(), 4);
    let shove = 0.05;

    for frame in 0..=10 {
        harness.client_half(|_| false);
        if frame == 5 {
            harness.server_scene.get_mut(&PLAYER).unwrap().position.x += shove;
        }
        harness.server_half();
    }

    let corrected: Vec<ReconcileOutcome> = harness
        .outcomes()
        .into_iter()
        .filter(ReconcileOutcome::is_correction)
        .collect();
    assert_eq!(corrected.len(), 1);
    let ReconcileOutcome::Corrected {
        frame,
        distance,
        replayed,
    } = corrected[0]
    else {
        unreachable!();
    };
    assert_eq!(frame, 5);
    assert_eq!(replayed, 4);
    assert!((distance - shove).abs() < 1e-4);

    let mut reference = player();
    let dt = harness.client.clock().dt();
    for frame in 0..=10 {
        let input = reference.collect_input(frame);
        reference.apply_input(&input, dt);
    }

    let drift = harness.client_position().distance(reference.position);
    assert!(drift < STEP, "drift {drift}");
    assert!(drift > SyncConfig::default().mismatch_threshold);
    assert!(harness.client_position().distance(harness.server_position()) < 1e-4);
}

#[test]
fn test_evicted_prediction_takes_authoritative_state() {
    let config = SyncConfig {
        prediction_capacity: 4,
        ..Default::default()
    };
    let mut harness = Harness::new(config, 8);

    for _ in 0..=9 {
        harness.step();
    }

    let report = &harness.reports[9];
    assert_eq!(report.frame, 9);
    assert_eq!(
        report.errors,
        vec![SessionError::Reconcile {
            object: PLAYER,
            source: ReconcileError::MissingPrediction {
                frame: 0,
                oldest: Some(5)
            },
        }]
    );
    assert_eq!(report.simulated, 1);
    // Server frame 0, then this tick's prediction.
    assert!((harness.client_position().x - 2.0 * STEP).abs() < 1e-4);
}

#[test]
fn test_reconciliation_recovers_after_evicted_predictions() {
    let config = SyncConfig {
        prediction_capacity: 8,
        ..Default::default()
    };
    let shape = SharedShape::ball(0.5);
    let mut client = ClientSession::<KinematicBody>::new(config.clone());
    let mut server = ServerSession::<KinematicBody>::new(config);
    client.spawn_owned(PLAYER, shape.clone(), HitMask::PLAYER, ColliderPose::default());
    server.spawn_owned(PLAYER, shape, HitMask::PLAYER, ColliderPose::default());
    let mut client_scene = HashMap::from([(PLAYER, player())]);
    let mut server_scene = HashMap::from([(PLAYER, player())]);

    // Results normally take three ticks; everything up to frame 26 stalls
    // until tick 30 and arrives in one burst.
    let mut in_flight: Vec<(u32, ResultMessage<MoveResult>)> = Vec::new();
    let mut reports = Vec::new();
    for now in 0..80u32 {
        reports.push(client.tick(&mut client_scene));
        for message in client.take_outbox() {
            server.receive_input(message).unwrap();
        }
        server.tick(&mut server_scene);

        for message in server.take_outbox() {
            let arrival = if message.frame <= 26 { 30 } else { message.frame + 3 };
            in_flight.push((arrival, message));
        }
        let (due, later): (Vec<_>, Vec<_>) = in_flight
            .drain(..)
            .partition(|(arrival, _)| *arrival <= now);
        in_flight = later;
        for (_, message) in due {
            client.receive_result(message).unwrap();
        }
    }

    // Only the burst finds its predictions evicted: frames 0..=22.
    let burst = &reports[31];
    assert_eq!(burst.errors.len(), 23);
    assert_eq!(
        burst.errors[0],
        SessionError::Reconcile {
            object: PLAYER,
            source: ReconcileError::MissingPrediction {
                frame: 0,
                oldest: Some(23)
            },
        }
    );
    for (tick, report) in reports.iter().enumerate() {
        if tick != 31 {
            assert!(report.is_clean(), "tick {tick}: {:?}", report.errors);
        }
    }

    assert!(reports.iter().map(TickReport::corrections).sum::<usize>() >= 1);
    let client_x = client_scene[&PLAYER].position.x;
    let server_x = server_scene[&PLAYER].position.x;
    assert!((client_x - server_x).abs() < 1e-4, "client {client_x} server {server_x}");
}

#[test]
fn test_rewound_hit_past_history_uses_oldest_pose() {
    let config = SyncConfig {
        hit_history_depth: 30,
        ..Default::default()
    };
    let mut server = ServerSession::<KinematicBody>::new(config);
    server.spawn_owned(
        PLAYER,
        SharedShape::ball(0.5),
        HitMask::PLAYER,
        ColliderPose::default(),
    );
    let mut scene = HashMap::from([(PLAYER, player())]);

    for frame in 0..60 {
        server
            .receive_input(InputMessage {
                object: PLAYER,
                client_frame: frame,
                input: MoveInput::towards(Vec3::X),
            })
            .unwrap();
        server.tick(&mut scene);
    }

    let history = server.lag_compensator().history(PLAYER).unwrap();
    let oldest = history.oldest().unwrap();
    assert_eq!(oldest.frame, 30);

    let at_frame = server.frame() - 50;
    let origin = Vec3::new(oldest.pose.position.x, 0.0, -5.0);
    let hits = server.server_query(at_frame, origin, Vec3::Z, 20.0, HitMask::all());

    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].object, PLAYER);
    assert_eq!(hits[0].lookup, Some(PoseLookup::Underrun(30)));
    assert!((hits[0].distance - 4.5).abs() < 1e-4);
}

#[test]
fn test_equal_distance_hits_order_by_object() {
    let run = |ids: [u32; 3]| {
        let mut compensator = LagCompensator::new(8);
        for id in ids {
            compensator.register(
                ObjectId(id),
                SharedShape::cuboid(0.5, 0.5, 0.5),
                HitMask::PROP,
                ColliderPose::default(),
            );
            compensator
                .archive(ObjectId(id), 0, ColliderPose::at(Vec3::new(0.0, 0.0, 2.0)))
                .unwrap();
        }
        compensator
            .server_query(0, Vec3::ZERO, Vec3::Z, 10.0, HitMask::all())
            .into_iter()
            .map(|hit| (hit.object, hit.distance))
            .collect::<Vec<_>>()
    };

    let first = run([9, 2, 5]);
    assert_eq!(
        first.iter().map(|(object, _)| *object).collect::<Vec<_>>(),
        vec![ObjectId(2), ObjectId(5), ObjectId(9)]
    );
    assert!(first.iter().all(|(_, distance)| (distance - 1.5).abs() < 1e-5));
    for _ in 0..5 {
        assert_eq!(run([5, 9, 2]), first);
    }
}

#[test]
fn test_interpolation_amount_monotonic_and_clamped() {
    let mut interpolator = Interpolator::new(8);
    interpolator
        .push(State::new(TransformSnapshot::at(Vec3::ZERO), 1.0, 60))
        .unwrap();
    interpolator
        .push(State::new(TransformSnapshot::at(Vec3::X), 1.1, 66))
        .unwrap();

    let mut last = -1.0;
    for i in 0..=20 {
        let t = 1.0 + 0.005 * i as f64;
        let amount = interpolator.evaluate(t).unwrap().amount;
        assert!(amount >= last);
        last = amount;
    }

    for t in [-10.0, 0.0, 5.0, f64::MAX] {
        let amount = interpolator.evaluate(t).unwrap().amount;
        assert!((0.0..=1.0).contains(&amount));
    }
}

#[test]
fn test_remote_object_follows_server_states() {
    let mut server = ServerSession::<KinematicBody>::new(SyncConfig::default());
    let mut client = ClientSession::<KinematicBody>::new(SyncConfig::default());
    server.spawn_owned(PLAYER, SharedShape::ball(0.5), HitMask::PLAYER, ColliderPose::default());
    client.spawn(PLAYER, SharedShape::ball(0.5), HitMask::PLAYER, ColliderPose::default());
    let mut server_scene = HashMap::from([(PLAYER, player())]);

    for frame in 0..4 {
        server
            .receive_input(InputMessage {
                object: PLAYER,
                client_frame: frame,
                input: MoveInput::towards(Vec3::X),
            })
            .unwrap();
        server.tick(&mut server_scene);
        let state = server.interpolator(PLAYER).unwrap().newest().unwrap().clone();
        client.push_remote_state(PLAYER, state.clone()).unwrap();
        // Duplicate delivery changes nothing.
        client.push_remote_state(PLAYER, state).unwrap();
    }

    let halfway = client.clock().time_of(1) + client.clock().dt() as f64 * 0.5;
    let result = client.evaluate(PLAYER, halfway).unwrap();
    assert!((result.amount - 0.5).abs() < 1e-4);
    assert!((result.snapshot().position.x - 2.5 * STEP).abs() < 1e-4);
    assert_eq!(client.interpolator(PLAYER).unwrap().len(), 4);
}
