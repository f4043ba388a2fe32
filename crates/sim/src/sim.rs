use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;

use anyhow::{Context, Result};
use glam::{Quat, Vec3};
use rapier3d::prelude::SharedShape;

use rewind::net::{LinkStats, decode_stream, encode_stream};
use rewind::{
    ClientSession, ColliderPose, Envelope, Hit, HitMask, InputMessage, KinematicBody,
    LinkConditions, LinkSimulator, MessageType, MoveInput, MoveResult, ObjectId, Registry,
    ReconcileOutcome, ResultMessage, ServerSession, SessionError, State, SyncConfig, TickReport,
    TransformSnapshot, WorldImage,
};

const PLAYER: ObjectId = ObjectId(1);
const DRONE: ObjectId = ObjectId(2);
const PLAYER_SPEED: f32 = 5.0;
const DRONE_SPEED: f32 = 3.0;
const DRONE_START: Vec3 = Vec3::new(0.0, 0.0, 8.0);
/// Remote objects are drawn this many ticks behind the newest frame.
const VIEW_DELAY_TICKS: u32 = 6;
const LEVEL: &str = "yard";

#[derive(Debug, Default)]
pub struct Summary {
    pub ticks: u32,
    pub confirmed: usize,
    pub corrections: usize,
    pub tick_errors: usize,
    pub stale_states: usize,
    pub bad_envelopes: usize,
    pub uplink: LinkStats,
    pub downlink: LinkStats,
    pub fallback_frames: u64,
    pub late_inputs: u64,
    pub local_hits: Vec<Hit>,
    pub server_hits: Vec<Hit>,
}

impl Summary {
    fn record(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.corrections += report.corrections();
        self.confirmed += report
            .outcomes
            .iter()
            .filter(|(_, outcome)| matches!(outcome, ReconcileOutcome::Confirmed { .. }))
            .count();
        self.tick_errors += report.errors.len();
    }

    pub fn log(&self) {
        log::info!(
            "{} ticks: {} confirmed, {} corrected, {} tick errors",
            self.ticks,
            self.confirmed,
            self.corrections,
            self.tick_errors
        );
        log::info!(
            "uplink {:?}, downlink {:?}, {} stale states, {} bad envelopes",
            self.uplink,
            self.downlink,
            self.stale_states,
            self.bad_envelopes
        );
        log::info!(
            "server ran {} frames on fallback input and dropped {} late inputs",
            self.fallback_frames,
            self.late_inputs
        );
        log::info!(
            "shot: {} local hits, {} server hits {:?}",
            self.local_hits.len(),
            self.server_hits.len(),
            self.server_hits.first()
        );
    }
}

/// A client and a server session in one process, exchanging envelope streams
/// over two simulated links.
pub struct Simulation {
    client: ClientSession<KinematicBody>,
    server: ServerSession<KinematicBody>,
    client_scene: HashMap<ObjectId, KinematicBody>,
    server_scene: HashMap<ObjectId, KinematicBody>,
    uplink: LinkSimulator<Vec<u8>>,
    downlink: LinkSimulator<Vec<u8>>,
    summary: Summary,
}

impl Simulation {
    pub fn new(config: SyncConfig, link: LinkConditions, seed: u64) -> Result<Self> {
        let registry = Registry::builder()
            .register::<TransformSnapshot>("transform")?
            .register::<KinematicBody>("kinematic")?
            .build();
        let transform = registry
            .kind_of::<TransformSnapshot>()
            .context("transform kind missing from registry")?;

        let player_shape = SharedShape::capsule_y(0.9, 0.4);
        let drone_shape = SharedShape::ball(0.6);

        let mut server = ServerSession::new(config.clone());
        let mut server_scene = HashMap::from([
            (PLAYER, KinematicBody::new(Vec3::ZERO, PLAYER_SPEED)),
            (DRONE, KinematicBody::new(DRONE_START, DRONE_SPEED)),
        ]);
        server.spawn_owned(PLAYER, player_shape.clone(), HitMask::PLAYER, ColliderPose::default());
        server.spawn_owned(DRONE, drone_shape.clone(), HitMask::PROP, ColliderPose::at(DRONE_START));

        // Level load goes over the reliable path, not the simulated link.
        let image = server.capture_world(&mut server_scene, LEVEL, transform);
        let envelope = Envelope::from_raw(
            MessageType::WorldSerialize,
            ObjectId(0),
            image.frame,
            image.serialize()?,
        )?;
        let loaded = WorldImage::deserialize(envelope.payload())?;
        log::info!(
            "level '{}' loaded at frame {} with {} objects ({} bytes)",
            loaded.level,
            loaded.frame,
            loaded.objects.len(),
            envelope.payload().len()
        );

        let drone_start: TransformSnapshot = loaded
            .decode_state(DRONE)
            .context("drone missing from world image")??;
        let mut client = ClientSession::new(config);
        let client_scene = HashMap::from([
            (PLAYER, KinematicBody::new(Vec3::ZERO, PLAYER_SPEED)),
            (DRONE, KinematicBody::new(drone_start.position, DRONE_SPEED)),
        ]);
        client.spawn_owned(PLAYER, player_shape, HitMask::PLAYER, ColliderPose::default());
        client.spawn(DRONE, drone_shape, HitMask::PROP, ColliderPose::at(drone_start.position));

        Ok(Self {
            client,
            server,
            client_scene,
            server_scene,
            uplink: LinkSimulator::new(link.clone(), seed),
            downlink: LinkSimulator::new(link, seed.wrapping_add(1)),
            summary: Summary::default(),
        })
    }

    pub fn link(&self) -> &LinkConditions {
        self.uplink.conditions()
    }

    pub fn step(&mut self) -> Result<()> {
        let now = self.client.frame();
        self.steer_player(now);
        self.show_drone(now);

        let report = self.client.tick(&mut self.client_scene);
        self.summary.record(&report);

        let inputs = self
            .client
            .take_outbox()
            .iter()
            .map(|message| {
                Envelope::new(
                    MessageType::InputSample,
                    message.object,
                    message.client_frame,
                    message,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        if !inputs.is_empty() {
            self.uplink.send(now, encode_stream(&inputs));
        }
        for datagram in self.uplink.deliver(now) {
            self.server_receive(&datagram);
        }

        self.steer_drone(now);
        self.server.tick(&mut self.server_scene);

        let mut outgoing = Vec::new();
        for message in self.server.take_outbox() {
            if message.object == PLAYER {
                outgoing.push(Envelope::new(
                    MessageType::SimulationResult,
                    message.object,
                    message.frame,
                    &message,
                )?);
            }
        }
        if let Some(state) = self.server.interpolator(DRONE).and_then(|i| i.newest()) {
            outgoing.push(Envelope::new(
                MessageType::ObjectUpdateState,
                DRONE,
                state.frame,
                &state.snapshot,
            )?);
        }
        if !outgoing.is_empty() {
            self.downlink.send(now, encode_stream(&outgoing));
        }
        for datagram in self.downlink.deliver(now) {
            self.client_receive(&datagram);
        }

        Ok(())
    }

    fn steer_player(&mut self, frame: u32) {
        let yaw = (frame / 120) as f32 * FRAC_PI_2;
        let input = MoveInput {
            direction: Quat::from_rotation_y(yaw) * Vec3::X,
            yaw,
            sprint: frame % 240 < 60,
        };
        if let Some(player) = self.client_scene.get_mut(&PLAYER) {
            player.set_input(input);
        }
    }

    /// The server drives the drone through its own input queue.
    fn steer_drone(&mut self, frame: u32) {
        let angle = frame as f32 * 0.02;
        let message = InputMessage {
            object: DRONE,
            client_frame: frame,
            input: MoveInput::towards(Vec3::new(angle.cos(), 0.0, angle.sin())),
        };
        if let Err(err) = self.server.receive_input(message) {
            log::warn!("drone input rejected: {err}");
        }
    }

    /// Moves the client's drone proxy to where the drone is drawn.
    fn show_drone(&mut self, frame: u32) {
        let render_time = self.view_time(frame);
        let Some(view) = self.client.evaluate(DRONE, render_time) else {
            return;
        };
        if let Some(drone) = self.client_scene.get_mut(&DRONE) {
            drone.position = view.snapshot().position;
            drone.rotation = view.snapshot().rotation;
        }
    }

    fn view_time(&self, frame: u32) -> f64 {
        self.client
            .clock()
            .time_of(frame.saturating_sub(VIEW_DELAY_TICKS))
    }

    fn server_receive(&mut self, datagram: &[u8]) {
        for envelope in decode_stream(datagram) {
            let message = envelope.and_then(|envelope| {
                envelope.decode_payload::<InputMessage<MoveInput>>()
            });
            match message {
                Ok(message) => {
                    if let Err(err) = self.server.receive_input(message) {
                        log::warn!("input dropped: {err}");
                    }
                }
                Err(err) => {
                    self.summary.bad_envelopes += 1;
                    log::warn!("undecodable input envelope: {err}");
                }
            }
        }
    }

    fn client_receive(&mut self, datagram: &[u8]) {
        for envelope in decode_stream(datagram) {
            let envelope = match envelope {
                Ok(envelope) => envelope,
                Err(err) => {
                    self.summary.bad_envelopes += 1;
                    log::warn!("undecodable envelope: {err}");
                    continue;
                }
            };

            let delivered = match envelope.kind() {
                MessageType::SimulationResult => envelope
                    .decode_payload::<ResultMessage<MoveResult>>()
                    .map_err(anyhow::Error::from)
                    .and_then(|message| Ok(self.client.receive_result(message)?)),
                MessageType::ObjectUpdateState => envelope
                    .decode_payload::<TransformSnapshot>()
                    .map_err(anyhow::Error::from)
                    .and_then(|snapshot| {
                        let frame = envelope.frame();
                        let time = self.client.clock().time_of(frame);
                        let state = State::new(snapshot, time, frame);
                        Ok(self.client.push_remote_state(envelope.object(), state)?)
                    }),
                other => {
                    log::debug!("ignoring {other:?} envelope");
                    Ok(())
                }
            };

            if let Err(err) = delivered {
                match err.downcast_ref::<SessionError>() {
                    Some(SessionError::State { .. }) => {
                        self.summary.stale_states += 1;
                        log::debug!("{err}");
                    }
                    _ => log::warn!("{err}"),
                }
            }
        }
    }

    /// Fires at the drone as the client currently draws it and resolves the
    /// shot on both sides.
    pub fn fire(&mut self) -> Result<()> {
        let viewed = self.client.frame().saturating_sub(1 + VIEW_DELAY_TICKS);
        let target = self
            .client
            .evaluate(DRONE, self.client.clock().time_of(viewed))
            .context("drone has no buffered states to aim at")?
            .snapshot()
            .position;
        let origin = target - Vec3::Z * 10.0;

        self.summary.local_hits = self
            .client
            .client_query(origin, Vec3::Z, 50.0, HitMask::PROP);
        self.summary.server_hits = self
            .server
            .server_query(viewed, origin, Vec3::Z, 50.0, HitMask::PROP);
        log::info!("fired at frame {viewed} from {origin}");
        Ok(())
    }

    pub fn summary(&mut self) -> &Summary {
        self.summary.uplink = self.uplink.stats().clone();
        self.summary.downlink = self.downlink.stats().clone();
        if let Some(authority) = self.server.authority(PLAYER) {
            self.summary.fallback_frames = authority.fallback_frames();
            self.summary.late_inputs = authority.late_inputs();
        }
        &self.summary
    }
}
