//! Fixed-rate tick clock shared by every component within a tick.

#[derive(Debug, Clone)]
pub struct FixedTimestep {
    tick_rate: u32,
    dt: f32,
    accumulator: f32,
}

impl FixedTimestep {
    pub const MAX_DELTA: f32 = 0.25;

    pub fn new(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick_rate,
            dt: 1.0 / tick_rate as f32,
            accumulator: 0.0,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn accumulate(&mut self, delta: f32) {
        self.accumulator += delta.clamp(0.0, Self::MAX_DELTA);
    }

    pub fn should_tick(&self) -> bool {
        self.accumulator >= self.dt
    }

    pub fn consume_tick(&mut self) -> bool {
        let due = self.should_tick();
        if due {
            self.accumulator -= self.dt;
        }
        due
    }

    pub fn alpha(&self) -> f32 {
        self.accumulator / self.dt
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// Read-only view of the clock handed to components during one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickContext {
    pub frame: u32,
    pub time: f64,
    pub dt: f32,
}

/// Authoritative frame counter. Only [`SimulationClock::advance`] moves it,
/// once per tick after every object has committed.
#[derive(Debug, Clone)]
pub struct SimulationClock {
    frame: u32,
    timestep: FixedTimestep,
}

impl SimulationClock {
    pub fn new(tick_rate: u32) -> Self {
        Self::starting_at(tick_rate, 0)
    }

    pub fn starting_at(tick_rate: u32, frame: u32) -> Self {
        Self {
            frame,
            timestep: FixedTimestep::new(tick_rate),
        }
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn dt(&self) -> f32 {
        self.timestep.dt()
    }

    pub fn tick_rate(&self) -> u32 {
        self.timestep.tick_rate()
    }

    pub fn time(&self) -> f64 {
        self.time_of(self.frame)
    }

    pub fn time_of(&self, frame: u32) -> f64 {
        frame as f64 / self.timestep.tick_rate() as f64
    }

    /// Frame whose capture time is at or before `time`.
    pub fn frame_at(&self, time: f64) -> u32 {
        (time.max(0.0) * self.timestep.tick_rate() as f64).floor() as u32
    }

    pub fn context(&self) -> TickContext {
        TickContext {
            frame: self.frame,
            time: self.time(),
            dt: self.dt(),
        }
    }

    pub fn accumulate(&mut self, delta: f32) {
        self.timestep.accumulate(delta);
    }

    pub fn consume_tick(&mut self) -> bool {
        self.timestep.consume_tick()
    }

    /// Fraction of the next tick already accumulated, for render blending.
    pub fn alpha(&self) -> f32 {
        self.timestep.alpha()
    }

    /// Render time `alpha` of a tick past the current frame.
    pub fn render_time(&self) -> f64 {
        self.time() + self.alpha() as f64 * self.dt() as f64
    }

    pub fn advance(&mut self) {
        self.frame = self.frame.wrapping_add(1);
    }
}

/// Runs `tick_fn` once for every whole tick accumulated from wall-clock
/// deltas, advancing the clock after each one.
pub struct TickLoop<F> {
    clock: SimulationClock,
    tick_fn: F,
}

impl<F> TickLoop<F>
where
    F: FnMut(TickContext),
{
    pub fn new(tick_rate: u32, tick_fn: F) -> Self {
        Self {
            clock: SimulationClock::new(tick_rate),
            tick_fn,
        }
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn update(&mut self, delta: f32) -> u32 {
        self.clock.accumulate(delta);

        let mut ticks_run = 0;
        while self.clock.consume_tick() {
            (self.tick_fn)(self.clock.context());
            self.clock.advance();
            ticks_run += 1;
        }

        ticks_run
    }

    pub fn interpolation_alpha(&self) -> f32 {
        self.clock.alpha()
    }
}
