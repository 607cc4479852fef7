//! # Replication Simulation
//!
//! Deterministic end-to-end run of the replication path:
//!
//! ```text
//! mover --publish 30Hz--> ReplicationPacket bytes
//!       --in flight (latency, jitter, loss, reordering)-->
//!       ReplicationSender --> SyncSession inbox --> tick @ 60Hz --> RenderPose
//! ```
//!
//! Each frame the rendered pose is compared against where the mover truly
//! was at the render time, which is what a player would judge smoothness by.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

use skirmish_shared::{ReplicationPacket, Vec2, PUBLISH_RATE_HZ};

use crate::config::SyncConfig;
use crate::error::NetResult;
use crate::interpolation::ReconcileMode;
use crate::session::{EntityId, ReplicationPublisher, ReplicationSender, SyncSession};

/// Network conditions for simulation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkConditions {
    /// One-way base latency (ms).
    pub base_latency_ms: u32,
    /// Latency spread either side of the base (ms).
    pub jitter_ms: u32,
    /// Packet loss percentage (0-100).
    pub packet_loss_percent: u8,
    /// Percentage of packets held back behind their successors (0-100).
    pub out_of_order_percent: u8,
}

impl NetworkConditions {
    /// LAN.
    pub const PERFECT: Self = Self {
        base_latency_ms: 1,
        jitter_ms: 0,
        packet_loss_percent: 0,
        out_of_order_percent: 0,
    };

    /// Fiber.
    pub const GOOD: Self = Self {
        base_latency_ms: 20,
        jitter_ms: 5,
        packet_loss_percent: 0,
        out_of_order_percent: 0,
    };

    /// Cable.
    pub const AVERAGE: Self = Self {
        base_latency_ms: 50,
        jitter_ms: 20,
        packet_loss_percent: 1,
        out_of_order_percent: 2,
    };

    /// Mobile / congested wifi.
    pub const POOR: Self = Self {
        base_latency_ms: 100,
        jitter_ms: 50,
        packet_loss_percent: 5,
        out_of_order_percent: 5,
    };

    /// Preset by name (`perfect`, `good`, `average`, `poor`).
    #[must_use]
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "perfect" => Some(Self::PERFECT),
            "good" => Some(Self::GOOD),
            "average" => Some(Self::AVERAGE),
            "poor" => Some(Self::POOR),
            _ => None,
        }
    }

    /// One-way latency with jitter (seconds).
    #[must_use]
    pub fn generate_latency(&self, rng_value: u32) -> f64 {
        let jitter = if self.jitter_ms > 0 {
            i64::from(rng_value % (self.jitter_ms * 2)) - i64::from(self.jitter_ms)
        } else {
            0
        };
        let latency_ms = (i64::from(self.base_latency_ms) + jitter).max(0);
        #[allow(clippy::cast_precision_loss)]
        let latency = latency_ms as f64 / 1000.0;
        latency
    }

    /// True if the packet is lost.
    #[must_use]
    pub fn should_drop(&self, rng_value: u32) -> bool {
        rng_value % 100 < u32::from(self.packet_loss_percent)
    }

    /// True if the packet is held back.
    #[must_use]
    pub fn should_reorder(&self, rng_value: u32) -> bool {
        rng_value % 100 < u32::from(self.out_of_order_percent)
    }

    /// Round trip the receiver would estimate (seconds).
    #[must_use]
    pub fn rtt(&self) -> f64 {
        f64::from(self.base_latency_ms) * 2.0 / 1000.0
    }
}

impl Default for NetworkConditions {
    fn default() -> Self {
        Self::AVERAGE
    }
}

/// Lehmer (MINSTD) generator; identical seeds give identical runs.
#[derive(Clone, Debug)]
pub struct SimpleRng {
    state: u64,
}

impl SimpleRng {
    const MODULUS: u64 = 2_147_483_647;

    /// Creates a generator. Zero is not a valid state and is replaced by one.
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        let state = seed % Self::MODULUS;
        Self {
            state: if state == 0 { 1 } else { state },
        }
    }

    /// Next value in `1..2^31-1`.
    pub fn next_u32(&mut self) -> u32 {
        self.state = (self.state * 48_271) % Self::MODULUS;
        u32::try_from(self.state).unwrap_or(u32::MAX)
    }

    /// Next value in `[0, 1)`.
    pub fn next_f32(&mut self) -> f32 {
        #[allow(clippy::cast_precision_loss)]
        let unit = self.next_u32() as f32 / Self::MODULUS as f32;
        unit.min(0.999_999)
    }
}

/// Simulation setup.
#[derive(Clone, Debug)]
pub struct SimulationConfig {
    /// Remote entities.
    pub entity_count: u32,
    /// Simulated seconds.
    pub duration_secs: f64,
    /// Receiver render rate (Hz).
    pub frame_rate: u32,
    /// Sender publish rate (Hz).
    pub publish_rate: u32,
    /// Link model.
    pub network: NetworkConditions,
    /// Every entity respawns this often (seconds), if set.
    pub respawn_interval: Option<f64>,
    /// Movement speed (units per second).
    pub speed: f32,
    /// RNG seed.
    pub seed: u64,
    /// Receiver tuning.
    pub sync: SyncConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            entity_count: 8,
            duration_secs: 30.0,
            frame_rate: 60,
            publish_rate: PUBLISH_RATE_HZ,
            network: NetworkConditions::AVERAGE,
            respawn_interval: None,
            speed: 6.0,
            seed: 42,
            sync: SyncConfig::default(),
        }
    }
}

/// Wall-clock cost of a paced run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PacingStats {
    /// Frames stepped.
    pub frames: u64,
    /// Mean work per frame (µs).
    pub avg_work_us: u64,
    /// Worst work per frame (µs).
    pub max_work_us: u64,
    /// Frames whose work exceeded the frame period.
    pub overruns: u64,
}

/// Outcome of a run.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SimulationStats {
    /// Frames rendered.
    pub frames: u64,
    /// Messages published.
    pub published: u64,
    /// Messages lost in transit.
    pub lost: u64,
    /// Messages held back behind later ones.
    pub reordered: u64,
    /// Messages stored by receivers.
    pub accepted: u64,
    /// Messages rejected as stale.
    pub rejected: u64,
    /// Frames per mode.
    pub interpolated: u64,
    /// Frames per mode.
    pub extrapolated: u64,
    /// Frames per mode.
    pub held: u64,
    /// Teleport snaps.
    pub teleports: u64,
    /// Mean distance between rendered and true position.
    pub avg_error: f32,
    /// Worst distance between rendered and true position.
    pub max_error: f32,
    /// Mean active delay at the end of the run (seconds).
    pub final_delay: f64,
}

impl SimulationStats {
    /// Share of rendered frames spent extrapolating (percent).
    #[must_use]
    pub fn extrapolation_percent(&self) -> f64 {
        let frames = self.interpolated + self.extrapolated + self.held;
        if frames == 0 {
            return 0.0;
        }
        #[allow(clippy::cast_precision_loss)]
        let percent = self.extrapolated as f64 * 100.0 / frames as f64;
        percent
    }
}

struct InFlight {
    deliver_at: f64,
    bytes: Vec<u8>,
}

/// Authoritative-side moving entity.
#[derive(Debug)]
struct Mover {
    id: EntityId,
    spawn: Vec2,
    position: Vec2,
    velocity: Vec2,
    phase: f32,
    publisher: ReplicationPublisher,
    history: VecDeque<(f64, Vec2)>,
}

const HISTORY_SECONDS: f64 = 2.0;
const RESPAWN_OFFSET: f32 = 25.0;

impl Mover {
    fn new(id: EntityId, spawn: Vec2, phase: f32, publish_rate: u32) -> Self {
        Self {
            id,
            spawn,
            position: spawn,
            velocity: Vec2::ZERO,
            phase,
            publisher: ReplicationPublisher::new(publish_rate),
            history: VecDeque::new(),
        }
    }

    /// Zig-zag horizontally, bob vertically.
    fn advance(&mut self, time: f64, dt: f64, speed: f32) {
        #[allow(clippy::cast_possible_truncation)]
        let t = time as f32;
        let direction = if (t * 1.7 + self.phase).sin() >= 0.0 { 1.0 } else { -1.0 };
        let bob = (t * 3.0 + self.phase).cos() * 1.5;
        self.velocity = Vec2::new(speed * direction, bob);
        #[allow(clippy::cast_possible_truncation)]
        let step = dt as f32;
        self.position += self.velocity * step;
        self.record(time);
    }

    fn respawn(&mut self, time: f64) {
        self.spawn = self.spawn + Vec2::new(RESPAWN_OFFSET, 0.0);
        self.position = self.spawn;
        self.velocity = Vec2::ZERO;
        self.history.clear();
        self.record(time);
    }

    fn record(&mut self, time: f64) {
        self.history.push_back((time, self.position));
        while self.history.front().is_some_and(|(t, _)| time - t > HISTORY_SECONDS) {
            self.history.pop_front();
        }
    }

    fn grounded(&self) -> bool {
        self.velocity.y <= 0.0
    }

    /// True position at `time`, if still in history.
    fn position_at(&self, time: f64) -> Option<Vec2> {
        let after = self.history.iter().position(|(t, _)| *t >= time)?;
        let (t1, p1) = self.history[after];
        if after == 0 {
            return ((t1 - time).abs() < 1e-9).then_some(p1);
        }
        let (t0, p0) = self.history[after - 1];
        let span = t1 - t0;
        #[allow(clippy::cast_possible_truncation)]
        let w = if span > 1e-9 { ((time - t0) / span) as f32 } else { 1.0 };
        Some(p0.lerp(p1, w))
    }
}

/// Sender, lossy link and receiving session in one deterministic loop.
pub struct ReplicationSimulation {
    config: SimulationConfig,
    session: SyncSession,
    sender: ReplicationSender,
    movers: Vec<Mover>,
    in_flight: Vec<InFlight>,
    rng: SimpleRng,
    time: f64,
    next_respawn: Option<f64>,
    error_sum: f64,
    error_samples: u64,
    stats: SimulationStats,
}

impl ReplicationSimulation {
    /// Sets up movers and the receiving session.
    ///
    /// # Errors
    ///
    /// Returns an error if `config.sync` is invalid.
    pub fn new(config: SimulationConfig) -> NetResult<Self> {
        let mut session = SyncSession::new(config.sync.clone())?;
        let sender = session.sender();
        let mut rng = SimpleRng::new(config.seed);

        let movers = (0..config.entity_count)
            .map(|id| {
                let spawn = Vec2::new(rng.next_f32() * 200.0 - 100.0, rng.next_f32() * 20.0);
                let phase = rng.next_f32() * std::f32::consts::TAU;
                session.create_sync(id);
                Mover::new(id, spawn, phase, config.publish_rate)
            })
            .collect();

        Ok(Self {
            next_respawn: config.respawn_interval,
            config,
            session,
            sender,
            movers,
            in_flight: Vec::new(),
            rng,
            time: 0.0,
            error_sum: 0.0,
            error_samples: 0,
            stats: SimulationStats::default(),
        })
    }

    /// Runs one frame. Returns `false` once the duration is exhausted.
    pub fn step(&mut self) -> bool {
        if self.time >= self.config.duration_secs {
            return false;
        }
        let dt = 1.0 / f64::from(self.config.frame_rate.max(1));
        self.time += dt;
        let now = self.time;

        let respawn = self.next_respawn.is_some_and(|at| now >= at);
        if respawn {
            self.next_respawn = self.next_respawn.zip(self.config.respawn_interval).map(|(at, i)| at + i);
        }

        self.publish(now, dt, respawn);
        self.deliver(now);
        self.render(now, dt);

        self.stats.frames += 1;
        true
    }

    fn publish(&mut self, now: f64, dt: f64, respawn: bool) {
        let network = self.config.network;
        for mover in &mut self.movers {
            if respawn {
                mover.respawn(now);
            } else {
                mover.advance(now, dt, self.config.speed);
            }

            let Some(message) = mover
                .publisher
                .poll(dt, now, mover.position, mover.velocity, mover.grounded())
            else {
                continue;
            };
            self.stats.published += 1;

            if network.should_drop(self.rng.next_u32()) {
                self.stats.lost += 1;
                continue;
            }
            let mut latency = network.generate_latency(self.rng.next_u32());
            if network.should_reorder(self.rng.next_u32()) {
                latency += 2.0 * mover.publisher.interval();
                self.stats.reordered += 1;
            }

            let packet = ReplicationPacket::new(mover.id, &message);
            self.in_flight.push(InFlight {
                deliver_at: now + latency,
                bytes: packet.as_bytes().to_vec(),
            });
        }
    }

    fn deliver(&mut self, now: f64) {
        let sender = &self.sender;
        self.in_flight.retain(|packet| {
            if packet.deliver_at > now {
                return true;
            }
            sender.send_packet(&packet.bytes);
            false
        });
    }

    fn render(&mut self, now: f64, dt: f64) {
        let mut poses = Vec::with_capacity(self.movers.len());
        let report = self
            .session
            .tick(now, self.config.network.rtt(), dt, |id, pose| poses.push((id, *pose)));
        self.stats.accepted += u64::from(report.accepted);
        self.stats.rejected += u64::from(report.rejected);

        for (id, pose) in poses {
            match pose.mode {
                ReconcileMode::Interpolate => self.stats.interpolated += 1,
                ReconcileMode::Extrapolate => self.stats.extrapolated += 1,
                ReconcileMode::Hold => self.stats.held += 1,
            }
            if pose.teleported {
                self.stats.teleports += 1;
                continue;
            }

            let Some(delay) = self.session.entity(id).map(|e| e.delay().active_delay()) else {
                continue;
            };
            let Some(truth) = self
                .movers
                .get(usize::try_from(id).unwrap_or(usize::MAX))
                .and_then(|m| m.position_at(now - delay))
            else {
                continue;
            };
            let error = pose.position.distance(truth);
            self.error_sum += f64::from(error);
            self.error_samples += 1;
            self.stats.max_error = self.stats.max_error.max(error);
        }
    }

    /// Runs to completion and returns the final statistics.
    pub fn run(&mut self) -> SimulationStats {
        while self.step() {}
        self.finish()
    }

    /// Runs to completion in real time, one step per frame period.
    ///
    /// Simulated results are identical to [`run`](Self::run); only the wall
    /// clock differs. A frame that overruns resets the schedule instead of
    /// stepping several times to catch up.
    pub fn run_paced(&mut self) -> (SimulationStats, PacingStats) {
        let period = Duration::from_secs_f64(1.0 / f64::from(self.config.frame_rate.max(1)));
        let mut pacing = PacingStats::default();
        let mut work_total = Duration::ZERO;
        let mut next_frame = Instant::now();

        loop {
            let start = Instant::now();
            if !self.step() {
                break;
            }
            let work = start.elapsed();
            work_total += work;
            pacing.frames += 1;
            pacing.max_work_us = pacing.max_work_us.max(micros(work));
            if work > period {
                pacing.overruns += 1;
            }

            next_frame += period;
            let now = Instant::now();
            if next_frame > now {
                thread::sleep(next_frame - now);
            } else {
                next_frame = now;
            }
        }

        if pacing.frames > 0 {
            pacing.avg_work_us = micros(work_total) / pacing.frames;
        }
        (self.finish(), pacing)
    }

    /// Completes the error and delay figures and returns the statistics.
    /// Callers that drive [`step`](Self::step) themselves call this at the end.
    pub fn finish(&mut self) -> SimulationStats {
        if self.error_samples > 0 {
            #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
            let avg = (self.error_sum / self.error_samples as f64) as f32;
            self.stats.avg_error = avg;
        }
        let delays: Vec<f64> = self
            .session
            .entity_ids()
            .filter_map(|id| self.session.entity(id))
            .map(|e| e.delay().active_delay())
            .collect();
        if !delays.is_empty() {
            #[allow(clippy::cast_precision_loss)]
            let mean = delays.iter().sum::<f64>() / delays.len() as f64;
            self.stats.final_delay = mean;
        }
        self.stats.clone()
    }

    /// Simulated seconds elapsed.
    #[must_use]
    pub const fn time(&self) -> f64 {
        self.time
    }

    /// Statistics so far (error figures are filled in by [`finish`](Self::finish)).
    #[must_use]
    pub const fn stats(&self) -> &SimulationStats {
        &self.stats
    }

    /// The receiving session.
    #[must_use]
    pub const fn session(&self) -> &SyncSession {
        &self.session
    }
}

fn micros(duration: Duration) -> u64 {
    u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
}
