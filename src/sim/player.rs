//! Player car: manual driving or autopilot, nitro, drift and obstacle reactions

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::collision::{bounce, circle_contact, push_out};
use super::obstacle::ObstacleKind;
use super::progress::LapProgress;
use super::racer::{Racer, StepContext};
use super::steering::arrive;
use super::vehicle::Vehicle;
use crate::consts::EPSILON;
use crate::{heading_vector, normalize_angle};

pub const PLAYER_MAX_SPEED: f32 = 6.0;
pub const NITRO_MAX_SPEED: f32 = 9.0;
pub const PLAYER_MAX_STEER: f32 = 0.3;
pub const PLAYER_RADIUS: f32 = 12.0;

/// Thrust per step while accelerating / reversing
pub const THRUST: f32 = 0.25;
pub const REVERSE_THRUST: f32 = 0.12;

/// Max heading change per step, reached at TURN_FULL_SPEED
pub const TURN_RATE: f32 = 0.06;
pub const TURN_FULL_SPEED: f32 = 3.0;
/// Below this speed the car cannot turn
pub const MIN_TURN_SPEED: f32 = 0.3;
/// Autopilot lets the heading follow the velocity this fast
pub const AUTOPILOT_TURN_RATE: f32 = 0.2;

/// Velocity kept per step with no throttle
pub const ROLLING_FRICTION: f32 = 0.98;
/// Lateral velocity kept per step (the rest is corrected toward the heading)
pub const LATERAL_RETENTION: f32 = 0.1;
pub const OIL_LATERAL_RETENTION: f32 = 0.6;
pub const OIL_DURATION: u32 = 90;

/// Cone hit: speed multiplier, then decay-only steps
pub const CONE_SPEED_FACTOR: f32 = 0.5;
pub const CONE_DURATION: u32 = 30;
pub const CONE_DECAY: f32 = 0.95;
/// Barrier hit keeps this fraction of speed
pub const BARRIER_SPEED_FACTOR: f32 = 0.5;
/// Steps before another obstacle contact can register
pub const CONTACT_COOLDOWN: u32 = 20;

pub const MAX_FUEL: f32 = 100.0;
pub const NITRO_DRAIN: f32 = 1.0;
pub const NITRO_RECHARGE: f32 = 0.25;
pub const NITRO_FORCE: f32 = 0.3;

/// Autopilot tuning
pub const AUTOPILOT_LOOKAHEAD: usize = 3;
pub const ARRIVE_RADIUS: f32 = 40.0;
pub const OBSTACLE_LOOK_AHEAD: f32 = 80.0;
pub const AUTOPILOT_AVOID_WEIGHT: f32 = 2.0;
pub const AUTOPILOT_BOUNDARY_WEIGHT: f32 = 1.5;
pub const AUTO_NITRO_SPEED: f32 = 3.0;
pub const AUTO_NITRO_RESERVE: f32 = 30.0;

/// Held keys for one step
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerInput {
    pub forward: bool,
    pub backward: bool,
    pub left: bool,
    pub right: bool,
    pub boost: bool,
}

/// Who is driving
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriveMode {
    Manual,
    Autopilot,
}

/// Lingering effect of the last obstacle hit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceEffect {
    Normal,
    /// Sliding: less lateral correction
    OnOil { ticks: u32 },
    /// No thrust, velocity decays
    SlowedByCone { ticks: u32 },
}

impl SurfaceEffect {
    /// Count down one step, returning to Normal when expired
    fn tick(self) -> Self {
        match self {
            SurfaceEffect::OnOil { ticks } if ticks > 1 => SurfaceEffect::OnOil { ticks: ticks - 1 },
            SurfaceEffect::SlowedByCone { ticks } if ticks > 1 => {
                SurfaceEffect::SlowedByCone { ticks: ticks - 1 }
            }
            _ => SurfaceEffect::Normal,
        }
    }
}

/// Boost gauge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Nitro {
    fuel: f32,
    active: bool,
}

impl Default for Nitro {
    fn default() -> Self {
        Self {
            fuel: MAX_FUEL,
            active: false,
        }
    }
}

impl Nitro {
    pub fn with_fuel(fuel: f32) -> Self {
        Self {
            fuel: fuel.clamp(0.0, MAX_FUEL),
            active: false,
        }
    }

    /// Apply this step's request: active only if requested and there is fuel
    ///
    /// Drains while active, recharges otherwise; fuel stays in [0, MAX_FUEL].
    pub fn update(&mut self, requested: bool) -> bool {
        self.active = requested && self.fuel > 0.0;
        self.fuel = if self.active {
            (self.fuel - NITRO_DRAIN).max(0.0)
        } else {
            (self.fuel + NITRO_RECHARGE).min(MAX_FUEL)
        };
        self.active
    }

    pub fn fuel(&self) -> f32 {
        self.fuel
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Fuel as a fraction of the tank (for a gauge)
    pub fn ratio(&self) -> f32 {
        self.fuel / MAX_FUEL
    }
}

/// The player's car
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerController {
    pub vehicle: Vehicle,
    /// Facing angle (radians)
    pub heading: f32,
    pub mode: DriveMode,
    pub effect: SurfaceEffect,
    pub nitro: Nitro,
    pub progress: LapProgress,
    pub finished: bool,
    pub lap_target: u32,
    /// Steps left before another obstacle contact registers
    pub contact_cooldown: u32,
    /// Obstacle the car overlapped at the end of the last step
    #[serde(default)]
    pub overlapping: Option<u32>,
    /// Autopilot's last offset to its target
    #[serde(skip)]
    aim: Vec2,
    /// Whether throttle was applied this step (no rolling friction then)
    #[serde(skip)]
    thrusting: bool,
}

impl PlayerController {
    pub fn new(position: Vec2, heading: f32, lap_target: u32) -> Self {
        Self {
            vehicle: Vehicle::new(position, PLAYER_MAX_SPEED, PLAYER_MAX_STEER, PLAYER_RADIUS),
            heading,
            mode: DriveMode::Manual,
            effect: SurfaceEffect::Normal,
            nitro: Nitro::default(),
            progress: LapProgress::new(),
            finished: false,
            lap_target,
            contact_cooldown: 0,
            overlapping: None,
            aim: Vec2::ZERO,
            thrusting: false,
        }
    }

    /// Back to the grid for a retry, keeping the drive mode
    pub fn reset(&mut self, position: Vec2, heading: f32) {
        self.vehicle.reset_at(position);
        self.vehicle.max_speed = PLAYER_MAX_SPEED;
        self.heading = heading;
        self.effect = SurfaceEffect::Normal;
        self.nitro = Nitro::default();
        self.progress = LapProgress::new();
        self.finished = false;
        self.contact_cooldown = 0;
        self.overlapping = None;
        self.aim = Vec2::ZERO;
        self.thrusting = false;
    }

    pub fn toggle_autopilot(&mut self) -> DriveMode {
        self.mode = match self.mode {
            DriveMode::Manual => DriveMode::Autopilot,
            DriveMode::Autopilot => DriveMode::Manual,
        };
        log::debug!("Player drive mode: {:?}", self.mode);
        self.mode
    }

    pub fn heading_vector(&self) -> Vec2 {
        heading_vector(self.heading)
    }

    /// Current speed ceiling (higher while nitro burns)
    pub fn speed_cap(&self) -> f32 {
        if self.nitro.is_active() {
            NITRO_MAX_SPEED
        } else {
            PLAYER_MAX_SPEED
        }
    }

    fn slowed(&self) -> bool {
        matches!(self.effect, SurfaceEffect::SlowedByCone { .. })
    }

    /// Thrust and turn from held keys; returns whether boost was requested
    fn drive_manual(&mut self, input: &PlayerInput, ctx: &StepContext<'_>) -> bool {
        let forward = self.heading_vector();
        if input.forward {
            self.vehicle.apply_force(forward * THRUST);
        }
        if input.backward {
            self.vehicle.apply_force(-forward * REVERSE_THRUST);
        }
        self.thrusting = input.forward || input.backward;

        // Turning needs speed, and flips when rolling backward
        let speed = self.vehicle.speed();
        if speed > MIN_TURN_SPEED {
            let rate = TURN_RATE * (speed / TURN_FULL_SPEED).min(1.0);
            let direction = if self.vehicle.velocity.dot(forward) < 0.0 { -1.0 } else { 1.0 };
            if input.left {
                self.heading += rate * direction;
            }
            if input.right {
                self.heading -= rate * direction;
            }
            self.heading = normalize_angle(self.heading);
        }

        let (pos, vel) = (self.vehicle.position, self.vehicle.velocity);
        if let Some(tracked) = self.progress.tracked_waypoint(ctx.track, pos) {
            let boundary = ctx.track.boundary_force_near(pos, vel, tracked);
            self.vehicle.apply_force(boundary);
        }

        input.boost
    }

    /// Chase the next checkpoints while dodging obstacles; returns whether to boost
    fn drive_autopilot(&mut self, ctx: &StepContext<'_>) -> bool {
        let pos = self.vehicle.position;
        let vel = self.vehicle.velocity;
        let Some(tracked) = self.progress.tracked_waypoint(ctx.track, pos) else {
            return false;
        };
        let Some(target) = ctx.track.waypoint(tracked + AUTOPILOT_LOOKAHEAD) else {
            return false;
        };
        self.aim = target - pos;

        let seek = arrive(&self.vehicle, target, ARRIVE_RADIUS);
        // Dodging fades out toward standstill
        let dodge = (self.vehicle.speed() / self.vehicle.max_speed.max(EPSILON)).min(1.0);
        let avoid = ctx.obstacles.avoidance_force(pos, vel, OBSTACLE_LOOK_AHEAD) * dodge;
        let boundary = ctx.track.boundary_force_near(pos, vel, tracked);

        self.vehicle.apply_force(seek);
        self.vehicle.apply_force(avoid * AUTOPILOT_AVOID_WEIGHT);
        self.vehicle.apply_force(boundary * AUTOPILOT_BOUNDARY_WEIGHT);
        self.thrusting = true;

        self.vehicle.speed() > AUTO_NITRO_SPEED && self.nitro.fuel() > AUTO_NITRO_RESERVE
    }

    /// Pull velocity toward the heading, keeping a fraction of the sideways slip
    fn apply_drift(&mut self) {
        let retention = match self.effect {
            SurfaceEffect::OnOil { .. } => OIL_LATERAL_RETENTION,
            _ => LATERAL_RETENTION,
        };
        let h = self.heading_vector();
        let along = h * self.vehicle.velocity.dot(h);
        let lateral = self.vehicle.velocity - along;
        self.vehicle.velocity = along + lateral * retention;
    }

    /// Let the heading swing toward the direction of travel (autopilot only)
    ///
    /// Too slow to have a direction of travel, it turns toward the target instead.
    fn follow_velocity(&mut self) {
        let facing = if self.vehicle.speed() > MIN_TURN_SPEED {
            self.vehicle.velocity
        } else {
            self.aim
        };
        if facing.length_squared() <= EPSILON {
            return;
        }
        let target = facing.to_angle();
        let delta = normalize_angle(target - self.heading)
            .clamp(-AUTOPILOT_TURN_RATE, AUTOPILOT_TURN_RATE);
        self.heading = normalize_angle(self.heading + delta);
    }

    /// React to the obstacle under the car
    ///
    /// Only entering an obstacle counts: a car parked on a cone is not hit again
    /// every time the cooldown runs out.
    fn resolve_obstacles(&mut self, ctx: &StepContext<'_>) {
        let hit = ctx.obstacles.check_collision(self.vehicle.position);
        let previous = std::mem::replace(&mut self.overlapping, hit.map(|o| o.id));
        if self.contact_cooldown > 0 {
            self.contact_cooldown -= 1;
            return;
        }
        let Some(obstacle) = hit else {
            return;
        };
        if previous == Some(obstacle.id) {
            return;
        }

        log::debug!("Player hit {} #{}", obstacle.kind.name(), obstacle.id);
        match obstacle.kind {
            ObstacleKind::Cone => {
                self.vehicle.velocity *= CONE_SPEED_FACTOR;
                self.effect = SurfaceEffect::SlowedByCone {
                    ticks: CONE_DURATION,
                };
            }
            ObstacleKind::Oil => {
                self.effect = SurfaceEffect::OnOil {
                    ticks: OIL_DURATION,
                };
            }
            ObstacleKind::Barrier { .. } => {
                let contact = circle_contact(
                    self.vehicle.position,
                    obstacle.position,
                    obstacle.radius,
                    -self.vehicle.velocity,
                );
                self.vehicle.velocity =
                    bounce(self.vehicle.velocity, contact.normal, BARRIER_SPEED_FACTOR);
                self.vehicle.position = push_out(self.vehicle.position, &contact, 1.0);
            }
        }
        self.contact_cooldown = CONTACT_COOLDOWN;
    }
}

impl Racer for PlayerController {
    fn steer(&mut self, input: Option<&PlayerInput>, ctx: &StepContext<'_>) {
        if self.finished {
            return;
        }
        self.thrusting = false;

        // Cone slowdown: no thrust, no boost, just decay
        let wants_boost = if self.slowed() {
            false
        } else {
            match self.mode {
                DriveMode::Manual => {
                    let input = input.copied().unwrap_or_default();
                    self.drive_manual(&input, ctx)
                }
                DriveMode::Autopilot => self.drive_autopilot(ctx),
            }
        };

        if self.nitro.update(wants_boost) {
            let boost = self.heading_vector() * NITRO_FORCE;
            self.vehicle.apply_force(boost);
        }
    }

    fn advance(&mut self, ctx: &StepContext<'_>) {
        if self.finished {
            self.vehicle.pending_force = Vec2::ZERO;
            return;
        }

        self.vehicle.max_speed = self.speed_cap();
        self.apply_drift();
        if self.slowed() {
            self.vehicle.velocity *= CONE_DECAY;
        } else if !self.thrusting {
            self.vehicle.velocity *= ROLLING_FRICTION;
        }
        self.effect = self.effect.tick();

        self.vehicle.integrate();
        if self.mode == DriveMode::Autopilot {
            self.follow_velocity();
        }

        self.resolve_obstacles(ctx);

        let n = ctx.track.waypoint_count();
        if let Some(nearest) = ctx.track.nearest_waypoint_index(self.vehicle.position) {
            if self.progress.advance_to(nearest, n) > 0 {
                log::debug!("Player completed lap {}", self.progress.laps);
            }
        }
        if self.progress.laps >= self.lap_target {
            self.finished = true;
            log::info!("Player finished");
        }
    }

    fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    fn lap_progress(&self) -> &LapProgress {
        &self.progress
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}
