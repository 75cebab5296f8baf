//! AI opponents: path following blended with separation and player avoidance
//!
//! Opponents ignore obstacles and have no nitro. They are deliberately simpler
//! than the player's autopilot.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::player::PlayerInput;
use super::progress::LapProgress;
use super::racer::{Racer, StepContext};
use super::steering::{flee_from, seek, separate};
use super::vehicle::Vehicle;

pub const OPPONENT_MAX_STEER: f32 = 0.25;
pub const OPPONENT_RADIUS: f32 = 12.0;
/// Top speed before difficulty and per-car variation
pub const OPPONENT_BASE_SPEED: f32 = 5.0;
/// Per-car top speed multiplier range
pub const SPEED_VARIATION_MIN: f32 = 0.92;
pub const SPEED_VARIATION_MAX: f32 = 1.04;

pub const SEPARATION_RADIUS: f32 = 50.0;
pub const PLAYER_AVOID_RADIUS: f32 = 60.0;
pub const PATH_LOOKAHEAD: usize = 3;

pub const PATH_WEIGHT: f32 = 1.5;
pub const SEPARATION_WEIGHT: f32 = 2.5;
pub const PLAYER_AVOID_WEIGHT: f32 = 2.0;
pub const BOUNDARY_WEIGHT: f32 = 2.0;

/// One AI car
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpponentController {
    /// Position in the opponent list (used to skip itself in separation)
    pub index: usize,
    pub vehicle: Vehicle,
    pub progress: LapProgress,
    pub finished: bool,
    pub lap_target: u32,
}

impl OpponentController {
    pub fn new(index: usize, position: Vec2, max_speed: f32, lap_target: u32) -> Self {
        Self {
            index,
            vehicle: Vehicle::new(position, max_speed, OPPONENT_MAX_STEER, OPPONENT_RADIUS),
            progress: LapProgress::new(),
            finished: false,
            lap_target,
        }
    }

    /// Back to the grid for a retry, keeping this car's top speed
    pub fn reset(&mut self, position: Vec2) {
        self.vehicle.reset_at(position);
        self.progress = LapProgress::new();
        self.finished = false;
    }

    /// Facing angle, taken from the direction of travel
    pub fn heading(&self) -> f32 {
        self.vehicle.velocity.to_angle()
    }

    /// The blended steering force for this step
    pub fn blended_force(&self, ctx: &StepContext<'_>) -> Vec2 {
        let (pos, vel) = (self.vehicle.position, self.vehicle.velocity);
        let tracked = self.progress.tracked_waypoint(ctx.track, pos);
        let path = tracked
            .and_then(|i| ctx.track.waypoint(i + PATH_LOOKAHEAD))
            .map(|target| seek(&self.vehicle, target))
            .unwrap_or(Vec2::ZERO);

        let neighbors: Vec<Vec2> = ctx
            .opponents
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != self.index)
            .map(|(_, k)| k.position)
            .collect();
        let separation = separate(&self.vehicle, &neighbors, SEPARATION_RADIUS);
        let avoid_player = flee_from(&self.vehicle, ctx.player.position, PLAYER_AVOID_RADIUS);
        let boundary = tracked
            .map(|i| ctx.track.boundary_force_near(pos, vel, i))
            .unwrap_or(Vec2::ZERO);

        path * PATH_WEIGHT
            + separation * SEPARATION_WEIGHT
            + avoid_player * PLAYER_AVOID_WEIGHT
            + boundary * BOUNDARY_WEIGHT
    }
}

impl Racer for OpponentController {
    fn steer(&mut self, _input: Option<&PlayerInput>, ctx: &StepContext<'_>) {
        if self.finished {
            return;
        }
        let force = self.blended_force(ctx);
        self.vehicle.apply_force(force);
    }

    fn advance(&mut self, ctx: &StepContext<'_>) {
        if self.finished {
            self.vehicle.pending_force = Vec2::ZERO;
            return;
        }
        self.vehicle.integrate();

        let n = ctx.track.waypoint_count();
        if let Some(nearest) = ctx.track.nearest_waypoint_index(self.vehicle.position) {
            if self.progress.advance_to(nearest, n) > 0 {
                log::debug!("Opponent {} completed lap {}", self.index, self.progress.laps);
            }
        }
        if self.progress.laps >= self.lap_target {
            self.finished = true;
            log::info!("Opponent {} finished", self.index);
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
