//! What every competitor can do, and the frozen world it reads each step

use glam::Vec2;

use super::obstacle::ObstacleSet;
use super::player::PlayerInput;
use super::progress::LapProgress;
use super::track::Track;
use super::vehicle::{Kinematics, Vehicle};

/// World as it stood at the end of the previous step
///
/// Built once per step before any car moves, so no competitor sees another's
/// half-finished update.
#[derive(Debug, Clone, Copy)]
pub struct StepContext<'a> {
    pub track: &'a Track,
    pub obstacles: &'a ObstacleSet,
    pub player: Kinematics,
    pub opponents: &'a [Kinematics],
}

/// A car that produces forces and advances its own race progress
pub trait Racer {
    /// Compute this step's forces from the frozen context (no movement yet)
    fn steer(&mut self, input: Option<&PlayerInput>, ctx: &StepContext<'_>);

    /// Integrate, resolve contacts, update lap progress
    fn advance(&mut self, ctx: &StepContext<'_>);

    fn vehicle(&self) -> &Vehicle;

    fn lap_progress(&self) -> &LapProgress;

    fn is_finished(&self) -> bool;

    /// Steer then advance in one call, for a car stepped on its own
    fn step(&mut self, input: Option<&PlayerInput>, ctx: &StepContext<'_>) {
        self.steer(input, ctx);
        self.advance(ctx);
    }

    fn position(&self) -> Vec2 {
        self.vehicle().position
    }

    fn velocity(&self) -> Vec2 {
        self.vehicle().velocity
    }

    fn laps_completed(&self) -> u32 {
        self.lap_progress().laps
    }

    /// Scalar progress on a track with `waypoint_count` waypoints
    fn progress(&self, waypoint_count: usize) -> u32 {
        self.lap_progress().progress(waypoint_count)
    }
}
