//! Point-mass motion integrator shared by every car
//!
//! Mass-normalized: an applied force is an acceleration for this step.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Physics state of one car
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vehicle {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Force accumulated for the current step, zeroed by `integrate`
    pub pending_force: Vec2,
    pub collision_radius: f32,
    pub max_steer_force: f32,
    pub max_speed: f32,
}

impl Vehicle {
    pub fn new(position: Vec2, max_speed: f32, max_steer_force: f32, collision_radius: f32) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            pending_force: Vec2::ZERO,
            collision_radius,
            max_steer_force,
            max_speed,
        }
    }

    /// Accumulate a force for this step (no limit applied here)
    #[inline]
    pub fn apply_force(&mut self, force: Vec2) {
        if force.is_finite() {
            self.pending_force += force;
        }
    }

    /// Advance one step: v += F, clamp |v|, p += v, F = 0
    pub fn integrate(&mut self) {
        self.velocity += self.pending_force;
        self.velocity = self.velocity.clamp_length_max(self.max_speed.max(0.0));
        self.position += self.velocity;
        self.pending_force = Vec2::ZERO;
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.velocity.length()
    }

    /// Put the car back on the grid, keeping its tuning
    pub fn reset_at(&mut self, position: Vec2) {
        self.position = position;
        self.velocity = Vec2::ZERO;
        self.pending_force = Vec2::ZERO;
    }
}

/// Frozen position/velocity pair read by other cars during a step
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: Vec2,
    pub velocity: Vec2,
}

impl From<&Vehicle> for Kinematics {
    fn from(v: &Vehicle) -> Self {
        Self {
            position: v.position,
            velocity: v.velocity,
        }
    }
}
