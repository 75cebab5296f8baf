//! Loop Racer - top-down circuit racing simulation
//!
//! Core modules:
//! - `sim`: Deterministic simulation (motion, steering, track, obstacles, laps)
//! - `config`: Data-driven race setup and difficulty presets
//! - `unlocks`: Persisted level unlock ratchet

pub mod config;
pub mod sim;
pub mod unlocks;

pub use config::{Difficulty, RaceConfig};
pub use unlocks::LevelUnlocks;

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Simulation steps per second (one step per rendered frame)
    pub const STEPS_PER_SECOND: u32 = 60;

    /// Levels available in the circuit rotation
    pub const MIN_LEVEL: u32 = 1;
    pub const MAX_LEVEL: u32 = 10;

    /// Laps needed to win a race
    pub const LAP_TARGET: u32 = 2;
    /// Fraction of the checkpoints that must be covered before a lap counts
    pub const LAP_COVERAGE: f32 = 0.8;

    /// Waypoints sampled around each circuit
    pub const WAYPOINT_COUNT: usize = 80;

    /// Below this length a vector has no usable direction
    pub const EPSILON: f32 = 1e-6;
}

/// Clamp a requested level into the playable range
#[inline]
pub fn clamp_level(level: u32) -> u32 {
    let clamped = level.clamp(consts::MIN_LEVEL, consts::MAX_LEVEL);
    if clamped != level {
        log::warn!("Level {} out of range, using {}", level, clamped);
    }
    clamped
}

/// Normalized angle to [-π, π)
#[inline]
pub fn normalize_angle(mut angle: f32) -> f32 {
    use std::f32::consts::PI;
    while angle >= PI {
        angle -= 2.0 * PI;
    }
    while angle < -PI {
        angle += 2.0 * PI;
    }
    angle
}

/// Smallest absolute difference between two angles, in [0, π]
#[inline]
pub fn angle_distance(a: f32, b: f32) -> f32 {
    normalize_angle(a - b).abs()
}

/// Convert elliptical polar (rx, ry, theta) to cartesian (x, y)
#[inline]
pub fn polar_to_cartesian(rx: f32, ry: f32, theta: f32) -> Vec2 {
    Vec2::new(rx * theta.cos(), ry * theta.sin())
}

/// Unit vector for a heading angle (radians, counter-clockwise from +x)
#[inline]
pub fn heading_vector(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Normalize, treating near-zero vectors as having no direction
#[inline]
pub fn safe_normalize(v: Vec2) -> Vec2 {
    let len = v.length();
    if len < consts::EPSILON || !len.is_finite() {
        Vec2::ZERO
    } else {
        v / len
    }
}

/// Linearly map `value` from [in_min, in_max] to [out_min, out_max], clamped to the output range
#[inline]
pub fn map_range(value: f32, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> f32 {
    let span = in_max - in_min;
    if span.abs() < consts::EPSILON {
        return out_min;
    }
    let t = ((value - in_min) / span).clamp(0.0, 1.0);
    out_min + (out_max - out_min) * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_normalize_angle_wraps() {
        assert!((normalize_angle(3.0 * PI) - (-PI)).abs() < 1e-4);
        assert!((normalize_angle(-PI / 2.0) + PI / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_safe_normalize_zero() {
        assert_eq!(safe_normalize(Vec2::ZERO), Vec2::ZERO);
        assert_eq!(safe_normalize(Vec2::new(1e-9, 0.0)), Vec2::ZERO);
        let n = safe_normalize(Vec2::new(3.0, 4.0));
        assert!((n.length() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_map_range_clamps() {
        assert!((map_range(0.0, 0.0, 80.0, 1.5, 0.3) - 1.5).abs() < 1e-6);
        assert!((map_range(80.0, 0.0, 80.0, 1.5, 0.3) - 0.3).abs() < 1e-6);
        assert!((map_range(200.0, 0.0, 80.0, 1.5, 0.3) - 0.3).abs() < 1e-6);
        assert!((map_range(40.0, 0.0, 80.0, 1.5, 0.3) - 0.9).abs() < 1e-5);
    }

    #[test]
    fn test_clamp_level() {
        assert_eq!(clamp_level(0), 1);
        assert_eq!(clamp_level(5), 5);
        assert_eq!(clamp_level(42), 10);
    }
}
