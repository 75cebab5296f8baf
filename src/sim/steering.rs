//! Steering behaviors
//!
//! Pure functions returning a bounded force for a vehicle. They never write to
//! the vehicle; callers feed the result into `Vehicle::apply_force`.

use glam::Vec2;

use super::vehicle::Vehicle;
use crate::consts::EPSILON;
use crate::safe_normalize;

/// Separation gets twice the authority of other steering forces
pub const SEPARATION_AUTHORITY: f32 = 2.0;

/// Turn a desired velocity into a steering force limited to `max_force`
#[inline]
fn steer_towards(vehicle: &Vehicle, desired: Vec2, max_force: f32) -> Vec2 {
    (desired - vehicle.velocity).clamp_length_max(max_force.max(0.0))
}

/// Steer toward `target` at full speed
pub fn seek(vehicle: &Vehicle, target: Vec2) -> Vec2 {
    let offset = target - vehicle.position;
    if offset.length() < EPSILON {
        return Vec2::ZERO;
    }
    let desired = safe_normalize(offset) * vehicle.max_speed;
    steer_towards(vehicle, desired, vehicle.max_steer_force)
}

/// Like `seek`, but the desired speed ramps down linearly inside `slow_radius`
pub fn arrive(vehicle: &Vehicle, target: Vec2, slow_radius: f32) -> Vec2 {
    let offset = target - vehicle.position;
    let distance = offset.length();
    if distance < EPSILON {
        return Vec2::ZERO;
    }

    let speed = if slow_radius > 0.0 && distance < slow_radius {
        vehicle.max_speed * (distance / slow_radius)
    } else {
        vehicle.max_speed
    };
    let desired = (offset / distance) * speed;
    steer_towards(vehicle, desired, vehicle.max_steer_force)
}

/// Push away from every neighbor closer than `desired_separation`
///
/// Each neighbor contributes a unit vector away from it weighted by inverse
/// distance; the average becomes a full-speed desired velocity. Neighbors at
/// the vehicle's own position (itself, or an exact overlap) have no direction
/// and are skipped.
pub fn separate(vehicle: &Vehicle, neighbors: &[Vec2], desired_separation: f32) -> Vec2 {
    if desired_separation <= 0.0 {
        return Vec2::ZERO;
    }

    let mut sum = Vec2::ZERO;
    let mut count = 0u32;
    for &other in neighbors {
        let away = vehicle.position - other;
        let distance = away.length();
        if distance > EPSILON && distance < desired_separation {
            sum += safe_normalize(away) / distance;
            count += 1;
        }
    }

    if count == 0 {
        return Vec2::ZERO;
    }

    let direction = safe_normalize(sum / count as f32);
    if direction == Vec2::ZERO {
        return Vec2::ZERO;
    }
    let desired = direction * vehicle.max_speed;
    steer_towards(
        vehicle,
        desired,
        vehicle.max_steer_force * SEPARATION_AUTHORITY,
    )
}

/// Separation against a single threat
#[inline]
pub fn flee_from(vehicle: &Vehicle, threat: Vec2, radius: f32) -> Vec2 {
    separate(vehicle, &[threat], radius)
}
