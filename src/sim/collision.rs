//! Contact detection and response between cars and round obstacles

use glam::Vec2;

use crate::safe_normalize;

/// Result of a contact check
#[derive(Debug, Clone)]
pub struct ContactResult {
    /// Whether the point is inside the circle
    pub hit: bool,
    /// Unit normal from the circle center toward the point
    pub normal: Vec2,
    /// How far inside the circle the point is
    pub penetration: f32,
}

impl ContactResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            normal: Vec2::ZERO,
            penetration: 0.0,
        }
    }
}

/// Check whether `point` lies strictly inside a circle
///
/// A point exactly at the center has no geometric normal; `fallback` (usually
/// the reverse of the car's velocity) is used instead, then +x.
pub fn circle_contact(point: Vec2, center: Vec2, radius: f32, fallback: Vec2) -> ContactResult {
    let offset = point - center;
    let distance = offset.length();
    if distance >= radius {
        return ContactResult::miss();
    }

    let mut normal = safe_normalize(offset);
    if normal == Vec2::ZERO {
        normal = safe_normalize(fallback);
    }
    if normal == Vec2::ZERO {
        normal = Vec2::X;
    }

    ContactResult {
        hit: true,
        normal,
        penetration: radius - distance,
    }
}

/// Reflect velocity off a surface with given normal
#[inline]
pub fn reflect_velocity(vel: Vec2, normal: Vec2) -> Vec2 {
    vel - 2.0 * vel.dot(normal) * normal
}

/// Bounce away from a contact: reflect if moving into the surface, then scale speed
pub fn bounce(vel: Vec2, normal: Vec2, speed_factor: f32) -> Vec2 {
    let out = if vel.dot(normal) < 0.0 {
        reflect_velocity(vel, normal)
    } else {
        vel
    };
    out * speed_factor
}

/// Move a point out of a contact along its normal, plus a small clearance
#[inline]
pub fn push_out(point: Vec2, contact: &ContactResult, clearance: f32) -> Vec2 {
    if contact.hit {
        point + contact.normal * (contact.penetration + clearance)
    } else {
        point
    }
}
