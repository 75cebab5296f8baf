//! Obstacles scattered along a circuit
//!
//! Generated once per race attempt from a seeded RNG and never mutated after.

use glam::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::track::Track;
use crate::{clamp_level, heading_vector, map_range, safe_normalize};

/// Waypoints at each end of the loop kept clear of obstacles (start/finish area)
pub const START_MARGIN: usize = 5;

pub const CONE_RADIUS: f32 = 8.0;
pub const BARRIER_WIDTH: f32 = 40.0;
pub const BARRIER_HEIGHT: f32 = 12.0;
pub const BARRIER_RADIUS: f32 = 20.0;
pub const OIL_RADIUS: f32 = 22.0;

pub const MAX_CONES: u32 = 12;
pub const MAX_BARRIERS: u32 = 6;
pub const MAX_OIL: u32 = 4;
pub const BARRIER_UNLOCK_LEVEL: u32 = 4;
pub const OIL_UNLOCK_LEVEL: u32 = 7;

/// Only obstacles whose direction is within this cone (dot with heading) are avoided
pub const AVOID_CONE_DOT: f32 = 0.3;
/// Deflection strength at zero distance and at the look-ahead limit
pub const AVOID_FORCE_NEAR: f32 = 1.5;
pub const AVOID_FORCE_FAR: f32 = 0.3;

/// Obstacle types
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ObstacleKind {
    /// Knocks speed down
    Cone,
    /// Bounces the car back
    Barrier {
        width: f32,
        height: f32,
        /// Long axis angle (radians), aligned with the track
        orientation: f32,
    },
    /// Makes the car slide
    Oil,
}

impl ObstacleKind {
    pub fn name(&self) -> &'static str {
        match self {
            ObstacleKind::Cone => "cone",
            ObstacleKind::Barrier { .. } => "barrier",
            ObstacleKind::Oil => "oil",
        }
    }
}

/// An obstacle entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obstacle {
    pub id: u32,
    pub kind: ObstacleKind,
    pub position: Vec2,
    /// Contact radius
    pub radius: f32,
}

impl Obstacle {
    /// Corners of a barrier's rectangle (for drawing); empty for round obstacles
    pub fn corners(&self) -> Vec<Vec2> {
        match self.kind {
            ObstacleKind::Barrier {
                width,
                height,
                orientation,
            } => {
                let along = heading_vector(orientation) * (width / 2.0);
                let across = along.perp().normalize_or_zero() * (height / 2.0);
                vec![
                    self.position + along + across,
                    self.position - along + across,
                    self.position - along - across,
                    self.position + along - across,
                ]
            }
            _ => Vec::new(),
        }
    }
}

/// Sideways placement rule, as a fraction of track width from the centerline
#[derive(Debug, Clone, Copy)]
enum Lateral {
    /// Cones: 20-40% out, either side
    Edges,
    /// Barriers: within 20% of the middle
    Center,
    /// Oil: up to 42% either side
    Anywhere,
}

impl Lateral {
    fn sample<R: Rng>(self, rng: &mut R) -> f32 {
        match self {
            Lateral::Edges => {
                let side = if rng.random_bool(0.5) { 1.0 } else { -1.0 };
                side * rng.random_range(0.2f32..0.4)
            }
            Lateral::Center => rng.random_range(-0.2f32..=0.2),
            Lateral::Anywhere => rng.random_range(-0.42f32..=0.42),
        }
    }
}

/// How many of each obstacle a level gets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ObstacleCounts {
    pub cones: u32,
    pub barriers: u32,
    pub oil: u32,
}

/// Cones from level 1, barriers from level 4, oil from level 7, each capped
pub fn obstacle_counts_for_level(level: u32) -> ObstacleCounts {
    let level = clamp_level(level);
    ObstacleCounts {
        cones: (2 + level).min(MAX_CONES),
        barriers: if level >= BARRIER_UNLOCK_LEVEL {
            (level - BARRIER_UNLOCK_LEVEL + 1).min(MAX_BARRIERS)
        } else {
            0
        },
        oil: if level >= OIL_UNLOCK_LEVEL {
            (level - OIL_UNLOCK_LEVEL + 1).min(MAX_OIL)
        } else {
            0
        },
    }
}

/// All obstacles on a circuit, in generation order
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObstacleSet {
    obstacles: Vec<Obstacle>,
}

impl ObstacleSet {
    pub fn new(obstacles: Vec<Obstacle>) -> Self {
        Self { obstacles }
    }

    /// Scatter obstacles along the track
    ///
    /// Each one sits at a uniformly sampled waypoint (away from the start
    /// area), shifted sideways along the local normal: cones toward the edges,
    /// barriers near the middle, oil anywhere across the width. Placements are
    /// independent, so obstacles may overlap.
    pub fn generate<R: Rng>(track: &Track, rng: &mut R) -> Self {
        let n = track.waypoint_count();
        if !track.is_ready() || n <= START_MARGIN * 2 {
            log::warn!("Track not ready, skipping obstacle generation");
            return Self::default();
        }

        let counts = obstacle_counts_for_level(track.level());
        let total = counts.cones + counts.barriers + counts.oil;
        let mut obstacles = Vec::with_capacity(total as usize);

        let plan = std::iter::repeat_n(Lateral::Edges, counts.cones as usize)
            .chain(std::iter::repeat_n(Lateral::Center, counts.barriers as usize))
            .chain(std::iter::repeat_n(Lateral::Anywhere, counts.oil as usize));

        for (i, lateral) in plan.enumerate() {
            let index = rng.random_range(START_MARGIN..n - START_MARGIN);
            let offset = lateral.sample(rng) * track.width();
            let position = track.waypoints()[index] + track.normal_at(index) * offset;
            let (kind, radius) = match lateral {
                Lateral::Edges => (ObstacleKind::Cone, CONE_RADIUS),
                Lateral::Center => (
                    ObstacleKind::Barrier {
                        width: BARRIER_WIDTH,
                        height: BARRIER_HEIGHT,
                        orientation: track.tangent_at(index).to_angle(),
                    },
                    BARRIER_RADIUS,
                ),
                Lateral::Anywhere => (ObstacleKind::Oil, OIL_RADIUS),
            };
            obstacles.push(Obstacle {
                id: i as u32 + 1,
                kind,
                position,
                radius,
            });
        }

        log::info!(
            "Level {}: {} cones, {} barriers, {} oil",
            track.level(),
            counts.cones,
            counts.barriers,
            counts.oil
        );
        Self { obstacles }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn as_slice(&self) -> &[Obstacle] {
        &self.obstacles
    }

    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// First obstacle (in generation order) whose radius contains `pos`
    pub fn check_collision(&self, pos: Vec2) -> Option<&Obstacle> {
        self.obstacles
            .iter()
            .find(|o| o.position.distance(pos) < o.radius)
    }

    /// Sideways deflection away from obstacles ahead
    ///
    /// Every obstacle within `look_ahead + radius` and inside the forward cone
    /// contributes a push perpendicular to the direction of travel, on the side
    /// away from the obstacle, stronger the closer it is. Contributions add up.
    pub fn avoidance_force(&self, pos: Vec2, vel: Vec2, look_ahead: f32) -> Vec2 {
        let forward = safe_normalize(vel);
        if forward == Vec2::ZERO {
            return Vec2::ZERO;
        }

        let mut force = Vec2::ZERO;
        for obstacle in &self.obstacles {
            let offset = obstacle.position - pos;
            let distance = offset.length();
            if distance > look_ahead + obstacle.radius {
                continue;
            }
            let dir = safe_normalize(offset);
            if forward.dot(dir) <= AVOID_CONE_DOT {
                continue;
            }

            let mut side = forward.perp();
            if side.dot(offset) > 0.0 {
                side = -side;
            }
            let strength = map_range(distance, 0.0, look_ahead, AVOID_FORCE_NEAR, AVOID_FORCE_FAR);
            force += side * strength;
        }
        force
    }
}
