//! Procedural circuit geometry
//!
//! A circuit is an ellipse sampled at a fixed number of angles, with its radii
//! pushed in or out by smooth angular bumps ("control points"). Every level has
//! its own fixed recipe, so the same level always produces the same circuit.

use std::f32::consts::{PI, TAU};

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::consts::WAYPOINT_COUNT;
use crate::{angle_distance, clamp_level, polar_to_cartesian, safe_normalize};

/// Base ellipse radii (centered on the origin)
pub const BASE_RADIUS_X: f32 = 420.0;
pub const BASE_RADIUS_Y: f32 = 280.0;
/// Deformed radii never shrink below this
pub const MIN_RADIUS: f32 = 90.0;

/// Track width formula: max(MIN_TRACK_WIDTH, BASE_TRACK_WIDTH - level * WIDTH_SHRINK_PER_LEVEL)
pub const BASE_TRACK_WIDTH: f32 = 160.0;
pub const MIN_TRACK_WIDTH: f32 = 100.0;
pub const WIDTH_SHRINK_PER_LEVEL: f32 = 6.0;

/// Boundary force starts this far inside the half-width
pub const BOUNDARY_MARGIN: f32 = 15.0;
/// Overshoot (past the margin) at which the boundary force reaches full authority
pub const BOUNDARY_RAMP: f32 = 25.0;
/// Full-authority boundary force
pub const BOUNDARY_FORCE: f32 = 0.6;
/// Outward speed at which the boundary force is doubled
pub const BOUNDARY_URGENT_SPEED: f32 = 5.0;

/// A smooth angular bump applied to the base ellipse
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlPoint {
    /// Angle of peak influence (radians)
    pub angle: f32,
    /// Change to the x radius at the peak
    pub delta_x: f32,
    /// Change to the y radius at the peak
    pub delta_y: f32,
    /// Angular half-width of the bump, as a fraction of π
    pub spread: f32,
}

impl ControlPoint {
    pub const fn new(angle: f32, delta_x: f32, delta_y: f32, spread: f32) -> Self {
        Self {
            angle,
            delta_x,
            delta_y,
            spread,
        }
    }

    /// Raised-cosine weight in [0, 1]: 1 at `angle`, 0 beyond `spread * π`
    pub fn influence(&self, theta: f32) -> f32 {
        let reach = self.spread * PI;
        if reach <= 0.0 {
            return 0.0;
        }
        let d = angle_distance(theta, self.angle);
        if d >= reach {
            0.0
        } else {
            0.5 * (1.0 + (PI * d / reach).cos())
        }
    }
}

/// Deformation recipe for a level (1-10)
///
/// Early levels are gentle ovals; later ones stack narrow, deep bumps that read
/// as chicanes, S-curves and hairpins.
pub fn control_points_for_level(level: u32) -> Vec<ControlPoint> {
    const Q: f32 = PI / 2.0;
    let cp = ControlPoint::new;
    match clamp_level(level) {
        1 => vec![],
        2 => vec![cp(0.0, -70.0, 0.0, 0.30)],
        3 => vec![cp(Q, 0.0, -90.0, 0.35), cp(3.0 * Q, 0.0, 50.0, 0.30)],
        4 => vec![
            cp(0.0, -100.0, 0.0, 0.25),
            cp(PI, 70.0, 0.0, 0.30),
            cp(Q, 0.0, -60.0, 0.20),
        ],
        5 => vec![
            // S-curve on the top straight
            cp(0.35 * PI, 40.0, -110.0, 0.18),
            cp(0.65 * PI, -40.0, 60.0, 0.18),
            cp(3.0 * Q, 0.0, -70.0, 0.25),
        ],
        6 => vec![
            cp(0.0, -130.0, 0.0, 0.20),
            cp(Q, 0.0, 80.0, 0.20),
            cp(PI, -90.0, 0.0, 0.22),
            cp(3.0 * Q, 0.0, -100.0, 0.18),
        ],
        7 => vec![
            // Chicane pair
            cp(0.20 * PI, -60.0, -90.0, 0.12),
            cp(0.30 * PI, 50.0, 70.0, 0.12),
            cp(PI, -150.0, 0.0, 0.20),
            cp(1.40 * PI, 0.0, -110.0, 0.15),
            cp(1.70 * PI, 60.0, 60.0, 0.15),
        ],
        8 => vec![
            cp(0.0, -180.0, 0.0, 0.15),
            cp(0.45 * PI, 0.0, -130.0, 0.14),
            cp(0.55 * PI, 0.0, 60.0, 0.10),
            cp(1.10 * PI, -120.0, -40.0, 0.16),
            cp(1.50 * PI, 0.0, -140.0, 0.12),
            cp(1.80 * PI, 70.0, 50.0, 0.12),
        ],
        9 => vec![
            // Hairpin on the right; legs stay a track width apart
            cp(0.0, -200.0, 0.0, 0.18),
            cp(0.25 * PI, 30.0, -65.0, 0.12),
            cp(0.60 * PI, -50.0, 80.0, 0.10),
            cp(PI, -170.0, 0.0, 0.14),
            cp(1.30 * PI, 0.0, -50.0, 0.10),
            cp(1.55 * PI, 0.0, 90.0, 0.10),
            cp(1.80 * PI, -70.0, -55.0, 0.12),
        ],
        _ => vec![
            cp(0.0, -190.0, 0.0, 0.20),
            cp(0.15 * PI, 40.0, -50.0, 0.10),
            cp(0.40 * PI, 0.0, -120.0, 0.12),
            cp(0.60 * PI, 0.0, 70.0, 0.10),
            cp(PI, -160.0, 0.0, 0.20),
            cp(1.25 * PI, 40.0, -60.0, 0.10),
            cp(1.50 * PI, 0.0, -110.0, 0.12),
            cp(1.75 * PI, -60.0, 60.0, 0.10),
        ],
    }
}

/// Track width for a level, shrinking monotonically
pub fn track_width_for_level(level: u32) -> f32 {
    (BASE_TRACK_WIDTH - clamp_level(level) as f32 * WIDTH_SHRINK_PER_LEVEL).max(MIN_TRACK_WIDTH)
}

/// Lifecycle of a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackState {
    /// No waypoints yet; every query answers with a neutral result
    Uninitialized,
    Ready,
}

/// Closed-loop circuit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    level: u32,
    width: f32,
    state: TrackState,
    waypoints: Vec<Vec2>,
    inner_edge: Vec<Vec2>,
    outer_edge: Vec<Vec2>,
}

impl Track {
    /// A track for `level` with no geometry yet
    pub fn uninitialized(level: u32) -> Self {
        let level = clamp_level(level);
        Self {
            level,
            width: track_width_for_level(level),
            state: TrackState::Uninitialized,
            waypoints: Vec::new(),
            inner_edge: Vec::new(),
            outer_edge: Vec::new(),
        }
    }

    /// Build and generate the circuit for `level`
    pub fn generate(level: u32) -> Self {
        let mut track = Self::uninitialized(level);
        track.generate_circuit();
        track
    }

    /// Build a track from explicit waypoints (counter-clockwise loop)
    pub fn from_waypoints(level: u32, width: f32, waypoints: Vec<Vec2>) -> Self {
        let mut track = Self::uninitialized(level);
        track.width = width;
        track.set_waypoints(waypoints);
        track
    }

    /// Sample the deformed ellipse and derive the edges
    pub fn generate_circuit(&mut self) {
        let control_points = control_points_for_level(self.level);
        let waypoints = (0..WAYPOINT_COUNT)
            .map(|i| {
                let theta = i as f32 / WAYPOINT_COUNT as f32 * TAU;
                let (mut rx, mut ry) = (BASE_RADIUS_X, BASE_RADIUS_Y);
                for point in &control_points {
                    let w = point.influence(theta);
                    rx += point.delta_x * w;
                    ry += point.delta_y * w;
                }
                polar_to_cartesian(rx.max(MIN_RADIUS), ry.max(MIN_RADIUS), theta)
            })
            .collect();
        self.set_waypoints(waypoints);
        log::info!(
            "Level {} circuit: {} waypoints, width {}, {} control points",
            self.level,
            self.waypoints.len(),
            self.width,
            control_points.len()
        );
    }

    /// Replace the waypoints; edges are always rebuilt alongside
    fn set_waypoints(&mut self, waypoints: Vec<Vec2>) {
        self.waypoints = waypoints;
        self.state = if self.waypoints.is_empty() {
            TrackState::Uninitialized
        } else {
            TrackState::Ready
        };
        self.rebuild_edges();
    }

    fn rebuild_edges(&mut self) {
        let half = self.width / 2.0;
        let (inner, outer): (Vec<Vec2>, Vec<Vec2>) = (0..self.waypoints.len())
            .map(|i| {
                let wp = self.waypoints[i];
                let n = self.normal_at(i);
                (wp + n * half, wp - n * half)
            })
            .unzip();
        self.inner_edge = inner;
        self.outer_edge = outer;
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == TrackState::Ready
    }

    pub fn waypoints(&self) -> &[Vec2] {
        &self.waypoints
    }

    pub fn inner_edge(&self) -> &[Vec2] {
        &self.inner_edge
    }

    pub fn outer_edge(&self) -> &[Vec2] {
        &self.outer_edge
    }

    pub fn waypoint_count(&self) -> usize {
        self.waypoints.len()
    }

    /// Waypoint by index, wrapping around the loop
    pub fn waypoint(&self, index: usize) -> Option<Vec2> {
        if self.waypoints.is_empty() {
            None
        } else {
            Some(self.waypoints[index % self.waypoints.len()])
        }
    }

    /// Unit direction of travel at a waypoint (previous to next)
    pub fn tangent_at(&self, index: usize) -> Vec2 {
        let n = self.waypoints.len();
        if n < 2 {
            return Vec2::ZERO;
        }
        let i = index % n;
        let prev = self.waypoints[(i + n - 1) % n];
        let next = self.waypoints[(i + 1) % n];
        safe_normalize(next - prev)
    }

    /// Tangent rotated 90° to the left (toward the infield on a counter-clockwise loop)
    pub fn normal_at(&self, index: usize) -> Vec2 {
        self.tangent_at(index).perp()
    }

    /// Exact nearest waypoint by linear scan
    pub fn nearest_waypoint_index(&self, pos: Vec2) -> Option<usize> {
        self.waypoints
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                a.distance_squared(pos)
                    .partial_cmp(&b.distance_squared(pos))
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .map(|(i, _)| i)
    }

    /// Nearest waypoint among `count` consecutive ones starting at `from`
    ///
    /// Ties keep the earliest in scan order. Used to stay on one leg of a
    /// hairpin whose other leg is closer than the track width.
    pub fn nearest_waypoint_between(&self, pos: Vec2, from: usize, count: usize) -> Option<usize> {
        let n = self.waypoints.len();
        if n == 0 {
            return None;
        }
        let mut best = from % n;
        let mut best_dist = self.waypoints[best].distance_squared(pos);
        for k in 1..count {
            let i = (from + k) % n;
            let d = self.waypoints[i].distance_squared(pos);
            if d < best_dist {
                best = i;
                best_dist = d;
            }
        }
        Some(best)
    }

    /// Closest point on the segments either side of waypoint `index`
    fn closest_point_near(&self, pos: Vec2, index: usize) -> Vec2 {
        let n = self.waypoints.len();
        let i = index % n;
        let here = self.waypoints[i];
        let prev = self.waypoints[(i + n - 1) % n];
        let next = self.waypoints[(i + 1) % n];

        [project_onto_segment(pos, prev, here), project_onto_segment(pos, here, next)]
            .into_iter()
            .fold(here, |best, p| {
                if p.distance_squared(pos) < best.distance_squared(pos) {
                    p
                } else {
                    best
                }
            })
    }

    /// Pull back toward the centerline once a car strays past `width/2 - margin`
    ///
    /// Zero inside the threshold; beyond it the force points at the closest
    /// centerline point and ramps to full authority over `BOUNDARY_RAMP` units.
    /// Moving outward makes it up to twice as strong.
    pub fn boundary_force(&self, pos: Vec2, vel: Vec2) -> Vec2 {
        match self.nearest_waypoint_index(pos) {
            Some(nearest) => self.boundary_force_near(pos, vel, nearest),
            None => Vec2::ZERO,
        }
    }

    /// `boundary_force` measured from the segments around waypoint `nearest`
    ///
    /// Cars pass the waypoint they are tracking so the pull never points at
    /// the other leg of a hairpin.
    pub fn boundary_force_near(&self, pos: Vec2, vel: Vec2, nearest: usize) -> Vec2 {
        if self.waypoints.is_empty() {
            return Vec2::ZERO;
        }
        let to_center = self.closest_point_near(pos, nearest) - pos;
        let distance = to_center.length();
        let threshold = self.width / 2.0 - BOUNDARY_MARGIN;
        if distance <= threshold {
            return Vec2::ZERO;
        }

        let dir = safe_normalize(to_center);
        let ramp = ((distance - threshold) / BOUNDARY_RAMP).min(1.0);
        let outward_speed = vel.dot(-dir).max(0.0);
        let urgency = 1.0 + (outward_speed / BOUNDARY_URGENT_SPEED).min(1.0);
        dir * BOUNDARY_FORCE * ramp * urgency
    }

    /// Start line position and heading (waypoint 0, facing along the track)
    pub fn start_pose(&self) -> (Vec2, f32) {
        match self.waypoint(0) {
            Some(p) => (p, self.tangent_at(0).to_angle()),
            None => (Vec2::ZERO, 0.0),
        }
    }

    /// Centerline length of the closed loop
    pub fn length(&self) -> f32 {
        let n = self.waypoints.len();
        (0..n)
            .map(|i| self.waypoints[i].distance(self.waypoints[(i + 1) % n]))
            .sum()
    }
}

/// Closest point to `p` on segment `a`-`b`
fn project_onto_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq <= f32::EPSILON {
        return a;
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_width_formula() {
        assert!((track_width_for_level(1) - 154.0).abs() < 1e-5);
        assert!((track_width_for_level(5) - 130.0).abs() < 1e-5);
        assert!((track_width_for_level(10) - 100.0).abs() < 1e-5);
        for level in 1..10 {
            assert!(track_width_for_level(level + 1) <= track_width_for_level(level));
        }
    }

    #[test]
    fn test_control_point_influence() {
        let cp = ControlPoint::new(0.0, 10.0, 0.0, 0.25);
        assert!((cp.influence(0.0) - 1.0).abs() < 1e-6);
        assert!((cp.influence(PI * 0.125) - 0.5).abs() < 1e-5);
        assert_eq!(cp.influence(PI * 0.3), 0.0);
        // Wraps across ±π
        assert!((cp.influence(TAU - 0.01) - cp.influence(0.01)).abs() < 1e-5);
    }

    #[test]
    fn test_recipes_grow_with_level() {
        assert!(control_points_for_level(1).is_empty());
        assert!(control_points_for_level(10).len() > control_points_for_level(5).len());
        assert_eq!(control_points_for_level(7), control_points_for_level(7));
    }

    #[test]
    fn test_uninitialized_queries_are_neutral() {
        let track = Track::uninitialized(3);
        assert_eq!(track.state(), TrackState::Uninitialized);
        assert_eq!(track.nearest_waypoint_index(Vec2::ZERO), None);
        assert_eq!(track.boundary_force(Vec2::new(999.0, 0.0), Vec2::X), Vec2::ZERO);
        assert_eq!(track.waypoint(5), None);
        assert_eq!(track.tangent_at(0), Vec2::ZERO);
    }

    #[test]
    fn test_generate_is_closed_loop() {
        let track = Track::generate(1);
        assert!(track.is_ready());
        assert_eq!(track.waypoint_count(), WAYPOINT_COUNT);
        assert_eq!(track.waypoint(WAYPOINT_COUNT), track.waypoint(0));
        assert_eq!(track.inner_edge().len(), WAYPOINT_COUNT);
        assert_eq!(track.outer_edge().len(), WAYPOINT_COUNT);
        // Level 1 is the undeformed ellipse
        let p0 = track.waypoints()[0];
        assert!((p0 - Vec2::new(BASE_RADIUS_X, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_from_waypoints() {
        let diamond = vec![
            Vec2::new(100.0, 0.0),
            Vec2::new(0.0, 100.0),
            Vec2::new(-100.0, 0.0),
            Vec2::new(0.0, -100.0),
        ];
        let track = Track::from_waypoints(3, 40.0, diamond);
        assert!(track.is_ready());
        assert_eq!(track.width(), 40.0);
        assert!((track.length() - 400.0 * std::f32::consts::SQRT_2).abs() < 1e-2);
        assert!((track.inner_edge()[0] - Vec2::new(80.0, 0.0)).length() < 1e-4);
        assert!((track.outer_edge()[0] - Vec2::new(120.0, 0.0)).length() < 1e-4);

        let empty = Track::from_waypoints(3, 40.0, Vec::new());
        assert_eq!(empty.state(), TrackState::Uninitialized);
        assert_eq!(empty.length(), 0.0);
    }

    #[test]
    fn test_inner_edge_is_infield() {
        let track = Track::generate(4);
        for i in 0..track.waypoint_count() {
            assert!(track.inner_edge()[i].length() < track.outer_edge()[i].length());
        }
    }

    #[test]
    fn test_nearest_waypoint() {
        let track = Track::generate(2);
        for i in [0, 17, 79] {
            let p = track.waypoints()[i] + Vec2::new(0.5, -0.5);
            assert_eq!(track.nearest_waypoint_index(p), Some(i));
        }
    }

    #[test]
    fn test_boundary_force_threshold() {
        let track = Track::generate(1);
        let wp = track.waypoints()[0];
        let normal = track.normal_at(0);
        let threshold = track.width() / 2.0 - BOUNDARY_MARGIN;

        // On or inside the threshold: exactly zero
        assert_eq!(track.boundary_force(wp, Vec2::ZERO), Vec2::ZERO);
        let inside = wp - normal * (threshold - 1.0);
        assert_eq!(track.boundary_force(inside, Vec2::ZERO), Vec2::ZERO);

        // Past it: nonzero and pointing back at the waypoint
        let outside = wp - normal * (threshold + 5.0);
        let force = track.boundary_force(outside, Vec2::ZERO);
        assert!(force.length() > 0.0);
        assert!(force.dot(wp - outside) > 0.0);

        // Full authority past the ramp
        let far = wp - normal * (threshold + BOUNDARY_RAMP + 1.0);
        let full = track.boundary_force(far, Vec2::ZERO);
        assert!((full.length() - BOUNDARY_FORCE).abs() < 1e-4);
        assert!(full.length() > force.length());
    }

    #[test]
    fn test_boundary_force_between_sparse_waypoints() {
        // Waypoints 200 apart: a car on the centerline between two of them is
        // far from both but still on the track
        let square = vec![
            Vec2::new(100.0, -100.0),
            Vec2::new(100.0, 100.0),
            Vec2::new(-100.0, 100.0),
            Vec2::new(-100.0, -100.0),
        ];
        let track = Track::from_waypoints(9, 60.0, square);
        let midpoint = Vec2::new(100.0, 0.0);
        assert_eq!(track.boundary_force(midpoint, Vec2::Y * 5.0), Vec2::ZERO);

        // Off to the side of that segment the pull is straight back across it
        let wide = Vec2::new(150.0, 10.0);
        let force = track.boundary_force(wide, Vec2::ZERO);
        assert!(force.x < 0.0);
        assert!(force.y.abs() < 1e-5);
    }

    #[test]
    fn test_boundary_force_stronger_when_heading_out() {
        let track = Track::generate(1);
        let wp = track.waypoints()[0];
        let normal = track.normal_at(0);
        let pos = wp - normal * (track.width() / 2.0);
        let calm = track.boundary_force(pos, Vec2::ZERO);
        let escaping = track.boundary_force(pos, -normal * 5.0);
        assert!(escaping.length() > calm.length());
        assert!(escaping.normalize().dot(calm.normalize()) > 0.999);
    }

    #[test]
    fn test_nearest_waypoint_between_stays_in_range() {
        let track = Track::generate(1);
        let p = track.waypoints()[40];
        assert_eq!(track.nearest_waypoint_between(p, 0, 80), Some(40));
        // Window 77..=5 wraps and never reaches 40
        let local = track.nearest_waypoint_between(p, 77, 9).unwrap();
        assert!(local >= 77 || local <= 5);
        assert_eq!(Track::uninitialized(1).nearest_waypoint_between(p, 0, 4), None);
    }

    #[test]
    fn test_boundary_force_near_ignores_other_leg() {
        // Hairpin: two legs 60 apart on a track 100 wide
        let pin = vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(200.0, 0.0),
            Vec2::new(400.0, 0.0),
            Vec2::new(400.0, 60.0),
            Vec2::new(200.0, 60.0),
            Vec2::new(0.0, 60.0),
        ];
        let track = Track::from_waypoints(9, 100.0, pin);
        // On the lower leg, 20 below it; globally nearest is still wp 1
        let pos = Vec2::new(200.0, -45.0);
        let lower = track.boundary_force_near(pos, Vec2::ZERO, 1);
        assert!(lower.y > 0.0);
        // Tracking the upper leg pulls the same way but much harder
        let upper = track.boundary_force_near(pos, Vec2::ZERO, 4);
        assert!(upper.length() > lower.length());
        assert_eq!(track.boundary_force_near(Vec2::new(200.0, 10.0), Vec2::ZERO, 1), Vec2::ZERO);
    }

    #[test]
    fn test_legs_never_closer_than_track_width() {
        // Waypoints far apart along the loop must not sit within a track width
        // of each other, or a car on one leg is also on the other
        for level in 1..=10 {
            let track = Track::generate(level);
            let w = track.width();
            let n = track.waypoint_count();
            let mut along = vec![0.0f32];
            for i in 0..n {
                let step = track.waypoints()[i].distance(track.waypoints()[(i + 1) % n]);
                along.push(along[i] + step);
            }
            let total = along[n];
            for i in 0..n {
                for j in i + 1..n {
                    let path = (along[j] - along[i]).min(total - (along[j] - along[i]));
                    if path > w * PI / 2.0 * 1.2 {
                        let gap = track.waypoints()[i].distance(track.waypoints()[j]);
                        assert!(gap > w, "level {} waypoints {} and {} only {} apart", level, i, j, gap);
                    }
                }
            }
        }
    }

    #[test]
    fn test_start_pose_faces_along_track() {
        let track = Track::generate(1);
        let (pos, heading) = track.start_pose();
        assert_eq!(pos, track.waypoints()[0]);
        // Counter-clockwise ellipse: start on +x, heading +y
        assert!((heading - PI / 2.0).abs() < 0.05);
    }

    proptest! {
        #[test]
        fn prop_edges_are_half_width_from_centerline(level in 1u32..=10) {
            let track = Track::generate(level);
            let half = track.width() / 2.0;
            for i in 0..track.waypoint_count() {
                let wp = track.waypoints()[i];
                prop_assert!((wp.distance(track.inner_edge()[i]) - half).abs() < 1e-3);
                prop_assert!((wp.distance(track.outer_edge()[i]) - half).abs() < 1e-3);
            }
        }

        #[test]
        fn prop_generation_is_deterministic(level in 1u32..=10) {
            let a = Track::generate(level);
            let b = Track::generate(level);
            prop_assert_eq!(a.waypoints(), b.waypoints());
        }
    }
}
