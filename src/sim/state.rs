//! Race session state
//!
//! Everything one race attempt needs lives here; the outer game loop owns it
//! and passes it to `tick` every frame.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::obstacle::ObstacleSet;
use super::opponent::{
    OPPONENT_BASE_SPEED, OpponentController, SPEED_VARIATION_MAX, SPEED_VARIATION_MIN,
};
use super::player::{DriveMode, PlayerController};
use super::progress::{CompetitorId, rank};
use super::racer::Racer;
use super::track::Track;
use crate::{clamp_level, safe_normalize};
use crate::config::RaceConfig;

/// Distance between grid rows behind the start line
pub const GRID_ROW_SPACING: f32 = 30.0;
/// Sideways offset of grid slots from the centerline (fraction of track width)
pub const GRID_LATERAL: f32 = 0.2;

/// Current phase of the race
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RacePhase {
    Racing,
    /// Someone reached the lap target; nothing moves any more
    Finished { winner: CompetitorId },
}

/// RNG seed derivation for one attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngState {
    pub seed: u64,
    pub stream: u64,
}

impl RngState {
    /// Mix race seed, level and attempt so retries get fresh obstacles
    pub fn for_attempt(seed: u64, level: u32, attempt: u32) -> Self {
        Self {
            seed,
            stream: (level as u64).wrapping_mul(2654435761) ^ ((attempt as u64) << 32),
        }
    }

    pub fn to_rng(&self) -> Pcg32 {
        Pcg32::seed_from_u64(self.seed ^ self.stream)
    }
}

/// Per-competitor line for the outer game loop (HUD, results screen)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompetitorStatus {
    pub id: CompetitorId,
    pub position: Vec2,
    pub laps: u32,
    pub progress: u32,
    pub finished: bool,
}

/// Read-only summary of a race at one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub level: u32,
    pub tick: u64,
    pub phase: RacePhase,
    /// Competitors in standings order
    pub standings: Vec<CompetitorStatus>,
    pub player_position: usize,
    pub nitro_fuel: f32,
    /// Nitro gauge fill, 0 to 1
    pub nitro_ratio: f32,
    /// Centerline length of the circuit
    pub track_length: f32,
    /// Barrier rectangles as four corners each
    pub barrier_outlines: Vec<Vec<Vec2>>,
}

/// Complete race state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceState {
    /// Race seed for reproducibility
    pub seed: u64,
    pub level: u32,
    /// Retry counter (0 for the first attempt)
    pub attempt: u32,
    pub config: RaceConfig,
    pub track: Track,
    pub obstacles: ObstacleSet,
    pub player: PlayerController,
    pub opponents: Vec<OpponentController>,
    pub phase: RacePhase,
    /// Simulation tick counter
    pub time_ticks: u64,
}

impl RaceState {
    /// Set up a race on `level` (clamped to 1-10)
    pub fn new(level: u32, seed: u64, config: RaceConfig) -> Self {
        let level = clamp_level(level);
        let track = Track::generate(level);
        let mut rng = RngState::for_attempt(seed, level, 0).to_rng();
        let obstacles = ObstacleSet::generate(&track, &mut rng);

        let (start, heading) = track.start_pose();
        let mut player = PlayerController::new(start, heading, config.lap_target);
        if config.autopilot {
            player.mode = DriveMode::Autopilot;
        }

        let base_speed = OPPONENT_BASE_SPEED
            * config.difficulty.opponent_speed_factor()
            * (1.0 + config.opponent_speed_per_level * (level - 1) as f32);
        let opponents = (0..config.opponent_count)
            .map(|i| {
                let variation = rng.random_range(SPEED_VARIATION_MIN..=SPEED_VARIATION_MAX);
                OpponentController::new(i, grid_slot(&track, i), base_speed * variation, config.lap_target)
            })
            .collect();

        log::info!(
            "Race ready: level {}, seed {}, {} opponents ({})",
            level,
            seed,
            config.opponent_count,
            config.difficulty.as_str()
        );

        Self {
            seed,
            level,
            attempt: 0,
            config,
            track,
            obstacles,
            player,
            opponents,
            phase: RacePhase::Racing,
            time_ticks: 0,
        }
    }

    /// Start the same level over
    ///
    /// Track and obstacles are rebuilt for the new attempt; cars are reset in
    /// place and keep their tuning.
    pub fn retry(&mut self) {
        self.attempt += 1;
        self.track = Track::generate(self.level);
        let mut rng = RngState::for_attempt(self.seed, self.level, self.attempt).to_rng();
        self.obstacles = ObstacleSet::generate(&self.track, &mut rng);

        let (start, heading) = self.track.start_pose();
        self.player.reset(start, heading);
        for (i, opponent) in self.opponents.iter_mut().enumerate() {
            opponent.reset(grid_slot(&self.track, i));
        }
        self.phase = RacePhase::Racing;
        self.time_ticks = 0;
        log::info!("Retry #{} on level {}", self.attempt, self.level);
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, RacePhase::Finished { .. })
    }

    pub fn winner(&self) -> Option<CompetitorId> {
        match self.phase {
            RacePhase::Finished { winner } => Some(winner),
            RacePhase::Racing => None,
        }
    }

    /// Scalar progress for every competitor, player first then opponents in order
    pub fn progress_entries(&self) -> Vec<(CompetitorId, u32)> {
        let n = self.track.waypoint_count();
        std::iter::once((CompetitorId::Player, self.player.progress(n)))
            .chain(
                self.opponents
                    .iter()
                    .enumerate()
                    .map(|(i, o)| (CompetitorId::Opponent(i), o.progress(n))),
            )
            .collect()
    }

    /// Competitors ordered by progress (ties keep player-first list order)
    pub fn standings(&self) -> Vec<CompetitorId> {
        rank(&self.progress_entries())
    }

    /// Player's 1-based place
    pub fn player_position(&self) -> usize {
        self.standings()
            .iter()
            .position(|id| *id == CompetitorId::Player)
            .map(|i| i + 1)
            .unwrap_or(1)
    }

    fn status(&self, id: CompetitorId) -> Option<CompetitorStatus> {
        let n = self.track.waypoint_count();
        let racer: &dyn Racer = match id {
            CompetitorId::Player => &self.player,
            CompetitorId::Opponent(i) => self.opponents.get(i)?,
        };
        Some(CompetitorStatus {
            id,
            position: racer.position(),
            laps: racer.laps_completed(),
            progress: racer.progress(n),
            finished: racer.is_finished(),
        })
    }

    pub fn snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            level: self.level,
            tick: self.time_ticks,
            phase: self.phase,
            standings: self
                .standings()
                .into_iter()
                .filter_map(|id| self.status(id))
                .collect(),
            player_position: self.player_position(),
            nitro_fuel: self.player.nitro.fuel(),
            nitro_ratio: self.player.nitro.ratio(),
            track_length: self.track.length(),
            barrier_outlines: self
                .obstacles
                .iter()
                .map(|o| o.corners())
                .filter(|corners| !corners.is_empty())
                .collect(),
        }
    }
}

/// Grid slot `i` behind the start line, alternating sides, two per row
///
/// Rows are measured back along the centerline, so on a circuit that bends
/// right behind the line the grid still sits on the track.
pub fn grid_slot(track: &Track, i: usize) -> Vec2 {
    let (start, _) = track.start_pose();
    let waypoints = track.waypoints();
    let n = waypoints.len();
    let row = (i / 2 + 1) as f32;
    let side = if i % 2 == 0 { 1.0 } else { -1.0 };
    let lateral = side * GRID_LATERAL * track.width();

    let mut back = GRID_ROW_SPACING * row;
    let mut k = 0;
    for _ in 0..n {
        let prev = (k + n - 1) % n;
        let (here, behind) = (waypoints[k], waypoints[prev]);
        let segment = here.distance(behind);
        if back <= segment {
            return here + safe_normalize(behind - here) * back + track.normal_at(prev) * lateral;
        }
        back -= segment;
        k = prev;
    }
    start + track.normal_at(0) * lateral
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Difficulty;
    use crate::sim::obstacle::{ObstacleKind, obstacle_counts_for_level};
    use crate::sim::player::MAX_FUEL;

    #[test]
    fn test_new_race_layout() {
        let state = RaceState::new(4, 42, RaceConfig::default());
        assert_eq!(state.level, 4);
        assert_eq!(state.opponents.len(), 3);
        assert_eq!(state.phase, RacePhase::Racing);
        assert_eq!(state.player.vehicle.position, state.track.waypoints()[0]);
        assert!(!state.obstacles.is_empty());

        // Opponents start behind the line, never on top of each other
        let tangent = state.track.tangent_at(0);
        for (i, o) in state.opponents.iter().enumerate() {
            assert_eq!(o.index, i);
            assert!((o.vehicle.position - state.player.vehicle.position).dot(tangent) < 0.0);
        }
        assert_ne!(state.opponents[0].vehicle.position, state.opponents[1].vehicle.position);
    }

    #[test]
    fn test_grid_follows_the_centerline() {
        // Level 9 pinches in tight around the start line
        let track = Track::generate(9);
        for i in 0..6 {
            // Well inside the track: no pull back toward the centerline
            let slot = grid_slot(&track, i);
            assert_eq!(track.boundary_force(slot, Vec2::ZERO), Vec2::ZERO, "slot {}", i);
        }
        // Each row further back along the loop than the one before
        let nearest = |i| track.nearest_waypoint_index(grid_slot(&track, i)).unwrap_or(0);
        assert!(nearest(0) > 70 && nearest(2) <= nearest(0));
        assert_eq!(grid_slot(&Track::uninitialized(1), 0), Vec2::ZERO);
    }

    #[test]
    fn test_level_is_clamped() {
        assert_eq!(RaceState::new(0, 1, RaceConfig::default()).level, 1);
        assert_eq!(RaceState::new(11, 1, RaceConfig::default()).level, 10);
    }

    #[test]
    fn test_opponent_speeds_follow_difficulty() {
        let easy = RaceState::new(1, 9, RaceConfig::from_preset(Difficulty::Easy));
        let hard = RaceState::new(1, 9, RaceConfig::from_preset(Difficulty::Hard));
        for (e, h) in easy.opponents.iter().zip(&hard.opponents) {
            assert!(e.vehicle.max_speed < h.vehicle.max_speed);
        }
        for o in &easy.opponents {
            let base = OPPONENT_BASE_SPEED * Difficulty::Easy.opponent_speed_factor();
            assert!(o.vehicle.max_speed >= base * SPEED_VARIATION_MIN - 1e-4);
            assert!(o.vehicle.max_speed <= base * SPEED_VARIATION_MAX + 1e-4);
        }
    }

    #[test]
    fn test_same_seed_same_race() {
        let a = RaceState::new(8, 1234, RaceConfig::default());
        let b = RaceState::new(8, 1234, RaceConfig::default());
        assert_eq!(a.obstacles.as_slice(), b.obstacles.as_slice());
        assert_eq!(a.opponents[2].vehicle.max_speed, b.opponents[2].vehicle.max_speed);
    }

    #[test]
    fn test_retry_resets_in_place() {
        let mut state = RaceState::new(8, 77, RaceConfig::default());
        let speeds: Vec<f32> = state.opponents.iter().map(|o| o.vehicle.max_speed).collect();
        let first_obstacles = state.obstacles.as_slice().to_vec();

        state.player.vehicle.position += Vec2::new(50.0, 0.0);
        state.player.progress.laps = 1;
        state.opponents[0].progress.laps = 1;
        state.phase = RacePhase::Finished {
            winner: CompetitorId::Opponent(0),
        };
        state.time_ticks = 500;

        state.retry();
        assert_eq!(state.attempt, 1);
        assert_eq!(state.phase, RacePhase::Racing);
        assert_eq!(state.time_ticks, 0);
        assert_eq!(state.player.vehicle.position, state.track.waypoints()[0]);
        assert_eq!(state.player.progress.laps, 0);
        assert_eq!(state.opponents[0].progress.laps, 0);
        let after: Vec<f32> = state.opponents.iter().map(|o| o.vehicle.max_speed).collect();
        assert_eq!(speeds, after);
        assert_ne!(first_obstacles, state.obstacles.as_slice());
    }

    #[test]
    fn test_standings_and_player_position() {
        let mut state = RaceState::new(1, 5, RaceConfig::default());
        // Everyone level: player first by list order
        assert_eq!(state.player_position(), 1);

        state.opponents[1].progress.last_checkpoint = 10;
        state.opponents[2].progress.laps = 1;
        assert_eq!(
            state.standings(),
            vec![
                CompetitorId::Opponent(2),
                CompetitorId::Opponent(1),
                CompetitorId::Player,
                CompetitorId::Opponent(0),
            ]
        );
        assert_eq!(state.player_position(), 3);

        let snap = state.snapshot();
        assert_eq!(snap.player_position, 3);
        assert_eq!(snap.standings.len(), 4);
        assert_eq!(snap.standings[0].id, CompetitorId::Opponent(2));
        assert_eq!(snap.standings[0].progress, 80);
    }

    #[test]
    fn test_snapshot_serializes() {
        let state = RaceState::new(2, 3, RaceConfig::default());
        let json = serde_json::to_string(&state.snapshot()).unwrap();
        let back: RaceSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state.snapshot());
    }

    #[test]
    fn test_snapshot_gauge_and_geometry() {
        let mut state = RaceState::new(6, 21, RaceConfig::default());
        let snap = state.snapshot();
        assert!((snap.nitro_ratio - 1.0).abs() < 1e-6);
        assert!((snap.track_length - state.track.length()).abs() < 1e-3);
        assert!(snap.track_length > 0.0);

        // Level 6 has three barriers and nothing else draws as a rectangle
        let barriers = obstacle_counts_for_level(6).barriers as usize;
        assert_eq!(snap.barrier_outlines.len(), barriers);
        let barrier_centers: Vec<Vec2> = state
            .obstacles
            .iter()
            .filter(|o| matches!(o.kind, ObstacleKind::Barrier { .. }))
            .map(|o| o.position)
            .collect();
        for (outline, center) in snap.barrier_outlines.iter().zip(&barrier_centers) {
            assert_eq!(outline.len(), 4);
            let mean = outline.iter().copied().sum::<Vec2>() / 4.0;
            assert!(mean.distance(*center) < 1e-3);
        }

        // Burn some fuel and the gauge follows
        for _ in 0..20 {
            state.player.nitro.update(true);
        }
        let snap = state.snapshot();
        assert!(snap.nitro_ratio < 1.0);
        assert!((snap.nitro_ratio * MAX_FUEL - snap.nitro_fuel).abs() < 1e-4);
    }
}
