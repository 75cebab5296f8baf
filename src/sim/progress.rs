//! Lap counting, standings and finish detection

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::track::Track;
use crate::consts::LAP_COVERAGE;

/// How far ahead of the last checkpoint the nearest waypoint may be and still count
///
/// Wide enough that cutting the inside of a tight bend still scores, narrow
/// enough that crossing the infield to the far side of the loop does not.
pub const CHECKPOINT_WINDOW: usize = 12;

/// How far behind the last checkpoint a car may still be tracked (after knock-back)
pub const TRACKING_BACKTRACK: usize = 3;

/// Who is racing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompetitorId {
    Player,
    Opponent(usize),
}

/// Checkpoints needed since the last lap reset before crossing checkpoint 0 counts
pub fn lap_threshold(waypoint_count: usize) -> u32 {
    (waypoint_count as f32 * LAP_COVERAGE).ceil() as u32
}

/// Per-competitor lap state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LapProgress {
    pub laps: u32,
    /// Most recently reached waypoint
    pub last_checkpoint: usize,
    /// Checkpoints reached since the last lap was counted
    pub checkpoints_since_lap_start: u32,
}

impl LapProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record reaching a checkpoint; returns true if this completed a lap
    ///
    /// Reaching checkpoint 0 only counts as a lap once enough of the loop has
    /// been covered since the last one, so bouncing back over the line does not.
    pub fn record_checkpoint(&mut self, index: usize, waypoint_count: usize) -> bool {
        if waypoint_count == 0 {
            return false;
        }
        self.last_checkpoint = index % waypoint_count;
        self.checkpoints_since_lap_start += 1;

        if self.last_checkpoint == 0
            && self.checkpoints_since_lap_start >= lap_threshold(waypoint_count)
        {
            self.laps += 1;
            self.checkpoints_since_lap_start = 0;
            return true;
        }
        false
    }

    /// Walk forward to the car's nearest waypoint, one checkpoint at a time
    ///
    /// Only waypoints up to `CHECKPOINT_WINDOW` ahead count; anything behind
    /// (knock-back, reversing) or further ahead is ignored. Returns the number
    /// of laps completed during the walk.
    pub fn advance_to(&mut self, nearest: usize, waypoint_count: usize) -> u32 {
        if waypoint_count == 0 {
            return 0;
        }
        let ahead = (nearest % waypoint_count + waypoint_count - self.last_checkpoint) % waypoint_count;
        if ahead == 0 || ahead > CHECKPOINT_WINDOW {
            return 0;
        }

        let mut laps = 0;
        for _ in 0..ahead {
            let next = (self.last_checkpoint + 1) % waypoint_count;
            if self.record_checkpoint(next, waypoint_count) {
                laps += 1;
            }
        }
        laps
    }

    /// Waypoint a car is driving past, searched only around its last checkpoint
    ///
    /// Steering and the boundary pull use this instead of the nearest waypoint
    /// overall, which can sit on the other leg of a hairpin.
    pub fn tracked_waypoint(&self, track: &Track, pos: Vec2) -> Option<usize> {
        let n = track.waypoint_count();
        if n == 0 {
            return None;
        }
        let from = (self.last_checkpoint % n + n - TRACKING_BACKTRACK % n) % n;
        track.nearest_waypoint_between(pos, from, TRACKING_BACKTRACK + CHECKPOINT_WINDOW + 1)
    }

    /// Scalar race progress: laps * waypoint_count + last checkpoint
    pub fn progress(&self, waypoint_count: usize) -> u32 {
        self.laps * waypoint_count as u32 + self.last_checkpoint as u32
    }
}

/// Order competitors by descending progress; equal progress keeps input order
pub fn rank(entries: &[(CompetitorId, u32)]) -> Vec<CompetitorId> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| b.1.cmp(&a.1));
    sorted.into_iter().map(|(id, _)| id).collect()
}

/// First competitor at or past `lap_target`, player checked first, then opponents in order
pub fn detect_winner(player_laps: u32, opponent_laps: &[u32], lap_target: u32) -> Option<CompetitorId> {
    if player_laps >= lap_target {
        return Some(CompetitorId::Player);
    }
    opponent_laps
        .iter()
        .position(|&laps| laps >= lap_target)
        .map(CompetitorId::Opponent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const N: usize = 80;

    #[test]
    fn test_threshold() {
        assert_eq!(lap_threshold(80), 64);
        assert_eq!(lap_threshold(10), 8);
    }

    #[test]
    fn test_short_cut_to_zero_does_not_count() {
        let mut p = LapProgress::new();
        for i in 71..80 {
            p.record_checkpoint(i, N);
        }
        // Ten checkpoints, the last being 0
        assert!(!p.record_checkpoint(0, N));
        assert_eq!(p.laps, 0);
        assert_eq!(p.checkpoints_since_lap_start, 10);
    }

    #[test]
    fn test_covered_lap_counts() {
        let mut p = LapProgress::new();
        for i in 10..79 {
            p.record_checkpoint(i, N);
        }
        // 69 so far, the 70th is checkpoint 0
        assert!(p.record_checkpoint(0, N));
        assert_eq!(p.laps, 1);
        assert_eq!(p.checkpoints_since_lap_start, 0);
    }

    #[test]
    fn test_advance_to_walks_forward_and_wraps() {
        let mut p = LapProgress::new();
        assert_eq!(p.advance_to(2, N), 0);
        assert_eq!(p.last_checkpoint, 2);
        assert_eq!(p.checkpoints_since_lap_start, 2);

        // Behind and beyond the window: ignored
        p.advance_to(1, N);
        p.advance_to(40, N);
        assert_eq!(p.last_checkpoint, 2);

        // Full loop back to 0
        let mut laps = 0;
        for i in 3..=N {
            laps += p.advance_to(i % N, N);
        }
        assert_eq!(laps, 1);
        assert_eq!(p.laps, 1);
        assert_eq!(p.last_checkpoint, 0);
        assert!(p.last_checkpoint < N);
    }

    #[test]
    fn test_advance_to_skips_a_cut_corner() {
        let mut p = LapProgress {
            laps: 0,
            last_checkpoint: 20,
            checkpoints_since_lap_start: 20,
        };
        // Cutting a hairpin jumps the nearest waypoint several places at once
        p.advance_to(20 + CHECKPOINT_WINDOW, N);
        assert_eq!(p.last_checkpoint, 20 + CHECKPOINT_WINDOW);
        assert_eq!(p.checkpoints_since_lap_start, 20 + CHECKPOINT_WINDOW as u32);

        // One past the window is the far side of the loop
        p.advance_to(2 * CHECKPOINT_WINDOW + 21, N);
        assert_eq!(p.last_checkpoint, 20 + CHECKPOINT_WINDOW);
    }

    #[test]
    fn test_empty_track_is_neutral() {
        let mut p = LapProgress::new();
        assert!(!p.record_checkpoint(0, 0));
        assert_eq!(p.advance_to(3, 0), 0);
        assert_eq!(p.tracked_waypoint(&Track::uninitialized(1), Vec2::ZERO), None);
    }

    #[test]
    fn test_tracked_waypoint_stays_near_checkpoint() {
        let track = Track::generate(1);
        let mut p = LapProgress::new();
        // Across the infield from the car's checkpoint
        let far = track.waypoints()[40];
        let tracked = p.tracked_waypoint(&track, far).unwrap();
        assert!(tracked >= N - TRACKING_BACKTRACK || tracked <= CHECKPOINT_WINDOW);

        p.last_checkpoint = 30;
        let near = track.waypoints()[35];
        assert_eq!(p.tracked_waypoint(&track, near), Some(35));
        let behind = track.waypoints()[28];
        assert_eq!(p.tracked_waypoint(&track, behind), Some(28));
    }

    #[test]
    fn test_progress_value() {
        let p = LapProgress {
            laps: 1,
            last_checkpoint: 12,
            checkpoints_since_lap_start: 12,
        };
        assert_eq!(p.progress(N), 92);
    }

    #[test]
    fn test_rank_is_stable() {
        let ranked = rank(&[
            (CompetitorId::Player, 10),
            (CompetitorId::Opponent(0), 30),
            (CompetitorId::Opponent(1), 10),
            (CompetitorId::Opponent(2), 20),
        ]);
        assert_eq!(
            ranked,
            vec![
                CompetitorId::Opponent(0),
                CompetitorId::Opponent(2),
                CompetitorId::Player,
                CompetitorId::Opponent(1),
            ]
        );
    }

    #[test]
    fn test_detect_winner_prefers_player() {
        assert_eq!(detect_winner(1, &[1, 1], 2), None);
        assert_eq!(detect_winner(2, &[2, 0], 2), Some(CompetitorId::Player));
        assert_eq!(detect_winner(1, &[0, 2, 2], 2), Some(CompetitorId::Opponent(1)));
    }

    proptest! {
        #[test]
        fn prop_progress_monotonic(moves in prop::collection::vec(0usize..N, 1..400)) {
            let mut p = LapProgress::new();
            let mut last = p.progress(N);
            for nearest in moves {
                p.advance_to(nearest, N);
                prop_assert!(p.last_checkpoint < N);
                let now = p.progress(N);
                prop_assert!(now >= last);
                last = now;
            }
        }
    }
}
