//! Fixed-step race tick
//!
//! Every car plans its forces from the same frozen snapshot before any car
//! moves, then cars integrate in list order (player first).

use serde::{Deserialize, Serialize};

use super::player::PlayerInput;
use super::progress::{CompetitorId, detect_winner};
use super::racer::{Racer, StepContext};
use super::state::{RacePhase, RaceState};
use super::vehicle::Kinematics;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickInput {
    /// Held keys for the player's car
    pub player: PlayerInput,
    /// Switch between manual driving and autopilot
    pub toggle_autopilot: bool,
}

/// Advance the race by one step
pub fn tick(state: &mut RaceState, input: &TickInput) {
    if input.toggle_autopilot {
        state.player.toggle_autopilot();
    }

    // Nothing moves once someone has won
    if state.is_finished() {
        return;
    }

    state.time_ticks += 1;

    let player_snapshot = Kinematics::from(&state.player.vehicle);
    let opponent_snapshots: Vec<Kinematics> = state
        .opponents
        .iter()
        .map(|o| Kinematics::from(&o.vehicle))
        .collect();
    let ctx = StepContext {
        track: &state.track,
        obstacles: &state.obstacles,
        player: player_snapshot,
        opponents: &opponent_snapshots,
    };

    // Plan
    state.player.steer(Some(&input.player), &ctx);
    for opponent in &mut state.opponents {
        opponent.steer(None, &ctx);
    }

    // Move
    state.player.advance(&ctx);
    for opponent in &mut state.opponents {
        opponent.advance(&ctx);
    }

    let opponent_laps: Vec<u32> = state.opponents.iter().map(|o| o.laps_completed()).collect();
    if let Some(winner) = detect_winner(
        state.player.laps_completed(),
        &opponent_laps,
        state.config.lap_target,
    ) {
        state.phase = RacePhase::Finished { winner };
        match winner {
            CompetitorId::Player => log::info!("Race won by the player at tick {}", state.time_ticks),
            CompetitorId::Opponent(i) => {
                log::info!("Race won by opponent {} at tick {}", i, state.time_ticks)
            }
        }
    }
}
