//! Deterministic race simulation
//!
//! All race logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (player first, then opponents by index)
//! - No rendering or platform dependencies

pub mod collision;
pub mod obstacle;
pub mod opponent;
pub mod player;
pub mod progress;
pub mod racer;
pub mod state;
pub mod steering;
pub mod tick;
pub mod track;
pub mod vehicle;

pub use collision::{ContactResult, bounce, circle_contact, push_out, reflect_velocity};
pub use obstacle::{Obstacle, ObstacleKind, ObstacleSet, obstacle_counts_for_level};
pub use opponent::OpponentController;
pub use player::{DriveMode, Nitro, PlayerController, PlayerInput, SurfaceEffect};
pub use progress::{CompetitorId, LapProgress, detect_winner, lap_threshold, rank};
pub use racer::{Racer, StepContext};
pub use state::{CompetitorStatus, RacePhase, RaceSnapshot, RaceState, RngState};
pub use steering::{arrive, flee_from, seek, separate};
pub use tick::{TickInput, tick};
pub use track::{ControlPoint, Track, TrackState, control_points_for_level, track_width_for_level};
pub use vehicle::{Kinematics, Vehicle};
