//! Race setup and difficulty presets
//!
//! Loaded from a JSON file next to the binary; anything missing or malformed
//! falls back to defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::LAP_TARGET;

/// Difficulty presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Difficulty {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "normal" | "medium" => Some(Difficulty::Normal),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Multiplier on opponent top speed
    pub fn opponent_speed_factor(&self) -> f32 {
        match self {
            Difficulty::Easy => 0.85,
            Difficulty::Normal => 1.0,
            Difficulty::Hard => 1.12,
        }
    }
}

/// Race configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Laps to win
    pub lap_target: u32,
    /// Number of AI cars
    pub opponent_count: usize,
    pub difficulty: Difficulty,
    /// Start the player in autopilot
    pub autopilot: bool,
    /// Opponent top speed gain per level above 1 (fraction)
    pub opponent_speed_per_level: f32,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            lap_target: LAP_TARGET,
            opponent_count: 3,
            difficulty: Difficulty::Normal,
            autopilot: false,
            opponent_speed_per_level: 0.02,
        }
    }
}

impl RaceConfig {
    /// Create a config from a difficulty preset
    pub fn from_preset(difficulty: Difficulty) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    /// Parse from JSON, sanitizing values that would make a race impossible
    pub fn from_json(json: &str) -> Option<Self> {
        match serde_json::from_str::<Self>(json) {
            Ok(config) => Some(config.sanitized()),
            Err(e) => {
                log::warn!("Invalid race config: {}", e);
                None
            }
        }
    }

    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string_pretty(self).ok()
    }

    fn sanitized(mut self) -> Self {
        if self.lap_target == 0 {
            log::warn!("lap_target 0 is not raceable, using {}", LAP_TARGET);
            self.lap_target = LAP_TARGET;
        }
        if !self.opponent_speed_per_level.is_finite() || self.opponent_speed_per_level < 0.0 {
            self.opponent_speed_per_level = 0.0;
        }
        self
    }

    /// Load from a file, or defaults if it is missing or malformed
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(json) => {
                if let Some(config) = Self::from_json(&json) {
                    log::info!("Loaded race config from {}", path.display());
                    return config;
                }
            }
            Err(e) => log::warn!("Could not read {}: {}", path.display(), e),
        }

        log::info!("Using default race config");
        Self::default()
    }

    /// Write to a file; failures are logged, not fatal
    pub fn save(&self, path: &Path) {
        let Some(json) = self.to_json() else {
            return;
        };
        match std::fs::write(path, json) {
            Ok(()) => log::info!("Race config saved to {}", path.display()),
            Err(e) => log::warn!("Could not save race config: {}", e),
        }
    }
}
