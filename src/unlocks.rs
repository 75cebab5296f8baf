//! Level unlock progress
//!
//! The highest unlocked level only ever goes up.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_LEVEL, MIN_LEVEL};

/// Which levels the player may pick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelUnlocks {
    highest_unlocked: u32,
}

impl Default for LevelUnlocks {
    fn default() -> Self {
        Self {
            highest_unlocked: MIN_LEVEL,
        }
    }
}

impl LevelUnlocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn highest_unlocked(&self) -> u32 {
        self.highest_unlocked
    }

    pub fn is_unlocked(&self, level: u32) -> bool {
        (MIN_LEVEL..=self.highest_unlocked).contains(&level)
    }

    /// Unlock up to `level`; returns true if anything new was unlocked
    pub fn unlock(&mut self, level: u32) -> bool {
        let level = level.min(MAX_LEVEL);
        if level > self.highest_unlocked {
            log::info!("Unlocked level {}", level);
            self.highest_unlocked = level;
            true
        } else {
            false
        }
    }

    /// Winning a level opens the next one
    pub fn record_win(&mut self, level: u32) -> bool {
        self.unlock(level.saturating_add(1))
    }

    /// Load from a file, or a fresh ratchet if it is missing or malformed
    pub fn load(path: &Path) -> Self {
        let loaded = std::fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str::<Self>(&json).ok());

        match loaded {
            Some(mut unlocks) => {
                unlocks.highest_unlocked = unlocks.highest_unlocked.clamp(MIN_LEVEL, MAX_LEVEL);
                log::info!("Loaded unlocks (highest level {})", unlocks.highest_unlocked);
                unlocks
            }
            None => {
                log::info!("No unlock data found, starting fresh");
                Self::new()
            }
        }
    }

    /// Persist, never lowering what is already stored
    pub fn save(&self, path: &Path) {
        let mut merged = *self;
        if let Some(stored) = std::fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str::<Self>(&json).ok())
        {
            merged.unlock(stored.highest_unlocked);
        }

        match serde_json::to_string(&merged) {
            Ok(json) => match std::fs::write(path, json) {
                Ok(()) => log::info!("Unlocks saved (highest level {})", merged.highest_unlocked),
                Err(e) => log::warn!("Could not save unlocks: {}", e),
            },
            Err(e) => log::warn!("Could not encode unlocks: {}", e),
        }
    }
}
