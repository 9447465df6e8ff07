// src/config.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::SaveLoadError;

pub const DEFAULT_STATS_FILENAME: &str = "chess_history.json";

/// Automatic draw rules applied after every move. Each can be switched off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrawRules {
    /// 100 half-moves without a pawn move or capture.
    pub fifty_move: bool,
    pub threefold_repetition: bool,
    pub insufficient_material: bool,
}

impl Default for DrawRules {
    fn default() -> Self {
        DrawRules { fifty_move: true, threefold_repetition: true, insufficient_material: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub stats_filename: String,
    /// `tracing-subscriber` filter directive, overridden by `RUST_LOG`.
    pub log_filter: String,
    pub room_id: String,
    pub white_player: String,
    pub black_player: String,
    pub draw_rules: DrawRules,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            stats_filename: DEFAULT_STATS_FILENAME.to_string(),
            log_filter: "info".to_string(),
            room_id: "local".to_string(),
            white_player: "white@local".to_string(),
            black_player: "black@local".to_string(),
            draw_rules: DrawRules::default(),
        }
    }
}

impl Config {
    pub fn from_json(json: &str) -> Result<Config, SaveLoadError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON config file; missing keys fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Config, SaveLoadError> {
        let json = fs::read_to_string(path)
            .map_err(|e| SaveLoadError::Io(path.display().to_string(), e))?;
        Config::from_json(&json)
    }

    /// `None` yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Config, SaveLoadError> {
        match path {
            Some(path) => Config::from_file(path),
            None => Ok(Config::default()),
        }
    }
}
