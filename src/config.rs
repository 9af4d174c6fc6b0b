//! Engine configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("team link pattern must contain {{team}}: {0}")]
    LinkPattern(String),
}

/// Thresholds and presentation settings. Every field has a default, so a
/// RON file only needs the values it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub seed: u64,
    /// Season matches a team must have played before rank-sensitive
    /// sections are written.
    pub match_count_threshold: u32,
    pub win_streak_threshold: u32,
    pub lose_streak_threshold: u32,
    /// A last goal after this minute counts as late.
    pub late_goal_minute: u32,
    /// Points gap above which a draw or an underdog win is a surprise.
    pub surprise_points_gap: i32,
    /// Link to a team page; `{competition}` and `{team}` are replaced by slugs.
    pub team_link: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: 0,
            match_count_threshold: 7,
            win_streak_threshold: 4,
            lose_streak_threshold: 3,
            late_goal_minute: 80,
            surprise_points_gap: 10,
            team_link: "/{competition}/{team}/".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn load_from_ron(path: &Path) -> Result<EngineConfig, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    pub fn parse_ron(input: &str) -> Result<EngineConfig, ConfigError> {
        let config: EngineConfig = ron::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.team_link.contains("{team}") {
            return Err(ConfigError::LinkPattern(self.team_link.clone()));
        }
        Ok(())
    }
}
