//! TOML-based engine configuration.
//!
//! Tunable amounts for the engagement engine:
//! - Base points per daily claim
//! - Streak bonus step
//! - Claim interval in hours
//!
//! Configuration is stored at `~/.config/kudos/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;
use crate::store::data_dir;

fn default_base_points() -> i64 {
    50
}
fn default_streak_bonus_step() -> i64 {
    5
}
fn default_claim_interval_hours() -> i64 {
    24
}

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Points awarded by every daily claim before the streak bonus
    #[serde(default = "default_base_points")]
    pub base_points: i64,

    /// Extra points per day of streak held before the claim
    #[serde(default = "default_streak_bonus_step")]
    pub streak_bonus_step: i64,

    /// Hours that must elapse between claims
    #[serde(default = "default_claim_interval_hours")]
    pub claim_interval_hours: i64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_points: default_base_points(),
            streak_bonus_step: default_streak_bonus_step(),
            claim_interval_hours: default_claim_interval_hours(),
        }
    }
}

impl EngineConfig {
    /// Path to the config file under the data directory.
    ///
    /// # Errors
    /// Returns an error if the data directory cannot be prepared.
    pub fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config/kudos"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk, writing defaults on first use.
    ///
    /// # Errors
    /// Returns an error if an existing file cannot be parsed or if the
    /// default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                path,
                message: e.to_string(),
            }),
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })
    }

    /// Validate that the configured amounts make sense.
    ///
    /// # Errors
    /// Returns an error naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_points <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "base_points".to_string(),
                message: format!("must be positive, got {}", self.base_points),
            });
        }
        if self.streak_bonus_step < 0 {
            return Err(ConfigError::InvalidValue {
                key: "streak_bonus_step".to_string(),
                message: format!("must not be negative, got {}", self.streak_bonus_step),
            });
        }
        if self.claim_interval_hours <= 0 {
            return Err(ConfigError::InvalidValue {
                key: "claim_interval_hours".to_string(),
                message: format!("must be positive, got {}", self.claim_interval_hours),
            });
        }
        Ok(())
    }
}
