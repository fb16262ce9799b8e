//! Optional TOML configuration.
//!
//! Configuration is deliberately small: where the database lives and when the
//! absent sweep may run. A missing config file is not an error; every field
//! has a default so a bare `rollcall init` works in an empty directory.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::error::RollcallError;
use crate::core::schemas;

pub const DEFAULT_CONFIG_NAME: &str = "rollcall.toml";

/// Hour of day (local, 24h) after which unmarked employees may be swept Absent.
pub const DEFAULT_CUTOFF_HOUR: u32 = 19;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub attendance: AttendanceConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceConfig {
    #[serde(default = "default_cutoff_hour")]
    pub cutoff_hour: u32,
}

fn default_db_path() -> PathBuf {
    PathBuf::from(schemas::DEFAULT_DB_NAME)
}

fn default_cutoff_hour() -> u32 {
    DEFAULT_CUTOFF_HOUR
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            path: default_db_path(),
        }
    }
}

impl Default for AttendanceConfig {
    fn default() -> Self {
        AttendanceConfig {
            cutoff_hour: DEFAULT_CUTOFF_HOUR,
        }
    }
}

impl Config {
    /// Loads configuration. An explicit path must exist and parse; without
    /// one, `rollcall.toml` in the working directory is used if present,
    /// otherwise defaults apply.
    pub fn load(explicit: Option<&Path>) -> Result<Config, RollcallError> {
        let path = match explicit {
            Some(p) => {
                if !p.exists() {
                    return Err(RollcallError::Config(format!(
                        "config file not found: {}",
                        p.display()
                    )));
                }
                p.to_path_buf()
            }
            None => {
                let default = PathBuf::from(DEFAULT_CONFIG_NAME);
                if !default.exists() {
                    return Ok(Config::default());
                }
                default
            }
        };

        let content = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| RollcallError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), RollcallError> {
        if self.attendance.cutoff_hour > 23 {
            return Err(RollcallError::Config(format!(
                "attendance.cutoff_hour must be 0-23, got {}",
                self.attendance.cutoff_hour
            )));
        }
        Ok(())
    }
}
