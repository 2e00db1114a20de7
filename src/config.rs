//! # Curtain Configuration
//!
//! Configuration for the host and every managed cover, loaded from TOML.
//!
//! ## Example: TOML Configuration
//!
//! ```toml
//! [host]
//! update_interval_ms = 500
//!
//! [[covers]]
//! name = "Living room"
//! open_code = "send_open"
//! close_code = "send_close"
//! stop_code = "send_stop"
//! full_travel_duration = 30.0
//! polarity = "zero_open"
//! ```
//!
//! - `pause_code` is accepted in place of `stop_code`.
//! - `update_interval_ms` may be overridden per cover.

// src/config.rs - Single configuration file
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::cover::{Polarity, is_valid_position};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Main configuration struct: host settings plus the list of covers.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub host: HostConfig,
    #[serde(default)]
    pub covers: Vec<CoverConfig>,
}

/// Host-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HostConfig {
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            update_interval_ms: default_update_interval_ms(),
            event_capacity: default_event_capacity(),
        }
    }
}

/// Per-cover configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CoverConfig {
    pub name: String,
    pub open_code: String,
    pub close_code: String,
    #[serde(alias = "pause_code")]
    pub stop_code: String,
    /// Seconds to travel the whole 0-100 range.
    #[serde(default = "default_full_travel_duration")]
    pub full_travel_duration: f64,
    #[serde(default)]
    pub polarity: Polarity,
    #[serde(default)]
    pub initial_position: Option<f64>,
    #[serde(default)]
    pub bridge_device: Option<String>,
    #[serde(default = "default_dispatch_latency_ms")]
    pub dispatch_latency_ms: u64,
    #[serde(default)]
    pub update_interval_ms: Option<u64>,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            name: "Curtain".to_string(),
            open_code: "send_open".to_string(),
            close_code: "send_close".to_string(),
            stop_code: "send_stop".to_string(),
            full_travel_duration: default_full_travel_duration(),
            polarity: Polarity::default(),
            initial_position: None,
            bridge_device: None,
            dispatch_latency_ms: default_dispatch_latency_ms(),
            update_interval_ms: None,
        }
    }
}

impl CoverConfig {
    /// Validate codes, travel time and the starting position.
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Cover name must not be empty".to_string());
        }
        for (field, code) in [
            ("open_code", &self.open_code),
            ("close_code", &self.close_code),
            ("stop_code", &self.stop_code),
        ] {
            if code.trim().is_empty() {
                return Err(format!("Cover '{}': {} must not be empty", self.name, field));
            }
        }
        if !self.full_travel_duration.is_finite() || self.full_travel_duration <= 0.0 {
            return Err(format!(
                "Cover '{}': full_travel_duration must be > 0 (got {})",
                self.name, self.full_travel_duration
            ));
        }
        if Duration::try_from_secs_f64(self.full_travel_duration).is_err() {
            return Err(format!("Cover '{}': full_travel_duration is too large", self.name));
        }
        if let Some(position) = self.initial_position {
            if !is_valid_position(position) {
                return Err(format!(
                    "Cover '{}': initial_position must be between 0 and 100 (got {})",
                    self.name, position
                ));
            }
        }
        if self.update_interval_ms == Some(0) {
            return Err(format!("Cover '{}': update_interval_ms must be > 0", self.name));
        }
        Ok(())
    }

    /// Full-travel time. Call after `validate`.
    pub fn full_travel(&self) -> Duration {
        Duration::try_from_secs_f64(self.full_travel_duration).unwrap_or(Duration::ZERO)
    }

    /// Starting position, defaulting to the open end.
    pub fn start_position(&self) -> f64 {
        self.initial_position.unwrap_or_else(|| self.polarity.open_end())
    }

    pub fn dispatch_latency(&self) -> Duration {
        Duration::from_millis(self.dispatch_latency_ms)
    }

    /// Tick cadence for this cover, falling back to the host default.
    pub fn update_interval(&self, host: &HostConfig) -> Duration {
        Duration::from_millis(self.update_interval_ms.unwrap_or(host.update_interval_ms))
    }
}

impl Config {
    /// Validate host settings, each cover, and name uniqueness.
    pub fn validate(&self) -> Result<(), String> {
        if self.host.update_interval_ms == 0 {
            return Err("host.update_interval_ms must be > 0".to_string());
        }
        let mut names = HashSet::new();
        for cover in &self.covers {
            cover.validate()?;
            if !names.insert(cover.name.as_str()) {
                return Err(format!("Duplicate cover name '{}'", cover.name));
            }
        }
        Ok(())
    }
}

// Default value functions
fn default_update_interval_ms() -> u64 { 500 }
fn default_event_capacity() -> usize { 64 }
fn default_full_travel_duration() -> f64 { 30.0 }
fn default_dispatch_latency_ms() -> u64 { 500 }

/// Load and validate configuration from a TOML file at the given path.
pub fn load_config(path: &str) -> Result<Config, ConfigError> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            tracing::error!("Failed to read config file '{}': {}", path, e);
            return Err(ConfigError::Io(e));
        }
    };
    let config: Config = match toml::from_str(&contents) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to parse config TOML: {}", e);
            return Err(ConfigError::Toml(e));
        }
    };
    if let Err(e) = config.validate() {
        tracing::error!("Configuration rejected: {}", e);
        return Err(ConfigError::Invalid(e));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_values() {
        let cover = CoverConfig::default();
        assert_eq!(cover.full_travel_duration, 30.0);
        assert_eq!(cover.polarity, Polarity::ZeroOpen);
        assert_eq!(cover.stop_code, "send_stop");
        assert_eq!(cover.start_position(), 0.0);
        assert!(cover.validate().is_ok());
        let config = Config::default();
        assert_eq!(config.host.update_interval_ms, 500);
        assert!(config.covers.is_empty());
    }

    #[test]
    fn test_load_config_success() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("curtains.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(
            file,
            "[host]\nupdate_interval_ms = 250\n\n[[covers]]\nname = 'Study'\nopen_code = 'o'\nclose_code = 'c'\npause_code = 'p'\npolarity = 'zero_closed'"
        )
        .unwrap();
        file.flush().unwrap();
        let config = load_config(file_path.to_str().unwrap()).unwrap();
        assert_eq!(config.host.update_interval_ms, 250);
        let cover = &config.covers[0];
        assert_eq!(cover.stop_code, "p");
        assert_eq!(cover.polarity, Polarity::ZeroClosed);
        // Defaults for missing fields
        assert_eq!(cover.full_travel_duration, 30.0);
        assert_eq!(cover.start_position(), 100.0);
        assert_eq!(cover.update_interval(&config.host), Duration::from_millis(250));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config("nonexistent_file.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("bad.toml");
        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "not a valid toml").unwrap();
        file.flush().unwrap();
        let result = load_config(file_path.to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::Toml(_))));
    }

    #[test]
    fn test_load_config_rejects_duplicate_names() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("dup.toml");
        let mut file = File::create(&file_path).unwrap();
        let cover = "[[covers]]\nname = 'Hall'\nopen_code = 'o'\nclose_code = 'c'\nstop_code = 's'\n";
        write!(file, "{}{}", cover, cover).unwrap();
        file.flush().unwrap();
        let result = load_config(file_path.to_str().unwrap());
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_cover_validation() {
        let bad_travel = CoverConfig { full_travel_duration: 0.0, ..Default::default() };
        assert!(bad_travel.validate().is_err());
        let nan_travel = CoverConfig { full_travel_duration: f64::NAN, ..Default::default() };
        assert!(nan_travel.validate().is_err());
        let empty_code = CoverConfig { close_code: "  ".to_string(), ..Default::default() };
        assert!(empty_code.validate().unwrap_err().contains("close_code"));
        let bad_start = CoverConfig { initial_position: Some(120.0), ..Default::default() };
        assert!(bad_start.validate().is_err());
        let zero_tick = CoverConfig { update_interval_ms: Some(0), ..Default::default() };
        assert!(zero_tick.validate().is_err());
    }
}
