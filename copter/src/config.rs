use std::fs;
use std::path::Path;

use motor::Rotation;
use serde::Deserialize;
use thiserror::Error;

const DEFAULT_INTERVAL_MS: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid throttle bounds: min {min} must be below max {max}")]
    ThrottleBounds { min: u16, max: u16 },
}

/// The complete configuration record, loaded once at startup and passed by
/// reference from there on. Loading is all-or-nothing: a missing key or an
/// unparsable value fails the whole load and nothing is applied.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub motors: MotorsConfig,
    pub signals: SignalsConfig,
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MotorsConfig {
    pub front_left: MotorConfig,
    pub front_right: MotorConfig,
    pub rear_left: MotorConfig,
    pub rear_right: MotorConfig,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct MotorConfig {
    /// BCM pin number of the ESC signal line.
    pub pin: u8,
    pub rotation: Rotation,
}

/// Arming and disarming pulse values shared by all four ESCs.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SignalsConfig {
    pub start: u16,
    pub stop: u16,
}

/// Pulse bounds of the usable throttle range (1% and 100%).
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ThrottleConfig {
    pub min: u16,
    pub max: u16,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SamplingConfig {
    /// Poll cadence of the orientation sampling loop.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        SamplingConfig {
            interval_ms: DEFAULT_INTERVAL_MS,
        }
    }
}

fn default_interval_ms() -> u64 {
    DEFAULT_INTERVAL_MS
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&raw)
    }

    fn parse(raw: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(raw)?;
        if config.throttle.max <= config.throttle.min {
            return Err(ConfigError::ThrottleBounds {
                min: config.throttle.min,
                max: config.throttle.max,
            });
        }
        Ok(config)
    }
}
