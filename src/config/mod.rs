// src/config/mod.rs
// Runtime configuration loaded from gaswatch.yml

pub mod validator;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{GaswatchError, Result};
use crate::util::io::bus::DEFAULT_RETAIN;
use crate::util::io::serial::{DEFAULT_LEAK_MARKER, DEFAULT_MARKER};
use crate::{log_info, log_warn};

pub use validator::{ConfigValidator, ValidationError};

pub const DEFAULT_CONFIG_PATH: &str = "gaswatch.yml";
pub const DEFAULT_GAS_THRESHOLD: i64 = 100;

/// Where [`RuntimeConfig::load`] got its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    File,
    Defaults,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub sensor: SensorConfig,
    pub parser: ParserConfig,
    pub channel: ChannelConfig,
    pub monitor: MonitorConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorSource {
    Serial,
    Stdin,
    File,
    Simulate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    pub source: SensorSource,
    /// Serial device path, or `auto` to pick the first USB serial port.
    pub port: String,
    pub baud_rate: u32,
    /// Replay file for the `file` source.
    pub path: Option<PathBuf>,
    /// Emit interval for the `simulate` source.
    pub interval_ms: u64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            source: SensorSource::Serial,
            port: "auto".to_string(),
            baud_rate: 9600,
            path: None,
            interval_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub marker: String,
    pub leak_marker: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            leak_marker: DEFAULT_LEAK_MARKER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Memory,
    Journal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub kind: ChannelKind,
    pub journal_path: Option<PathBuf>,
    pub poll_interval_ms: u64,
    /// Entries the in-memory bus keeps for late subscribers.
    pub retain: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            kind: ChannelKind::Memory,
            journal_path: Some(PathBuf::from("./data/gas_readings.jsonl")),
            poll_interval_ms: 200,
            retain: DEFAULT_RETAIN,
        }
    }
}

impl ChannelConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub threshold_ppm: i64,
    pub subscribe_backlog: usize,
    pub refresh_delay_ms: u64,
    pub test_reading_ppm: i64,
    pub stop_action_id: String,
    pub alarm_sound: Option<PathBuf>,
    pub volume: f32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            threshold_ppm: DEFAULT_GAS_THRESHOLD,
            subscribe_backlog: 1,
            refresh_delay_ms: 500,
            test_reading_ppm: 150,
            stop_action_id: "STOP".to_string(),
            alarm_sound: None,
            volume: 1.0,
        }
    }
}

impl MonitorConfig {
    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub debug: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./logs"),
            debug: false,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a YAML document. Missing keys take defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: RuntimeConfig = if yaml.trim().is_empty() {
            RuntimeConfig::default()
        } else {
            serde_yaml::from_str(yaml)?
        };

        ConfigValidator::validate(&config)
            .map_err(|e| GaswatchError::ConfigError(e.to_string()))?;

        Ok(config)
    }

    /// Load from `path`; an absent file yields the defaults.
    ///
    /// Runs before the logger is configured, so it reports through the
    /// returned [`ConfigSource`] instead of logging.
    pub fn load(path: &Path) -> Result<(Self, ConfigSource)> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Ok((Self::from_yaml(&contents)?, ConfigSource::File)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Ok((RuntimeConfig::default(), ConfigSource::Defaults))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn log_source(path: &Path, source: ConfigSource) {
        match source {
            ConfigSource::File => log_info!("Loaded config from {}", path.display()),
            ConfigSource::Defaults => log_warn!("No config at {}, using defaults", path.display()),
        }
    }
}
