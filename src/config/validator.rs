// src/config/validator.rs
// Validates runtime config values before anything starts

use crate::config::{ChannelKind, RuntimeConfig, SensorSource};

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub error: String,
}

impl ValidationError {
    fn new(field: &str, error: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            error: error.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.error)
    }
}

impl std::error::Error for ValidationError {}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(config: &RuntimeConfig) -> Result<(), ValidationError> {
        Self::validate_sensor(config)?;
        Self::validate_parser(config)?;
        Self::validate_channel(config)?;
        Self::validate_monitor(config)?;
        Ok(())
    }

    fn validate_sensor(config: &RuntimeConfig) -> Result<(), ValidationError> {
        let sensor = &config.sensor;

        match sensor.source {
            SensorSource::Serial => {
                if sensor.port.trim().is_empty() {
                    return Err(ValidationError::new("sensor.port", "Cannot be empty (use \"auto\")"));
                }
                if sensor.baud_rate == 0 {
                    return Err(ValidationError::new("sensor.baud_rate", "Must be greater than 0"));
                }
            }
            SensorSource::File => {
                if sensor.path.is_none() {
                    return Err(ValidationError::new("sensor.path", "Required for the file source"));
                }
            }
            SensorSource::Simulate => {
                if sensor.interval_ms == 0 {
                    return Err(ValidationError::new("sensor.interval_ms", "Must be greater than 0"));
                }
            }
            SensorSource::Stdin => {}
        }

        Ok(())
    }

    fn validate_parser(config: &RuntimeConfig) -> Result<(), ValidationError> {
        if config.parser.marker.is_empty() {
            return Err(ValidationError::new("parser.marker", "Cannot be empty"));
        }
        if config.parser.leak_marker.is_empty() {
            return Err(ValidationError::new("parser.leak_marker", "Cannot be empty"));
        }
        Ok(())
    }

    fn validate_channel(config: &RuntimeConfig) -> Result<(), ValidationError> {
        let channel = &config.channel;

        if channel.kind == ChannelKind::Journal && channel.journal_path.is_none() {
            return Err(ValidationError::new("channel.journal_path", "Required for the journal channel"));
        }
        if channel.poll_interval_ms == 0 {
            return Err(ValidationError::new("channel.poll_interval_ms", "Must be greater than 0"));
        }
        if channel.retain == 0 {
            return Err(ValidationError::new("channel.retain", "Must be greater than 0"));
        }
        Ok(())
    }

    fn validate_monitor(config: &RuntimeConfig) -> Result<(), ValidationError> {
        let monitor = &config.monitor;

        if monitor.threshold_ppm <= 0 {
            return Err(ValidationError::new("monitor.threshold_ppm", "Must be greater than 0"));
        }
        // The drill has to raise a real alarm
        if monitor.test_reading_ppm <= monitor.threshold_ppm {
            return Err(ValidationError::new(
                "monitor.test_reading_ppm",
                format!(
                    "Must be above threshold_ppm ({}), got {}",
                    monitor.threshold_ppm, monitor.test_reading_ppm
                ),
            ));
        }
        if monitor.subscribe_backlog == 0 {
            return Err(ValidationError::new("monitor.subscribe_backlog", "Must be at least 1"));
        }
        if monitor.stop_action_id.trim().is_empty() {
            return Err(ValidationError::new("monitor.stop_action_id", "Cannot be empty"));
        }
        if !(0.0..=1.0).contains(&monitor.volume) {
            return Err(ValidationError::new(
                "monitor.volume",
                format!("Must be within 0.0..=1.0, got {}", monitor.volume),
            ));
        }
        Ok(())
    }
}
