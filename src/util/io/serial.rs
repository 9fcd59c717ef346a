// src/util/io/serial.rs
//! Gas sensor line format and the `Reading` value it produces.
//!
//! The sensor firmware prints lines such as `Gas Level = 150 -> GAS LEAKING`
//! interleaved with free-form diagnostic chatter. Only lines carrying the
//! marker token are readings; everything else is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::{log_debug, log_warn};

pub const DEFAULT_MARKER: &str = "Gas Level";
pub const DEFAULT_LEAK_MARKER: &str = "GAS LEAKING";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GasStatus {
    Normal,
    Leak,
    #[default]
    #[serde(other)]
    Unknown,
}

impl GasStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GasStatus::Normal => "NORMAL",
            GasStatus::Leak => "LEAK",
            GasStatus::Unknown => "Unknown",
        }
    }
}

/// One timestamped gas sample. Built once by the parser and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// Concentration in ppm.
    pub value: i64,
    #[serde(default)]
    pub status: GasStatus,
    pub timestamp: DateTime<Utc>,
}

impl Reading {
    /// Reading stamped with the current wall-clock time.
    pub fn new(value: i64, status: GasStatus) -> Self {
        Self::at(value, status, Utc::now())
    }

    pub fn at(value: i64, status: GasStatus, timestamp: DateTime<Utc>) -> Self {
        Self { value, status, timestamp }
    }

    pub fn exceeds(&self, threshold: i64) -> bool {
        self.value > threshold
    }
}

/// What became of one raw line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Reading(Reading),
    /// No marker token: device chatter, dropped silently.
    Ignored,
    /// Marker present but the value was unusable. Already logged.
    Rejected(ParseError),
}

impl ParseOutcome {
    pub fn into_reading(self) -> Option<Reading> {
        match self {
            ParseOutcome::Reading(reading) => Some(reading),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReadingParser {
    marker: String,
    leak_marker: String,
}

impl Default for ReadingParser {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER, DEFAULT_LEAK_MARKER)
    }
}

impl ReadingParser {
    pub fn new(marker: &str, leak_marker: &str) -> Self {
        Self {
            marker: marker.to_string(),
            leak_marker: leak_marker.to_string(),
        }
    }

    pub fn from_config(config: &ParserConfig) -> Self {
        Self::new(&config.marker, &config.leak_marker)
    }

    /// Parse one raw line from the sensor transport.
    pub fn parse_line(&self, line: &str) -> ParseOutcome {
        let trimmed = line.trim();

        if !trimmed.contains(&self.marker) {
            return ParseOutcome::Ignored;
        }

        match Self::extract_value(trimmed) {
            Ok(value) => {
                let status = if trimmed.contains(&self.leak_marker) {
                    GasStatus::Leak
                } else {
                    GasStatus::Normal
                };
                let reading = Reading::new(value, status);
                log_debug!("Parsed reading {} ppm ({})", reading.value, reading.status.as_str());
                ParseOutcome::Reading(reading)
            }
            Err(e) => {
                log_warn!("Invalid gas value received, skipping: {}", e);
                ParseOutcome::Rejected(e)
            }
        }
    }

    pub fn parse(&self, line: &str) -> Option<Reading> {
        self.parse_line(line).into_reading()
    }

    /// The value sits between the first `=` and the following `->`.
    fn extract_value(line: &str) -> Result<i64, ParseError> {
        let segment = line
            .split('=')
            .nth(1)
            .ok_or_else(|| ParseError::MissingDelimiter { line: line.to_string() })?;

        let field = segment.split("->").next().unwrap_or(segment).trim();

        field.parse::<i64>().map_err(|_| ParseError::InvalidValue {
            field: field.to_string(),
            line: line.to_string(),
        })
    }
}
