use std::sync::Arc;

use crate::util::io::bus::TelemetryChannel;
use crate::util::io::serial::Reading;
use crate::{log_error, log_info};

/// Hands parsed readings to the distribution channel.
///
/// One attempt per reading. A failed publish is logged and the reading is
/// dropped; the next reading supersedes it.
pub struct TelemetryPublisher {
    channel: Arc<dyn TelemetryChannel>,
    published: u64,
    dropped: u64,
}

impl TelemetryPublisher {
    pub fn new(channel: Arc<dyn TelemetryChannel>) -> Self {
        Self {
            channel,
            published: 0,
            dropped: 0,
        }
    }

    /// Returns whether the reading made it into the channel.
    pub fn publish(&mut self, reading: &Reading) -> bool {
        match self.channel.append(reading) {
            Ok(sequence) => {
                self.published += 1;
                log_info!(
                    "Uploaded reading #{}: {} ppm ({})",
                    sequence,
                    reading.value,
                    reading.status.as_str()
                );
                true
            }
            Err(e) => {
                self.dropped += 1;
                log_error!("Failed to publish reading of {} ppm: {}", reading.value, e);
                false
            }
        }
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl std::fmt::Debug for TelemetryPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryPublisher")
            .field("channel", &"<TelemetryChannel>")
            .field("published", &self.published)
            .field("dropped", &self.dropped)
            .finish()
    }
}
