use crate::{
    log_debug, log_info,
    modules::monitoring::handler::MonitoringHandler,
    util::io::{bus::LogEntry, serial::Reading},
};

impl MonitoringHandler {
    /// Deliver one channel entry, skipping backlog entries this connection
    /// has already seen.
    pub(super) fn deliver_entry(&mut self, entry: LogEntry) {
        if self.replay_remaining > 0 {
            self.replay_remaining -= 1;
            if self.last_sequence.is_some_and(|last| entry.sequence <= last) {
                log_debug!("Skipping already delivered sequence {}", entry.sequence);
                return;
            }
        }

        self.last_sequence = Some(entry.sequence);
        log_info!(
            "Reading #{}: {} ppm ({})",
            entry.sequence,
            entry.reading.value,
            entry.reading.status.as_str()
        );
        self.status_label = entry.reading.status.as_str().to_string();
        self.apply_reading(entry.reading, false);
    }

    /// Record a reading and run it through the alert state machine.
    pub(super) fn apply_reading(&mut self, reading: Reading, drill: bool) {
        self.history.append(reading.value);
        self.alerts.evaluate(&reading, drill);
        self.last_reading = Some(reading);
        self.notify();
    }
}
