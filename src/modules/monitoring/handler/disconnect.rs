use crate::{
    log_info,
    modules::monitoring::{
        handler::{MonitoringHandler, DISCONNECTED_LABEL},
        snapshot::ConnectionMode,
    },
};

impl MonitoringHandler {
    /// Unsubscribe and clear everything shown to the user. An active alarm
    /// keeps running.
    pub fn disconnect(&mut self) {
        self.pending_refresh = None;
        self.subscription = None;
        self.mode = ConnectionMode::Disconnected;

        self.last_reading = None;
        self.status_label = DISCONNECTED_LABEL.to_string();
        self.history.clear();
        self.last_sequence = None;
        self.replay_remaining = 0;

        log_info!("Disconnected from telemetry channel");
        self.notify();
    }
}
