use crate::{
    log_error, log_info,
    modules::monitoring::{handler::MonitoringHandler, snapshot::ConnectionMode},
};

impl MonitoringHandler {
    /// Go LIVE and (re)subscribe from the latest backlog entries. History is kept.
    pub fn connect(&mut self) {
        self.pending_refresh = None;
        // Release the old subscription before asking for a new one
        self.subscription = None;

        match self.channel.subscribe_from_latest(self.settings.backlog) {
            Ok(subscription) => {
                self.replay_remaining = subscription.backlog();
                self.subscription = Some(subscription);
                self.mode = ConnectionMode::Live;
                log_info!("Connected to telemetry channel");
            }
            Err(e) => {
                log_error!("Failed to subscribe to telemetry channel: {}", e);
                self.mode = ConnectionMode::Disconnected;
                self.schedule_reconnect();
            }
        }

        self.notify();
    }
}
