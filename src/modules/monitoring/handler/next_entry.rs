use crate::{
    error::SubscriptionError,
    log_error, log_warn,
    modules::monitoring::{handler::MonitoringHandler, snapshot::ConnectionMode},
    util::io::bus::LogEntry,
};

impl MonitoringHandler {
    /// Wait for the next channel entry. Never resolves while unsubscribed.
    pub async fn next_entry(&mut self) -> Option<Result<LogEntry, SubscriptionError>> {
        match self.subscription.as_mut() {
            Some(subscription) => subscription.next_entry().await,
            None => std::future::pending().await,
        }
    }

    pub fn try_next_entry(&mut self) -> Option<Result<LogEntry, SubscriptionError>> {
        self.subscription.as_mut()?.try_next_entry()
    }

    /// Handle what [`MonitoringHandler::next_entry`] produced. A failed or
    /// ended subscription is recovered the same way a refresh is.
    pub fn handle_feed(&mut self, feed: Option<Result<LogEntry, SubscriptionError>>) {
        match feed {
            Some(Ok(entry)) => self.deliver_entry(entry),
            Some(Err(e)) => {
                log_error!("Telemetry subscription failed: {}", e);
                self.recover_subscription();
            }
            None => {
                log_warn!("Telemetry subscription ended");
                self.recover_subscription();
            }
        }
    }

    fn recover_subscription(&mut self) {
        if self.mode != ConnectionMode::Live {
            return;
        }
        self.subscription = None;
        self.mode = ConnectionMode::Disconnected;
        self.schedule_reconnect();
        self.notify();
    }
}
