use tokio::runtime::Handle;

use crate::{
    event::AppEvent,
    log_debug, log_info, log_warn,
    modules::monitoring::{handler::MonitoringHandler, snapshot::ConnectionMode},
};

impl MonitoringHandler {
    /// Drop the subscription and reconnect after the refresh delay.
    pub fn refresh(&mut self) {
        if self.mode == ConnectionMode::Test {
            log_info!("Refresh ignored while a drill is running");
            return;
        }

        self.subscription = None;
        self.mode = ConnectionMode::Disconnected;
        log_info!("Refreshing telemetry connection");

        self.schedule_reconnect();
        self.notify();
    }

    /// Arm a timer that queues [`AppEvent::RefreshElapsed`] for a fresh epoch.
    /// Any earlier pending reconnect is superseded.
    pub(super) fn schedule_reconnect(&mut self) {
        self.refresh_epoch += 1;
        let epoch = self.refresh_epoch;
        self.pending_refresh = Some(epoch);

        let Ok(runtime) = Handle::try_current() else {
            log_warn!("No async runtime, reconnect {} will not fire", epoch);
            return;
        };

        let delay = self.settings.refresh_delay;
        let events = self.events.clone();
        runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(AppEvent::RefreshElapsed { epoch });
        });
    }

    pub(super) fn resume_after_refresh(&mut self, epoch: u64) {
        if self.pending_refresh != Some(epoch) {
            log_debug!("Ignoring superseded reconnect {}", epoch);
            return;
        }
        self.connect();
    }
}
