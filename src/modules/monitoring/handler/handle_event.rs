use crate::{
    event::AppEvent,
    log_info,
    modules::{alert::StopTrigger, monitoring::handler::MonitoringHandler},
};

impl MonitoringHandler {
    /// Apply one app event. Returns `false` once the loop should exit.
    pub fn handle_event(&mut self, event: AppEvent) -> bool {
        match event {
            AppEvent::Connect => self.connect(),
            AppEvent::Disconnect => self.disconnect(),
            AppEvent::Refresh => self.refresh(),
            AppEvent::RefreshElapsed { epoch } => self.resume_after_refresh(epoch),
            AppEvent::TestEmergency => {
                let simulated = self.simulated_reading();
                self.enter_test_mode(simulated);
            }
            AppEvent::Acknowledge { session, .. } => {
                self.acknowledge(session);
            }
            AppEvent::NotificationAction { action_id, session } => {
                self.handle_notification_action(&action_id, session);
            }
            AppEvent::StopAlarm => {
                self.stop_alarm(StopTrigger::Programmatic);
            }
            AppEvent::Status => self.notify(),
            AppEvent::Quit => {
                log_info!("Monitor shutting down");
                self.subscription = None;
                return false;
            }
        }
        true
    }
}
