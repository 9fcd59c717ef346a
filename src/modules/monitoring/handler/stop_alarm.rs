use uuid::Uuid;

use crate::{
    log_debug, log_info,
    modules::{
        alert::StopTrigger,
        monitoring::{handler::MonitoringHandler, snapshot::ConnectionMode},
    },
};

impl MonitoringHandler {
    /// Single stop path for every trigger. Always leaves test mode.
    /// Returns whether an alarm was actually running.
    pub fn stop_alarm(&mut self, trigger: StopTrigger) -> bool {
        let stopped = self.alerts.stop(trigger);

        if self.mode == ConnectionMode::Test {
            self.mode = ConnectionMode::Disconnected;
            log_info!("Drill finished");
        }

        self.notify();
        stopped
    }

    /// Blocking alert acknowledged. Ignored unless `session` is the active one.
    pub fn acknowledge(&mut self, session: Uuid) -> bool {
        let Some(active) = self.alerts.session() else {
            log_debug!("Acknowledgment for {} with no active alarm", session);
            return false;
        };
        if active.id != session {
            log_debug!("Ignoring stale acknowledgment for {}", session);
            return false;
        }

        let trigger = if active.drill {
            StopTrigger::DrillCompleted
        } else {
            StopTrigger::UserAcknowledged
        };
        self.stop_alarm(trigger)
    }

    pub fn handle_notification_action(&mut self, action_id: &str, session: Option<Uuid>) -> bool {
        if !self.alerts.is_stop_action(action_id) {
            log_debug!("Ignoring notification action {}", action_id);
            return false;
        }

        let current = self.alerts.session().map(|s| s.id);
        if session.is_some() && session != current {
            log_debug!("Ignoring stop action for stale session {:?}", session);
            return false;
        }

        self.stop_alarm(StopTrigger::NotificationAction)
    }
}
