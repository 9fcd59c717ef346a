use crate::modules::monitoring::{
    handler::MonitoringHandler,
    snapshot::{ConnectionMode, MonitorEvent, MonitorSnapshot},
};

impl MonitoringHandler {
    pub fn snapshot(&self) -> MonitorSnapshot {
        let reading = self.last_reading.as_ref();
        let above_threshold = reading.is_some_and(|r| r.exceeds(self.alerts.threshold()));

        MonitorSnapshot {
            mode: self.mode,
            reading: reading.map(|r| r.value),
            status: self.status_label.clone(),
            timestamp: reading.map(|r| r.timestamp),
            history: self.history.snapshot(),
            alert: self.alerts.state(),
            session: self.alerts.session().map(|s| s.id),
            is_danger: above_threshold || self.alerts.is_active() || self.mode == ConnectionMode::Test,
        }
    }

    /// Push the current state to every observer.
    pub(super) fn notify(&mut self) {
        if self.observers.is_empty() {
            return;
        }
        let event = MonitorEvent::StateChanged(self.snapshot());
        for observer in self.observers.iter_mut() {
            observer.on_event(&event);
        }
    }
}
