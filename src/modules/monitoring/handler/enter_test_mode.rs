use crate::{
    log_warn,
    modules::monitoring::{
        handler::{MonitoringHandler, TEST_MODE_LABEL},
        snapshot::ConnectionMode,
    },
    util::io::serial::{GasStatus, Reading},
};

impl MonitoringHandler {
    /// Run a drill: stop listening and feed `simulated` through the normal
    /// delivery path. Only a stop leaves this mode.
    pub fn enter_test_mode(&mut self, simulated: Reading) {
        self.pending_refresh = None;
        self.subscription = None;
        self.mode = ConnectionMode::Test;
        log_warn!("Test emergency: simulating {} ppm", simulated.value);

        self.status_label = TEST_MODE_LABEL.to_string();
        self.apply_reading(simulated, true);
    }

    pub fn simulated_reading(&self) -> Reading {
        let value = self.settings.test_reading_ppm;
        let status = if value > self.alerts.threshold() {
            GasStatus::Leak
        } else {
            GasStatus::Normal
        };
        Reading::new(value, status)
    }
}
