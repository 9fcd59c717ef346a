use std::sync::Arc;

use crate::{
    config::MonitorConfig,
    event::EventSender,
    modules::{
        alert::{collaborators::AlertCollaborators, AlertStateMachine},
        monitoring::{history::HistoryWindow, snapshot::ConnectionMode},
    },
    util::io::bus::TelemetryChannel,
};

use super::{MonitorSettings, MonitoringHandler, DISCONNECTED_LABEL};

impl MonitoringHandler {
    /// Starts disconnected; call [`MonitoringHandler::connect`] to go live.
    pub fn new(
        channel: Arc<dyn TelemetryChannel>,
        config: &MonitorConfig,
        collaborators: AlertCollaborators,
        events: EventSender,
    ) -> Self {
        let alerts = AlertStateMachine::new(
            config.threshold_ppm,
            &config.stop_action_id,
            collaborators,
            events.clone(),
        );

        Self {
            channel,
            settings: MonitorSettings {
                backlog: config.subscribe_backlog,
                refresh_delay: config.refresh_delay(),
                test_reading_ppm: config.test_reading_ppm,
            },
            mode: ConnectionMode::Disconnected,
            subscription: None,
            history: HistoryWindow::new(),
            last_reading: None,
            status_label: DISCONNECTED_LABEL.to_string(),
            last_sequence: None,
            replay_remaining: 0,
            refresh_epoch: 0,
            pending_refresh: None,
            alerts,
            observers: Vec::new(),
            events,
        }
    }
}
