mod new;
mod connect;
mod disconnect;
mod refresh;
mod enter_test_mode;
mod deliver;
mod stop_alarm;
mod next_entry;
mod handle_event;
mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use crate::{
    event::EventSender,
    modules::{
        alert::AlertStateMachine,
        monitoring::{
            history::HistoryWindow,
            snapshot::{ConnectionMode, StateObserver},
        },
    },
    util::io::{
        bus::{Subscription, TelemetryChannel},
        serial::Reading,
    },
};

pub const DISCONNECTED_LABEL: &str = "Disconnected";
pub const TEST_MODE_LABEL: &str = "Test Mode - High";

#[derive(Debug, Clone)]
struct MonitorSettings {
    backlog: usize,
    refresh_delay: Duration,
    test_reading_ppm: i64,
}

/// Consumer side of the pipeline: owns the subscription, the history window
/// and the alert state machine, and moves between LIVE, DISCONNECTED and TEST.
pub struct MonitoringHandler {
    channel: Arc<dyn TelemetryChannel>,
    settings: MonitorSettings,
    mode: ConnectionMode,
    subscription: Option<Subscription>,
    history: HistoryWindow,
    last_reading: Option<Reading>,
    status_label: String,
    // Dedupe of backlog entries replayed by a resubscribe
    last_sequence: Option<u64>,
    replay_remaining: usize,
    refresh_epoch: u64,
    pending_refresh: Option<u64>,
    alerts: AlertStateMachine,
    observers: Vec<Box<dyn StateObserver + Send>>,
    events: EventSender,
}

impl std::fmt::Debug for MonitoringHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitoringHandler")
            .field("mode", &self.mode)
            .field("subscribed", &self.subscription.is_some())
            .field("history", &self.history)
            .field("last_reading", &self.last_reading)
            .field("status_label", &self.status_label)
            .field("alerts", &self.alerts)
            .finish_non_exhaustive()
    }
}

impl MonitoringHandler {
    pub fn mode(&self) -> ConnectionMode {
        self.mode
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    pub fn last_reading(&self) -> Option<&Reading> {
        self.last_reading.as_ref()
    }

    pub fn status_label(&self) -> &str {
        &self.status_label
    }

    pub fn alerts(&self) -> &AlertStateMachine {
        &self.alerts
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn is_refresh_pending(&self) -> bool {
        self.pending_refresh.is_some()
    }

    pub fn add_observer(&mut self, observer: Box<dyn StateObserver + Send>) {
        self.observers.push(observer);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::config::MonitorConfig;
    use crate::event::{AppEvent, EventHandler};
    use crate::modules::alert::collaborators::mock::Recorder;
    use crate::modules::alert::{AlertState, StopTrigger};
    use crate::modules::monitoring::snapshot::{MonitorEvent, MonitorSnapshot};
    use crate::util::io::bus::MessageBus;
    use crate::util::io::serial::GasStatus;

    #[derive(Clone, Default)]
    struct Snapshots(Arc<Mutex<Vec<MonitorSnapshot>>>);

    impl Snapshots {
        fn last(&self) -> MonitorSnapshot {
            self.0.lock().unwrap().last().cloned().unwrap()
        }
    }

    impl StateObserver for Snapshots {
        fn on_event(&mut self, event: &MonitorEvent) {
            let MonitorEvent::StateChanged(snapshot) = event;
            self.0.lock().unwrap().push(snapshot.clone());
        }
    }

    struct Fixture {
        bus: MessageBus,
        handler: MonitoringHandler,
        events: EventHandler,
        recorder: Recorder,
        snapshots: Snapshots,
    }

    fn fixture() -> Fixture {
        let bus = MessageBus::default();
        let events = EventHandler::new();
        let recorder = Recorder::default();
        let snapshots = Snapshots::default();
        let config = MonitorConfig {
            refresh_delay_ms: 20,
            ..MonitorConfig::default()
        };
        let mut handler = MonitoringHandler::new(
            Arc::new(bus.clone()),
            &config,
            recorder.collaborators(false),
            events.sender(),
        );
        handler.add_observer(Box::new(snapshots.clone()));
        Fixture { bus, handler, events, recorder, snapshots }
    }

    fn publish(bus: &MessageBus, value: i64) {
        bus.append(&Reading::new(value, if value > 100 { GasStatus::Leak } else { GasStatus::Normal }))
            .unwrap();
    }

    /// Deliver whatever the subscription has queued.
    fn pump(handler: &mut MonitoringHandler) {
        while let Some(feed) = handler.try_next_entry() {
            handler.handle_feed(Some(feed));
        }
    }

    #[tokio::test]
    async fn test_live_readings_fill_history_and_trigger_alarm() {
        let mut f = fixture();
        f.handler.connect();

        for value in [42, 60, 150] {
            publish(&f.bus, value);
        }
        pump(&mut f.handler);

        assert_eq!(f.handler.mode(), ConnectionMode::Live);
        assert_eq!(f.handler.history().snapshot(), vec![42, 60, 150]);
        assert_eq!(f.handler.alerts().state(), AlertState::Danger);

        let snapshot = f.snapshots.last();
        assert_eq!(snapshot.reading, Some(150));
        assert_eq!(snapshot.status, "LEAK");
        assert!(snapshot.is_danger);
    }

    #[tokio::test]
    async fn test_connect_delivers_latest_backlog_entry() {
        let mut f = fixture();
        publish(&f.bus, 10);
        publish(&f.bus, 20);

        f.handler.connect();
        pump(&mut f.handler);

        assert_eq!(f.handler.history().snapshot(), vec![20]);
    }

    #[tokio::test]
    async fn test_disconnect_clears_display_but_keeps_alarm() {
        let mut f = fixture();
        f.handler.connect();
        publish(&f.bus, 150);
        pump(&mut f.handler);

        f.handler.disconnect();

        assert_eq!(f.handler.mode(), ConnectionMode::Disconnected);
        assert!(!f.handler.is_subscribed());
        assert!(f.handler.history().is_empty());
        assert!(f.handler.last_reading().is_none());
        assert_eq!(f.handler.status_label(), DISCONNECTED_LABEL);
        assert_eq!(f.handler.alerts().state(), AlertState::Danger);

        // Readings published while disconnected are not seen
        publish(&f.bus, 30);
        pump(&mut f.handler);
        assert!(f.handler.history().is_empty());
        assert_eq!(f.snapshots.last().reading, None);
    }

    #[tokio::test]
    async fn test_refresh_reconnects_without_redelivery() {
        let mut f = fixture();
        f.handler.connect();
        publish(&f.bus, 40);
        pump(&mut f.handler);

        f.handler.refresh();
        assert_eq!(f.handler.mode(), ConnectionMode::Disconnected);
        assert_eq!(f.handler.history().snapshot(), vec![40]);

        let event = tokio::time::timeout(Duration::from_secs(2), f.events.next())
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(event, AppEvent::RefreshElapsed { .. }));
        assert!(f.handler.handle_event(event));
        assert_eq!(f.handler.mode(), ConnectionMode::Live);

        pump(&mut f.handler);
        publish(&f.bus, 41);
        pump(&mut f.handler);
        assert_eq!(f.handler.history().snapshot(), vec![40, 41]);
    }

    #[tokio::test]
    async fn test_disconnect_supersedes_pending_refresh() {
        let mut f = fixture();
        f.handler.connect();
        f.handler.refresh();
        assert!(f.handler.is_refresh_pending());

        f.handler.disconnect();
        let event = tokio::time::timeout(Duration::from_secs(2), f.events.next())
            .await
            .unwrap()
            .unwrap();
        f.handler.handle_event(event);

        assert!(!f.handler.is_refresh_pending());
        assert_eq!(f.handler.mode(), ConnectionMode::Disconnected);
        assert!(!f.handler.is_subscribed());
    }

    #[tokio::test]
    async fn test_refresh_is_ignored_in_test_mode() {
        let mut f = fixture();
        f.handler.enter_test_mode(f.handler.simulated_reading());

        f.handler.refresh();

        assert_eq!(f.handler.mode(), ConnectionMode::Test);
        assert!(!f.handler.is_refresh_pending());
    }

    #[tokio::test]
    async fn test_drill_runs_alarm_until_acknowledged() {
        let mut f = fixture();
        f.handler.connect();

        f.handler.handle_event(AppEvent::TestEmergency);

        assert_eq!(f.handler.mode(), ConnectionMode::Test);
        assert!(!f.handler.is_subscribed());
        assert_eq!(f.handler.history().snapshot(), vec![150]);
        assert_eq!(f.handler.status_label(), TEST_MODE_LABEL);
        assert!(f.handler.alerts().session().unwrap().drill);
        assert_eq!(f.recorder.calls.count("sound.start"), 1);

        // Test mode does not listen to the channel
        publish(&f.bus, 20);
        pump(&mut f.handler);
        assert_eq!(f.handler.history().snapshot(), vec![150]);

        f.recorder.take_ack().unwrap().acknowledge();
        let event = f.events.try_next().unwrap();
        f.handler.handle_event(event);

        assert_eq!(f.handler.alerts().state(), AlertState::Normal);
        assert_eq!(f.handler.mode(), ConnectionMode::Disconnected);
        assert_eq!(f.recorder.calls.count("sound.stop"), 1);
        assert_eq!(f.snapshots.last().alert, AlertState::Normal);
        assert_eq!(f.snapshots.last().mode, ConnectionMode::Disconnected);
    }

    #[tokio::test]
    async fn test_stop_action_from_notification() {
        let mut f = fixture();
        f.handler.connect();
        publish(&f.bus, 150);
        pump(&mut f.handler);
        let session = f.handler.alerts().session().unwrap().id;

        f.handler.handle_event(AppEvent::NotificationAction {
            action_id: "SNOOZE".to_string(),
            session: Some(session),
        });
        assert_eq!(f.handler.alerts().state(), AlertState::Danger);

        f.handler.handle_event(AppEvent::NotificationAction {
            action_id: "STOP".to_string(),
            session: Some(session),
        });
        assert_eq!(f.handler.alerts().state(), AlertState::Normal);
        // Still live after a stop outside test mode
        assert_eq!(f.handler.mode(), ConnectionMode::Live);
    }

    #[tokio::test]
    async fn test_stale_acknowledgment_is_ignored() {
        let mut f = fixture();
        f.handler.connect();
        publish(&f.bus, 150);
        pump(&mut f.handler);
        let stale = f.recorder.take_ack().unwrap();

        f.handler.stop_alarm(StopTrigger::Programmatic);
        publish(&f.bus, 170);
        pump(&mut f.handler);
        assert_eq!(f.handler.alerts().state(), AlertState::Danger);

        stale.acknowledge();
        let event = f.events.try_next().unwrap();
        f.handler.handle_event(event);

        assert_eq!(f.handler.alerts().state(), AlertState::Danger);
        assert_eq!(f.recorder.calls.count("sound.stop"), 1);
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_across_sources() {
        let mut f = fixture();
        f.handler.connect();
        publish(&f.bus, 150);
        pump(&mut f.handler);

        assert!(f.handler.stop_alarm(StopTrigger::UserAcknowledged));
        assert!(!f.handler.stop_alarm(StopTrigger::NotificationAction));
        assert!(!f.handler.stop_alarm(StopTrigger::Programmatic));

        assert_eq!(f.recorder.calls.count("sound.stop"), 1);
    }

    #[tokio::test]
    async fn test_lost_subscription_schedules_reconnect() {
        let mut f = fixture();
        f.handler.connect();

        f.handler.handle_feed(None);

        assert_eq!(f.handler.mode(), ConnectionMode::Disconnected);
        assert!(!f.handler.is_subscribed());
        assert!(f.handler.is_refresh_pending());

        let event = tokio::time::timeout(Duration::from_secs(2), f.events.next())
            .await
            .unwrap()
            .unwrap();
        f.handler.handle_event(event);
        assert_eq!(f.handler.mode(), ConnectionMode::Live);
    }

    #[tokio::test]
    async fn test_connect_to_closed_channel_stays_disconnected() {
        let mut f = fixture();
        f.bus.close();

        f.handler.connect();

        assert_eq!(f.handler.mode(), ConnectionMode::Disconnected);
        assert!(f.handler.is_refresh_pending());
    }

    #[tokio::test]
    async fn test_quit_stops_the_loop() {
        let mut f = fixture();
        assert!(f.handler.handle_event(AppEvent::Status));
        assert!(!f.handler.handle_event(AppEvent::Quit));
    }
}
