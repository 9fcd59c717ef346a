//! Danger alert state machine.
//!
//! `Normal` → `Danger` when a delivered reading exceeds the threshold and no
//! session is active. `Danger` → `Normal` only through [`AlertStateMachine::stop`],
//! whichever source asked for it.

pub mod collaborators;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::event::EventSender;
use crate::util::io::serial::Reading;
use crate::{log_debug, log_error, log_info, log_warn};

use collaborators::{AlertAck, AlertCollaborators, Notification, NotificationAction};

pub const ALERT_TITLE: &str = "Gas Leak Detected!";
pub const DRILL_TITLE: &str = "Gas Leak Drill";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertState {
    Normal,
    Danger,
}

/// Why an alarm was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopTrigger {
    UserAcknowledged,
    NotificationAction,
    DrillCompleted,
    Programmatic,
}

/// The single active alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSession {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub trigger_value: i64,
    pub drill: bool,
}

#[derive(Debug)]
pub struct AlertStateMachine {
    threshold: i64,
    stop_action_id: String,
    session: Option<AlertSession>,
    collaborators: AlertCollaborators,
    events: EventSender,
}

impl AlertStateMachine {
    pub fn new(
        threshold: i64,
        stop_action_id: &str,
        collaborators: AlertCollaborators,
        events: EventSender,
    ) -> Self {
        Self {
            threshold,
            stop_action_id: stop_action_id.to_string(),
            session: None,
            collaborators,
            events,
        }
    }

    pub fn state(&self) -> AlertState {
        if self.session.is_some() {
            AlertState::Danger
        } else {
            AlertState::Normal
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&AlertSession> {
        self.session.as_ref()
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn is_stop_action(&self, action_id: &str) -> bool {
        action_id == self.stop_action_id
    }

    /// Feed one delivered reading. Returns the id of a newly started session.
    ///
    /// Readings below the threshold never clear an active alarm.
    pub fn evaluate(&mut self, reading: &Reading, drill: bool) -> Option<Uuid> {
        if !reading.exceeds(self.threshold) {
            return None;
        }
        if let Some(active) = &self.session {
            log_debug!(
                "Danger reading {} ppm while session {} is active, not re-triggering",
                reading.value,
                active.id
            );
            return None;
        }

        let session = AlertSession {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            trigger_value: reading.value,
            drill,
        };
        let id = session.id;
        self.session = Some(session);
        log_warn!(
            "Danger: {} ppm exceeds {} ppm, alarm session {} started{}",
            reading.value,
            self.threshold,
            id,
            if drill { " (drill)" } else { "" }
        );

        self.fire_side_effects(id, drill);
        Some(id)
    }

    /// Side effects run after the session is recorded. Failures are logged and
    /// never undo the transition.
    fn fire_side_effects(&mut self, session: Uuid, drill: bool) {
        let title = if drill { DRILL_TITLE } else { ALERT_TITLE };
        let body = format!("Dangerous gas level above {}ppm!", self.threshold);

        if let Err(e) = self.collaborators.sound.start() {
            log_error!("Alert error: {}", e);
        }

        self.collaborators.haptics.vibrate();

        let notification = Notification {
            title: title.to_string(),
            body: "Tap to stop the alarm.".to_string(),
            session,
            actions: vec![NotificationAction {
                id: self.stop_action_id.clone(),
                label: "Stop".to_string(),
            }],
        };
        if let Err(e) = self.collaborators.notifier.post(&notification) {
            log_error!("Alert error: {}", e);
        }

        let ack = AlertAck::new(session, drill, self.events.clone());
        self.collaborators.alert.show(title, &body, ack);
    }

    /// Silence the alarm. Always succeeds; a no-op when nothing is active.
    /// Returns whether a session was deactivated.
    pub fn stop(&mut self, trigger: StopTrigger) -> bool {
        let Some(session) = self.session.take() else {
            log_debug!("Stop requested ({:?}) with no active alarm", trigger);
            return false;
        };

        if let Err(e) = self.collaborators.sound.stop() {
            log_error!("Failed to stop alert: {}", e);
        }
        self.collaborators.haptics.cancel();

        log_info!("Alarm session {} stopped ({:?})", session.id, trigger);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::collaborators::mock::Recorder;
    use super::*;
    use crate::event::{AppEvent, EventHandler};
    use crate::util::io::serial::GasStatus;

    fn machine(recorder: &Recorder, fail_start: bool) -> (AlertStateMachine, EventHandler) {
        let events = EventHandler::new();
        let machine = AlertStateMachine::new(100, "STOP", recorder.collaborators(fail_start), events.sender());
        (machine, events)
    }

    #[test]
    fn test_danger_reading_starts_session() {
        let recorder = Recorder::default();
        let (mut machine, _events) = machine(&recorder, false);

        let started = machine.evaluate(&Reading::new(150, GasStatus::Leak), false);

        assert!(started.is_some());
        assert_eq!(machine.state(), AlertState::Danger);
        assert_eq!(
            recorder.calls.all(),
            vec!["sound.start", "haptics.vibrate", "notifier.post", "alert.show"]
        );
        let posted = recorder.posted.lock().unwrap();
        assert_eq!(posted[0].actions[0].id, "STOP");
        assert_eq!(Some(posted[0].session), started);
    }

    #[test]
    fn test_threshold_is_strict() {
        let recorder = Recorder::default();
        let (mut machine, _events) = machine(&recorder, false);

        assert!(machine.evaluate(&Reading::new(100, GasStatus::Normal), false).is_none());
        assert_eq!(machine.state(), AlertState::Normal);
        assert!(machine.evaluate(&Reading::new(101, GasStatus::Normal), false).is_some());
    }

    #[test]
    fn test_repeated_danger_does_not_retrigger() {
        let recorder = Recorder::default();
        let (mut machine, _events) = machine(&recorder, false);

        let first = machine.evaluate(&Reading::new(150, GasStatus::Leak), false);
        let second = machine.evaluate(&Reading::new(180, GasStatus::Leak), false);

        assert!(first.is_some());
        assert!(second.is_none());
        assert_eq!(machine.session().map(|s| s.trigger_value), Some(150));
        assert_eq!(recorder.calls.count("sound.start"), 1);
        assert_eq!(recorder.calls.count("alert.show"), 1);
    }

    #[test]
    fn test_normal_reading_does_not_stop_alarm() {
        let recorder = Recorder::default();
        let (mut machine, _events) = machine(&recorder, false);

        machine.evaluate(&Reading::new(150, GasStatus::Leak), false);
        machine.evaluate(&Reading::new(42, GasStatus::Normal), false);

        assert_eq!(machine.state(), AlertState::Danger);
        assert_eq!(recorder.calls.count("sound.stop"), 0);
    }

    #[test]
    fn test_sound_failure_does_not_block_transition_or_stop() {
        let recorder = Recorder::default();
        let (mut machine, _events) = machine(&recorder, true);

        assert!(machine.evaluate(&Reading::new(150, GasStatus::Leak), false).is_some());
        assert_eq!(machine.state(), AlertState::Danger);
        assert_eq!(recorder.calls.count("alert.show"), 1);

        assert!(machine.stop(StopTrigger::UserAcknowledged));
        assert_eq!(machine.state(), AlertState::Normal);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let recorder = Recorder::default();
        let (mut machine, _events) = machine(&recorder, false);
        machine.evaluate(&Reading::new(150, GasStatus::Leak), false);

        assert!(machine.stop(StopTrigger::NotificationAction));
        assert!(!machine.stop(StopTrigger::NotificationAction));

        assert_eq!(machine.state(), AlertState::Normal);
        assert_eq!(recorder.calls.count("sound.stop"), 1);
        assert_eq!(recorder.calls.count("haptics.cancel"), 1);
    }

    #[test]
    fn test_stop_without_alarm_is_noop() {
        let recorder = Recorder::default();
        let (mut machine, _events) = machine(&recorder, false);

        assert!(!machine.stop(StopTrigger::Programmatic));
        assert!(recorder.calls.all().is_empty());
    }

    #[test]
    fn test_new_session_after_stop() {
        let recorder = Recorder::default();
        let (mut machine, _events) = machine(&recorder, false);

        let first = machine.evaluate(&Reading::new(150, GasStatus::Leak), false).unwrap();
        machine.stop(StopTrigger::UserAcknowledged);
        let second = machine.evaluate(&Reading::new(160, GasStatus::Leak), false).unwrap();

        assert_ne!(first, second);
        assert_eq!(recorder.calls.count("alert.show"), 2);
    }

    #[test]
    fn test_acknowledge_queues_event() {
        let recorder = Recorder::default();
        let (mut machine, mut events) = machine(&recorder, false);

        let session = machine.evaluate(&Reading::new(150, GasStatus::Leak), true).unwrap();
        recorder.take_ack().unwrap().acknowledge();

        assert_eq!(events.try_next(), Some(AppEvent::Acknowledge { session, drill: true }));
    }

    #[test]
    fn test_stop_action_matching() {
        let recorder = Recorder::default();
        let (machine, _events) = machine(&recorder, false);

        assert!(machine.is_stop_action("STOP"));
        assert!(!machine.is_stop_action("STOP_SOUND"));
        assert!(!machine.is_stop_action("stop"));
    }
}
