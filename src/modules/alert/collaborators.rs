//! External collaborators reached when an alarm starts or stops.
//!
//! The alert state machine only talks to these traits; concrete devices
//! (speaker, vibration motor, OS notifications, dialogs) live behind them.

use uuid::Uuid;

use crate::error::SideEffectError;
use crate::event::{AppEvent, EventSender};

pub trait SoundPlayer {
    fn start(&mut self) -> Result<(), SideEffectError>;
    fn stop(&mut self) -> Result<(), SideEffectError>;
}

pub trait Haptics {
    fn vibrate(&mut self);
    fn cancel(&mut self);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationAction {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub session: Uuid,
    pub actions: Vec<NotificationAction>,
}

pub trait Notifier {
    fn post(&mut self, notification: &Notification) -> Result<(), SideEffectError>;
}

/// The `onAcknowledge` callback handed to a blocking alert.
#[derive(Debug, Clone)]
pub struct AlertAck {
    session: Uuid,
    drill: bool,
    events: EventSender,
}

impl AlertAck {
    pub fn new(session: Uuid, drill: bool, events: EventSender) -> Self {
        Self { session, drill, events }
    }

    pub fn session(&self) -> Uuid {
        self.session
    }

    /// Queue the acknowledgment. Harmless if the loop is gone.
    pub fn acknowledge(self) {
        let _ = self.events.send(AppEvent::Acknowledge {
            session: self.session,
            drill: self.drill,
        });
    }
}

pub trait BlockingAlert {
    fn show(&mut self, title: &str, body: &str, ack: AlertAck);
}

/// Everything an alarm session touches.
pub struct AlertCollaborators {
    pub sound: Box<dyn SoundPlayer + Send>,
    pub haptics: Box<dyn Haptics + Send>,
    pub notifier: Box<dyn Notifier + Send>,
    pub alert: Box<dyn BlockingAlert + Send>,
}

impl std::fmt::Debug for AlertCollaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertCollaborators").finish_non_exhaustive()
    }
}
