use color_eyre::eyre::OptionExt;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Events driving the monitoring loop, from operators, collaborators and timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    // Connection
    Connect,
    Disconnect,
    Refresh,
    /// Fires after the refresh delay; stale epochs are ignored.
    RefreshElapsed { epoch: u64 },

    // Alarm
    TestEmergency,
    /// Blocking alert acknowledged for `session`.
    Acknowledge { session: Uuid, drill: bool },
    /// A notification action was invoked.
    NotificationAction { action_id: String, session: Option<Uuid> },
    /// Programmatic stop.
    StopAlarm,

    // System
    Status,
    Quit,
}

pub type EventSender = mpsc::UnboundedSender<AppEvent>;

/// Event queue for the monitoring loop.
#[derive(Debug)]
pub struct EventHandler {
    sender: EventSender,
    receiver: mpsc::UnboundedReceiver<AppEvent>,
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHandler {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self { sender, receiver }
    }

    /// Handle for anything that needs to queue events later.
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Receives the next queued event.
    pub async fn next(&mut self) -> color_eyre::Result<AppEvent> {
        self.receiver
            .recv()
            .await
            .ok_or_eyre("Failed to receive event")
    }

    pub fn try_next(&mut self) -> Option<AppEvent> {
        self.receiver.try_recv().ok()
    }
}
