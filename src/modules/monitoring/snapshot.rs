//! Observer mechanism for whatever renders the monitor state.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::modules::alert::AlertState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    Live,
    Disconnected,
    Test,
}

impl ConnectionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMode::Live => "LIVE",
            ConnectionMode::Disconnected => "DISCONNECTED",
            ConnectionMode::Test => "TEST",
        }
    }
}

/// Everything a display needs after a state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSnapshot {
    pub mode: ConnectionMode,
    pub reading: Option<i64>,
    pub status: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub history: Vec<i64>,
    pub alert: AlertState,
    pub session: Option<Uuid>,
    /// Above threshold, alarm active, or drilling.
    pub is_danger: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitorEvent {
    StateChanged(MonitorSnapshot),
}

pub trait StateObserver {
    fn on_event(&mut self, event: &MonitorEvent);
}
