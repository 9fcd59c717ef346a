//! Consumer side: subscription, history window and connection modes.

pub mod handler;
pub mod history;
pub mod snapshot;

pub use handler::{MonitoringHandler, DISCONNECTED_LABEL, TEST_MODE_LABEL};
pub use history::{HistoryWindow, HISTORY_CAPACITY};
pub use snapshot::{ConnectionMode, MonitorEvent, MonitorSnapshot, StateObserver};
