use color_eyre::Result;

use crate::event::EventHandler;
use crate::log_info;
use crate::modules::monitoring::MonitoringHandler;

pub const WELCOME: &str = "Gas Leak Detector is now active!";

/// The monitoring loop.
#[derive(Debug)]
pub struct App {
    /// Is the application running?
    pub running: bool,
    pub handler: MonitoringHandler,
    /// Event handler.
    pub events: EventHandler,
}

impl App {
    pub fn new(handler: MonitoringHandler, events: EventHandler) -> Self {
        Self {
            running: true,
            handler,
            events,
        }
    }

    /// Run until `quit` or Ctrl-C. Every delivered reading is fully handled
    /// before the next event is taken.
    pub async fn run(mut self) -> Result<()> {
        println!("Welcome: {}", WELCOME);
        log_info!("{}", WELCOME);

        self.handler.connect();

        while self.running {
            tokio::select! {
                event = self.events.next() => {
                    self.running = self.handler.handle_event(event?);
                }
                feed = self.handler.next_entry() => {
                    self.handler.handle_feed(feed);
                }
                _ = tokio::signal::ctrl_c() => {
                    log_info!("Interrupted");
                    self.running = false;
                }
            }
        }

        Ok(())
    }
}
