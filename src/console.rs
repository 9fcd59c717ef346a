//! Terminal front end for the monitor: operator commands on stdin, alerts and
//! status lines on stdout.

use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::{CommandError, SideEffectError};
use crate::event::{AppEvent, EventSender};
use crate::modules::alert::collaborators::{
    AlertAck, AlertCollaborators, BlockingAlert, Haptics, Notification, Notifier, SoundPlayer,
};
use crate::modules::monitoring::snapshot::{MonitorEvent, MonitorSnapshot, StateObserver};
use crate::{log_info, log_warn};

pub const HELP: &str = "commands: connect | disconnect | refresh | test | ack | action <ID> | stop | status | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorCommand {
    Connect,
    Disconnect,
    Refresh,
    Test,
    /// Press the button on the blocking alert.
    Ack,
    /// Invoke a notification action.
    Action(String),
    Stop,
    Status,
    Quit,
    Help,
}

impl FromStr for OperatorCommand {
    type Err = CommandError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let mut parts = input.split_whitespace();
        let Some(word) = parts.next() else {
            return Err(CommandError::Unknown(String::new()));
        };

        match word.to_lowercase().as_str() {
            "connect" => Ok(Self::Connect),
            "disconnect" => Ok(Self::Disconnect),
            "refresh" | "r" => Ok(Self::Refresh),
            "test" => Ok(Self::Test),
            "ack" | "ok" => Ok(Self::Ack),
            "action" => parts
                .next()
                .map(|id| Self::Action(id.to_string()))
                .ok_or(CommandError::MissingArgument("action")),
            "stop" => Ok(Self::Stop),
            "status" | "s" => Ok(Self::Status),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            "help" | "?" => Ok(Self::Help),
            _ => Err(CommandError::Unknown(word.to_string())),
        }
    }
}

/// What the operator can still respond to.
#[derive(Debug, Default)]
struct Prompts {
    pending_ack: Option<AlertAck>,
    notification_session: Option<Uuid>,
}

/// Shared between the console collaborators and the stdin reader.
#[derive(Debug, Clone, Default)]
pub struct ConsolePrompts(Arc<Mutex<Prompts>>);

impl ConsolePrompts {
    fn lock(&self) -> std::sync::MutexGuard<'_, Prompts> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_pending_alert(&self) -> bool {
        self.lock().pending_ack.is_some()
    }

    pub fn notification_session(&self) -> Option<Uuid> {
        self.lock().notification_session
    }

    /// Forget prompts raised for any session other than `active`.
    pub fn retain_session(&self, active: Option<Uuid>) {
        let mut prompts = self.lock();
        if prompts.pending_ack.as_ref().is_some_and(|ack| Some(ack.session()) != active) {
            prompts.pending_ack = None;
        }
        if prompts.notification_session != active {
            prompts.notification_session = None;
        }
    }

    /// Resolve the blocking alert, if one is showing.
    pub fn acknowledge(&self) -> bool {
        match self.lock().pending_ack.take() {
            Some(ack) => {
                ack.acknowledge();
                true
            }
            None => false,
        }
    }

    /// Collaborators that print to the terminal, with `sound` for the alarm.
    pub fn collaborators(&self, sound: Box<dyn SoundPlayer + Send>) -> AlertCollaborators {
        AlertCollaborators {
            sound,
            haptics: Box::new(ConsoleHaptics),
            notifier: Box::new(ConsoleNotifier { prompts: self.clone() }),
            alert: Box::new(ConsoleAlert { prompts: self.clone() }),
        }
    }
}

#[derive(Debug)]
pub struct ConsoleNotifier {
    prompts: ConsolePrompts,
}

impl Notifier for ConsoleNotifier {
    fn post(&mut self, notification: &Notification) -> Result<(), SideEffectError> {
        let actions: Vec<&str> = notification.actions.iter().map(|a| a.id.as_str()).collect();
        println!(
            "🔔 {} - {} [action {}]",
            notification.title,
            notification.body,
            actions.join(" | action ")
        );
        self.prompts.lock().notification_session = Some(notification.session);
        Ok(())
    }
}

#[derive(Debug)]
pub struct ConsoleAlert {
    prompts: ConsolePrompts,
}

impl BlockingAlert for ConsoleAlert {
    fn show(&mut self, title: &str, body: &str, ack: AlertAck) {
        println!("🚨 {}: {}", title, body);
        println!("   type 'ack' to stop");
        self.prompts.lock().pending_ack = Some(ack);
    }
}

#[derive(Debug)]
pub struct ConsoleHaptics;

impl Haptics for ConsoleHaptics {
    fn vibrate(&mut self) {
        log_info!("Vibration started");
    }

    fn cancel(&mut self) {
        log_info!("Vibration cancelled");
    }
}

/// Prints a status line on every state change and drops prompts of alarms
/// that have ended.
#[derive(Debug)]
pub struct ConsoleObserver {
    prompts: ConsolePrompts,
}

impl ConsoleObserver {
    pub fn new(prompts: ConsolePrompts) -> Self {
        Self { prompts }
    }
}

impl StateObserver for ConsoleObserver {
    fn on_event(&mut self, event: &MonitorEvent) {
        let MonitorEvent::StateChanged(snapshot) = event;
        self.prompts.retain_session(snapshot.session);
        println!("{}", format_status(snapshot));
    }
}

pub fn format_status(snapshot: &MonitorSnapshot) -> String {
    let reading = snapshot
        .reading
        .map(|value| value.to_string())
        .unwrap_or_else(|| "---".to_string());
    let timestamp = snapshot
        .timestamp
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "---".to_string());
    let flag = if snapshot.is_danger { "🔥" } else { "✅" };
    let history: Vec<String> = snapshot.history.iter().map(|v| v.to_string()).collect();

    format!(
        "[{}] Current Reading: {} | Status: {} {} | Timestamp: {} | History: [{}]",
        snapshot.mode.as_str(),
        reading,
        snapshot.status,
        flag,
        timestamp,
        history.join(", ")
    )
}

/// Turns operator commands into app events.
#[derive(Debug, Clone)]
pub struct OperatorConsole {
    prompts: ConsolePrompts,
    events: EventSender,
}

impl OperatorConsole {
    pub fn new(prompts: ConsolePrompts, events: EventSender) -> Self {
        Self { prompts, events }
    }

    /// Returns `false` after `quit`.
    pub fn dispatch(&self, command: OperatorCommand) -> bool {
        let event = match command {
            OperatorCommand::Connect => AppEvent::Connect,
            OperatorCommand::Disconnect => AppEvent::Disconnect,
            OperatorCommand::Refresh => AppEvent::Refresh,
            OperatorCommand::Test => AppEvent::TestEmergency,
            OperatorCommand::Ack => {
                if !self.prompts.acknowledge() {
                    println!("no alert to acknowledge");
                }
                return true;
            }
            OperatorCommand::Action(action_id) => AppEvent::NotificationAction {
                action_id,
                session: self.prompts.notification_session(),
            },
            OperatorCommand::Stop => AppEvent::StopAlarm,
            OperatorCommand::Status => AppEvent::Status,
            OperatorCommand::Quit => {
                let _ = self.events.send(AppEvent::Quit);
                return false;
            }
            OperatorCommand::Help => {
                println!("{}", HELP);
                return true;
            }
        };

        let _ = self.events.send(event);
        true
    }

    /// Read commands from stdin until `quit` or end of input.
    pub fn spawn_stdin(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        log_warn!("Console input failed: {}", e);
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }

                match line.parse::<OperatorCommand>() {
                    Ok(command) => {
                        if !self.dispatch(command) {
                            break;
                        }
                    }
                    Err(e) => println!("{}", e),
                }
            }
        })
    }
}
