//! Recording collaborators shared by the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use gaswatch::error::SideEffectError;
use gaswatch::modules::alert::collaborators::{
    AlertAck, AlertCollaborators, BlockingAlert, Haptics, Notification, Notifier, SoundPlayer,
};
use gaswatch::modules::monitoring::{MonitorEvent, MonitorSnapshot, StateObserver};

#[derive(Debug, Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<&'static str>>>);

impl Calls {
    pub fn push(&self, call: &'static str) {
        self.0.lock().unwrap().push(call);
    }

    pub fn count(&self, call: &str) -> usize {
        self.0.lock().unwrap().iter().filter(|c| **c == call).count()
    }
}

struct Sound(Calls);

impl SoundPlayer for Sound {
    fn start(&mut self) -> Result<(), SideEffectError> {
        self.0.push("sound.start");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SideEffectError> {
        self.0.push("sound.stop");
        Ok(())
    }
}

struct Vibration(Calls);

impl Haptics for Vibration {
    fn vibrate(&mut self) {
        self.0.push("haptics.vibrate");
    }

    fn cancel(&mut self) {
        self.0.push("haptics.cancel");
    }
}

struct Notifications(Calls);

impl Notifier for Notifications {
    fn post(&mut self, _notification: &Notification) -> Result<(), SideEffectError> {
        self.0.push("notifier.post");
        Ok(())
    }
}

struct Dialog(Calls, Arc<Mutex<Option<AlertAck>>>);

impl BlockingAlert for Dialog {
    fn show(&mut self, _title: &str, _body: &str, ack: AlertAck) {
        self.0.push("alert.show");
        *self.1.lock().unwrap() = Some(ack);
    }
}

#[derive(Clone, Default)]
pub struct Recorder {
    pub calls: Calls,
    pub ack: Arc<Mutex<Option<AlertAck>>>,
}

impl Recorder {
    pub fn collaborators(&self) -> AlertCollaborators {
        AlertCollaborators {
            sound: Box::new(Sound(self.calls.clone())),
            haptics: Box::new(Vibration(self.calls.clone())),
            notifier: Box::new(Notifications(self.calls.clone())),
            alert: Box::new(Dialog(self.calls.clone(), Arc::clone(&self.ack))),
        }
    }

    pub fn take_ack(&self) -> Option<AlertAck> {
        self.ack.lock().unwrap().take()
    }
}

/// Keeps every snapshot the handler publishes.
#[derive(Clone, Default)]
pub struct Snapshots(pub Arc<Mutex<Vec<MonitorSnapshot>>>);

impl Snapshots {
    pub fn all(&self) -> Vec<MonitorSnapshot> {
        self.0.lock().unwrap().clone()
    }
}

impl StateObserver for Snapshots {
    fn on_event(&mut self, event: &MonitorEvent) {
        let MonitorEvent::StateChanged(snapshot) = event;
        self.0.lock().unwrap().push(snapshot.clone());
    }
}
