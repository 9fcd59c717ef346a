//! Distribution channel between the ingestion side and the monitoring side.
//!
//! A channel is an append-ordered log of [`Reading`]s. Producers append;
//! consumers subscribe starting from the latest `n` entries and then receive
//! every later entry in append order.

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};

use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{PublishError, SubscriptionError};
use crate::log_debug;
use crate::util::io::serial::Reading;

pub const DEFAULT_RETAIN: usize = 256;

/// A reading together with its position in the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub sequence: u64,
    pub reading: Reading,
}

pub type EntrySender = mpsc::UnboundedSender<Result<LogEntry, SubscriptionError>>;
pub type EntryReceiver = mpsc::UnboundedReceiver<Result<LogEntry, SubscriptionError>>;

pub trait TelemetryChannel: Send + Sync {
    /// Append one reading, returning its sequence number.
    fn append(&self, reading: &Reading) -> Result<u64, PublishError>;

    /// Deliver the latest `n` entries, then every new one, in append order.
    fn subscribe_from_latest(&self, n: usize) -> Result<Subscription, SubscriptionError>;
}

/// Receiving end of a channel subscription. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    receiver: EntryReceiver,
    feeder: Option<JoinHandle<()>>,
    backlog: usize,
}

impl Subscription {
    /// `backlog` is how many already-appended entries were queued up front.
    pub fn new(receiver: EntryReceiver, backlog: usize) -> Self {
        Self { receiver, feeder: None, backlog }
    }

    /// Subscription whose entries are produced by a background task; the task
    /// is aborted when the subscription is released.
    pub fn with_feeder(receiver: EntryReceiver, backlog: usize, feeder: JoinHandle<()>) -> Self {
        Self { receiver, feeder: Some(feeder), backlog }
    }

    pub fn backlog(&self) -> usize {
        self.backlog
    }

    /// `None` once the channel side has gone away.
    pub async fn next_entry(&mut self) -> Option<Result<LogEntry, SubscriptionError>> {
        self.receiver.recv().await
    }

    pub fn try_next_entry(&mut self) -> Option<Result<LogEntry, SubscriptionError>> {
        self.receiver.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Result<LogEntry, SubscriptionError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(feeder) = self.feeder.take() {
            feeder.abort();
        }
    }
}

#[derive(Debug)]
struct BusState {
    next_sequence: u64,
    retained: VecDeque<LogEntry>,
    retain: usize,
    subscribers: Vec<EntrySender>,
    closed: bool,
}

/// In-process channel. Keeps the most recent `retain` entries for late
/// subscribers; older entries are forgotten.
#[derive(Debug, Clone)]
pub struct MessageBus {
    // One lock covers append and subscribe so no entry is missed or duplicated
    // between a subscriber's backlog and its live feed.
    state: Arc<Mutex<BusState>>,
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(DEFAULT_RETAIN)
    }
}

impl MessageBus {
    pub fn new(retain: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(BusState {
                next_sequence: 0,
                retained: VecDeque::new(),
                retain: retain.max(1),
                subscribers: Vec::new(),
                closed: false,
            })),
        }
    }

    /// Close the bus. Later appends fail and every subscription ends.
    pub fn close(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        state.subscribers.clear();
    }

    pub fn subscriber_count(&self) -> usize {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.subscribers.retain(|s| !s.is_closed());
        state.subscribers.len()
    }

    pub fn retained_len(&self) -> usize {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).retained.len()
    }
}

impl TelemetryChannel for MessageBus {
    fn append(&self, reading: &Reading) -> Result<u64, PublishError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(PublishError::ChannelClosed);
        }

        let entry = LogEntry {
            sequence: state.next_sequence,
            reading: reading.clone(),
        };
        state.next_sequence += 1;

        state.retained.push_back(entry.clone());
        while state.retained.len() > state.retain {
            state.retained.pop_front();
        }

        // Drop subscribers whose receiving end is gone
        state.subscribers.retain(|subscriber| subscriber.send(Ok(entry.clone())).is_ok());

        Ok(entry.sequence)
    }

    fn subscribe_from_latest(&self, n: usize) -> Result<Subscription, SubscriptionError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(SubscriptionError::ChannelClosed);
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        let skip = state.retained.len().saturating_sub(n);
        for entry in state.retained.iter().skip(skip) {
            let _ = sender.send(Ok(entry.clone()));
        }
        state.subscribers.push(sender);

        let backlog = state.retained.len() - skip;
        log_debug!("Bus subscriber added with backlog of {}", backlog);
        Ok(Subscription::new(receiver, backlog))
    }
}
