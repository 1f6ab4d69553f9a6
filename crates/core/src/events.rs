//! Event System
//!
//! Pub/sub bus carrying orchestration progress to UI surfaces. The terminal
//! [`PermissionEvent::SessionFinished`] event doubles as the navigation-result
//! channel: it carries the same granted/denied partition handed to the
//! terminal callback.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use tracing::debug;

/// Events emitted over the course of one orchestration session
#[derive(Debug, Clone)]
pub enum PermissionEvent {
    /// A session started with this many groups queued after filtering
    SessionStarted { pending_groups: usize },
    /// An explanation prompt should be visible to the user
    ExplanationSurfaced { title: String },
    /// The platform request primitive was handed these identifiers
    PlatformRequestIssued { permissions: Vec<String> },
    /// One permission was resolved
    DecisionRecorded { permission: String, granted: bool },
    /// Remaining groups were cancelled by an abort-on-deny group
    SessionAborted,
    /// Terminal partition of the session
    SessionFinished {
        granted: Vec<String>,
        denied: Vec<String>,
    },
}

/// Subscriber handle for receiving events
#[derive(Clone)]
pub struct EventSubscription {
    receiver: Receiver<PermissionEvent>,
}

impl EventSubscription {
    /// Receive the next event (blocking)
    pub fn recv(&self) -> Result<PermissionEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv(&self) -> Result<PermissionEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Get an iterator over events received so far
    pub fn iter(&self) -> impl Iterator<Item = PermissionEvent> + '_ {
        self.receiver.try_iter()
    }
}

/// Event bus for publish/subscribe pattern
pub struct EventBus {
    subscribers: RwLock<Vec<Sender<PermissionEvent>>>,
}

impl EventBus {
    /// Create a new event bus
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> EventSubscription {
        let (sender, receiver) = unbounded();
        self.subscribers.write().push(sender);
        EventSubscription { receiver }
    }

    /// Emit an event to all subscribers, returning the delivery count
    pub fn emit(&self, event: PermissionEvent) -> usize {
        let subscribers = self.subscribers.read();
        let mut delivered = 0;

        for sender in subscribers.iter() {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }

        debug!("Event {:?} delivered to {} subscribers", event, delivered);
        delivered
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
