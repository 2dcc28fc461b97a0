//! In-process loopback channel. The remote half plays the backend.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{
    ChannelError, FieldUpdateHandler, MessageHandler, OutboundEvent, SessionChannel,
    Subscriptions, SyncEvent,
};
use crate::lock_or_recover;
use crate::registration::{Field, FieldValue};

#[derive(Default)]
struct Shared {
    outbound: Vec<OutboundEvent>,
    failures: VecDeque<ChannelError>,
    closed: bool,
}

pub struct MemoryChannel {
    user_id: String,
    subscriptions: Arc<Mutex<Subscriptions>>,
    shared: Arc<Mutex<Shared>>,
}

/// Backend side of a [`MemoryChannel`].
#[derive(Clone)]
pub struct MemoryRemote {
    subscriptions: Arc<Mutex<Subscriptions>>,
    shared: Arc<Mutex<Shared>>,
}

impl MemoryChannel {
    pub fn new(user_id: impl Into<String>) -> (Self, MemoryRemote) {
        let subscriptions = Arc::new(Mutex::new(Subscriptions::default()));
        let shared = Arc::new(Mutex::new(Shared::default()));
        let channel = Self {
            user_id: user_id.into(),
            subscriptions: Arc::clone(&subscriptions),
            shared: Arc::clone(&shared),
        };
        (
            channel,
            MemoryRemote {
                subscriptions,
                shared,
            },
        )
    }

    fn push(&mut self, event: OutboundEvent) -> Result<(), ChannelError> {
        let mut shared = lock_or_recover(&self.shared, "memory channel send");
        if shared.closed {
            return Err(ChannelError::Closed);
        }
        if let Some(failure) = shared.failures.pop_front() {
            return Err(failure);
        }
        shared.outbound.push(event);
        Ok(())
    }
}

impl SessionChannel for MemoryChannel {
    fn on_message(&mut self, handler: MessageHandler) {
        lock_or_recover(&self.subscriptions, "memory channel subscribe").add_message(handler);
    }

    fn on_field_update(&mut self, handler: FieldUpdateHandler) {
        lock_or_recover(&self.subscriptions, "memory channel subscribe").add_field_update(handler);
    }

    fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        let event = OutboundEvent::Message {
            text: text.to_string(),
            user_id: self.user_id.clone(),
        };
        self.push(event)
    }

    fn send_field_update(&mut self, field: Field, value: &FieldValue) -> Result<(), ChannelError> {
        let event = OutboundEvent::FieldUpdate {
            field,
            value: value.clone(),
            user_id: self.user_id.clone(),
        };
        self.push(event)
    }

    fn close(&mut self) {
        lock_or_recover(&self.subscriptions, "memory channel close").clear();
        lock_or_recover(&self.shared, "memory channel close").closed = true;
    }

    fn is_closed(&self) -> bool {
        lock_or_recover(&self.shared, "memory channel state").closed
    }
}

impl MemoryRemote {
    /// Deliver an inbound event to the session's handlers. Returns false once closed.
    pub fn inject(&self, event: SyncEvent) -> bool {
        lock_or_recover(&self.subscriptions, "memory remote inject").dispatch(event)
    }

    pub fn say(&self, text: &str) -> bool {
        self.inject(SyncEvent::Message {
            text: text.to_string(),
        })
    }

    pub fn update_field(&self, field: Field, value: FieldValue) -> bool {
        self.inject(SyncEvent::FieldUpdate { field, value })
    }

    /// Everything the session has sent so far, in send order.
    #[must_use]
    pub fn outbound(&self) -> Vec<OutboundEvent> {
        lock_or_recover(&self.shared, "memory remote outbound")
            .outbound
            .clone()
    }

    /// Make the next send fail with `error`.
    pub fn fail_next(&self, error: ChannelError) {
        lock_or_recover(&self.shared, "memory remote fail_next")
            .failures
            .push_back(error);
    }

    /// Hang up from the backend side: handlers are dropped and sends fail.
    pub fn disconnect(&self) {
        lock_or_recover(&self.subscriptions, "memory remote disconnect").clear();
        lock_or_recover(&self.shared, "memory remote disconnect").closed = true;
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        lock_or_recover(&self.shared, "memory remote state").closed
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        lock_or_recover(&self.subscriptions, "memory remote state").len()
    }
}
