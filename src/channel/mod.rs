//! Session channel seam: the duplex event stream to the registration backend.
//!
//! Inbound frames decode into [`SyncEvent`]s and fan out to registered handlers. Outbound
//! user actions are tagged with the session's user id, since the backend keys its
//! conversation state by it.

pub mod memory;
pub mod websocket;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::registration::{Field, FieldValue};

pub use memory::{MemoryChannel, MemoryRemote};
pub use websocket::WebSocketChannel;

/// Inbound unit from the channel. Consumed once by the field synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    Message { text: String },
    FieldUpdate { field: Field, value: FieldValue },
}

impl SyncEvent {
    pub fn decode(frame: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(frame)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OutboundEvent {
    Message {
        text: String,
        user_id: String,
    },
    FieldUpdate {
        field: Field,
        value: FieldValue,
        user_id: String,
    },
}

impl OutboundEvent {
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

pub type MessageHandler = Box<dyn FnMut(String) + Send>;
pub type FieldUpdateHandler = Box<dyn FnMut(Field, FieldValue) + Send>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelError {
    Closed,
    /// The channel refused this kind of outbound message.
    Unsupported(String),
    Transport(String),
}

impl fmt::Display for ChannelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "session channel is closed"),
            Self::Unsupported(msg) => write!(f, "message not supported by channel: {msg}"),
            Self::Transport(msg) => write!(f, "channel delivery failed: {msg}"),
        }
    }
}

impl std::error::Error for ChannelError {}

/// Duplex event stream consumed by the intake session.
///
/// Sends from one sender arrive in order; nothing is assumed across senders. `close`
/// detaches every handler before returning, and outbound sends still queued are best
/// effort.
pub trait SessionChannel {
    fn on_message(&mut self, handler: MessageHandler);
    fn on_field_update(&mut self, handler: FieldUpdateHandler);
    fn send(&mut self, text: &str) -> Result<(), ChannelError>;
    fn send_field_update(&mut self, field: Field, value: &FieldValue) -> Result<(), ChannelError>;
    fn close(&mut self);
    fn is_closed(&self) -> bool;
}

/// Handler table shared between a channel and whatever thread decodes its frames.
#[derive(Default)]
pub(crate) struct Subscriptions {
    message: Vec<MessageHandler>,
    field_update: Vec<FieldUpdateHandler>,
    detached: bool,
}

impl Subscriptions {
    pub(crate) fn add_message(&mut self, handler: MessageHandler) {
        if !self.detached {
            self.message.push(handler);
        }
    }

    pub(crate) fn add_field_update(&mut self, handler: FieldUpdateHandler) {
        if !self.detached {
            self.field_update.push(handler);
        }
    }

    /// Hand one event to every handler of its kind. Returns false once detached.
    pub(crate) fn dispatch(&mut self, event: SyncEvent) -> bool {
        if self.detached {
            return false;
        }
        match event {
            SyncEvent::Message { text } => {
                for handler in &mut self.message {
                    handler(text.clone());
                }
            }
            SyncEvent::FieldUpdate { field, value } => {
                for handler in &mut self.field_update {
                    handler(field, value.clone());
                }
            }
        }
        true
    }

    pub(crate) fn clear(&mut self) {
        self.message.clear();
        self.field_update.clear();
        self.detached = true;
    }

    pub(crate) fn len(&self) -> usize {
        self.message.len() + self.field_update.len()
    }
}
