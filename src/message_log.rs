//! Append-only chat log. Indices stay valid for the whole session.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Bot,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    /// The channel refused this kind of message.
    Unsupported,
}

/// One chat bubble. Only `delivery_status` can change after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationTurn {
    text: String,
    origin: Origin,
    created_at: DateTime<Utc>,
    delivery_status: DeliveryStatus,
}

impl ConversationTurn {
    pub fn new(text: impl Into<String>, origin: Origin, delivery_status: DeliveryStatus) -> Self {
        Self {
            text: text.into(),
            origin,
            created_at: Utc::now(),
            delivery_status,
        }
    }

    /// Bot turns arrive over the channel, so they are delivered by definition.
    pub fn bot(text: impl Into<String>) -> Self {
        Self::new(text, Origin::Bot, DeliveryStatus::Delivered)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(text, Origin::User, DeliveryStatus::Pending)
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn delivery_status(&self) -> DeliveryStatus {
        self.delivery_status
    }
}

#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    turns: Vec<ConversationTurn>,
}

impl MessageLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn and return its index.
    pub fn append(&mut self, turn: ConversationTurn) -> usize {
        self.turns.push(turn);
        self.turns.len() - 1
    }

    /// Returns false when `index` is out of range.
    pub fn mark_delivered(&mut self, index: usize) -> bool {
        self.set_status(index, DeliveryStatus::Delivered)
    }

    pub fn mark_unsupported(&mut self, index: usize) -> bool {
        self.set_status(index, DeliveryStatus::Unsupported)
    }

    fn set_status(&mut self, index: usize, status: DeliveryStatus) -> bool {
        match self.turns.get_mut(index) {
            Some(turn) => {
                turn.delivery_status = status;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&ConversationTurn> {
        self.turns.get(index)
    }

    #[must_use]
    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
