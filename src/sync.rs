//! Field synchronizer: decides which surface owns each field and applies every write.
//!
//! State machine:
//!
//! - `Idle`: no guided prompt active.
//! - `AwaitingField(f)`: a bot prompt asked for `f`; `f` is chat-controlled until the
//!   guided phase completes. Fields prompted earlier stay chat-controlled.
//! - `Reconciling`: entered on a completion marker; every field returns to the user,
//!   then the machine settles in `Idle`.
//!
//! Backend `FieldUpdate`s are applied in any state. Events are handled strictly in
//! arrival order, so the later of two updates to one field wins.

use serde::Serialize;

use crate::channel::SyncEvent;
use crate::markers::{MarkerMatch, MarkerTable};
use crate::registration::{EditAuthority, Field, FieldValue, RecordError, RegistrationRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "field", rename_all = "snake_case")]
pub enum SyncState {
    Idle,
    AwaitingField(Field),
    Reconciling,
}

/// What handling one inbound event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// A prompt marker handed `field` to the chat flow. `reentered` is true when the
    /// field was already chat-controlled.
    Prompted { field: Field, reentered: bool },
    /// A completion marker released these fields back to the user.
    Completed { released: Vec<Field> },
    /// Plain chat text with no marker.
    Chat,
    FieldApplied { field: Field, previous: FieldValue },
    FieldRejected { field: Field, error: RecordError },
}

/// Result of a user edit coming from the form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditDecision {
    Accepted { previous: FieldValue },
    /// The chat flow owns the field; the record is unchanged.
    Rejected,
}

#[derive(Debug, Clone)]
pub struct FieldSynchronizer {
    state: SyncState,
    record: RegistrationRecord,
    markers: MarkerTable,
}

impl FieldSynchronizer {
    #[must_use]
    pub fn new(markers: MarkerTable) -> Self {
        Self {
            state: SyncState::Idle,
            record: RegistrationRecord::new(),
            markers,
        }
    }

    #[must_use]
    pub fn state(&self) -> SyncState {
        self.state
    }

    #[must_use]
    pub fn record(&self) -> &RegistrationRecord {
        &self.record
    }

    #[must_use]
    pub fn markers(&self) -> &MarkerTable {
        &self.markers
    }

    /// Consume one inbound event.
    pub fn handle(&mut self, event: SyncEvent) -> SyncOutcome {
        match event {
            SyncEvent::Message { text } => self.handle_message(&text),
            SyncEvent::FieldUpdate { field, value } => self.handle_field_update(field, value),
        }
    }

    pub fn handle_message(&mut self, text: &str) -> SyncOutcome {
        match self.markers.classify(text) {
            MarkerMatch::Prompt(field) => self.await_field(field),
            MarkerMatch::Completion => self.reconcile(),
            MarkerMatch::None => SyncOutcome::Chat,
        }
    }

    /// Backend-derived value: applied regardless of state or authority.
    pub fn handle_field_update(&mut self, field: Field, value: FieldValue) -> SyncOutcome {
        match self.record.apply(field, value) {
            Ok(previous) => {
                tracing::debug!(field = %field, state = ?self.state, "applied backend field update");
                SyncOutcome::FieldApplied { field, previous }
            }
            Err(error) => {
                tracing::warn!(field = %field, %error, "dropped backend field update");
                SyncOutcome::FieldRejected { field, error }
            }
        }
    }

    /// Edit typed into the form. Rejected while the chat flow owns the field.
    pub fn user_edit(&mut self, field: Field, value: FieldValue) -> Result<EditDecision, RecordError> {
        if self.record.authority(field) == EditAuthority::ChatControlled {
            tracing::debug!(field = %field, "user edit rejected: field is chat-controlled");
            return Ok(EditDecision::Rejected);
        }
        let previous = self.record.apply_edit(field, value)?;
        Ok(EditDecision::Accepted { previous })
    }

    fn await_field(&mut self, field: Field) -> SyncOutcome {
        let reentered = self.record.authority(field) == EditAuthority::ChatControlled;
        self.record.set_authority(field, EditAuthority::ChatControlled);
        self.state = SyncState::AwaitingField(field);
        tracing::debug!(field = %field, reentered, "awaiting field from chat");
        SyncOutcome::Prompted { field, reentered }
    }

    fn reconcile(&mut self) -> SyncOutcome {
        self.state = SyncState::Reconciling;
        let released = self.record.release_all();
        tracing::debug!(released = released.len(), "guided entry complete; fields released");
        self.state = SyncState::Idle;
        SyncOutcome::Completed { released }
    }
}
