//! Intake session: one ordered state for chat turns, speech input, and the registration
//! form.
//!
//! Channel handlers only enqueue [`SyncEvent`]s; the owner drains them with
//! [`IntakeSession::dispatch_tick`], so every transition runs to completion before the
//! next event is looked at.

use crossbeam_channel::{unbounded, Receiver, Sender};
use serde::Serialize;

use crate::capture::{CaptureController, CaptureSignal, SpeechCapture};
use crate::channel::{ChannelError, SessionChannel, SyncEvent};
use crate::error::SessionError;
use crate::log_debug_content;
use crate::markers::MarkerTable;
use crate::message_log::{ConversationTurn, MessageLog};
use crate::registration::{Field, FieldValue, RegistrationRecord};
use crate::submit::RegistrationSubmitter;
use crate::sync::{EditDecision, FieldSynchronizer, SyncOutcome, SyncState};
use crate::transcript::TranscriptState;

/// Everything the UI renders, captured at one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub turns: Vec<ConversationTurn>,
    pub record: RegistrationRecord,
    pub state: SyncState,
    pub transcript: TranscriptState,
    pub draft: String,
    pub form_valid: bool,
    pub missing_fields: Vec<Field>,
    pub invalid_fields: Vec<Field>,
}

pub struct IntakeSession<C: SessionChannel> {
    channel: C,
    sync: FieldSynchronizer,
    log: MessageLog,
    capture: CaptureController,
    draft: String,
    inbound_tx: Sender<SyncEvent>,
    inbound_rx: Receiver<SyncEvent>,
    subscribed: bool,
    closed: bool,
}

impl<C: SessionChannel> IntakeSession<C> {
    pub fn new(channel: C, markers: MarkerTable) -> Self {
        let (inbound_tx, inbound_rx) = unbounded();
        Self {
            channel,
            sync: FieldSynchronizer::new(markers),
            log: MessageLog::new(),
            capture: CaptureController::new(None),
            draft: String::new(),
            inbound_tx,
            inbound_rx,
            subscribed: false,
            closed: false,
        }
    }

    /// Seed the conversation with a bot turn shown before the backend says anything.
    #[must_use]
    pub fn with_greeting(mut self, greeting: impl Into<String>) -> Self {
        self.log.append(ConversationTurn::bot(greeting));
        self
    }

    #[must_use]
    pub fn with_capture(mut self, device: Box<dyn SpeechCapture>) -> Self {
        self.capture = CaptureController::new(Some(device));
        self
    }

    /// Attach channel handlers (once) and return the queue they feed.
    pub fn subscribe(&mut self) -> Receiver<SyncEvent> {
        if !self.subscribed && !self.closed {
            let message_tx = self.inbound_tx.clone();
            self.channel.on_message(Box::new(move |text| {
                let _ = message_tx.send(SyncEvent::Message { text });
            }));
            let field_tx = self.inbound_tx.clone();
            self.channel.on_field_update(Box::new(move |field, value| {
                let _ = field_tx.send(SyncEvent::FieldUpdate { field, value });
            }));
            self.subscribed = true;
        }
        self.inbound_rx.clone()
    }

    /// Handle every queued inbound event in arrival order. Returns how many were handled.
    pub fn dispatch_tick(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.inbound_rx.try_recv() {
            if self.handle_inbound(event).is_err() {
                break;
            }
            handled += 1;
        }
        handled
    }

    /// Handle one inbound event: bot text is logged, then the synchronizer sees it.
    pub fn handle_inbound(&mut self, event: SyncEvent) -> Result<SyncOutcome, SessionError> {
        self.ensure_open()?;
        if let SyncEvent::Message { text } = &event {
            log_debug_content(&format!("bot: {text}"));
            self.log.append(ConversationTurn::bot(text.clone()));
        }
        let outcome = self.sync.handle(event);
        tracing::debug!(?outcome, state = ?self.sync.state(), "inbound event handled");
        Ok(outcome)
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Send the draft input value as a user turn.
    pub fn send_draft(&mut self) -> Result<Option<usize>, SessionError> {
        let text = std::mem::take(&mut self.draft);
        self.send_text(&text)
    }

    /// Append a user turn and send it as typed. Blank text is ignored (`Ok(None)`);
    /// otherwise the new turn's index is returned once the channel accepted it.
    pub fn send_text(&mut self, text: &str) -> Result<Option<usize>, SessionError> {
        self.ensure_open()?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        self.draft.clear();
        log_debug_content(&format!("user: {text}"));
        let index = self.log.append(ConversationTurn::user(text));
        match self.channel.send(text) {
            Ok(()) => {
                self.log.mark_delivered(index);
                Ok(Some(index))
            }
            Err(err) => {
                if matches!(err, ChannelError::Unsupported(_)) {
                    self.log.mark_unsupported(index);
                }
                tracing::warn!(%err, index, "user turn not delivered");
                Err(SessionError::ChannelDelivery(err))
            }
        }
    }

    /// Form edit. Applied locally and forwarded unless the chat flow owns the field.
    ///
    /// A forwarding failure is returned as an error, but the local edit stands.
    pub fn edit_field(
        &mut self,
        field: Field,
        value: FieldValue,
    ) -> Result<EditDecision, SessionError> {
        self.ensure_open()?;
        let decision = self.sync.user_edit(field, value)?;
        if let EditDecision::Accepted { .. } = decision {
            let stored = self.sync.record().get(field).clone();
            log_debug_content(&format!("user edit {field} = {stored}"));
            self.channel.send_field_update(field, &stored)?;
        }
        Ok(decision)
    }

    pub fn start_capture(&mut self) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.capture.start()?;
        Ok(())
    }

    /// Feed recognizer output. The final text of an utterance becomes the draft.
    pub fn capture_signal(&mut self, signal: CaptureSignal) -> Result<(), SessionError> {
        self.ensure_open()?;
        if let Some(text) = self.capture.signal(signal)? {
            self.take_transcript(text);
        }
        Ok(())
    }

    /// Stop capturing; the final text (if any) becomes the draft and is returned.
    pub fn stop_capture(&mut self) -> Result<String, SessionError> {
        self.ensure_open()?;
        let text = self.capture.stop();
        self.take_transcript(text.clone());
        Ok(text)
    }

    /// Flush the current hypothesis into the draft without ending the capture.
    pub fn commit_transcript(&mut self) -> Result<String, SessionError> {
        self.ensure_open()?;
        let text = self.capture.commit();
        self.take_transcript(text.clone());
        Ok(text)
    }

    fn take_transcript(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        log_debug_content(&format!("transcript: {text}"));
        self.draft = text;
    }

    pub fn validate(&self) -> Result<(), SessionError> {
        self.sync.record().validate()?;
        Ok(())
    }

    #[must_use]
    pub fn is_form_valid(&self) -> bool {
        self.sync.record().is_valid()
    }

    /// Validate locally, then hand the record to `submitter`. An invalid form never
    /// reaches the submitter.
    pub fn submit(&self, submitter: &dyn RegistrationSubmitter) -> Result<(), SessionError> {
        self.ensure_open()?;
        self.validate()?;
        submitter
            .submit(self.sync.record())
            .map_err(SessionError::Submission)
    }

    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let record = self.sync.record().clone();
        SessionSnapshot {
            turns: self.log.turns().to_vec(),
            form_valid: record.is_valid(),
            missing_fields: record.missing_fields(),
            invalid_fields: record.invalid_fields(),
            record,
            state: self.sync.state(),
            transcript: self.capture.transcript().clone(),
            draft: self.draft.clone(),
        }
    }

    #[must_use]
    pub fn log(&self) -> &MessageLog {
        &self.log
    }

    #[must_use]
    pub fn record(&self) -> &RegistrationRecord {
        self.sync.record()
    }

    #[must_use]
    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    #[must_use]
    pub fn markers(&self) -> &MarkerTable {
        self.sync.markers()
    }

    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.capture.is_capturing()
    }

    #[must_use]
    pub fn channel(&self) -> &C {
        &self.channel
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release the speech device, detach channel handlers, and close the channel.
    /// Later calls do nothing.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if self.capture.is_capturing() {
            let _ = self.capture.stop();
        }
        self.channel.close();
        let dropped = self.inbound_rx.try_iter().count();
        tracing::info!(dropped, turns = self.log.len(), "intake session closed");
    }

    fn ensure_open(&self) -> Result<(), SessionError> {
        if self.closed {
            Err(SessionError::SessionClosed)
        } else {
            Ok(())
        }
    }
}

impl<C: SessionChannel> Drop for IntakeSession<C> {
    fn drop(&mut self) {
        self.close();
    }
}
