//! IPC loop helpers for command dispatch, inbound ticks, and exit policy.

use super::super::protocol::{IpcCommand, IpcEvent};
use super::{send_event, IpcState};
use crate::capture::CaptureSignal;
use crate::channel::{ChannelError, SessionChannel, SyncEvent};
use crate::error::SessionError;
use crate::sync::{EditDecision, SyncOutcome};

pub(super) fn handle_command<C: SessionChannel>(state: &mut IpcState<C>, cmd: IpcCommand) {
    match cmd {
        IpcCommand::SendMessage { text } => {
            let result = match text {
                Some(text) => state.session.send_text(&text),
                None => state.session.send_draft(),
            };
            state.report(result);
        }
        IpcCommand::SetDraft { text } => {
            state.session.set_draft(text);
        }
        IpcCommand::EditField { field, value } => match state.session.edit_field(field, value) {
            Ok(EditDecision::Rejected) => send_event(&IpcEvent::EditRejected { field }),
            Ok(EditDecision::Accepted { .. }) => {}
            Err(err) => state.emit_error(&err),
        },
        IpcCommand::StartVoice => {
            let result = state.session.start_capture();
            state.report(result);
        }
        IpcCommand::StopVoice => {
            let result = state.session.stop_capture();
            state.report(result);
        }
        IpcCommand::VoiceFragment { text } => {
            let result = state.session.capture_signal(CaptureSignal::Fragment(text));
            state.report(result);
        }
        IpcCommand::VoiceError { message } => {
            let result = state.session.capture_signal(CaptureSignal::Error(message));
            state.report(result);
        }
        IpcCommand::VoiceEnded => {
            let result = state.session.capture_signal(CaptureSignal::Ended);
            state.report(result);
        }
        IpcCommand::CommitTranscript => {
            let result = state.session.commit_transcript();
            state.report(result);
        }
        IpcCommand::Submit => match state.session.submit(state.submitter.as_ref()) {
            Ok(()) => send_event(&IpcEvent::Submitted),
            Err(err) => state.emit_error(&err),
        },
        IpcCommand::GetSnapshot => {}
        IpcCommand::Quit => {
            state.exit_requested = true;
            return;
        }
    }
    state.emit_snapshot();
}

/// Handle one inbound event plus whatever queued up behind it, then publish one snapshot.
pub(super) fn handle_inbound_event<C: SessionChannel>(state: &mut IpcState<C>, event: SyncEvent) {
    match state.session.handle_inbound(event) {
        Ok(SyncOutcome::FieldRejected { field, error }) => {
            tracing::warn!(field = %field, %error, "backend sent an unusable field value");
        }
        Ok(_) => {}
        Err(err) => {
            state.emit_error(&err);
            return;
        }
    }
    state.session.dispatch_tick();
    state.emit_snapshot();
}

/// End the session once the backend has hung up.
pub(super) fn check_channel<C: SessionChannel>(state: &mut IpcState<C>) {
    if state.session.is_closed() || !state.session.channel().is_closed() {
        return;
    }
    tracing::warn!("backend closed the session channel");
    state.emit_fatal(&SessionError::ChannelDelivery(ChannelError::Closed));
    state.exit_requested = true;
}

pub(super) fn should_exit<C: SessionChannel>(state: &IpcState<C>) -> bool {
    state.exit_requested
}
