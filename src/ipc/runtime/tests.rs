use super::event_sink::{event_snapshot, events_since};
use super::loop_runtime::{check_channel, handle_command, handle_inbound_event};
use super::*;
use crate::channel::{MemoryChannel, MemoryRemote};
use crate::markers::MarkerTable;
use crate::registration::{Field, FieldValue, RegistrationRecord};
use crate::submit::RegistrationSubmitter;
use crate::sync::SyncState;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
struct StubSubmitter {
    calls: Arc<AtomicUsize>,
    reject_with: Option<String>,
}

impl RegistrationSubmitter for StubSubmitter {
    fn submit(&self, _record: &RegistrationRecord) -> Result<(), String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.reject_with {
            Some(reason) => Err(reason.clone()),
            None => Ok(()),
        }
    }
}

fn ipc_state(submitter: StubSubmitter) -> (IpcState<MemoryChannel>, MemoryRemote) {
    let (channel, remote) = MemoryChannel::new("guest-ipc");
    let mut session = IntakeSession::new(channel, MarkerTable::builtin())
        .with_capture(Box::new(UiCapture))
        .with_greeting("Hello!");
    session.subscribe();
    let state = IpcState::new(
        session,
        Box::new(submitter),
        "guest-ipc".to_string(),
        "ws://127.0.0.1:5000/session".to_string(),
    );
    (state, remote)
}

fn last_snapshot(events: &[IpcEvent]) -> crate::session::SessionSnapshot {
    events
        .iter()
        .rev()
        .find_map(|event| match event {
            IpcEvent::Snapshot(snapshot) => Some(snapshot.clone()),
            _ => None,
        })
        .expect("a snapshot event")
}

fn error_kinds(events: &[IpcEvent]) -> Vec<String> {
    events
        .iter()
        .filter_map(|event| match event {
            IpcEvent::Error { kind, .. } => Some(kind.clone()),
            _ => None,
        })
        .collect()
}

fn fill_required(state: &mut IpcState<MemoryChannel>) {
    for (field, value) in [
        (Field::FullName, "Jane Doe"),
        (Field::Email, "jane@example.com"),
        (Field::Phone, "555-0100"),
        (Field::DateOfBirth, "1990-04-01"),
        (Field::Address, "1 Main St"),
    ] {
        handle_command(
            state,
            IpcCommand::EditField {
                field,
                value: FieldValue::text(value),
            },
        );
    }
}

#[test]
fn every_command_is_followed_by_a_snapshot() {
    let (mut state, remote) = ipc_state(StubSubmitter::default());
    let start = event_snapshot();
    handle_command(
        &mut state,
        IpcCommand::SetDraft {
            text: "hello bot".to_string(),
        },
    );
    handle_command(&mut state, IpcCommand::SendMessage { text: None });
    let events = events_since(start);
    assert_eq!(events.len(), 2);
    let snapshot = last_snapshot(&events);
    assert_eq!(snapshot.draft, "");
    assert_eq!(snapshot.turns.len(), 2);
    assert_eq!(snapshot.turns[1].text(), "hello bot");
    assert_eq!(remote.outbound().len(), 1);
}

#[test]
fn inbound_prompt_then_rejected_edit() {
    let (mut state, remote) = ipc_state(StubSubmitter::default());
    let start = event_snapshot();
    remote.say("What's your full name?");
    let first = state.session.subscribe().try_recv().expect("queued event");
    handle_inbound_event(&mut state, first);
    handle_command(
        &mut state,
        IpcCommand::EditField {
            field: Field::FullName,
            value: FieldValue::text("Typed"),
        },
    );
    let events = events_since(start);
    assert!(events.contains(&IpcEvent::EditRejected {
        field: Field::FullName
    }));
    let snapshot = last_snapshot(&events);
    assert_eq!(snapshot.state, SyncState::AwaitingField(Field::FullName));
    assert_eq!(snapshot.record.text(Field::FullName), "");
}

#[test]
fn inbound_tick_drains_everything_queued() {
    let (mut state, remote) = ipc_state(StubSubmitter::default());
    remote.update_field(Field::Email, FieldValue::text("a@example.com"));
    remote.update_field(Field::Email, FieldValue::text("b@example.com"));
    let start = event_snapshot();
    let first = state.session.subscribe().try_recv().expect("queued event");
    handle_inbound_event(&mut state, first);
    let events = events_since(start);
    assert_eq!(events.len(), 1, "one snapshot per tick");
    assert_eq!(last_snapshot(&events).record.text(Field::Email), "b@example.com");
}

#[test]
fn voice_commands_drive_the_ui_recognizer() {
    let (mut state, _remote) = ipc_state(StubSubmitter::default());
    let start = event_snapshot();
    handle_command(&mut state, IpcCommand::StartVoice);
    handle_command(
        &mut state,
        IpcCommand::VoiceFragment {
            text: "automatic".to_string(),
        },
    );
    handle_command(&mut state, IpcCommand::VoiceEnded);
    let events = events_since(start);
    assert_eq!(events[0], IpcEvent::CaptureStart);
    assert!(events.contains(&IpcEvent::CaptureStop));
    let snapshot = last_snapshot(&events);
    assert_eq!(snapshot.draft, "automatic");
    assert!(!snapshot.transcript.is_capturing);
}

#[test]
fn voice_error_is_reported_as_capture_error() {
    let (mut state, _remote) = ipc_state(StubSubmitter::default());
    handle_command(&mut state, IpcCommand::StartVoice);
    let start = event_snapshot();
    handle_command(
        &mut state,
        IpcCommand::VoiceError {
            message: "not-allowed".to_string(),
        },
    );
    let events = events_since(start);
    assert_eq!(error_kinds(&events), vec!["capture".to_string()]);
    assert!(!last_snapshot(&events).transcript.is_capturing);
}

#[test]
fn submit_is_blocked_until_the_form_is_valid() {
    let submitter = StubSubmitter::default();
    let (mut state, _remote) = ipc_state(submitter.clone());
    let start = event_snapshot();
    handle_command(&mut state, IpcCommand::Submit);
    assert_eq!(error_kinds(&events_since(start)), vec!["validation".to_string()]);
    assert_eq!(submitter.calls.load(Ordering::SeqCst), 0);

    fill_required(&mut state);
    let start = event_snapshot();
    handle_command(&mut state, IpcCommand::Submit);
    let events = events_since(start);
    assert_eq!(events[0], IpcEvent::Submitted);
    assert_eq!(submitter.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn backend_rejection_is_surfaced_verbatim() {
    let submitter = StubSubmitter {
        reject_with: Some("Email already registered".to_string()),
        ..StubSubmitter::default()
    };
    let (mut state, _remote) = ipc_state(submitter);
    fill_required(&mut state);
    let start = event_snapshot();
    handle_command(&mut state, IpcCommand::Submit);
    let events = events_since(start);
    assert!(events.contains(&IpcEvent::Error {
        kind: "submission".to_string(),
        message: "Email already registered".to_string(),
        recoverable: true,
    }));
}

#[test]
fn loop_emits_ready_then_exits_on_quit_and_closes_the_session() {
    let (mut state, remote) = ipc_state(StubSubmitter::default());
    let inbound_rx = state.session.subscribe();
    let (cmd_tx, cmd_rx) = unbounded();
    cmd_tx.send(IpcCommand::GetSnapshot).expect("queue");
    cmd_tx.send(IpcCommand::Quit).expect("queue");

    let start = event_snapshot();
    run_ipc_loop(&mut state, &cmd_rx, &inbound_rx);
    let events = events_since(start);

    assert!(matches!(
        &events[0],
        IpcEvent::Ready { user_id, marker_source: None, .. } if user_id == "guest-ipc"
    ));
    assert!(matches!(events[1], IpcEvent::Snapshot(_)));
    assert!(state.session.is_closed());
    assert!(remote.is_closed());
}

#[test]
fn loop_exits_when_the_command_stream_closes() {
    let (mut state, _remote) = ipc_state(StubSubmitter::default());
    let inbound_rx = state.session.subscribe();
    let (cmd_tx, cmd_rx) = unbounded::<IpcCommand>();
    drop(cmd_tx);
    run_ipc_loop(&mut state, &cmd_rx, &inbound_rx);
    assert!(state.exit_requested);
    assert!(state.session.is_closed());
}

#[test]
fn backend_hang_up_is_reported_and_ends_the_session() {
    let (mut state, remote) = ipc_state(StubSubmitter::default());
    let start = event_snapshot();
    check_channel(&mut state);
    assert!(events_since(start).is_empty(), "live channel is left alone");
    assert!(!state.exit_requested);

    remote.disconnect();
    check_channel(&mut state);
    let events = events_since(start);
    assert!(matches!(
        events.as_slice(),
        [IpcEvent::Error { kind, recoverable: false, .. }] if kind == "channel_delivery"
    ));
    assert!(state.exit_requested);
}

#[test]
fn loop_exits_when_the_backend_hangs_up() {
    let (mut state, remote) = ipc_state(StubSubmitter::default());
    let (_cmd_tx, cmd_rx) = unbounded::<IpcCommand>();
    let inbound_rx = state.session.subscribe();
    remote.disconnect();

    let start = event_snapshot();
    run_ipc_loop(&mut state, &cmd_rx, &inbound_rx);
    let events = events_since(start);
    assert_eq!(error_kinds(&events), vec!["channel_delivery".to_string()]);
    assert!(state.session.is_closed());
}
