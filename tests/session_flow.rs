//! End-to-end intake flows against the in-memory backend.

use std::cell::Cell;

use drivebot::channel::{MemoryChannel, MemoryRemote, OutboundEvent};
use drivebot::{
    DeliveryStatus, EditAuthority, EditDecision, Field, FieldValue, IntakeSession, MarkerTable,
    Origin, RegistrationRecord, RegistrationSubmitter, SessionError, SyncState,
};

struct CountingSubmitter {
    calls: Cell<usize>,
    reply: Result<(), String>,
}

impl CountingSubmitter {
    fn accepting() -> Self {
        Self {
            calls: Cell::new(0),
            reply: Ok(()),
        }
    }
}

impl RegistrationSubmitter for CountingSubmitter {
    fn submit(&self, _record: &RegistrationRecord) -> Result<(), String> {
        self.calls.set(self.calls.get() + 1);
        self.reply.clone()
    }
}

fn start_session() -> (IntakeSession<MemoryChannel>, MemoryRemote) {
    let (channel, remote) = MemoryChannel::new("guest-flow");
    let mut session = IntakeSession::new(channel, MarkerTable::builtin());
    session.subscribe();
    (session, remote)
}

fn backend_says(session: &mut IntakeSession<MemoryChannel>, remote: &MemoryRemote, text: &str) {
    assert!(remote.say(text));
    session.dispatch_tick();
}

fn backend_sets(
    session: &mut IntakeSession<MemoryChannel>,
    remote: &MemoryRemote,
    field: Field,
    value: FieldValue,
) {
    assert!(remote.update_field(field, value));
    session.dispatch_tick();
}

#[test]
fn guided_full_name_entry() {
    let (mut session, remote) = start_session();

    backend_says(&mut session, &remote, "Hi there! What's your full name?");
    assert_eq!(session.sync_state(), SyncState::AwaitingField(Field::FullName));
    assert_eq!(
        session.record().authority(Field::FullName),
        EditAuthority::ChatControlled
    );

    let decision = session
        .edit_field(Field::FullName, FieldValue::text("Typed Name"))
        .expect("edit");
    assert_eq!(decision, EditDecision::Rejected);
    assert_eq!(session.record().text(Field::FullName), "");

    session.send_text("Jane Doe").expect("send answer");
    backend_sets(&mut session, &remote, Field::FullName, FieldValue::text("Jane Doe"));
    assert_eq!(session.record().text(Field::FullName), "Jane Doe");

    backend_says(&mut session, &remote, "Thanks for the info!");
    assert_eq!(session.sync_state(), SyncState::Idle);
    assert_eq!(
        session.record().authority(Field::FullName),
        EditAuthority::UserControlled
    );

    let turns = session.log().turns();
    let origins: Vec<Origin> = turns.iter().map(|turn| turn.origin()).collect();
    assert_eq!(origins, vec![Origin::Bot, Origin::User, Origin::Bot]);
    assert_eq!(turns[1].delivery_status(), DeliveryStatus::Delivered);
    assert_eq!(
        remote.outbound(),
        vec![OutboundEvent::Message {
            text: "Jane Doe".to_string(),
            user_id: "guest-flow".to_string()
        }]
    );
}

#[test]
fn whole_backend_dialogue_fills_a_valid_form() {
    let (mut session, remote) = start_session();
    let dialogue = [
        ("What's your full name?", Field::FullName, FieldValue::text("Jane Doe")),
        ("What's your email address?", Field::Email, FieldValue::text("jane@example.com")),
        ("Can you provide your phone number?", Field::Phone, FieldValue::text("555-0100")),
        ("What's your date of birth?", Field::DateOfBirth, FieldValue::text("1990-04-01")),
        ("Please provide your address.", Field::Address, FieldValue::text("1 Main St")),
        ("Do you have a driving license? (Yes/No)", Field::HasLicense, FieldValue::text("yes")),
        (
            "If you have a license, please provide the license number.",
            Field::LicenseNumber,
            FieldValue::text("D1234567"),
        ),
        (
            "What transmission do you prefer? (Automatic/Manual)",
            Field::PreferredTransmission,
            FieldValue::text("Manual"),
        ),
    ];
    for (prompt, field, value) in dialogue {
        backend_says(&mut session, &remote, prompt);
        assert_eq!(session.sync_state(), SyncState::AwaitingField(field));
        backend_sets(&mut session, &remote, field, value);
    }
    assert_eq!(session.record().chat_controlled().count(), Field::ALL.len());

    backend_says(&mut session, &remote, "Thanks for the info! You're all set.");
    assert_eq!(session.record().chat_controlled().count(), 0);
    assert!(session.record().flag(Field::HasLicense));
    assert_eq!(session.record().text(Field::PreferredTransmission), "Manual");

    let submitter = CountingSubmitter::accepting();
    session.submit(&submitter).expect("valid form submits");
    assert_eq!(submitter.calls.get(), 1);
}

#[test]
fn license_number_is_only_required_when_licensed() {
    let (mut session, _remote) = start_session();
    for (field, value) in [
        (Field::FullName, "Jane Doe"),
        (Field::Email, "jane@example.com"),
        (Field::Phone, "555-0100"),
        (Field::DateOfBirth, "1990-04-01"),
        (Field::Address, "1 Main St"),
    ] {
        session
            .edit_field(field, FieldValue::text(value))
            .expect("edit");
    }
    session
        .edit_field(Field::HasLicense, FieldValue::Flag(false))
        .expect("edit");
    assert!(session.is_form_valid());
    assert_eq!(session.record().text(Field::LicenseNumber), "");

    session
        .edit_field(Field::HasLicense, FieldValue::Flag(true))
        .expect("edit");
    assert!(!session.is_form_valid());
    let submitter = CountingSubmitter::accepting();
    let err = session.submit(&submitter).expect_err("blocked locally");
    assert!(matches!(err, SessionError::Validation(_)));
    assert_eq!(submitter.calls.get(), 0, "backend never contacted");
    assert_eq!(session.snapshot().missing_fields, vec![Field::LicenseNumber]);
}

#[test]
fn backend_updates_land_while_idle_and_user_edits_are_forwarded() {
    let (mut session, remote) = start_session();
    backend_sets(
        &mut session,
        &remote,
        Field::Email,
        FieldValue::text("jane@example.com"),
    );
    assert_eq!(session.sync_state(), SyncState::Idle);
    assert_eq!(session.record().text(Field::Email), "jane@example.com");

    session
        .edit_field(Field::Email, FieldValue::text("jane.doe@example.com"))
        .expect("edit");
    assert_eq!(
        remote.outbound(),
        vec![OutboundEvent::FieldUpdate {
            field: Field::Email,
            value: FieldValue::text("jane.doe@example.com"),
            user_id: "guest-flow".to_string()
        }]
    );
}

#[test]
fn backend_transmission_lands_as_sent_and_gates_submission() {
    let (mut session, remote) = start_session();
    for (field, value) in [
        (Field::FullName, "Jane Doe"),
        (Field::Email, "jane@example.com"),
        (Field::Phone, "555-0100"),
        (Field::DateOfBirth, "1990-04-01"),
        (Field::Address, "1 Main St"),
    ] {
        session
            .edit_field(field, FieldValue::text(value))
            .expect("edit");
    }
    backend_sets(
        &mut session,
        &remote,
        Field::PreferredTransmission,
        FieldValue::text("Automatic please"),
    );
    assert_eq!(
        session.record().text(Field::PreferredTransmission),
        "Automatic please"
    );
    let snapshot = session.snapshot();
    assert!(!snapshot.form_valid);
    assert_eq!(snapshot.invalid_fields, vec![Field::PreferredTransmission]);

    session
        .edit_field(Field::PreferredTransmission, FieldValue::text("automatic"))
        .expect("user fixes it");
    assert!(session.is_form_valid());
}

#[test]
fn malformed_license_answer_does_not_corrupt_the_record() {
    let (mut session, remote) = start_session();
    backend_sets(
        &mut session,
        &remote,
        Field::HasLicense,
        FieldValue::text("perhaps"),
    );
    assert!(!session.record().flag(Field::HasLicense));
}

#[test]
fn submission_rejection_is_surfaced_verbatim() {
    let (mut session, _remote) = start_session();
    for (field, value) in [
        (Field::FullName, "Jane Doe"),
        (Field::Email, "jane@example.com"),
        (Field::Phone, "555-0100"),
        (Field::DateOfBirth, "1990-04-01"),
        (Field::Address, "1 Main St"),
    ] {
        session
            .edit_field(field, FieldValue::text(value))
            .expect("edit");
    }
    let submitter = CountingSubmitter {
        calls: Cell::new(0),
        reply: Err("Email already registered".to_string()),
    };
    let err = session.submit(&submitter).expect_err("rejected");
    assert_eq!(err, SessionError::Submission("Email already registered".to_string()));
    assert_eq!(err.to_string(), "Email already registered");
}

#[test]
fn closed_session_ignores_the_backend() {
    let (mut session, remote) = start_session();
    session.close();
    assert!(!remote.say("What's your full name?"));
    assert_eq!(session.dispatch_tick(), 0);
    assert_eq!(session.sync_state(), SyncState::Idle);
    assert!(session.log().is_empty());
}
