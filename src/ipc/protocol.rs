//! Newline-delimited JSON protocol spoken with the UI process.

use serde::{Deserialize, Serialize};

use crate::registration::{Field, FieldValue};
use crate::session::SessionSnapshot;

/// Events written to stdout, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum IpcEvent {
    Ready {
        version: String,
        user_id: String,
        server_url: String,
        marker_source: Option<String>,
    },
    Snapshot(SessionSnapshot),
    /// Ask the UI to start its speech recognizer.
    CaptureStart,
    /// Ask the UI to stop its speech recognizer.
    CaptureStop,
    EditRejected {
        field: Field,
    },
    Submitted,
    Error {
        kind: String,
        message: String,
        recoverable: bool,
    },
}

/// Commands read from stdin, one JSON object per line.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum IpcCommand {
    /// Send `text`, or the current draft when omitted.
    SendMessage {
        #[serde(default)]
        text: Option<String>,
    },
    SetDraft {
        text: String,
    },
    EditField {
        field: Field,
        value: FieldValue,
    },
    StartVoice,
    StopVoice,
    VoiceFragment {
        text: String,
    },
    VoiceError {
        message: String,
    },
    VoiceEnded,
    CommitTranscript,
    Submit,
    GetSnapshot,
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_tagged_json() {
        let cmd: IpcCommand = serde_json::from_str(r#"{"cmd":"send_message"}"#).expect("parse");
        assert_eq!(cmd, IpcCommand::SendMessage { text: None });

        let cmd: IpcCommand =
            serde_json::from_str(r#"{"cmd":"edit_field","field":"hasLicense","value":true}"#)
                .expect("parse");
        assert_eq!(
            cmd,
            IpcCommand::EditField {
                field: Field::HasLicense,
                value: FieldValue::Flag(true)
            }
        );

        let cmd: IpcCommand =
            serde_json::from_str(r#"{"cmd":"voice_fragment","text":"my name is"}"#).expect("parse");
        assert_eq!(
            cmd,
            IpcCommand::VoiceFragment {
                text: "my name is".to_string()
            }
        );
    }

    #[test]
    fn unknown_commands_are_rejected() {
        assert!(serde_json::from_str::<IpcCommand>(r#"{"cmd":"reboot"}"#).is_err());
        assert!(serde_json::from_str::<IpcCommand>(
            r#"{"cmd":"edit_field","field":"firstName","value":"x"}"#
        )
        .is_err());
    }

    #[test]
    fn events_serialize_with_event_tag() {
        let json = serde_json::to_value(IpcEvent::Error {
            kind: "validation".to_string(),
            message: "missing required fields: phone".to_string(),
            recoverable: true,
        })
        .expect("serialize");
        assert_eq!(json["event"], "error");
        assert_eq!(json["kind"], "validation");

        let json = serde_json::to_value(IpcEvent::CaptureStart).expect("serialize");
        assert_eq!(json, serde_json::json!({"event": "capture_start"}));

        let json = serde_json::to_value(IpcEvent::EditRejected {
            field: Field::FullName,
        })
        .expect("serialize");
        assert_eq!(json["field"], "fullName");
    }
}
