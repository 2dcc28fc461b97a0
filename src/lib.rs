//! DriveBot intake core: keeps chat turns, speech transcripts, and the registration form
//! in one ordered session state.

pub mod capture;
pub mod channel;
pub mod config;
pub mod error;
pub mod ipc;
mod lock;
mod logging;
pub mod markers;
pub mod message_log;
pub mod registration;
pub mod session;
pub mod submit;
pub mod sync;
pub mod transcript;

pub(crate) use lock::lock_or_recover;
pub use logging::{content_logging_enabled, init_logging, log_debug_content, tracing_log_path};

pub use capture::{CaptureController, CaptureSignal, SpeechCapture};
pub use channel::{ChannelError, OutboundEvent, SessionChannel, SyncEvent};
pub use error::SessionError;
pub use markers::{MarkerMatch, MarkerTable};
pub use message_log::{ConversationTurn, DeliveryStatus, MessageLog, Origin};
pub use registration::{EditAuthority, Field, FieldValue, RegistrationRecord, ValidationError};
pub use session::{IntakeSession, SessionSnapshot};
pub use submit::{HttpSubmitter, RegistrationSubmitter};
pub use sync::{EditDecision, FieldSynchronizer, SyncOutcome, SyncState};
pub use transcript::{CaptureError, TranscriptBuffer, TranscriptState};
