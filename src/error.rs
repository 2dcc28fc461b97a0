//! Session-level error taxonomy. Every variant is recoverable: the user can retry.

use std::fmt;

use crate::channel::ChannelError;
use crate::registration::{RecordError, ValidationError};
use crate::transcript::CaptureError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    Capture(CaptureError),
    ChannelDelivery(ChannelError),
    /// Submission blocked locally; the backend was not contacted.
    Validation(ValidationError),
    /// The backend refused the registration; carries its reason verbatim.
    Submission(String),
    Record(RecordError),
    SessionClosed,
}

impl SessionError {
    /// Short machine-readable tag for UI clients.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Capture(_) => "capture",
            Self::ChannelDelivery(_) => "channel_delivery",
            Self::Validation(_) => "validation",
            Self::Submission(_) => "submission",
            Self::Record(_) => "record",
            Self::SessionClosed => "session_closed",
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capture(err) => write!(f, "{err}"),
            Self::ChannelDelivery(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "{err}"),
            Self::Submission(reason) => write!(f, "{reason}"),
            Self::Record(err) => write!(f, "{err}"),
            Self::SessionClosed => write!(f, "session is closed"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Capture(err) => Some(err),
            Self::ChannelDelivery(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::Record(err) => Some(err),
            Self::Submission(_) | Self::SessionClosed => None,
        }
    }
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        Self::Capture(err)
    }
}

impl From<ChannelError> for SessionError {
    fn from(err: ChannelError) -> Self {
        Self::ChannelDelivery(err)
    }
}

impl From<ValidationError> for SessionError {
    fn from(err: ValidationError) -> Self {
        Self::Validation(err)
    }
}

impl From<RecordError> for SessionError {
    fn from(err: RecordError) -> Self {
        Self::Record(err)
    }
}
