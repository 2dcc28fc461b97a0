//! Speech hypothesis buffer that turns recognizer output into one editable input value.
//!
//! Continuous recognizers replay a growing hypothesis for the current utterance, so each
//! fragment supersedes the previous one instead of being concatenated to it.

use serde::Serialize;
use std::fmt;

/// Maximum number of superseded hypotheses retained for a single capture.
pub const MAX_FRAGMENTS: usize = 64;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranscriptState {
    pub fragments: Vec<String>,
    pub is_capturing: bool,
}

/// Speech device failure. Capture stops; the user has to start it again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureError {
    pub message: String,
}

impl CaptureError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "speech capture failed: {}", self.message)
    }
}

impl std::error::Error for CaptureError {}

#[derive(Debug, Default)]
pub struct TranscriptBuffer {
    state: TranscriptState,
}

impl TranscriptBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a capture. Returns false (and changes nothing) if one is already running.
    pub fn start_capture(&mut self) -> bool {
        if self.state.is_capturing {
            return false;
        }
        self.state.fragments.clear();
        self.state.is_capturing = true;
        true
    }

    /// Record the recognizer's latest hypothesis. Ignored while not capturing.
    pub fn append_fragment(&mut self, text: &str) -> bool {
        if !self.state.is_capturing {
            return false;
        }
        if self.state.fragments.last().map(String::as_str) == Some(text) {
            return true;
        }
        if self.state.fragments.len() >= MAX_FRAGMENTS {
            self.state.fragments.remove(0);
        }
        self.state.fragments.push(text.to_string());
        true
    }

    /// Latest hypothesis, or "" before the first fragment.
    #[must_use]
    pub fn current(&self) -> &str {
        self.state.fragments.last().map(String::as_str).unwrap_or("")
    }

    /// Flush the current hypothesis while continuing to capture.
    pub fn commit(&mut self) -> String {
        self.flush()
    }

    /// End the capture and return its final text ("" when nothing was capturing).
    pub fn stop_capture(&mut self) -> String {
        if !self.state.is_capturing {
            return String::new();
        }
        self.state.is_capturing = false;
        self.flush()
    }

    /// Device reported an error: stop, drop the partial hypothesis, report it.
    pub fn fail(&mut self, reason: &str) -> CaptureError {
        self.state.is_capturing = false;
        self.state.fragments.clear();
        CaptureError::new(reason)
    }

    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.state.is_capturing
    }

    #[must_use]
    pub fn state(&self) -> &TranscriptState {
        &self.state
    }

    fn flush(&mut self) -> String {
        let text = self.state.fragments.pop().unwrap_or_default();
        self.state.fragments.clear();
        text
    }
}
