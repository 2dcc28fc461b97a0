//! Speech capture device ownership.
//!
//! The controller holds the recognizer as a scoped resource: once started it is released
//! exactly once, on stop, end of speech, device error, or drop.

use crate::transcript::{CaptureError, TranscriptBuffer, TranscriptState};

/// A speech recognizer the session can start and stop. Results arrive separately as
/// [`CaptureSignal`]s.
pub trait SpeechCapture: Send {
    fn start(&mut self) -> Result<(), CaptureError>;
    fn stop(&mut self);
    fn label(&self) -> &str;
}

/// Recognizer output delivered back to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureSignal {
    /// Latest hypothesis for the current utterance.
    Fragment(String),
    Ended,
    Error(String),
}

pub struct CaptureController {
    device: Option<Box<dyn SpeechCapture>>,
    buffer: TranscriptBuffer,
    device_active: bool,
}

impl CaptureController {
    pub fn new(device: Option<Box<dyn SpeechCapture>>) -> Self {
        Self {
            device,
            buffer: TranscriptBuffer::new(),
            device_active: false,
        }
    }

    #[must_use]
    pub fn device_label(&self) -> Option<&str> {
        self.device.as_deref().map(|device| device.label())
    }

    /// Acquire the device and begin a capture. A capture already running is left alone.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.buffer.is_capturing() {
            return Ok(());
        }
        let Some(device) = self.device.as_mut() else {
            return Err(CaptureError::new("no speech capture device available"));
        };
        device.start()?;
        self.device_active = true;
        self.buffer.start_capture();
        tracing::debug!(device = device.label(), "speech capture started");
        Ok(())
    }

    /// Feed one recognizer signal. Returns the final text when the utterance ended.
    pub fn signal(&mut self, signal: CaptureSignal) -> Result<Option<String>, CaptureError> {
        match signal {
            CaptureSignal::Fragment(text) => {
                self.buffer.append_fragment(&text);
                Ok(None)
            }
            CaptureSignal::Ended => {
                if !self.buffer.is_capturing() {
                    return Ok(None);
                }
                self.release();
                Ok(Some(self.buffer.stop_capture()))
            }
            CaptureSignal::Error(message) => {
                self.release();
                let err = self.buffer.fail(&message);
                tracing::warn!(%err, "speech capture failed");
                Err(err)
            }
        }
    }

    /// Stop capturing and return the final text ("" when nothing was captured).
    pub fn stop(&mut self) -> String {
        self.release();
        self.buffer.stop_capture()
    }

    pub fn commit(&mut self) -> String {
        self.buffer.commit()
    }

    #[must_use]
    pub fn is_capturing(&self) -> bool {
        self.buffer.is_capturing()
    }

    #[must_use]
    pub fn current(&self) -> &str {
        self.buffer.current()
    }

    #[must_use]
    pub fn transcript(&self) -> &TranscriptState {
        self.buffer.state()
    }

    fn release(&mut self) {
        if !self.device_active {
            return;
        }
        self.device_active = false;
        if let Some(device) = self.device.as_mut() {
            device.stop();
            tracing::debug!(device = device.label(), "speech capture device released");
        }
    }
}

impl Drop for CaptureController {
    fn drop(&mut self) {
        self.release();
    }
}
