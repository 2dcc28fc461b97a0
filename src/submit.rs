//! Registration submission: the final hand-off of a validated record.

use std::time::Duration;

use crate::log_debug_content;
use crate::registration::RegistrationRecord;

/// Backend that accepts a completed registration. Rejections carry the backend's reason.
pub trait RegistrationSubmitter {
    fn submit(&self, record: &RegistrationRecord) -> Result<(), String>;
}

/// POSTs the record as a flat camelCase JSON object.
pub struct HttpSubmitter {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpSubmitter {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl RegistrationSubmitter for HttpSubmitter {
    fn submit(&self, record: &RegistrationRecord) -> Result<(), String> {
        let payload = serde_json::Value::Object(record.to_payload());
        log_debug_content(&format!("submitting registration: {payload}"));
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .map_err(|err| format!("registration request failed: {err}"))?;
        let status = response.status();
        if status.is_success() {
            tracing::info!(status = status.as_u16(), "registration accepted");
            return Ok(());
        }
        let body = response.text().unwrap_or_default();
        tracing::warn!(status = status.as_u16(), "registration rejected");
        if body.trim().is_empty() {
            Err(status.to_string())
        } else {
            Err(body)
        }
    }
}
