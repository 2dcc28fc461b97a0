//! JSON trace logging to a file, since stdout carries the IPC protocol.

use crate::config::RuntimeConfig;
use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;
use tracing_subscriber::fmt::time::UtcTime;

static TRACING_INIT: OnceLock<()> = OnceLock::new();
static LOG_CONTENT_ENABLED: AtomicBool = AtomicBool::new(false);

#[must_use]
pub fn tracing_log_path() -> PathBuf {
    env::var("DRIVEBOT_TRACE_LOG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| env::temp_dir().join("drivebot_trace.jsonl"))
}

fn init_tracing_once(config: &RuntimeConfig, once: &OnceLock<()>) {
    if !config.logging_enabled() {
        return;
    }

    let _ = once.get_or_init(|| {
        let path = tracing_log_path();
        let file = match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => file,
            Err(_) => return,
        };
        let subscriber = tracing_subscriber::fmt()
            .json()
            .with_max_level(tracing::Level::DEBUG)
            .with_timer(UtcTime::rfc_3339())
            .with_writer(file)
            .with_current_span(false)
            .with_span_list(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Install the trace subscriber when `--logs` is on and record the content policy.
pub fn init_logging(config: &RuntimeConfig) {
    LOG_CONTENT_ENABLED.store(
        config.logging_enabled() && config.log_content,
        Ordering::Relaxed,
    );
    init_tracing_once(config, &TRACING_INIT);
}

#[must_use]
pub fn content_logging_enabled() -> bool {
    LOG_CONTENT_ENABLED.load(Ordering::Relaxed)
}

/// Debug log for messages that carry user content (chat text, transcripts, field values).
pub fn log_debug_content(msg: &str) {
    if !content_logging_enabled() {
        return;
    }
    tracing::debug!(target: "drivebot::content", "{msg}");
}
