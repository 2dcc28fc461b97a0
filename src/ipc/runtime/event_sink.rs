use super::super::protocol::IpcEvent;
#[cfg(any(test, feature = "mutants"))]
use super::test_support;
use std::io::{self, Write};

pub(super) fn send_event(event: &IpcEvent) {
    #[cfg(any(test, feature = "mutants"))]
    if test_support::capture_test_event(event) {
        return;
    }
    match serde_json::to_string(event) {
        Ok(json) => {
            let mut stdout = io::stdout().lock();
            if let Err(err) = writeln!(stdout, "{json}") {
                tracing::warn!(%err, "ipc event write failed");
                return;
            }
            if let Err(err) = stdout.flush() {
                tracing::warn!(%err, "ipc event flush failed");
            }
        }
        Err(err) => {
            tracing::error!(%err, "ipc event serialization failed");
        }
    }
}

#[cfg(test)]
pub(super) fn event_snapshot() -> usize {
    test_support::event_snapshot()
}

#[cfg(test)]
pub(super) fn events_since(start: usize) -> Vec<IpcEvent> {
    test_support::events_since(start)
}
