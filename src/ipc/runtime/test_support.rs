use std::cell::RefCell;

use super::super::protocol::IpcEvent;

thread_local! {
    /// `Some` once a test on this thread starts recording; events then bypass stdout.
    static RECORDED: RefCell<Option<Vec<IpcEvent>>> = const { RefCell::new(None) };
}

pub(super) fn capture_test_event(event: &IpcEvent) -> bool {
    RECORDED.with(|recorded| match recorded.borrow_mut().as_mut() {
        Some(events) => {
            events.push(event.clone());
            true
        }
        None => false,
    })
}

/// Start recording on this thread (if not already) and return the current mark.
#[cfg_attr(not(test), allow(dead_code))]
pub(super) fn event_snapshot() -> usize {
    RECORDED.with(|recorded| recorded.borrow_mut().get_or_insert_with(Vec::new).len())
}

#[cfg_attr(not(test), allow(dead_code))]
pub(super) fn events_since(start: usize) -> Vec<IpcEvent> {
    RECORDED.with(|recorded| {
        recorded
            .borrow()
            .as_ref()
            .map(|events| events.iter().skip(start).cloned().collect())
            .unwrap_or_default()
    })
}
