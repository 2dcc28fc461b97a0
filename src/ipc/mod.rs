//! JSON-lines bridge between a UI process and one intake session.

mod protocol;
mod runtime;

pub use protocol::{IpcCommand, IpcEvent};
pub use runtime::run_ipc_mode;
