//! IPC session runtime: stdin commands and channel events feed one intake session.

mod event_sink;
mod loop_runtime;
mod state;
mod stdin_reader;
#[cfg(any(test, feature = "mutants"))]
mod test_support;
#[cfg(test)]
mod tests;

use std::time::Duration;

use anyhow::Context;
use crossbeam_channel::{select, unbounded, Receiver};

use super::protocol::{IpcCommand, IpcEvent};
use crate::capture::SpeechCapture;
use crate::channel::{SessionChannel, SyncEvent, WebSocketChannel};
use crate::config::RuntimeConfig;
use crate::session::IntakeSession;
use crate::submit::HttpSubmitter;
use crate::transcript::CaptureError;

use event_sink::send_event;
use loop_runtime::{check_channel, handle_command, handle_inbound_event, should_exit};
use state::IpcState;
use stdin_reader::spawn_stdin_reader;

const CHANNEL_POLL: Duration = Duration::from_millis(250);

/// The speech device in IPC mode is the UI's own recognizer: starting and stopping are
/// requests to the UI, and its results come back as `voice_*` commands.
struct UiCapture;

impl SpeechCapture for UiCapture {
    fn start(&mut self) -> Result<(), CaptureError> {
        send_event(&IpcEvent::CaptureStart);
        Ok(())
    }

    fn stop(&mut self) {
        send_event(&IpcEvent::CaptureStop);
    }

    fn label(&self) -> &str {
        "ui"
    }
}

/// Connect to the backend and serve the UI over stdio until `quit` or stdin closes.
pub fn run_ipc_mode(config: RuntimeConfig) -> anyhow::Result<()> {
    let markers = config.marker_table().context("loading marker table")?;
    let channel = WebSocketChannel::connect(&config.server_url, config.user_id.clone())
        .with_context(|| format!("connecting to {}", config.server_url))?;
    let submitter = HttpSubmitter::new(config.submit_url.clone(), config.submit_timeout)
        .context("building registration client")?;

    let session = IntakeSession::new(channel, markers).with_capture(Box::new(UiCapture));
    let session = match config.greeting.clone() {
        Some(greeting) => session.with_greeting(greeting),
        None => session,
    };

    let (cmd_tx, cmd_rx) = unbounded();
    let _stdin = spawn_stdin_reader(cmd_tx).context("starting stdin reader")?;

    let mut state = IpcState::new(
        session,
        Box::new(submitter),
        config.user_id.clone(),
        config.server_url.clone(),
    );
    let inbound_rx = state.session.subscribe();
    tracing::info!(user_id = %config.user_id, "ipc session started");
    run_ipc_loop(&mut state, &cmd_rx, &inbound_rx);
    Ok(())
}

fn run_ipc_loop<C: SessionChannel>(
    state: &mut IpcState<C>,
    cmd_rx: &Receiver<IpcCommand>,
    inbound_rx: &Receiver<SyncEvent>,
) {
    state.emit_ready();
    state.emit_snapshot();

    loop {
        select! {
            recv(cmd_rx) -> cmd => match cmd {
                Ok(cmd) => handle_command(state, cmd),
                Err(_) => {
                    tracing::info!("command stream closed");
                    state.exit_requested = true;
                }
            },
            recv(inbound_rx) -> event => {
                if let Ok(event) = event {
                    handle_inbound_event(state, event);
                }
            },
            default(CHANNEL_POLL) => {},
        }
        check_channel(state);
        if should_exit(state) {
            break;
        }
    }

    state.session.close();
    tracing::info!("ipc session finished");
}
