use std::io::{self, BufRead};
use std::thread;

use crossbeam_channel::Sender;

use super::super::protocol::{IpcCommand, IpcEvent};
use super::send_event;

pub(super) fn spawn_stdin_reader(
    tx: Sender<IpcCommand>,
) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("drivebot-stdin".to_string())
        .spawn(move || {
            let forwarded = forward_commands(io::stdin().lock(), &tx);
            tracing::debug!(forwarded, "stdin reader thread exiting");
        })
}

/// Forward one JSON command per line until input ends or the loop goes away. Blank
/// lines are skipped; unparseable ones are reported to the UI and skipped. Returns the
/// number of commands forwarded.
fn forward_commands<R: BufRead>(input: R, tx: &Sender<IpcCommand>) -> usize {
    let mut forwarded = 0;
    for line in input.lines() {
        let Ok(line) = line else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<IpcCommand>(line) {
            Ok(cmd) => {
                if tx.send(cmd).is_err() {
                    break;
                }
                forwarded += 1;
            }
            Err(err) => {
                tracing::debug!(%err, "unparseable ipc command");
                send_event(&IpcEvent::Error {
                    kind: "invalid_command".to_string(),
                    message: format!("Invalid command: {err}"),
                    recoverable: true,
                });
            }
        }
    }
    forwarded
}
