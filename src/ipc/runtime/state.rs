use super::super::protocol::IpcEvent;
use super::send_event;
use crate::channel::SessionChannel;
use crate::error::SessionError;
use crate::session::IntakeSession;
use crate::submit::RegistrationSubmitter;

pub(super) struct IpcState<C: SessionChannel> {
    pub(super) session: IntakeSession<C>,
    pub(super) submitter: Box<dyn RegistrationSubmitter>,
    pub(super) user_id: String,
    pub(super) server_url: String,
    pub(super) exit_requested: bool,
}

impl<C: SessionChannel> IpcState<C> {
    pub(super) fn new(
        session: IntakeSession<C>,
        submitter: Box<dyn RegistrationSubmitter>,
        user_id: String,
        server_url: String,
    ) -> Self {
        Self {
            session,
            submitter,
            user_id,
            server_url,
            exit_requested: false,
        }
    }

    pub(super) fn emit_ready(&self) {
        send_event(&IpcEvent::Ready {
            version: env!("CARGO_PKG_VERSION").to_string(),
            user_id: self.user_id.clone(),
            server_url: self.server_url.clone(),
            marker_source: self
                .session
                .markers()
                .source_path()
                .map(|path| path.display().to_string()),
        });
    }

    pub(super) fn emit_snapshot(&self) {
        send_event(&IpcEvent::Snapshot(self.session.snapshot()));
    }

    pub(super) fn emit_error(&self, err: &SessionError) {
        self.emit_error_event(err, true);
    }

    /// Report an error the session cannot continue past.
    pub(super) fn emit_fatal(&self, err: &SessionError) {
        self.emit_error_event(err, false);
    }

    fn emit_error_event(&self, err: &SessionError, recoverable: bool) {
        tracing::debug!(kind = err.kind(), recoverable, "reporting session error to ui");
        send_event(&IpcEvent::Error {
            kind: err.kind().to_string(),
            message: err.to_string(),
            recoverable,
        });
    }

    /// Report `result`'s error, if any.
    pub(super) fn report<T>(&self, result: Result<T, SessionError>) {
        if let Err(err) = result {
            self.emit_error(&err);
        }
    }
}
