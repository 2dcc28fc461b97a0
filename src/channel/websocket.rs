//! WebSocket session channel: JSON text frames over `tokio-tungstenite`.
//!
//! A private tokio runtime runs one reader task and one writer task. The reader decodes
//! frames and dispatches them to the subscription table; the writer drains an unbounded
//! queue so `send` never blocks the caller.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;

use super::{
    ChannelError, FieldUpdateHandler, MessageHandler, OutboundEvent, SessionChannel,
    Subscriptions, SyncEvent,
};
use crate::registration::{Field, FieldValue};
use crate::{lock_or_recover, log_debug_content};

const SHUTDOWN_GRACE: Duration = Duration::from_millis(250);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

pub struct WebSocketChannel {
    user_id: String,
    subscriptions: Arc<Mutex<Subscriptions>>,
    outbound: Option<UnboundedSender<Message>>,
    writer: Option<JoinHandle<()>>,
    runtime: Option<Runtime>,
    closed: Arc<AtomicBool>,
}

impl WebSocketChannel {
    /// Open the socket and start the reader and writer tasks.
    pub fn connect(url: &str, user_id: impl Into<String>) -> Result<Self, ChannelError> {
        Self::connect_with_timeout(url, user_id, CONNECT_TIMEOUT)
    }

    /// Like [`connect`](Self::connect), giving up when the handshake takes longer than
    /// `timeout`.
    pub fn connect_with_timeout(
        url: &str,
        user_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ChannelError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("drivebot-ws")
            .enable_all()
            .build()
            .map_err(|err| ChannelError::Transport(format!("runtime: {err}")))?;

        let (stream, _response) = runtime
            .block_on(async { tokio::time::timeout(timeout, connect_async(url)).await })
            .map_err(|_| {
                ChannelError::Transport(format!("{url}: no handshake within {timeout:?}"))
            })?
            .map_err(|err| ChannelError::Transport(format!("{url}: {err}")))?;
        tracing::info!(url, "session channel connected");

        let (mut sink, mut source) = stream.split();
        let subscriptions = Arc::new(Mutex::new(Subscriptions::default()));
        let closed = Arc::new(AtomicBool::new(false));
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        let writer = runtime.spawn(async move {
            while let Some(message) = rx.recv().await {
                let closing = matches!(message, Message::Close(_));
                if let Err(err) = sink.send(message).await {
                    tracing::warn!(%err, "session channel write failed");
                    break;
                }
                if closing {
                    break;
                }
            }
            let _ = sink.close().await;
        });

        let reader_subscriptions = Arc::clone(&subscriptions);
        let reader_closed = Arc::clone(&closed);
        runtime.spawn(async move {
            while let Some(frame) = source.next().await {
                match frame {
                    Ok(Message::Text(text)) => match SyncEvent::decode(&text) {
                        Ok(event) => {
                            log_debug_content(&format!("inbound frame: {text}"));
                            let delivered =
                                lock_or_recover(&reader_subscriptions, "websocket dispatch")
                                    .dispatch(event);
                            if !delivered {
                                break;
                            }
                        }
                        Err(err) => tracing::warn!(%err, "dropping undecodable frame"),
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        tracing::warn!(%err, "session channel read failed");
                        break;
                    }
                }
            }
            if !reader_closed.swap(true, Ordering::SeqCst) {
                tracing::warn!("backend closed the session channel");
            }
            tracing::debug!("session channel reader exiting");
        });

        Ok(Self {
            user_id: user_id.into(),
            subscriptions,
            outbound: Some(tx),
            writer: Some(writer),
            runtime: Some(runtime),
            closed,
        })
    }

    fn push(&mut self, event: &OutboundEvent) -> Result<(), ChannelError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ChannelError::Closed);
        }
        let frame = event
            .encode()
            .map_err(|err| ChannelError::Transport(err.to_string()))?;
        let Some(tx) = self.outbound.as_ref() else {
            return Err(ChannelError::Closed);
        };
        tx.send(Message::Text(frame))
            .map_err(|_| ChannelError::Closed)
    }
}

impl SessionChannel for WebSocketChannel {
    fn on_message(&mut self, handler: MessageHandler) {
        lock_or_recover(&self.subscriptions, "websocket subscribe").add_message(handler);
    }

    fn on_field_update(&mut self, handler: FieldUpdateHandler) {
        lock_or_recover(&self.subscriptions, "websocket subscribe").add_field_update(handler);
    }

    fn send(&mut self, text: &str) -> Result<(), ChannelError> {
        self.push(&OutboundEvent::Message {
            text: text.to_string(),
            user_id: self.user_id.clone(),
        })
    }

    fn send_field_update(&mut self, field: Field, value: &FieldValue) -> Result<(), ChannelError> {
        self.push(&OutboundEvent::FieldUpdate {
            field,
            value: value.clone(),
            user_id: self.user_id.clone(),
        })
    }

    fn close(&mut self) {
        lock_or_recover(&self.subscriptions, "websocket close").clear();
        self.closed.store(true, Ordering::SeqCst);
        if let Some(tx) = self.outbound.take() {
            let _ = tx.send(Message::Close(None));
        }
        if let Some(runtime) = self.runtime.take() {
            // Give the writer a moment to flush the close frame.
            if let Some(writer) = self.writer.take() {
                let _ = runtime
                    .block_on(async move { tokio::time::timeout(SHUTDOWN_GRACE, writer).await });
            }
            runtime.shutdown_timeout(SHUTDOWN_GRACE);
            tracing::info!("session channel closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for WebSocketChannel {
    fn drop(&mut self) {
        self.close();
    }
}
