//! WebSocket transport using tokio-tungstenite.
//!
//! Each [`WsTransport`] is backed by one spawned task that owns the socket.
//! The session writes through an unbounded channel, so `send` never blocks;
//! the task reports open/payload/close through [`TransportEvents`].

use std::borrow::Cow;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use crate::error::TransportError;
use crate::transport::{CloseReason, Connector, Transport, TransportEvents};

/// Commands from the session to the socket task.
#[derive(Debug)]
enum Outgoing {
    Text(String),
    Close,
}

/// Connector that opens real websocket connections.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    fn open(&self, url: Url, events: TransportEvents) -> Box<dyn Transport> {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_socket(url, events, rx));
        Box::new(WsTransport { tx })
    }
}

/// Session-side handle to a socket task.
pub struct WsTransport {
    tx: mpsc::UnboundedSender<Outgoing>,
}

impl Transport for WsTransport {
    fn send(&mut self, text: String) -> Result<(), TransportError> {
        self.tx
            .send(Outgoing::Text(text))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        let _ = self.tx.send(Outgoing::Close);
    }
}

async fn run_socket(url: Url, events: TransportEvents, mut outgoing: mpsc::UnboundedReceiver<Outgoing>) {
    let generation = events.generation();
    tracing::debug!(generation, url = %redact(&url), "Opening chat socket");

    let ws_stream = tokio::select! {
        result = connect_async(url.as_str()) => match result {
            Ok((ws_stream, _)) => ws_stream,
            Err(e) => {
                tracing::warn!(generation, error = %e, "Chat socket connect failed");
                events.failed(e.to_string());
                events.closed(CloseReason::abnormal("connect failed"));
                return;
            }
        },
        _ = wait_for_close(&mut outgoing) => {
            tracing::debug!(generation, "Chat socket closed before handshake completed");
            return;
        }
    };

    tracing::info!(generation, "Chat socket open");
    events.opened();

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            command = outgoing.recv() => match command {
                Some(Outgoing::Text(text)) => {
                    if let Err(e) = write.send(Message::Text(text)).await {
                        tracing::warn!(generation, error = %e, "Chat socket write failed");
                        events.failed(e.to_string());
                        events.closed(CloseReason::abnormal("write failed"));
                        return;
                    }
                }
                Some(Outgoing::Close) | None => {
                    let frame = CloseFrame {
                        code: CloseCode::Normal,
                        reason: Cow::Borrowed("client closing"),
                    };
                    if let Err(e) = write.send(Message::Close(Some(frame))).await {
                        tracing::debug!(generation, error = %e, "Close frame not delivered");
                    }
                    return;
                }
            },
            incoming = read.next() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    events.payload(text);
                }
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes) {
                    Ok(text) => {
                        events.payload(text);
                    }
                    Err(_) => tracing::warn!(generation, "Dropping non-UTF-8 binary payload"),
                },
                Some(Ok(Message::Close(frame))) => {
                    let reason = match frame {
                        Some(frame) => CloseReason::new(Some(u16::from(frame.code)), frame.reason.into_owned()),
                        None => CloseReason::new(None, "closed without status"),
                    };
                    tracing::info!(generation, code = ?reason.code, "Chat socket closed by server");
                    events.closed(reason);
                    return;
                }
                // tungstenite answers pings itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    tracing::warn!(generation, error = %e, "Chat socket read failed");
                    events.failed(e.to_string());
                    events.closed(CloseReason::abnormal("read failed"));
                    return;
                }
                None => {
                    events.closed(CloseReason::abnormal("stream ended"));
                    return;
                }
            },
        }
    }
}

/// Resolves once the session asks for a close or drops its handle.
async fn wait_for_close(outgoing: &mut mpsc::UnboundedReceiver<Outgoing>) {
    loop {
        match outgoing.recv().await {
            Some(Outgoing::Close) | None => return,
            Some(Outgoing::Text(_)) => {
                tracing::warn!("Dropping chat frame queued before handshake");
            }
        }
    }
}

/// URL without its query string, so tokens stay out of the logs.
fn redact(url: &Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact_strips_token() {
        let url = Url::parse("wss://chat.example.com/ws/chat/race-42?token=secret").expect("url");

        assert_eq!(redact(&url), "wss://chat.example.com/ws/chat/race-42");
    }

    #[tokio::test]
    async fn test_send_after_task_exit_reports_closed() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut transport = WsTransport { tx };

        let result = transport.send("hello".to_string());

        assert!(matches!(result, Err(TransportError::Closed)));
    }
}
