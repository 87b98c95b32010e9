//! In-memory connector for session tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use url::Url;

use crate::error::TransportError;
use crate::transport::{CloseReason, Connector, Transport, TransportEvents};

/// Test-side view of one opened transport.
pub(crate) struct FakeLink {
    pub url: Url,
    pub events: TransportEvents,
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl FakeLink {
    pub fn open(&self) {
        self.events.opened();
    }

    pub fn deliver(&self, payload: &str) {
        self.events.payload(payload);
    }

    /// Drop the connection without a close handshake.
    pub fn drop_connection(&self) {
        self.events.closed(CloseReason::abnormal("connection reset"));
    }

    pub fn close_normally(&self) {
        self.events.closed(CloseReason::normal());
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().expect("sent lock").clone()
    }

    /// Whether the session closed this transport.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct FakeTransport {
    sent: Arc<Mutex<Vec<String>>>,
    closed: Arc<AtomicBool>,
}

impl Transport for FakeTransport {
    fn send(&mut self, text: String) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.sent.lock().expect("sent lock").push(text);
        Ok(())
    }

    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Hands every opened transport to the test as a [`FakeLink`].
pub(crate) struct FakeConnector {
    links: mpsc::UnboundedSender<FakeLink>,
}

impl FakeConnector {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeLink>) {
        let (links, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { links }), rx)
    }
}

impl Connector for FakeConnector {
    fn open(&self, url: Url, events: TransportEvents) -> Box<dyn Transport> {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let _ = self.links.send(FakeLink {
            url,
            events,
            sent: Arc::clone(&sent),
            closed: Arc::clone(&closed),
        });
        Box::new(FakeTransport { sent, closed })
    }
}

/// One `message` frame as the server would send it.
pub(crate) fn message_frame(id: &str, channel_id: &str, text: &str, created_at: &str) -> String {
    serde_json::json!({
        "type": "message",
        "data": {
            "id": id,
            "channel_id": channel_id,
            "author_id": "u-7",
            "author_name": "pitwall",
            "text": text,
            "created_at": created_at,
        }
    })
    .to_string()
}
