//! Transport port.
//!
//! The session never performs I/O itself. A [`Connector`] opens a transport
//! in the background and reports progress through [`TransportEvents`], which
//! stamps every event with the generation of the transport that produced it.
//! The session drops events whose generation is no longer current, so a slow
//! close from a superseded socket can never touch its replacement.

use tokio::sync::mpsc;
use url::Url;

use crate::error::TransportError;
use crate::session::SessionEvent;

/// Monotonic id of a transport instance within one session.
pub type Generation = u64;

/// Normal closure (RFC 6455 1000).
pub const CLOSE_NORMAL: u16 = 1000;
/// Endpoint going away, e.g. server restart or page unload (RFC 6455 1001).
pub const CLOSE_GOING_AWAY: u16 = 1001;
/// Connection dropped without a close frame (RFC 6455 1006).
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Why a transport closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseReason {
    /// Close code, if the peer sent one
    pub code: Option<u16>,
    pub reason: String,
}

impl CloseReason {
    pub fn new(code: Option<u16>, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn normal() -> Self {
        Self::new(Some(CLOSE_NORMAL), "")
    }

    /// Dropped connection: no close handshake took place.
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self::new(Some(CLOSE_ABNORMAL), reason)
    }

    /// Normal closures end the session quietly; anything else is retried.
    pub fn is_normal(&self) -> bool {
        matches!(self.code, Some(CLOSE_NORMAL | CLOSE_GOING_AWAY))
    }
}

/// Events reported by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake complete; writes are accepted from now on
    Opened,
    /// One raw inbound payload (may hold several frames)
    Payload(String),
    /// The transport hit an error; a close follows or is implied
    Failed(String),
    /// The transport is gone
    Closed(CloseReason),
}

/// Generation-stamped event sink handed to a transport.
#[derive(Debug, Clone)]
pub struct TransportEvents {
    generation: Generation,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl TransportEvents {
    pub(crate) fn new(generation: Generation, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Report an event. Returns `false` once the session has shut down.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx
            .send(SessionEvent::Transport {
                generation: self.generation,
                event,
            })
            .is_ok()
    }

    pub fn opened(&self) -> bool {
        self.emit(TransportEvent::Opened)
    }

    pub fn payload(&self, payload: impl Into<String>) -> bool {
        self.emit(TransportEvent::Payload(payload.into()))
    }

    pub fn failed(&self, error: impl Into<String>) -> bool {
        self.emit(TransportEvent::Failed(error.into()))
    }

    pub fn closed(&self, reason: CloseReason) -> bool {
        self.emit(TransportEvent::Closed(reason))
    }
}

/// Write half of an open (or opening) transport, owned by the session.
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send {
    /// Queue one text frame for the wire. Must not block.
    fn send(&mut self, text: String) -> Result<(), TransportError>;

    /// Begin closing. Events emitted afterwards are ignored by the session.
    fn close(&mut self);
}

/// Opens transports.
pub trait Connector: Send + Sync + 'static {
    /// Start opening a transport to `url` and return its handle immediately.
    ///
    /// Progress (open, payloads, errors, close) must be reported through
    /// `events`; this method itself must not wait on the network.
    fn open(&self, url: Url, events: TransportEvents) -> Box<dyn Transport>;
}
