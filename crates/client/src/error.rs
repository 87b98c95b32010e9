//! Error types for the chat client.

use thiserror::Error;

/// Shown once the reconnect schedule is exhausted; stays until `reconnect()`.
pub const CONNECTION_FAILED_MESSAGE: &str = "Chat connection failed. Please refresh or retry.";

/// Shown when a dropped connection has not recovered within the debounce window.
pub const CONNECTION_LOST_MESSAGE: &str = "Chat connection lost. Reconnecting...";

/// Shown when the viewer tries to send while the socket is not open.
pub const NOT_CONNECTED_MESSAGE: &str = "Not connected to chat.";

/// Errors returned to callers of [`crate::ChatClient`].
#[derive(Debug, Error)]
pub enum ChatError {
    /// The session is not in the `Connected` state; nothing was sent.
    #[error("not connected to chat")]
    NotConnected,

    /// Blank lines are never sent.
    #[error("message is empty")]
    EmptyMessage,

    /// The session actor has shut down.
    #[error("chat session is closed")]
    SessionClosed,
}

/// Errors raised by a transport when writing.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The socket task has already exited.
    #[error("transport closed")]
    Closed,
}
