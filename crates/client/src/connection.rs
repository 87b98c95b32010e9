//! Connection state and observation.
//!
//! The session actor is the only writer of [`ConnectionState`]; everything
//! else reads it through a [`ConnectionStateObserver`].

use std::fmt;

use tokio::sync::watch;

/// Connection state for the chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected to the server
    #[default]
    Disconnected,
    /// Attempting to establish connection
    Connecting,
    /// Successfully connected
    Connected,
    /// Connection lost, waiting for the next reconnect attempt
    Reconnecting,
    /// Reconnect schedule exhausted; waits for an explicit reconnect
    Failed,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Failed => "failed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable connection state for UI binding.
///
/// Cheap to clone; multiple observers share the same underlying channel.
#[derive(Clone)]
pub struct ConnectionStateObserver {
    state: watch::Receiver<ConnectionState>,
}

impl ConnectionStateObserver {
    pub(crate) fn new(state: watch::Receiver<ConnectionState>) -> Self {
        Self { state }
    }

    /// Get the current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// Check if currently connected.
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Wait for the next state change and return the new state.
    ///
    /// Returns `None` once the session has shut down.
    pub async fn changed(&mut self) -> Option<ConnectionState> {
        self.state.changed().await.ok()?;
        Some(*self.state.borrow_and_update())
    }

    /// Wait until the state satisfies `predicate`.
    ///
    /// Returns `None` if the session shut down first.
    pub async fn wait_for(
        &mut self,
        predicate: impl FnMut(&ConnectionState) -> bool,
    ) -> Option<ConnectionState> {
        self.state.wait_for(predicate).await.ok().map(|state| *state)
    }
}

/// Publish a state transition, skipping no-op writes.
///
/// Returns `true` when the state actually changed.
pub(crate) fn set_connection_state(
    state: &watch::Sender<ConnectionState>,
    new_state: ConnectionState,
) -> bool {
    state.send_if_modified(|current| {
        if *current == new_state {
            false
        } else {
            *current = new_state;
            true
        }
    })
}
