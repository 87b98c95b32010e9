//! Public handle to a chat session.

use std::sync::Arc;

use racechat_shared::ChatMessage;
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::ChatConfig;
use crate::connection::{ConnectionState, ConnectionStateObserver};
use crate::error::ChatError;
use crate::identity::{Identity, SessionKey};
use crate::session::{Command, PresenceEvent, Session, SessionOutputs};
use crate::store::MessageStore;
use crate::transport::Connector;
use crate::websocket::WsConnector;

const PRESENCE_CAPACITY: usize = 64;

/// What the session connects to initially.
#[derive(Debug, Clone)]
pub struct ChatParams {
    pub channel_id: String,
    pub identity: Option<Identity>,
    /// A disabled session holds no connection until enabled
    pub enabled: bool,
}

impl ChatParams {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            identity: None,
            enabled: true,
        }
    }

    pub fn with_identity(mut self, identity: Option<Identity>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Handle to a running chat session.
///
/// All methods are non-blocking. Dropping the last handle tears the session
/// down; [`ChatClient::shutdown`] does the same and waits for it.
pub struct ChatClient {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<ConnectionState>,
    messages: watch::Receiver<MessageStore>,
    error: watch::Receiver<Option<String>>,
    presence: broadcast::Sender<PresenceEvent>,
    task: Option<JoinHandle<()>>,
}

impl ChatClient {
    /// Start a session over real websockets.
    pub fn connect(config: ChatConfig, params: ChatParams) -> Self {
        Self::spawn(config, params, Arc::new(WsConnector::new()))
    }

    /// Start a session with a custom connector.
    ///
    /// Must be called within a tokio runtime.
    pub fn spawn(config: ChatConfig, params: ChatParams, connector: Arc<dyn Connector>) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (messages_tx, messages_rx) = watch::channel(MessageStore::new());
        let (error_tx, error_rx) = watch::channel(None);
        let (presence_tx, _) = broadcast::channel(PRESENCE_CAPACITY);

        let outputs = SessionOutputs {
            state: state_tx,
            messages: messages_tx,
            error: error_tx,
            presence: presence_tx.clone(),
        };
        let key = SessionKey::new(params.channel_id, params.identity);
        let (session, events_rx) = Session::new(config, connector, key, params.enabled, outputs);
        let task = tokio::spawn(session.run(commands_rx, events_rx));

        Self {
            commands: commands_tx,
            state: state_rx,
            messages: messages_rx,
            error: error_rx,
            presence: presence_tx,
            task: Some(task),
        }
    }

    fn command(&self, command: Command) -> Result<(), ChatError> {
        self.commands
            .send(command)
            .map_err(|_| ChatError::SessionClosed)
    }

    /// Snapshot of stored messages in chronological order.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.messages.borrow().snapshot()
    }

    pub fn subscribe_messages(&self) -> watch::Receiver<MessageStore> {
        self.messages.clone()
    }

    /// Send a chat line.
    ///
    /// Returns [`ChatError::NotConnected`] when the session is not connected;
    /// nothing is written then and the error surface shows a notice. A
    /// successful return does not mean the server accepted the line: it
    /// shows up in [`ChatClient::messages`] once the server echoes it.
    pub fn send_message(&self, text: impl Into<String>) -> Result<(), ChatError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }

        // The text only reaches the session when the caller was told it was sent.
        if self.is_connected() {
            self.command(Command::Send(text))
        } else {
            self.command(Command::NotifyNotConnected)?;
            Err(ChatError::NotConnected)
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn state_observer(&self) -> ConnectionStateObserver {
        ConnectionStateObserver::new(self.state.clone())
    }

    /// Currently visible error, if any.
    pub fn error(&self) -> Option<String> {
        self.error.borrow().clone()
    }

    pub fn subscribe_errors(&self) -> watch::Receiver<Option<String>> {
        self.error.clone()
    }

    pub fn subscribe_presence(&self) -> broadcast::Receiver<PresenceEvent> {
        self.presence.subscribe()
    }

    /// Drop the current connection and start over with a fresh reconnect
    /// schedule. Also the way out of [`ConnectionState::Failed`].
    pub fn reconnect(&self) -> Result<(), ChatError> {
        self.command(Command::Reconnect)
    }

    /// Switch viewer. A different identity clears history and reconnects.
    pub fn set_identity(&self, identity: Option<Identity>) -> Result<(), ChatError> {
        self.command(Command::SetIdentity(identity))
    }

    /// Follow an external identity signal for the rest of the session.
    pub fn watch_identity(&self, source: watch::Receiver<Option<Identity>>) -> Result<(), ChatError> {
        self.command(Command::WatchIdentity(source))
    }

    /// Switch channel. Clears history and reconnects.
    pub fn set_channel(&self, channel_id: impl Into<String>) -> Result<(), ChatError> {
        self.command(Command::SetChannel(channel_id.into()))
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<(), ChatError> {
        self.command(Command::SetEnabled(enabled))
    }

    /// Tear the session down and wait for the actor to exit.
    pub async fn shutdown(mut self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.commands.send(Command::Shutdown(done_tx)).is_ok() {
            let _ = done_rx.await;
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Chat session task ended abnormally");
            }
        }
    }
}
