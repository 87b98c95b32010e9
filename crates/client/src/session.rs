//! Chat session actor.
//!
//! One spawned task owns the connection state machine, the message store,
//! the error surface and every timer. Callers talk to it through
//! [`Command`]s; transports and timers talk to it through [`SessionEvent`]s.
//! Both arrive on channels and are handled one at a time, so no state is
//! shared across tasks except the `watch` signals the actor publishes.
//!
//! ```text
//!  Disconnected --start--> Connecting --open--> Connected
//!        ^                     |                    |
//!        |  normal close       | abnormal close     | abnormal close
//!        +---------------------+--------------------+
//!                              v
//!                        Reconnecting --schedule exhausted--> Failed
//! ```

use std::sync::Arc;
use std::time::Duration;

use racechat_shared::{decode_payload, encode_command, ChatMessage, InboundFrame, OutboundCommand};
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use crate::backoff::Backoff;
use crate::config::ChatConfig;
use crate::connection::{set_connection_state, ConnectionState};
use crate::error::{CONNECTION_FAILED_MESSAGE, CONNECTION_LOST_MESSAGE, NOT_CONNECTED_MESSAGE};
use crate::error_surface::ErrorSurface;
use crate::heartbeat::{ping_frame, Heartbeat};
use crate::identity::{Identity, IdentityWatcher, SessionKey};
use crate::store::MessageStore;
use crate::timer::Timer;
use crate::transport::{CloseReason, Connector, Generation, Transport, TransportEvent, TransportEvents};


/// Viewers entering or leaving the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceEvent {
    Joined(String),
    Left(String),
}

/// Requests from [`crate::ChatClient`].
#[derive(Debug)]
pub(crate) enum Command {
    Send(String),
    /// A send was refused by the caller-side check; only show the notice.
    NotifyNotConnected,
    Reconnect,
    SetIdentity(Option<Identity>),
    SetChannel(String),
    SetEnabled(bool),
    WatchIdentity(watch::Receiver<Option<Identity>>),
    Shutdown(oneshot::Sender<()>),
}

/// Everything the actor reacts to besides commands.
#[derive(Debug)]
pub(crate) enum SessionEvent {
    Transport {
        generation: Generation,
        event: TransportEvent,
    },
    ReconnectDue {
        generation: Generation,
    },
    HeartbeatDue {
        generation: Generation,
    },
    ErrorDue {
        token: u64,
    },
}

/// Signals published by the session.
pub(crate) struct SessionOutputs {
    pub state: watch::Sender<ConnectionState>,
    pub messages: watch::Sender<MessageStore>,
    pub error: watch::Sender<Option<String>>,
    pub presence: broadcast::Sender<PresenceEvent>,
}

pub(crate) struct Session {
    config: ChatConfig,
    connector: Arc<dyn Connector>,
    enabled: bool,
    key: IdentityWatcher,
    identity_source: Option<watch::Receiver<Option<Identity>>>,

    generation: Generation,
    transport: Option<Box<dyn Transport>>,
    backoff: Backoff,
    heartbeat: Option<Heartbeat>,
    reconnect_timer: Option<Timer>,
    errors: ErrorSurface,

    state: watch::Sender<ConnectionState>,
    messages: watch::Sender<MessageStore>,
    presence: broadcast::Sender<PresenceEvent>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    torn_down: bool,
}

impl Session {
    pub(crate) fn new(
        config: ChatConfig,
        connector: Arc<dyn Connector>,
        key: SessionKey,
        enabled: bool,
        outputs: SessionOutputs,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let backoff = Backoff::new(config.reconnect.clone());

        let session = Self {
            config,
            connector,
            enabled,
            key: IdentityWatcher::new(key),
            identity_source: None,
            generation: 0,
            transport: None,
            backoff,
            heartbeat: None,
            reconnect_timer: None,
            errors: ErrorSurface::new(outputs.error, events_tx.clone()),
            state: outputs.state,
            messages: outputs.messages,
            presence: outputs.presence,
            events_tx,
            torn_down: false,
        };
        (session, events_rx)
    }

    /// Run until shut down or until every [`crate::ChatClient`] handle is gone.
    pub(crate) async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<SessionEvent>,
    ) {
        self.start();

        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        tracing::debug!("Chat client dropped; tearing down session");
                        self.teardown();
                    }
                },
                Some(event) = events.recv() => self.handle_event(event),
                update = identity_changed(&mut self.identity_source) => match update {
                    Some(identity) => self.on_identity(identity),
                    None => {
                        tracing::debug!("Identity source closed");
                        self.identity_source = None;
                    }
                },
            }

            if self.torn_down {
                break;
            }
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send(text) => self.send(text),
            Command::NotifyNotConnected => self.notify_not_connected(),
            Command::Reconnect => {
                tracing::info!(channel_id = %self.key.current().channel_id, "Reconnect requested");
                self.force_reconnect();
            }
            Command::SetIdentity(identity) => self.on_identity(identity),
            Command::SetChannel(channel_id) => self.on_channel(channel_id),
            Command::SetEnabled(enabled) => self.set_enabled(enabled),
            Command::WatchIdentity(mut source) => {
                let identity = source.borrow_and_update().clone();
                self.identity_source = Some(source);
                self.on_identity(identity);
            }
            Command::Shutdown(done) => {
                self.teardown();
                let _ = done.send(());
            }
        }
    }

    fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Transport { generation, event } => {
                if generation != self.generation || self.transport.is_none() {
                    tracing::debug!(
                        generation,
                        current = self.generation,
                        "Ignoring event from stale transport"
                    );
                    return;
                }
                match event {
                    TransportEvent::Opened => self.on_open(),
                    TransportEvent::Payload(payload) => self.on_payload(&payload),
                    TransportEvent::Failed(error) => {
                        tracing::warn!(generation, error = %error, "Chat transport error");
                        self.on_close(CloseReason::abnormal(error));
                    }
                    TransportEvent::Closed(reason) => self.on_close(reason),
                }
            }
            SessionEvent::ReconnectDue { generation } => {
                if generation != self.generation
                    || self.state() != ConnectionState::Reconnecting
                    || self.transport.is_some()
                {
                    tracing::debug!(generation, "Ignoring stale reconnect timer");
                    return;
                }
                self.reconnect_timer = None;
                self.open_transport();
            }
            SessionEvent::HeartbeatDue { generation } => self.on_heartbeat(generation),
            SessionEvent::ErrorDue { token } => self.errors.elapsed(token),
        }
    }

    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    fn set_state(&self, state: ConnectionState) {
        if set_connection_state(&self.state, state) {
            tracing::debug!(state = %state, generation = self.generation, "Chat connection state changed");
        }
    }

    /// Open a transport unless disabled, torn down, without a channel, or
    /// already holding one.
    ///
    /// Returns `true` if a connection attempt was made, including one that
    /// failed before a transport existed.
    fn start(&mut self) -> bool {
        if self.torn_down || !self.enabled || self.transport.is_some() {
            return false;
        }
        if self.key.current().channel_id.is_empty() {
            tracing::debug!("No chat channel selected; staying idle");
            return false;
        }
        self.reconnect_timer = None;
        self.open_transport();
        true
    }

    fn open_transport(&mut self) {
        let key = self.key.current();
        let url = match self.config.endpoint_for(&key.channel_id, key.token()) {
            Ok(url) => url,
            Err(e) => {
                tracing::error!(error = %e, "Cannot build chat URL");
                self.set_state(ConnectionState::Failed);
                self.errors.set(CONNECTION_FAILED_MESSAGE, Duration::ZERO);
                return;
            }
        };

        self.generation += 1;
        tracing::info!(
            generation = self.generation,
            channel_id = %key.channel_id,
            attempt = self.backoff.attempts(),
            authenticated = key.identity.is_some(),
            "Connecting to chat"
        );

        let events = TransportEvents::new(self.generation, self.events_tx.clone());
        self.set_state(ConnectionState::Connecting);
        self.transport = Some(self.connector.open(url, events));
    }

    /// Drop the live transport; anything it still reports is stale.
    fn close_transport(&mut self) {
        self.heartbeat = None;
        if let Some(mut transport) = self.transport.take() {
            transport.close();
        }
        self.generation += 1;
    }

    fn on_open(&mut self) {
        tracing::info!(generation = self.generation, "Connected to chat");
        self.set_state(ConnectionState::Connected);
        self.backoff.reset();
        self.errors.clear();
        self.heartbeat = Some(Heartbeat::start(
            self.config.heartbeat_interval,
            self.generation,
            &self.events_tx,
        ));
    }

    fn on_payload(&mut self, payload: &str) {
        for frame in decode_payload(payload) {
            match frame {
                InboundFrame::Message(message) => self.on_message(message),
                InboundFrame::Error(message) => {
                    tracing::warn!(error = %message, "Chat server reported an error");
                    self.errors.set(message, self.config.server_error_debounce);
                }
                InboundFrame::Pong => tracing::trace!("Heartbeat acknowledged"),
                InboundFrame::Joined(name) => self.publish_presence(PresenceEvent::Joined(name)),
                InboundFrame::Left(name) => self.publish_presence(PresenceEvent::Left(name)),
            }
        }
    }

    fn on_message(&mut self, message: ChatMessage) {
        let channel_id = &self.key.current().channel_id;
        if &message.channel_id != channel_id {
            tracing::debug!(
                message_id = %message.id,
                message_channel = %message.channel_id,
                "Dropping message for another channel"
            );
            return;
        }

        let id = message.id.clone();
        let inserted = self.messages.send_if_modified(|store| store.insert(message));
        if inserted {
            tracing::trace!(message_id = %id, "Chat message stored");
        } else {
            tracing::trace!(message_id = %id, "Duplicate chat message ignored");
        }
    }

    fn publish_presence(&self, event: PresenceEvent) {
        // No subscribers is fine.
        let _ = self.presence.send(event);
    }

    fn on_close(&mut self, reason: CloseReason) {
        self.close_transport();

        if reason.is_normal() {
            tracing::info!(code = ?reason.code, "Chat connection closed");
            self.reconnect_timer = None;
            self.backoff.reset();
            // A "connection lost" notice armed by an earlier drop no longer applies.
            self.errors.clear();
            self.set_state(ConnectionState::Disconnected);
            return;
        }

        tracing::warn!(code = ?reason.code, reason = %reason.reason, "Chat connection lost");
        self.schedule_reconnect();
    }

    fn schedule_reconnect(&mut self) {
        match self.backoff.next_delay_and_advance() {
            Some(delay) => {
                let attempt = self.backoff.attempts();
                tracing::info!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Scheduling chat reconnect"
                );
                self.set_state(ConnectionState::Reconnecting);
                self.reconnect_timer = Some(Timer::once(
                    delay,
                    &self.events_tx,
                    SessionEvent::ReconnectDue {
                        generation: self.generation,
                    },
                ));
                // Later attempts keep the first drop's debounce window running.
                if attempt == 1 {
                    self.errors
                        .set(CONNECTION_LOST_MESSAGE, self.config.transient_error_debounce);
                }
            }
            None => {
                tracing::error!(
                    attempts = self.backoff.attempts(),
                    "Chat reconnect attempts exhausted"
                );
                self.reconnect_timer = None;
                self.set_state(ConnectionState::Failed);
                self.errors.set(CONNECTION_FAILED_MESSAGE, Duration::ZERO);
            }
        }
    }

    fn on_heartbeat(&mut self, generation: Generation) {
        let current = self.heartbeat.as_ref().map(Heartbeat::generation);
        if current != Some(generation) || generation != self.generation {
            tracing::trace!(generation, "Ignoring stale heartbeat");
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        match ping_frame() {
            Ok(frame) => {
                if let Err(e) = transport.send(frame) {
                    tracing::warn!(error = %e, "Failed to send heartbeat");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode heartbeat"),
        }
    }

    fn notify_not_connected(&mut self) {
        tracing::debug!(state = %self.state(), "Dropping chat message: not connected");
        self.errors.set(NOT_CONNECTED_MESSAGE, Duration::ZERO);
    }

    fn send(&mut self, text: String) {
        if !self.state().is_connected() || self.transport.is_none() {
            self.notify_not_connected();
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            return;
        };

        match encode_command(&OutboundCommand::SendText { text }) {
            Ok(frame) => {
                if let Err(e) = transport.send(frame) {
                    tracing::warn!(error = %e, "Failed to send chat message");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to encode chat message"),
        }
    }

    /// Abandon the current connection and start over with a fresh schedule.
    fn force_reconnect(&mut self) {
        if self.torn_down {
            return;
        }
        self.close_transport();
        self.reconnect_timer = None;
        self.backoff.reset();
        self.errors.clear();
        if !self.start() {
            self.set_state(ConnectionState::Disconnected);
        }
    }

    fn on_identity(&mut self, identity: Option<Identity>) {
        if !self.key.observe_identity(identity) {
            return;
        }
        tracing::info!(
            authenticated = self.key.current().identity.is_some(),
            "Viewer identity changed; resetting chat session"
        );
        self.reset_session();
    }

    fn on_channel(&mut self, channel_id: String) {
        if !self.key.observe_channel(channel_id) {
            return;
        }
        tracing::info!(channel_id = %self.key.current().channel_id, "Chat channel changed; resetting chat session");
        self.reset_session();
    }

    fn reset_session(&mut self) {
        self.messages.send_if_modified(MessageStore::clear);
        self.force_reconnect();
    }

    fn set_enabled(&mut self, enabled: bool) {
        if enabled == self.enabled {
            return;
        }
        self.enabled = enabled;

        if enabled {
            tracing::info!("Chat enabled");
            self.backoff.reset();
            self.start();
        } else {
            tracing::info!("Chat disabled");
            self.close_transport();
            self.reconnect_timer = None;
            self.errors.clear();
            self.set_state(ConnectionState::Disconnected);
        }
    }

    /// Cancel every timer and close the transport. Idempotent.
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.identity_source = None;
        self.close_transport();
        self.reconnect_timer = None;
        self.errors.clear();
        self.set_state(ConnectionState::Disconnected);
        tracing::info!("Chat session torn down");
    }
}

/// Next value from an attached identity source.
///
/// Pends forever without a source; yields `None` once the source closes.
async fn identity_changed(
    source: &mut Option<watch::Receiver<Option<Identity>>>,
) -> Option<Option<Identity>> {
    match source {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}
