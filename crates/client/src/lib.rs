//! RaceChat Client - chat connection manager for live-race viewers.
//!
//! One [`ChatClient`] holds at most one websocket to the chat server for the
//! channel being watched. It keeps a deduplicated, time-ordered message
//! history, reconnects on a fixed schedule after unexpected drops, keeps the
//! socket alive with heartbeats, and debounces errors so brief blips stay
//! invisible.
//!
//! State is published through `tokio::sync::watch` channels:
//! - [`ChatClient::state_observer`] for the [`ConnectionState`]
//! - [`ChatClient::subscribe_messages`] for the [`MessageStore`]
//! - [`ChatClient::subscribe_errors`] for the visible error text

pub mod backoff;
pub mod client;
pub mod config;
pub mod connection;
pub mod error;
mod error_surface;
mod heartbeat;
pub mod identity;
mod session;
pub mod store;
mod timer;
pub mod transport;
pub mod websocket;

#[cfg(test)]
mod testing;

pub use backoff::{Backoff, ReconnectPlan};
pub use client::{ChatClient, ChatParams};
pub use config::{ChatConfig, ConfigError};
pub use connection::{ConnectionState, ConnectionStateObserver};
pub use error::{ChatError, TransportError};
pub use identity::{Identity, SessionKey};
pub use session::PresenceEvent;
pub use store::MessageStore;
pub use transport::{CloseReason, Connector, Transport, TransportEvent, TransportEvents};
pub use websocket::WsConnector;

pub use racechat_shared::ChatMessage;
