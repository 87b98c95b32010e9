//! Frame types for the chat websocket
//!
//! ## Wire format
//!
//! Server → client frames are JSON objects with a `type` discriminator and an
//! optional `data` payload:
//!
//! ```text
//! {"type":"message","data":{"id":"m1","channel_id":"race-42",...}}
//! {"type":"error","data":{"message":"slow mode is on"}}
//! {"type":"pong"}
//! {"type":"joined","data":{"author_name":"pitwall"}}
//! ```
//!
//! Client → server frames use the same envelope:
//!
//! ```text
//! {"type":"send_message","data":{"text":"go go go"}}
//! {"type":"ping"}
//! ```

use serde::{Deserialize, Serialize};

use crate::message::ChatMessage;

/// A decoded server frame.
///
/// Produced by the Frame Decoder, consumed by the connection state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    /// A chat line for the current channel
    Message(ChatMessage),
    /// Application-level error reported by the server; the connection stays open
    Error(String),
    /// Keepalive response
    Pong,
    /// A viewer joined the channel
    Joined(String),
    /// A viewer left the channel
    Left(String),
}

/// Messages from client to chat server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundCommand {
    /// Post a chat line to the current channel
    #[serde(rename = "send_message")]
    SendText { text: String },
    /// Heartbeat ping
    Ping,
}

/// `data` payload of an `error` frame.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorData {
    pub message: String,
}

/// `data` payload of `joined` / `left` frames.
#[derive(Debug, Deserialize)]
pub(crate) struct PresenceData {
    pub author_name: String,
}
