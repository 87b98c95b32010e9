//! RaceChat Shared - wire protocol for the live-race chat channel
//!
//! This crate contains the types exchanged between the chat server and the
//! connection manager:
//! - `ChatMessage`, the stored unit of chat history
//! - `InboundFrame` / `OutboundCommand`, the tagged frame unions
//! - the Frame Decoder for batched, newline-delimited payloads
//!
//! # Design Principles
//!
//! 1. **Minimal dependencies** - Only serde, serde_json, chrono, thiserror and tracing
//! 2. **No runtime** - Pure data types and (de)serialization
//! 3. **Forward compatible** - Unknown frame types are skipped, never fatal

pub mod codec;
pub mod frames;
pub mod message;

pub use codec::{decode_line, decode_payload, encode_command, CodecError, KEEPALIVE_TOKEN};
pub use frames::{InboundFrame, OutboundCommand};
pub use message::ChatMessage;
