//! Frame Decoder and command encoder.
//!
//! The chat server batches frames into a single websocket write, one JSON
//! object per line. A bad line is logged and skipped; it never takes the rest
//! of the payload down with it.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::frames::{ErrorData, InboundFrame, OutboundCommand, PresenceData};

/// Bare keepalive line the server may send instead of a `pong` frame.
pub const KEEPALIVE_TOKEN: &str = "pong";

/// Errors produced while decoding or encoding frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// The line is not a JSON frame envelope.
    #[error("invalid frame JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The envelope parsed but its `data` does not match the frame type.
    #[error("invalid `{kind}` frame data: {source}")]
    InvalidData {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Untyped envelope; `data` is resolved once the `type` is known.
#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: Value,
}

/// Decode a single line into a frame.
///
/// Returns `Ok(None)` for blank lines and for frame types this client does not
/// understand.
pub fn decode_line(line: &str) -> Result<Option<InboundFrame>, CodecError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    if line == KEEPALIVE_TOKEN {
        return Ok(Some(InboundFrame::Pong));
    }

    let RawFrame { kind, data } = serde_json::from_str(line)?;
    let frame = match kind.as_str() {
        "message" => InboundFrame::Message(data_as(&kind, data)?),
        "error" => InboundFrame::Error(data_as::<ErrorData>(&kind, data)?.message),
        "pong" => InboundFrame::Pong,
        "joined" => InboundFrame::Joined(data_as::<PresenceData>(&kind, data)?.author_name),
        "left" => InboundFrame::Left(data_as::<PresenceData>(&kind, data)?.author_name),
        other => {
            tracing::debug!(frame_type = %other, "Ignoring unknown frame type");
            return Ok(None);
        }
    };

    Ok(Some(frame))
}

/// Split a raw payload into frames.
///
/// Lines that fail to decode are logged and skipped.
pub fn decode_payload(payload: &str) -> Vec<InboundFrame> {
    let mut frames = Vec::new();

    for (index, line) in payload.lines().enumerate() {
        match decode_line(line) {
            Ok(Some(frame)) => frames.push(frame),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(line = index, error = %e, "Skipping malformed chat frame");
            }
        }
    }

    frames
}

/// Serialize a command for the wire.
pub fn encode_command(command: &OutboundCommand) -> Result<String, CodecError> {
    Ok(serde_json::to_string(command)?)
}

fn data_as<T: DeserializeOwned>(kind: &str, data: Value) -> Result<T, CodecError> {
    serde_json::from_value(data).map_err(|source| CodecError::InvalidData {
        kind: kind.to_string(),
        source,
    })
}
