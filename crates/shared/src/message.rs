//! Chat message record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single chat line as delivered by the server.
///
/// `id` is the identity of the message; redelivery of the same `id` (e.g. after
/// a reconnect) must not produce a second entry. `created_at` is the server
/// timestamp and defines display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub channel_id: String,
    /// Absent for system or anonymous authors
    #[serde(default)]
    pub author_id: Option<String>,
    pub author_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_deserialize_without_author_id() {
        let json = r#"{
            "id": "m1",
            "channel_id": "race-42",
            "author_name": "Marshal",
            "text": "Green flag!",
            "created_at": "2024-05-26T16:45:00Z"
        }"#;

        let msg: ChatMessage = serde_json::from_str(json).expect("valid message");

        assert_eq!(msg.id, "m1");
        assert_eq!(msg.author_id, None);
        assert_eq!(
            msg.created_at,
            Utc.with_ymd_and_hms(2024, 5, 26, 16, 45, 0).single().expect("valid date")
        );
    }

    #[test]
    fn test_deserialize_accepts_offset_timestamps() {
        let json = r#"{
            "id": "m2",
            "channel_id": "race-42",
            "author_id": "u-7",
            "author_name": "pitwall",
            "text": "box box",
            "created_at": "2024-05-26T18:45:00+02:00"
        }"#;

        let msg: ChatMessage = serde_json::from_str(json).expect("valid message");

        assert_eq!(msg.author_id.as_deref(), Some("u-7"));
        assert_eq!(
            msg.created_at,
            Utc.with_ymd_and_hms(2024, 5, 26, 16, 45, 0).single().expect("valid date")
        );
    }
}
