use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

use crate::error::WebSocketError;

/// The only event the relay routes.
pub const NOTE_EVENT: &str = "note";

/// A named event carried in one text frame: `{"type": "note", "payload": ...}`.
///
/// The payload is kept as raw JSON so it is forwarded exactly as the sender
/// wrote it. `None` means the field was absent; an explicit `null` is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub name: String,
    #[serde(
        default,
        deserialize_with = "present_payload",
        skip_serializing_if = "Option::is_none"
    )]
    pub payload: Option<Box<RawValue>>,
}

fn present_payload<'de, D>(deserializer: D) -> Result<Option<Box<RawValue>>, D::Error>
where
    D: Deserializer<'de>,
{
    Box::<RawValue>::deserialize(deserializer).map(Some)
}

impl Event {
    pub fn new(name: impl Into<String>, payload: Option<Box<RawValue>>) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    pub fn from_text(text: &str) -> Result<Self, WebSocketError> {
        serde_json::from_str(text).map_err(|e| WebSocketError::InvalidFormat(e.to_string()))
    }

    pub fn to_text(&self) -> Result<String, WebSocketError> {
        serde_json::to_string(self).map_err(|e| WebSocketError::InvalidFormat(e.to_string()))
    }

    pub fn is_note(&self) -> bool {
        self.name == NOTE_EVENT
    }

    pub fn payload_str(&self) -> Option<&str> {
        self.payload.as_deref().map(RawValue::get)
    }
}
