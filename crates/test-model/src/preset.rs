use omnichat_model::ResponseChunk;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The events in a preset response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum PresetEvent {
    #[serde(rename = "chunk")]
    Chunk(ResponseChunk),
    /// Fails the stream with the given message after the preceding events
    /// have been delivered.
    #[serde(rename = "error")]
    Error(String),
}

impl PresetEvent {
    /// A chunk without metadata.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        PresetEvent::Chunk(ResponseChunk::from_text(text))
    }

    /// A chunk with raw metadata attached.
    #[inline]
    pub fn with_metadata<S: Into<String>>(text: S, raw_metadata: Value) -> Self {
        PresetEvent::Chunk(ResponseChunk {
            text: text.into(),
            raw_metadata,
        })
    }
}

/// The preset response for one request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Events in this response.
    pub events: Vec<PresetEvent>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified events.
    #[inline]
    pub fn with_events(events: impl Into<Vec<PresetEvent>>) -> Self {
        Self {
            events: events.into(),
        }
    }
}
