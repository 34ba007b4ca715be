//! Grounding sources attached to model output.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Title used when the provider doesn't name a source.
pub const DEFAULT_CITATION_TITLE: &str = "Source";

/// A titled URI the model cited as support for its answer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Citation {
    /// Human readable title of the source.
    pub title: String,
    /// Location of the source.
    pub uri: String,
}

impl Citation {
    /// Creates a citation.
    #[inline]
    pub fn new<T: Into<String>, U: Into<String>>(title: T, uri: U) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
        }
    }
}

/// Extracts the web citations from the raw metadata of one chunk.
///
/// Reads `candidates[0].groundingMetadata.groundingChunks` and keeps the
/// chunks that carry a `web` object, in the order they appear. A missing or
/// empty title falls back to [`DEFAULT_CITATION_TITLE`], a missing URI
/// becomes an empty string. Never fails: metadata of any other shape yields
/// no citations.
pub fn extract_citations(raw_metadata: &Value) -> Vec<Citation> {
    let Some(grounding_chunks) = raw_metadata
        .pointer("/candidates/0/groundingMetadata/groundingChunks")
        .and_then(Value::as_array)
    else {
        return vec![];
    };

    grounding_chunks
        .iter()
        .filter_map(|chunk| chunk.get("web")?.as_object())
        .map(|web| {
            let title = web
                .get("title")
                .and_then(Value::as_str)
                .filter(|title| !title.is_empty())
                .unwrap_or(DEFAULT_CITATION_TITLE);
            let uri = web.get("uri").and_then(Value::as_str).unwrap_or_default();
            Citation::new(title, uri)
        })
        .collect()
}
