use omnichat_model::{ModelMessage, ModelRequest, ModelTool};
use serde::{Deserialize, Serialize};

// --------------------------
// Types shared in both sides
// --------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Set on parts that carry the model's reasoning summary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<bool>,
}

impl Content {
    fn with_text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(ToOwned::to_owned),
            parts: vec![Part {
                text: Some(text.to_owned()),
                thought: None,
            }],
        }
    }
}

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<Content>,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, thought parts excluded.
    pub fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|p| p.thought != Some(true))
                    .filter_map(|p| p.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[inline]
    pub fn finish_reason(&self) -> Option<&str> {
        self.candidates.first()?.finish_reason.as_deref()
    }

    #[inline]
    pub fn block_reason(&self) -> Option<&str> {
        self.prompt_feedback.as_ref()?.block_reason.as_deref()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    pub code: Option<u16>,
    pub message: String,
    pub status: Option<String>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize)]
struct GoogleSearch {}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
}

// -----------
// Conversions
// -----------

pub fn create_request(req: &ModelRequest) -> GenerateContentRequest {
    let mut system_texts = Vec::new();
    let mut contents = Vec::with_capacity(req.messages.len());
    for msg in &req.messages {
        match msg {
            ModelMessage::System(text) => system_texts.push(text.as_str()),
            ModelMessage::User(text) => {
                contents.push(Content::with_text(Some("user"), text));
            }
            ModelMessage::Assistant(text) => {
                contents.push(Content::with_text(Some("model"), text));
            }
        }
    }

    let system_instruction = if system_texts.is_empty() {
        None
    } else {
        Some(Content::with_text(None, &system_texts.join("\n\n")))
    };

    GenerateContentRequest {
        contents,
        system_instruction,
        tools: req.tools.iter().map(create_tool).collect(),
    }
}

#[inline]
fn create_tool(tool: &ModelTool) -> Tool {
    match tool {
        ModelTool::WebSearch => Tool {
            google_search: GoogleSearch {},
        },
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_create_request() {
        let request = ModelRequest {
            messages: vec![
                ModelMessage::System("You are a helpful assistant.".to_owned()),
                ModelMessage::User("Hello".to_owned()),
                ModelMessage::Assistant("Hi! How can I help?".to_owned()),
                ModelMessage::User("Latest Rust release?".to_owned()),
            ],
            tools: vec![ModelTool::WebSearch],
        };
        let expected = json!({
            "contents": [
                { "role": "user", "parts": [{ "text": "Hello" }] },
                { "role": "model", "parts": [{ "text": "Hi! How can I help?" }] },
                { "role": "user", "parts": [{ "text": "Latest Rust release?" }] }
            ],
            "systemInstruction": {
                "parts": [{ "text": "You are a helpful assistant." }]
            },
            "tools": [{ "googleSearch": {} }]
        });
        let actual = serde_json::to_value(create_request(&request)).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_request_without_extras() {
        let request = ModelRequest {
            messages: vec![ModelMessage::User("Hello".to_owned())],
            tools: vec![],
        };
        let actual = serde_json::to_value(create_request(&request)).unwrap();
        assert_eq!(
            actual,
            json!({ "contents": [{ "role": "user", "parts": [{ "text": "Hello" }] }] })
        );
    }

    #[test]
    fn test_response_text_skips_thoughts() {
        let resp: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        { "text": "Let me think.", "thought": true },
                        { "text": "The answer " },
                        { "text": "is 42." }
                    ]
                },
                "finishReason": "STOP"
            }],
            "modelVersion": "gemini-3-pro-preview"
        }))
        .unwrap();
        assert_eq!(resp.text(), "The answer is 42.");
        assert_eq!(resp.finish_reason(), Some("STOP"));
        assert_eq!(resp.block_reason(), None);
    }
}
