//! Chat sessions bound to a model provider.

use omnichat_model::{
    ModelMessage, ModelProvider, ModelRequest, ModelResponseEvent,
    ModelTool, ResponseChunk,
};

use crate::error::ChatError;
use crate::model_client::{ModelClient, ModelClientResponse};

/// The persona instruction used when none is configured.
pub const DEFAULT_PERSONA: &str = "You are OmniChat, a helpful, intelligent, and versatile universal assistant. You provide accurate, detailed, and polite answers to any question. If you use search results, cite your sources. Format your responses with Markdown for clarity.";

/// Behavior fixed for the lifetime of a session.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SessionConfig {
    /// System instruction sent with every request.
    pub persona: String,
    /// Whether the model may ground its answers on web search.
    pub web_search: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_owned(),
            web_search: true,
        }
    }
}

/// A conversation with the model.
///
/// The session keeps the history of completed turns and sends it along with
/// every new message, so the model sees the whole conversation.
pub struct ChatSession {
    client: ModelClient,
    config: SessionConfig,
    history: Vec<ModelMessage>,
}

impl ChatSession {
    /// Creates a session on top of `provider`.
    pub fn create<P: ModelProvider + 'static>(
        provider: P,
        config: SessionConfig,
    ) -> Self {
        Self {
            client: ModelClient::new(provider),
            config,
            history: vec![],
        }
    }

    /// The configuration the session was created with.
    #[inline]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Completed turns, oldest first.
    #[inline]
    pub fn history(&self) -> &[ModelMessage] {
        &self.history
    }

    /// Sends `text` and returns the stream of the reply.
    ///
    /// The turn is added to the history only once the stream has been
    /// consumed to its end without errors.
    pub async fn send_stream(
        &mut self,
        text: &str,
    ) -> Result<ChatStream<'_>, ChatError> {
        let request = self.build_request(text);
        let response = self
            .client
            .send_request(request)
            .await
            .map_err(|err| ChatError::transport(err.as_ref()))?;
        Ok(ChatStream {
            history: &mut self.history,
            user_text: text.to_owned(),
            reply: String::new(),
            response,
            finished: false,
        })
    }

    fn build_request(&self, text: &str) -> ModelRequest {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        if !self.config.persona.is_empty() {
            messages.push(ModelMessage::System(self.config.persona.clone()));
        }
        messages.extend(self.history.iter().cloned());
        messages.push(ModelMessage::User(text.to_owned()));

        let tools = if self.config.web_search {
            vec![ModelTool::WebSearch]
        } else {
            vec![]
        };
        ModelRequest { messages, tools }
    }
}

/// The streamed reply to one message.
pub struct ChatStream<'a> {
    history: &'a mut Vec<ModelMessage>,
    user_text: String,
    reply: String,
    response: ModelClientResponse,
    finished: bool,
}

impl ChatStream<'_> {
    /// Waits for the next chunk. `None` means the reply is complete.
    ///
    /// After an error the stream is over and keeps returning `None`.
    pub async fn next_chunk(
        &mut self,
    ) -> Result<Option<ResponseChunk>, ChatError> {
        while !self.finished {
            match self.response.next_event().await {
                Ok(Some(ModelResponseEvent::Chunk(chunk))) => {
                    self.reply.push_str(&chunk.text);
                    return Ok(Some(chunk));
                }
                Ok(Some(ModelResponseEvent::Completed(reason))) => {
                    debug!("reply completed: {reason:?}");
                }
                Ok(None) => {
                    self.finished = true;
                    self.commit();
                }
                Err(err) => {
                    self.finished = true;
                    return Err(ChatError::transport(err.as_ref()));
                }
            }
        }
        Ok(None)
    }

    fn commit(&mut self) {
        if self.reply.is_empty() {
            // An empty model turn would be rejected by the provider on the
            // next request, drop the whole turn instead.
            debug!("empty reply, turn not recorded");
            return;
        }
        self.history
            .push(ModelMessage::User(std::mem::take(&mut self.user_text)));
        self.history
            .push(ModelMessage::Assistant(std::mem::take(&mut self.reply)));
    }
}
