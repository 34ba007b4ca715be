/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The input messages, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Built-in tools the model is allowed to use.
    pub tools: Vec<ModelTool>,
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input text.
    User(String),
    /// An assistant text.
    Assistant(String),
}

/// A provider-side tool that can augment the model's answers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModelTool {
    /// Grounds answers on web search results. Providers report the sources
    /// they used in the chunk metadata.
    WebSearch,
}
