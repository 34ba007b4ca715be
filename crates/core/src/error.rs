use omnichat_model::{ErrorKind, ModelProviderError};

use crate::transcript::TranscriptError;

/// Errors surfaced by a chat exchange.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    /// The session could not be created, usually a missing credential.
    #[error("failed to initialize chat session: {0}")]
    Initialization(String),
    /// The request or the stream failed.
    #[error("transport error ({kind}): {message}")]
    Transport {
        /// What went wrong, as classified by the provider.
        kind: ErrorKind,
        /// Provider message.
        message: String,
    },
    /// The input was blank after trimming, nothing was sent.
    #[error("input is empty")]
    EmptyInput,
    /// A transcript transition was refused.
    #[error(transparent)]
    Transcript(#[from] TranscriptError),
}

impl ChatError {
    /// Wraps a provider error.
    pub fn transport(err: &dyn ModelProviderError) -> Self {
        ChatError::Transport {
            kind: err.kind(),
            message: err.to_string(),
        }
    }

    /// The text shown in the error banner.
    pub fn user_message(&self) -> &'static str {
        match self {
            ChatError::Initialization(_) => {
                "Failed to initialize chat session. Please check your configuration."
            }
            ChatError::Transport { .. } | ChatError::Transcript(_) => {
                "An error occurred while getting the response. Please try again."
            }
            ChatError::EmptyInput => "Type a message first.",
        }
    }
}
