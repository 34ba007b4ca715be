use omnichat_model::ModelProvider;

use super::{Chat, ChatEvent, Connector, EventCallback, connect};
use crate::error::ChatError;
use crate::session::{ChatSession, SessionConfig};
use crate::transcript::{Speaker, Transcript};

/// [`Chat`] builder.
pub struct ChatBuilder {
    connector: Connector,
    greeting: Option<String>,
    on_event: Option<EventCallback>,
}

impl ChatBuilder {
    /// Creates a builder that gets its sessions from `connector`.
    ///
    /// The connector is called when the chat is built and again on the
    /// next submission whenever there is no session.
    #[inline]
    pub fn with_connector(
        connector: impl Fn() -> Result<ChatSession, ChatError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            connector: Box::new(connector),
            greeting: None,
            on_event: None,
        }
    }

    /// Creates a builder whose sessions talk to `provider`.
    pub fn with_model_provider<P>(provider: P, config: SessionConfig) -> Self
    where
        P: ModelProvider + Clone + Send + Sync + 'static,
    {
        Self::with_connector(move || {
            Ok(ChatSession::create(provider.clone(), config.clone()))
        })
    }

    /// Sets the assistant message the transcript starts with.
    ///
    /// The greeting is only displayed, it's never sent to the model. It's
    /// left out when the session can't be created at build time.
    #[inline]
    pub fn with_greeting<S: Into<String>>(mut self, greeting: S) -> Self {
        self.greeting = Some(greeting.into());
        self
    }

    /// Attaches a callback to be invoked on every [`ChatEvent`].
    #[inline]
    pub fn on_event(
        mut self,
        on_event: impl Fn(&ChatEvent, &Transcript) + Send + Sync + 'static,
    ) -> Self {
        self.on_event = Some(Box::new(on_event));
        self
    }

    /// Builds the chat and tries to create its session.
    ///
    /// A failure doesn't prevent the chat from being built, it's reported
    /// through [`Chat::error`] instead.
    pub fn build(self) -> Chat {
        let Self {
            connector,
            greeting,
            on_event,
        } = self;

        let mut transcript = Transcript::new();
        let (session, error) = match connect(&connector) {
            Ok(session) => {
                if let Some(greeting) = greeting {
                    transcript.push_finalized(Speaker::Assistant, greeting);
                }
                (Some(session), None)
            }
            Err(err) => (None, Some(err)),
        };

        Chat {
            connector,
            session,
            transcript,
            error,
            on_event,
        }
    }
}
