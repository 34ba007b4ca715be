mod builder;

use crate::citation::extract_citations;
use crate::error::ChatError;
use crate::session::ChatSession;
use crate::transcript::{ConversationEntry, EntryId, Transcript};
pub use builder::ChatBuilder;

type Connector = Box<dyn Fn() -> Result<ChatSession, ChatError> + Send + Sync>;
type EventCallback = Box<dyn Fn(&ChatEvent, &Transcript) + Send + Sync>;

/// Changes a [`Chat`] reports while it works.
///
/// The callback receives the transcript right after the change was applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatEvent {
    /// A new entry was appended.
    EntryAdded(EntryId),
    /// A streamed chunk was appended to an in-flight entry.
    EntryUpdated(EntryId),
    /// The response entry is complete.
    EntryFinalized(EntryId),
    /// An in-flight entry was rolled back.
    EntryRemoved(EntryId),
    /// The exchange failed, the error banner is now set.
    Failed(ChatError),
}

/// The conversation as the user sees it: a transcript, an error banner and
/// the session that produces the replies.
///
/// The session is created lazily. If creating it fails, the failure shows in
/// the banner and the next submission tries again.
pub struct Chat {
    connector: Connector,
    session: Option<ChatSession>,
    transcript: Transcript,
    error: Option<ChatError>,
    on_event: Option<EventCallback>,
}

impl Chat {
    /// Sends `input` and streams the reply into the transcript.
    ///
    /// Blank input is rejected without touching anything. Otherwise the
    /// input is added as a user entry followed by an in-flight assistant
    /// entry that receives the chunks. On success the assistant entry is
    /// finalized and its id returned. On failure the assistant entry is
    /// removed, the user entry stays and the error banner is set.
    pub async fn submit(&mut self, input: &str) -> Result<EntryId, ChatError> {
        if input.trim().is_empty() {
            return Err(ChatError::EmptyInput);
        }
        self.discard_interrupted();
        self.error = None;

        let user_id = self.transcript.submit_user(input);
        self.emit(ChatEvent::EntryAdded(user_id));
        let response_id = self.transcript.begin_response()?;
        self.emit(ChatEvent::EntryAdded(response_id));

        match self.stream_reply(response_id, input).await {
            Ok(()) => {
                self.transcript.finalize(response_id)?;
                self.emit(ChatEvent::EntryFinalized(response_id));
                Ok(response_id)
            }
            Err(err) => {
                warn!("exchange failed: {err}");
                self.transcript.rollback(response_id)?;
                self.emit(ChatEvent::EntryRemoved(response_id));
                self.error = Some(err.clone());
                self.emit(ChatEvent::Failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Whether `input` would be accepted by [`Chat::submit`] right now.
    pub fn can_submit(&self, input: &str) -> bool {
        !input.trim().is_empty() && !self.is_busy()
    }

    /// Whether a response is still in flight.
    ///
    /// This only stays `true` outside of [`Chat::submit`] when a submission
    /// was cancelled by dropping its future, see
    /// [`Chat::discard_interrupted`].
    pub fn is_busy(&self) -> bool {
        self.transcript.in_flight().is_some()
    }

    /// Removes the response left in flight by a cancelled submission.
    ///
    /// The cancelled turn is not part of the session history, so the model
    /// won't see it. Returns whether there was anything to remove.
    pub fn discard_interrupted(&mut self) -> bool {
        let Some(id) = self.transcript.in_flight().map(ConversationEntry::id)
        else {
            return false;
        };
        info!("discarding interrupted response {id}");
        if self.transcript.rollback(id).is_err() {
            return false;
        }
        self.emit(ChatEvent::EntryRemoved(id));
        true
    }

    /// The error shown in the banner, if any.
    #[inline]
    pub fn error(&self) -> Option<&ChatError> {
        self.error.as_ref()
    }

    /// Clears the error banner.
    #[inline]
    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// The conversation so far.
    #[inline]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Whether a session currently exists.
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    async fn stream_reply(
        &mut self,
        id: EntryId,
        input: &str,
    ) -> Result<(), ChatError> {
        let session = match &mut self.session {
            Some(session) => session,
            None => self.session.insert(connect(&self.connector)?),
        };

        let mut stream = session.send_stream(input).await?;
        while let Some(chunk) = stream.next_chunk().await? {
            let citations = extract_citations(&chunk.raw_metadata);
            if !citations.is_empty() {
                debug!("{id} got {} citations", citations.len());
            }
            self.transcript.append_chunk(id, &chunk.text, citations)?;
            if let Some(on_event) = &self.on_event {
                on_event(&ChatEvent::EntryUpdated(id), &self.transcript);
            }
        }
        Ok(())
    }

    fn emit(&self, event: ChatEvent) {
        trace!("chat event: {event:?}");
        if let Some(on_event) = &self.on_event {
            on_event(&event, &self.transcript);
        }
    }
}

fn connect(connector: &Connector) -> Result<ChatSession, ChatError> {
    match connector() {
        Ok(session) => {
            info!("chat session created");
            Ok(session)
        }
        Err(err) => {
            error!("failed to create chat session: {err}");
            Err(err)
        }
    }
}
