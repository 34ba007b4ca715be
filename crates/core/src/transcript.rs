//! The conversation transcript and its state transitions.
//!
//! Entries are displayed in insertion order. User entries are final as soon
//! as they are added, while an assistant response goes through a placeholder
//! entry that receives streamed chunks until it is either finalized or
//! rolled back. At most one entry is in flight at any time.

use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

use chrono::{DateTime, Local};

use crate::citation::Citation;

/// Identifies an entry for its whole lifetime. Ids are never reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl Display for EntryId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "entry:{}", self.0)
    }
}

/// Who produced an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Speaker {
    /// The person typing.
    User,
    /// The model.
    Assistant,
    /// Notices from the client itself.
    System,
}

/// Lifecycle state of an entry that is part of the transcript.
///
/// Rolled back entries are removed, so they have no state here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntryState {
    /// The response is still streaming.
    InFlight,
    /// The entry will never change again.
    Finalized,
}

/// One entry of the transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConversationEntry {
    id: EntryId,
    speaker: Speaker,
    text: String,
    created_at: DateTime<Local>,
    state: EntryState,
    citations: Vec<Citation>,
}

impl ConversationEntry {
    /// Stable identifier of this entry.
    #[inline]
    pub fn id(&self) -> EntryId {
        self.id
    }

    /// Who wrote this entry.
    #[inline]
    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    /// The text received so far.
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// When the entry was added to the transcript.
    #[inline]
    pub fn created_at(&self) -> DateTime<Local> {
        self.created_at
    }

    /// Current lifecycle state.
    #[inline]
    pub fn state(&self) -> EntryState {
        self.state
    }

    /// Whether the entry is still receiving chunks.
    #[inline]
    pub fn is_in_flight(&self) -> bool {
        self.state == EntryState::InFlight
    }

    /// Citations in the order they were received, duplicates included.
    #[inline]
    pub fn citations(&self) -> &[Citation] {
        &self.citations
    }

    /// Citations with repeated URIs removed, keeping the first occurrence.
    pub fn unique_citations(&self) -> impl Iterator<Item = &Citation> {
        let mut seen = HashSet::new();
        self.citations
            .iter()
            .filter(move |citation| seen.insert(citation.uri.as_str()))
    }
}

/// Invalid transcript transitions.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TranscriptError {
    /// Another response is still streaming.
    #[error("{0} is still in flight")]
    ExchangeInProgress(EntryId),
    /// No entry has this id.
    #[error("{0} does not exist")]
    UnknownEntry(EntryId),
    /// The entry exists but doesn't accept changes anymore.
    #[error("{0} is not in flight")]
    NotInFlight(EntryId),
}

/// Ordered list of conversation entries.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    entries: Vec<ConversationEntry>,
    next_id: u64,
}

impl Transcript {
    /// Creates an empty transcript.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a finalized user entry.
    pub fn submit_user<S: Into<String>>(&mut self, text: S) -> EntryId {
        self.push(Speaker::User, text.into(), EntryState::Finalized)
    }

    /// Appends a finalized entry for any speaker.
    pub fn push_finalized<S: Into<String>>(
        &mut self,
        speaker: Speaker,
        text: S,
    ) -> EntryId {
        self.push(speaker, text.into(), EntryState::Finalized)
    }

    /// Appends an empty in-flight assistant entry, the placeholder for a
    /// response that is about to stream.
    pub fn begin_response(&mut self) -> Result<EntryId, TranscriptError> {
        if let Some(entry) = self.in_flight() {
            return Err(TranscriptError::ExchangeInProgress(entry.id));
        }
        Ok(self.push(Speaker::Assistant, String::new(), EntryState::InFlight))
    }

    /// Appends a text delta and the citations that came with it.
    ///
    /// Nothing is changed if the entry is not in flight.
    pub fn append_chunk(
        &mut self,
        id: EntryId,
        delta: &str,
        citations: Vec<Citation>,
    ) -> Result<(), TranscriptError> {
        let entry = self.in_flight_mut(id)?;
        entry.text.push_str(delta);
        entry.citations.extend(citations);
        Ok(())
    }

    /// Marks the in-flight entry as final.
    pub fn finalize(&mut self, id: EntryId) -> Result<(), TranscriptError> {
        let entry = self.in_flight_mut(id)?;
        entry.state = EntryState::Finalized;
        trace!("{id} finalized with {} bytes", entry.text.len());
        Ok(())
    }

    /// Removes the in-flight entry as if it never existed.
    pub fn rollback(&mut self, id: EntryId) -> Result<(), TranscriptError> {
        self.in_flight_mut(id)?;
        self.entries.retain(|entry| entry.id != id);
        debug!("{id} rolled back");
        Ok(())
    }

    /// All entries in display order.
    #[inline]
    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// Looks up an entry by id.
    pub fn get(&self, id: EntryId) -> Option<&ConversationEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    /// Returns the entry currently streaming, if any.
    pub fn in_flight(&self) -> Option<&ConversationEntry> {
        self.entries.iter().rev().find(|entry| entry.is_in_flight())
    }

    /// The newest entry.
    #[inline]
    pub fn last(&self) -> Option<&ConversationEntry> {
        self.entries.last()
    }

    /// Number of visible entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the transcript has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn push(&mut self, speaker: Speaker, text: String, state: EntryState) -> EntryId {
        let id = EntryId(self.next_id);
        self.next_id += 1;
        self.entries.push(ConversationEntry {
            id,
            speaker,
            text,
            created_at: Local::now(),
            state,
            citations: vec![],
        });
        id
    }

    fn in_flight_mut(
        &mut self,
        id: EntryId,
    ) -> Result<&mut ConversationEntry, TranscriptError> {
        let Some(entry) = self.entries.iter_mut().find(|entry| entry.id == id)
        else {
            warn!("rejected change to {id}: no such entry");
            return Err(TranscriptError::UnknownEntry(id));
        };
        if !entry.is_in_flight() {
            warn!("rejected change to {id}: not in flight");
            return Err(TranscriptError::NotInFlight(id));
        }
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn citation(n: u32) -> Citation {
        Citation::new(format!("Site {n}"), format!("https://{n}.example"))
    }

    #[test]
    fn test_user_entries_are_final() {
        let mut transcript = Transcript::new();
        let id = transcript.submit_user("Hello");
        let entry = transcript.get(id).unwrap();
        assert_eq!(entry.speaker(), Speaker::User);
        assert_eq!(entry.state(), EntryState::Finalized);
        assert_eq!(entry.text(), "Hello");
        assert!(transcript.in_flight().is_none());
    }

    #[test]
    fn test_streamed_response() {
        let mut transcript = Transcript::new();
        transcript.submit_user("Greet me");
        let id = transcript.begin_response().unwrap();
        assert_eq!(transcript.in_flight().map(|e| e.id()), Some(id));
        assert_eq!(transcript.get(id).unwrap().text(), "");

        transcript.append_chunk(id, "Hel", vec![]).unwrap();
        transcript.append_chunk(id, "lo", vec![]).unwrap();
        assert_eq!(transcript.get(id).unwrap().text(), "Hello");

        transcript.finalize(id).unwrap();
        let entry = transcript.get(id).unwrap();
        assert_eq!(entry.state(), EntryState::Finalized);
        assert_eq!(
            transcript.append_chunk(id, "!", vec![citation(1)]),
            Err(TranscriptError::NotInFlight(id))
        );
        assert_eq!(transcript.finalize(id), Err(TranscriptError::NotInFlight(id)));
        assert_eq!(transcript.rollback(id), Err(TranscriptError::NotInFlight(id)));

        let entry = transcript.get(id).unwrap();
        assert_eq!(entry.text(), "Hello");
        assert!(entry.citations().is_empty());
    }

    #[test]
    fn test_concatenation_in_order() {
        let chunks = [
            ("The ", vec![]),
            ("quick ", vec![citation(1), citation(2)]),
            ("", vec![citation(1)]),
            ("fox", vec![citation(3)]),
        ];

        let mut transcript = Transcript::new();
        let id = transcript.begin_response().unwrap();
        for (delta, citations) in chunks.clone() {
            transcript.append_chunk(id, delta, citations).unwrap();
        }
        transcript.finalize(id).unwrap();

        let entry = transcript.get(id).unwrap();
        let expected_text: String = chunks.iter().map(|(d, _)| *d).collect();
        let expected_citations: Vec<_> =
            chunks.into_iter().flat_map(|(_, c)| c).collect();
        assert_eq!(entry.text(), expected_text);
        assert_eq!(entry.citations(), expected_citations.as_slice());

        let unique: Vec<_> = entry.unique_citations().cloned().collect();
        assert_eq!(unique, vec![citation(1), citation(2), citation(3)]);
    }

    #[test]
    fn test_rollback_restores_length() {
        let mut transcript = Transcript::new();
        transcript.push_finalized(Speaker::Assistant, "Welcome!");
        transcript.submit_user("Question");
        let len_before = transcript.len();

        let id = transcript.begin_response().unwrap();
        transcript.append_chunk(id, "Partial ans", vec![citation(1)]).unwrap();
        transcript.rollback(id).unwrap();

        assert_eq!(transcript.len(), len_before);
        assert!(transcript.get(id).is_none());
        assert!(transcript.in_flight().is_none());
        assert_eq!(transcript.last().unwrap().text(), "Question");
        assert_eq!(
            transcript.append_chunk(id, "more", vec![]),
            Err(TranscriptError::UnknownEntry(id))
        );

        // Ids are not reused after a rollback.
        let next = transcript.begin_response().unwrap();
        assert_ne!(next, id);
    }

    #[test]
    fn test_single_exchange_at_a_time() {
        let mut transcript = Transcript::new();
        let id = transcript.begin_response().unwrap();
        assert_eq!(
            transcript.begin_response(),
            Err(TranscriptError::ExchangeInProgress(id))
        );
        assert_eq!(transcript.len(), 1);
    }

    #[test]
    fn test_invalid_calls_leave_other_entries_alone() {
        let mut transcript = Transcript::new();
        let user = transcript.submit_user("Hi");
        let reply = transcript.begin_response().unwrap();
        transcript.append_chunk(reply, "Hey", vec![]).unwrap();

        assert_eq!(
            transcript.append_chunk(user, "!", vec![]),
            Err(TranscriptError::NotInFlight(user))
        );
        assert_eq!(transcript.rollback(user), Err(TranscriptError::NotInFlight(user)));

        assert_eq!(transcript.get(user).unwrap().text(), "Hi");
        assert_eq!(transcript.get(reply).unwrap().text(), "Hey");
        assert!(transcript.get(reply).unwrap().is_in_flight());
    }
}
