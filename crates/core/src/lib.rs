//! Core logic of the chat client: sessions, the transcript, citation
//! extraction and markup formatting.
//!
//! [`Chat`] ties everything together. It owns the transcript and feeds it
//! with the chunks streamed by a [`ChatSession`]:
//!
//! ```no_run
//! # async fn run(provider: impl omnichat_model::ModelProvider + Clone + 'static) {
//! use omnichat_core::{ChatBuilder, SessionConfig};
//!
//! let mut chat = ChatBuilder::with_model_provider(provider, SessionConfig::default())
//!     .with_greeting("Hi!")
//!     .build();
//! if let Ok(id) = chat.submit("When was Rust 1.0 released?").await {
//!     let entry = chat.transcript().get(id).unwrap();
//!     println!("{}", omnichat_core::markup::format(entry.text()));
//! }
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod chat;
mod citation;
mod error;
pub mod markup;
mod model_client;
mod session;
mod transcript;

pub use chat::{Chat, ChatBuilder, ChatEvent};
pub use citation::{Citation, DEFAULT_CITATION_TITLE, extract_citations};
pub use error::ChatError;
pub use session::{ChatSession, ChatStream, DEFAULT_PERSONA, SessionConfig};
pub use transcript::{
    ConversationEntry, EntryId, EntryState, Speaker, Transcript,
    TranscriptError,
};
