//! A universal assistant in the terminal, answering with Gemini and citing
//! the web sources its answers are grounded on.
//!
//! The crate ships the `omnichat` binary. The pieces it is made of, the
//! environment settings and the terminal renderer, are also usable as a
//! library on top of [`omnichat_core`].

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

mod config;
pub mod render;

pub use config::{
    API_KEY_VAR, BASE_URL_VAR, FALLBACK_API_KEY_VAR, MODEL_VAR, Settings,
};

/// The first message of every conversation.
pub const GREETING: &str = "Hello! I am OmniChat. I can answer questions about history, science, coding, recent news, or anything else you're curious about. How can I help you today?";

/// Re-exports of [`omnichat_core`] crate.
pub mod core {
    pub use omnichat_core::*;
}
