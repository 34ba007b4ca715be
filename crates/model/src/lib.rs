//! An abstraction layer for the hosted LLMs the chat client talks to.
//!
//! This crate establishes the protocol between the chat core and a model
//! provider: a request carries the conversation so far, and the response
//! is a lazily-polled sequence of chunks, each holding a text delta and the
//! raw metadata the provider attached to it.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
