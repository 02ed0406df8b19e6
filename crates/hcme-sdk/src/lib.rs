//! Public facade wiring the graph store, provider traits, summarization
//! engine, and context assembly into one `Client`/`Conversation` API.

pub mod client;
pub mod error;
pub mod types;

pub use client::{Client, Conversation};
pub use error::{Error, Result};
