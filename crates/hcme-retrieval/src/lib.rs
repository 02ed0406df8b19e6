//! Multi-level semantic retrieval over conversation history and project
//! code (spec §4.8, §4.9).

pub mod code_search;
pub mod confidence;
pub mod error;
pub mod retriever;

pub use code_search::{search_code, CodeHit, CodeSearchFallback, CodeSearchOptions, DirectoryComposition};
pub use confidence::ConfidenceTiers;
pub use error::{Error, Result};
pub use retriever::{search_conversation_history, SearchHit, SearchOptions};
