//! Testing infrastructure for the hierarchical conversation memory engine
//! (spec A.4): an in-memory `GraphStore` plus deterministic embedding/LLM
//! stand-ins, and a fluent builder for seeding conversations into them.

pub mod conversation;
pub mod fakes;

pub use conversation::ConversationBuilder;
pub use fakes::{FakeEmbeddingProvider, FakeGraphStore, FakeLlmProvider};
