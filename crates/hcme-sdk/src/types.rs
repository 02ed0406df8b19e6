//! Re-exports of the domain types SDK consumers work with, so downstream
//! crates depend on `hcme-sdk` alone rather than the whole crate graph.

pub use hcme_context::{BuildOptions, ContextSections, FormatOptions, RenderedHit};
pub use hcme_providers::{CodeUnit, CodeUnitType, ProjectInfo};
pub use hcme_retrieval::{CodeHit, SearchHit};
pub use hcme_runtime::Config;
pub use hcme_types::{
    FileMention, Message, NodeMention, NodeMentionKind, Role, Summary, SummaryContent, SummaryLevel, Turn,
};
