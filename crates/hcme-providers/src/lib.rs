pub mod error;
pub mod traits;

pub use error::{Error, Result};
pub use traits::{
    normalize_numeric, AdvisoryLock, BrainRegistry, CodeUnit, CodeUnitType, EmbeddingProvider,
    FileToolbox, GrepMatch, GraphStore, LlmProvider, NativeToolCall, NativeToolProvider, NodeLabel,
    ProjectInfo, ProviderMessage, RelationType, ToolDefinition, VectorIndex, VectorMatch,
};
