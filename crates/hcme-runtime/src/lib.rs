//! Ambient runtime surface: the shared `Config` record, advisory locks and
//! the project registry guarding code-semantic search, and LLM call logging.

pub mod config;
pub mod error;
pub mod locks;
pub mod log;

pub use config::{resolve_workspace_path, Config};
pub use error::{Error, Result};
pub use locks::{FileAdvisoryLock, FileBrainRegistry};
pub use log::{analysis_enabled, schedule_analysis, CallMetadata, LlmCallLogger};
