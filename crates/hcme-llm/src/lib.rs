//! Structured LLM Executor (spec §4.12): prompt composition, schema-driven
//! output templates, permissive parsing, and the Batch/Single entry points
//! that drive summary generation and the Code Searcher's fallback.

pub mod batch;
pub mod compaction;
pub mod config;
pub mod error;
pub mod executor;
pub mod openai;
pub mod parse;
pub mod prompt;
pub mod schema;
pub mod single;

pub use batch::{run_batch, BatchItem, BatchOutput, BatchResult};
pub use config::{ExecutorConfig, CHARS_PER_TOKEN};
pub use error::{Error, Result};
pub use executor::{LlmCodeSearchFallback, LlmSummaryExecutor};
pub use openai::OpenAiProvider;
pub use parse::{parse_output, ParseFormat};
pub use prompt::{PromptSections, SectionKind, DEFAULT_ORDER};
pub use schema::{render_template, FieldSchema, OutputFormat, OutputSchema};
pub use single::{run_single, SingleOptions, ToolCallRequest, ToolExecutor};
