//! Context Builder and Formatter (spec §4.10/§4.11): fans recent turns,
//! summaries, and semantic/code search out under a character budget and
//! renders the result into a single deterministic prompt.

pub mod builder;
pub mod config;
pub mod error;
pub mod formatter;

pub use builder::{BuildOptions, ContextBuilder, ContextSections, RenderedHit};
pub use config::Config;
pub use error::{Error, Result};
pub use formatter::{format_context, FormatOptions};
