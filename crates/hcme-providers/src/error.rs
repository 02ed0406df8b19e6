use std::fmt;

/// Result type for hcme-providers operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types surfaced by the external-contract traits.
///
/// `VectorIndexNotFound` is split out from `Connection` deliberately: the
/// Semantic Retriever and Code Searcher need to tell "this index doesn't
/// exist, fall back to linear scan" apart from "the store is unreachable,
/// give up" (spec §4.1, §4.8).
#[derive(Debug)]
pub enum Error {
    /// Connection to the graph store failed or was lost.
    Connection(String),
    /// A named vector index does not exist.
    VectorIndexNotFound(String),
    /// A constraint (uniqueness, required field) was violated on write.
    Constraint(String),
    /// The embedding provider failed to embed the given input.
    Embedding(String),
    /// The LLM provider failed to generate a completion.
    Llm(String),
    /// A native tool-calling round failed.
    ToolCall(String),
    /// An advisory lock (ingestion/embedding) could not be acquired.
    Lock(String),
    /// The outbound call exceeded its caller-supplied deadline.
    Timeout,
    Json(serde_json::Error),
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(msg) => write!(f, "graph store connection error: {msg}"),
            Error::VectorIndexNotFound(name) => write!(f, "vector index not found: {name}"),
            Error::Constraint(msg) => write!(f, "constraint violation: {msg}"),
            Error::Embedding(msg) => write!(f, "embedding provider error: {msg}"),
            Error::Llm(msg) => write!(f, "LLM provider error: {msg}"),
            Error::ToolCall(msg) => write!(f, "tool call error: {msg}"),
            Error::Lock(msg) => write!(f, "lock error: {msg}"),
            Error::Timeout => write!(f, "operation exceeded its deadline"),
            Error::Json(err) => write!(f, "JSON error: {err}"),
            Error::Io(err) => write!(f, "IO error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Json(err) => Some(err),
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}
