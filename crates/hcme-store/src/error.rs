use std::fmt;

/// Result type for hcme-store's internal (non-trait) operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Database(rusqlite::Error),
    Json(serde_json::Error),
    /// A stored row referenced a value outside its declared domain (e.g. an
    /// unrecognized `role` or `status` string) — a corrupt-store condition,
    /// not a caller error.
    Corrupt(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Database(err) => write!(f, "database error: {err}"),
            Error::Json(err) => write!(f, "JSON error: {err}"),
            Error::Corrupt(msg) => write!(f, "corrupt row: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Database(err) => Some(err),
            Error::Json(err) => Some(err),
            Error::Corrupt(_) => None,
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        Error::Database(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err)
    }
}

/// Map a store-local error onto the shared provider error surface, at the
/// boundary where `SqliteGraphStore` implements `hcme_providers::GraphStore`.
pub fn to_provider_error(err: Error) -> hcme_providers::Error {
    match err {
        Error::Database(e) => hcme_providers::Error::Connection(e.to_string()),
        Error::Json(e) => hcme_providers::Error::Connection(format!("malformed stored JSON: {e}")),
        Error::Corrupt(msg) => hcme_providers::Error::Connection(msg),
    }
}
