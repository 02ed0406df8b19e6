use std::fmt;

#[derive(Debug)]
pub enum Error {
    Store(hcme_providers::Error),
    /// The LLM-guided fallback (spec §4.9) failed; carries its error text
    /// rather than depending on the executor crate's error type.
    Fallback(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(e) => write!(f, "graph store error: {e}"),
            Error::Fallback(msg) => write!(f, "code search fallback error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(e) => Some(e),
            Error::Fallback(_) => None,
        }
    }
}

impl From<hcme_providers::Error> for Error {
    fn from(e: hcme_providers::Error) -> Self {
        Error::Store(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
