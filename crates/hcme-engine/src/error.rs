use std::fmt;

#[derive(Debug)]
pub enum Error {
    Store(hcme_providers::Error),
    Llm(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(e) => write!(f, "graph store error: {e}"),
            Error::Llm(msg) => write!(f, "summary executor error: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(e) => Some(e),
            Error::Llm(_) => None,
        }
    }
}

impl From<hcme_providers::Error> for Error {
    fn from(e: hcme_providers::Error) -> Self {
        Error::Store(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
