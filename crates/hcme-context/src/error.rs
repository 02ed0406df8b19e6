use std::fmt;

#[derive(Debug)]
pub enum Error {
    Store(hcme_providers::Error),
    Engine(hcme_engine::Error),
    Retrieval(hcme_retrieval::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(e) => write!(f, "graph store error: {e}"),
            Error::Engine(e) => write!(f, "engine error: {e}"),
            Error::Retrieval(e) => write!(f, "retrieval error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(e) => Some(e),
            Error::Engine(e) => Some(e),
            Error::Retrieval(e) => Some(e),
        }
    }
}

impl From<hcme_providers::Error> for Error {
    fn from(e: hcme_providers::Error) -> Self {
        Error::Store(e)
    }
}

impl From<hcme_engine::Error> for Error {
    fn from(e: hcme_engine::Error) -> Self {
        Error::Engine(e)
    }
}

impl From<hcme_retrieval::Error> for Error {
    fn from(e: hcme_retrieval::Error) -> Self {
        Error::Retrieval(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
