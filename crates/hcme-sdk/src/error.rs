use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    Store(hcme_providers::Error),
    Engine(hcme_engine::Error),
    Context(hcme_context::Error),
    Llm(hcme_llm::Error),
    Runtime(hcme_runtime::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Store(err) => write!(f, "graph store error: {err}"),
            Error::Engine(err) => write!(f, "engine error: {err}"),
            Error::Context(err) => write!(f, "context error: {err}"),
            Error::Llm(err) => write!(f, "LLM executor error: {err}"),
            Error::Runtime(err) => write!(f, "runtime error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Store(err) => Some(err),
            Error::Engine(err) => Some(err),
            Error::Context(err) => Some(err),
            Error::Llm(err) => Some(err),
            Error::Runtime(err) => Some(err),
        }
    }
}

impl From<hcme_providers::Error> for Error {
    fn from(err: hcme_providers::Error) -> Self {
        Error::Store(err)
    }
}

impl From<hcme_engine::Error> for Error {
    fn from(err: hcme_engine::Error) -> Self {
        Error::Engine(err)
    }
}

impl From<hcme_context::Error> for Error {
    fn from(err: hcme_context::Error) -> Self {
        Error::Context(err)
    }
}

impl From<hcme_llm::Error> for Error {
    fn from(err: hcme_llm::Error) -> Self {
        Error::Llm(err)
    }
}

impl From<hcme_runtime::Error> for Error {
    fn from(err: hcme_runtime::Error) -> Self {
        Error::Runtime(err)
    }
}
