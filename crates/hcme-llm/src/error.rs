use std::fmt;

#[derive(Debug)]
pub enum Error {
    Provider(hcme_providers::Error),
    /// A response failed to parse under the declared format/schema. Carries
    /// a preview of the raw response for diagnosis (spec §4.12).
    Parse(String),
    /// Outer-iteration budget exhausted without a terminal valid output
    /// (spec §4.12 termination criterion (b)).
    MaxIterationsExceeded,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Provider(e) => write!(f, "provider error: {e}"),
            Error::Parse(msg) => write!(f, "parse error: {msg}"),
            Error::MaxIterationsExceeded => write!(f, "max iterations exceeded without a terminal output"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Provider(e) => Some(e),
            Error::Parse(_) | Error::MaxIterationsExceeded => None,
        }
    }
}

impl From<hcme_providers::Error> for Error {
    fn from(e: hcme_providers::Error) -> Self {
        Error::Provider(e)
    }
}

impl From<Error> for hcme_engine::Error {
    fn from(e: Error) -> Self {
        hcme_engine::Error::Llm(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
