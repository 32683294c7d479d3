use fluster_core::{InvalidUrlError, StorageError};
use std::fmt::{Display, Formatter};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ShortenerError>;

/// A step of the shortening pipeline, or the lookup path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validating,
    Resolving,
    CheckingSafety,
    Persisting,
    Encoding,
    Attaching,
    Lookup,
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::Resolving => "resolving",
            Stage::CheckingSafety => "checking-safety",
            Stage::Persisting => "persisting",
            Stage::Encoding => "encoding",
            Stage::Attaching => "attaching",
            Stage::Lookup => "lookup",
        };
        f.write_str(name)
    }
}

/// Failures while following a redirect chain.
#[derive(Debug, Clone, Error)]
pub enum ResolutionError {
    #[error("http client could not be built: {0}")]
    Client(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timed out: {0}")]
    Timeout(String),
    #[error("more than {max} redirects")]
    TooManyRedirects { max: usize },
    #[error("redirect has no usable location: {0}")]
    InvalidLocation(String),
}

impl From<reqwest::Error> for ResolutionError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ResolutionError::Timeout(err.to_string())
        } else {
            ResolutionError::Request(err.to_string())
        }
    }
}

/// Failures while asking the threat-matching service about a URL.
///
/// None of these mean "safe"; the pipeline stops on all of them.
#[derive(Debug, Clone, Error)]
pub enum CheckError {
    #[error("http client could not be built: {0}")]
    Client(String),
    #[error("threat service request failed: {0}")]
    Request(String),
    #[error("threat service answered with status {0}")]
    Status(u16),
    #[error("threat service response unreadable: {0}")]
    Body(String),
}

#[derive(Debug, Error)]
pub enum ShortenerError {
    #[error("invalid url: {0}")]
    InvalidUrl(#[from] InvalidUrlError),
    #[error("could not resolve url: {0}")]
    Resolution(#[from] ResolutionError),
    #[error("could not check url safety: {0}")]
    Check(#[from] CheckError),
    #[error("url is flagged as malicious: {0}")]
    MaliciousUrl(String),
    #[error("storage error while {stage}: {source}")]
    Storage {
        stage: Stage,
        #[source]
        source: StorageError,
    },
    #[error("short code not found: {0}")]
    NotFound(String),
}

impl ShortenerError {
    /// The stage at which the request failed.
    pub fn stage(&self) -> Stage {
        match self {
            ShortenerError::InvalidUrl(_) => Stage::Validating,
            ShortenerError::Resolution(_) => Stage::Resolving,
            ShortenerError::Check(_) | ShortenerError::MaliciousUrl(_) => Stage::CheckingSafety,
            ShortenerError::Storage { stage, .. } => *stage,
            ShortenerError::NotFound(_) => Stage::Lookup,
        }
    }
}
