use thiserror::Error;

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors produced when turning a short code back into a numeric key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("short code is not valid base58: {0}")]
    InvalidBase58(String),
    #[error("short code does not decode to a decimal key: {0:?}")]
    NotDecimal(String),
    #[error("decoded key is not canonical: {0:?}")]
    NonCanonical(String),
    #[error("decoded key is out of range: {0}")]
    OutOfRange(String),
}

/// A candidate URL that is not a well-formed absolute http(s) URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidUrlError {
    #[error("url cannot be empty")]
    Empty,
    #[error("url exceeds {max} bytes (got {len})")]
    TooLong { len: usize, max: usize },
    #[error("url is malformed: {0}")]
    Malformed(String),
    #[error("url scheme must be http or https, got '{0}'")]
    UnsupportedScheme(String),
    #[error("url has no host: {0}")]
    MissingHost(String),
}

#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("short code already attached to another record: {0}")]
    Conflict(String),
    #[error("no record with key {0}")]
    MissingRecord(u64),
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),
    #[error("storage operation timed out: {0}")]
    Timeout(String),
    #[error("storage query failed: {0}")]
    Query(String),
    #[error("stored data is invalid: {0}")]
    InvalidData(String),
}
