use crate::error::Result;
use crate::shortcode::ShortCode;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A persisted URL record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Store-assigned key, unique and never reused.
    pub key: u64,
    /// The terminal URL that was shortened.
    pub original_url: String,
    /// Set once by [`Repository::attach_short_code`].
    pub short_code: Option<ShortCode>,
}

/// Persistence for shortened URLs.
///
/// Keys are assigned by the store on [`insert`](Repository::insert). A record
/// only becomes resolvable once its short code has been attached, so a
/// concurrent lookup between the two calls simply misses.
#[async_trait]
pub trait Repository: Send + Sync + 'static {
    /// Persists a new record and returns its freshly assigned key.
    async fn insert(&self, original_url: &str) -> Result<u64>;

    /// Sets the short code of the record identified by `key`.
    ///
    /// Returns `Err(MissingRecord)` if no such record exists and
    /// `Err(Conflict)` if the code is already attached elsewhere.
    async fn attach_short_code(&self, key: u64, code: &ShortCode) -> Result<()>;

    /// Returns the original URL stored under `code`.
    ///
    /// Returns `Err(NotFound)` when nothing matches or the stored URL is blank.
    async fn resolve(&self, code: &ShortCode) -> Result<String>;

    /// Removes a record that never received a short code.
    /// Returns `true` if a record was removed.
    async fn discard(&self, key: u64) -> Result<bool>;
}
