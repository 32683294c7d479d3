use crate::error::Result;
use async_trait::async_trait;
use fluster_core::ShortCode;

#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Runs the shortening pipeline on a submitted URL and returns the issued short code.
    async fn shorten(&self, url: &str) -> Result<ShortCode>;

    /// Retrieves the original URL stored under the given short code.
    async fn resolve(&self, code: &str) -> Result<String>;
}
