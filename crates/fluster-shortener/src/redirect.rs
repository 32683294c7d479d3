//! Redirect-chain resolution.
//!
//! Submitted links are often tracker or affiliate redirectors. Following the
//! chain to its terminal URL before the safety check and before persisting
//! means the check sees the real destination and one destination maps to one
//! record no matter which tracker led to it.

use crate::error::ResolutionError;
use async_trait::async_trait;
use reqwest::header::{
    HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, DNT, LOCATION,
    UPGRADE_INSECURE_REQUESTS, USER_AGENT,
};
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, trace};
use typed_builder::TypedBuilder;
use url::Url;

/// Desktop Firefox, so redirect logic on the far side treats us like a browser.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:121.0) Gecko/20100101 Firefox/121.0";

const BROWSER_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";

/// Follows redirects from a URL to its terminal destination.
#[async_trait]
pub trait RedirectResolver: Send + Sync + 'static {
    /// Returns the URL of the last request issued while following the chain.
    async fn resolve_final(&self, url: &Url) -> Result<Url, ResolutionError>;
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct ResolverSettings {
    /// Redirects followed before giving up.
    #[builder(default = 10)]
    pub max_hops: usize,
    /// Timeout for each request in the chain.
    #[builder(default = Duration::from_secs(10))]
    pub request_timeout: Duration,
    #[builder(default = Duration::from_secs(5))]
    pub connect_timeout: Duration,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Resolves redirect chains over HTTP with an explicit, bounded hop loop.
///
/// The underlying client never follows redirects on its own; every hop is a
/// separate GET carrying the browser header set.
#[derive(Debug, Clone)]
pub struct HttpRedirectResolver {
    client: Client,
    max_hops: usize,
}

impl HttpRedirectResolver {
    pub fn new(settings: &ResolverSettings) -> Result<Self, ResolutionError> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .redirect(Policy::none())
            .timeout(settings.request_timeout)
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|e| ResolutionError::Client(e.to_string()))?;

        Ok(Self {
            client,
            max_hops: settings.max_hops,
        })
    }
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static(BROWSER_ACCEPT));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert(DNT, HeaderValue::from_static("1"));
    headers.insert(
        HeaderName::from_static("sec-gpc"),
        HeaderValue::from_static("1"),
    );
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));
    for (name, value) in [
        ("sec-fetch-dest", "document"),
        ("sec-fetch-mode", "navigate"),
        ("sec-fetch-site", "none"),
        ("sec-fetch-user", "?1"),
    ] {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }
    headers
}

fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

#[async_trait]
impl RedirectResolver for HttpRedirectResolver {
    async fn resolve_final(&self, url: &Url) -> Result<Url, ResolutionError> {
        let mut current = url.clone();
        let mut hops = 0;

        loop {
            let response = self.client.get(current.clone()).send().await?;
            let status = response.status();

            if !is_redirect(status) {
                debug!(url = %current, hops, status = status.as_u16(), "reached terminal url");
                return Ok(current);
            }

            if hops == self.max_hops {
                return Err(ResolutionError::TooManyRedirects { max: self.max_hops });
            }

            let location = response
                .headers()
                .get(LOCATION)
                .and_then(|value| value.to_str().ok())
                .ok_or_else(|| {
                    ResolutionError::InvalidLocation(format!(
                        "{} from {} without a location header",
                        status, current
                    ))
                })?;

            let next = current
                .join(location)
                .map_err(|e| ResolutionError::InvalidLocation(format!("{location}: {e}")))?;
            if next.scheme() != "http" && next.scheme() != "https" {
                return Err(ResolutionError::InvalidLocation(next.to_string()));
            }

            trace!(from = %current, to = %next, hop = hops + 1, "following redirect");
            current = next;
            hops += 1;
        }
    }
}
