//! Malicious-URL checks against the Safe Browsing threat-matching API.

use crate::error::CheckError;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use typed_builder::TypedBuilder;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://safebrowsing.googleapis.com";
pub const CLIENT_ID: &str = "flusterShortener";
pub const CLIENT_VERSION: &str = "0.0.1";

/// An empty match answer is `{}` plus a newline. Anything longer than this is
/// a match and is not read further.
const MAX_BODY_BYTES: usize = 4 * 1024;

const THREAT_TYPES: [&str; 4] = [
    "MALWARE",
    "SOCIAL_ENGINEERING",
    "POTENTIALLY_HARMFUL_APPLICATION",
    "UNWANTED_SOFTWARE",
];

/// Classifies URLs as safe or malicious.
#[async_trait]
pub trait ThreatChecker: Send + Sync + 'static {
    /// Returns `true` when the URL matched at least one threat list.
    async fn is_malicious(&self, url: &Url) -> Result<bool, CheckError>;
}

#[derive(Debug, Clone, TypedBuilder)]
pub struct SafeBrowsingSettings {
    #[builder(setter(into))]
    pub api_key: String,
    #[builder(default = DEFAULT_ENDPOINT.to_string(), setter(into))]
    pub endpoint: String,
    #[builder(default = CLIENT_ID.to_string(), setter(into))]
    pub client_id: String,
    #[builder(default = CLIENT_VERSION.to_string(), setter(into))]
    pub client_version: String,
    #[builder(default = Duration::from_secs(10))]
    pub timeout: Duration,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FindThreatMatchesRequest<'a> {
    client: ClientInfo<'a>,
    threat_info: ThreatInfo<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClientInfo<'a> {
    client_id: &'a str,
    client_version: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ThreatInfo<'a> {
    threat_types: &'a [&'a str],
    platform_types: &'a [&'a str],
    threat_entry_types: &'a [&'a str],
    threat_entries: [ThreatEntry<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ThreatEntry<'a> {
    url: &'a str,
}

/// Checks URLs with a single `threatMatches:find` call.
///
/// The verdict only looks at whether the response body is the empty JSON
/// object: `{}` means no match, anything else counts as a match, including a
/// blank body. The matched threat entries are not parsed.
#[derive(Debug, Clone)]
pub struct SafeBrowsingChecker {
    client: Client,
    settings: SafeBrowsingSettings,
}

impl SafeBrowsingChecker {
    pub fn new(settings: SafeBrowsingSettings) -> Result<Self, CheckError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| CheckError::Client(e.to_string()))?;
        Ok(Self { client, settings })
    }

    fn find_url(&self) -> String {
        format!(
            "{}/v4/threatMatches:find",
            self.settings.endpoint.trim_end_matches('/')
        )
    }
}

/// `true` when the service reported no matches.
fn is_empty_match(body: &[u8]) -> bool {
    matches!(
        serde_json::from_slice::<serde_json::Value>(body),
        Ok(serde_json::Value::Object(map)) if map.is_empty()
    )
}

/// Reads at most `limit` bytes of the body. `None` means the body was longer.
async fn read_capped(
    mut response: Response,
    limit: usize,
) -> Result<Option<Vec<u8>>, CheckError> {
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Ok(None);
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| CheckError::Body(e.without_url().to_string()))?
    {
        if body.len() + chunk.len() > limit {
            return Ok(None);
        }
        body.extend_from_slice(&chunk);
    }
    Ok(Some(body))
}

#[async_trait]
impl ThreatChecker for SafeBrowsingChecker {
    async fn is_malicious(&self, url: &Url) -> Result<bool, CheckError> {
        let request = FindThreatMatchesRequest {
            client: ClientInfo {
                client_id: &self.settings.client_id,
                client_version: &self.settings.client_version,
            },
            threat_info: ThreatInfo {
                threat_types: &THREAT_TYPES,
                platform_types: &["ANY_PLATFORM"],
                threat_entry_types: &["URL"],
                threat_entries: [ThreatEntry { url: url.as_str() }],
            },
        };

        let response = self
            .client
            .post(self.find_url())
            .query(&[("key", self.settings.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .map_err(|e| CheckError::Request(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "threat service rejected request");
            return Err(CheckError::Status(status.as_u16()));
        }

        let malicious = match read_capped(response, MAX_BODY_BYTES).await? {
            Some(body) => !is_empty_match(&body),
            None => true,
        };
        debug!(url = %url, malicious, "threat check finished");
        Ok(malicious)
    }
}
