//! In-process stand-ins for the pipeline collaborators.
//!
//! Enabled for this crate's tests and, through the `mocks` feature, for
//! downstream crates that need a pipeline without network access.

use crate::error::{CheckError, ResolutionError};
use crate::redirect::RedirectResolver;
use crate::threat::ThreatChecker;
use async_trait::async_trait;
use fluster_core::error::{Result, StorageError};
use fluster_core::{Repository, ShortCode};
use parking_lot::Mutex;
use std::collections::HashMap;
use url::Url;

const MAX_FAKE_HOPS: usize = 16;

/// A resolver that follows a fixed table of `from -> to` redirects.
#[derive(Debug, Default)]
pub struct StaticRedirects {
    hops: HashMap<String, String>,
    failure: Option<ResolutionError>,
}

impl StaticRedirects {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a redirect from `from` to `to`. Both must be exact URL strings.
    pub fn with_hop(mut self, from: &str, to: &str) -> Self {
        self.hops.insert(from.to_string(), to.to_string());
        self
    }

    /// A resolver for which every target is unreachable.
    pub fn unreachable() -> Self {
        Self {
            hops: HashMap::new(),
            failure: Some(ResolutionError::Request("connection refused".to_string())),
        }
    }
}

#[async_trait]
impl RedirectResolver for StaticRedirects {
    async fn resolve_final(&self, url: &Url) -> std::result::Result<Url, ResolutionError> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }

        let mut current = url.as_str().to_string();
        for _ in 0..MAX_FAKE_HOPS {
            match self.hops.get(&current) {
                Some(next) => current = next.clone(),
                None => {
                    return Url::parse(&current)
                        .map_err(|e| ResolutionError::InvalidLocation(e.to_string()))
                }
            }
        }
        Err(ResolutionError::TooManyRedirects { max: MAX_FAKE_HOPS })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    Safe,
    Malicious,
    Unavailable,
}

/// A threat checker with a fixed answer that remembers what it was asked.
#[derive(Debug)]
pub struct FixedVerdict {
    verdict: Verdict,
    checked: Mutex<Vec<String>>,
}

impl FixedVerdict {
    fn with(verdict: Verdict) -> Self {
        Self {
            verdict,
            checked: Mutex::new(Vec::new()),
        }
    }

    pub fn safe() -> Self {
        Self::with(Verdict::Safe)
    }

    pub fn malicious() -> Self {
        Self::with(Verdict::Malicious)
    }

    /// Every check fails as if the service could not be reached.
    pub fn unavailable() -> Self {
        Self::with(Verdict::Unavailable)
    }

    /// URLs passed to the checker, in call order.
    pub fn checked(&self) -> Vec<String> {
        self.checked.lock().clone()
    }
}

#[async_trait]
impl ThreatChecker for FixedVerdict {
    async fn is_malicious(&self, url: &Url) -> std::result::Result<bool, CheckError> {
        self.checked.lock().push(url.to_string());
        match self.verdict {
            Verdict::Safe => Ok(false),
            Verdict::Malicious => Ok(true),
            Verdict::Unavailable => Err(CheckError::Request("service unavailable".to_string())),
        }
    }
}

/// A call observed by [`RecordingRepository`].
#[derive(Debug, Clone, PartialEq)]
pub enum RepositoryCall {
    Insert(String),
    Attach(u64, ShortCode),
    Resolve(ShortCode),
    Discard(u64),
}

/// Wraps a repository and records every call made through it.
///
/// Can be told to fail inserts or attaches with `Unavailable`.
#[derive(Debug)]
pub struct RecordingRepository<R> {
    inner: R,
    calls: Mutex<Vec<RepositoryCall>>,
    fail_insert: bool,
    fail_attach: bool,
}

impl<R: Repository> RecordingRepository<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            calls: Mutex::new(Vec::new()),
            fail_insert: false,
            fail_attach: false,
        }
    }

    pub fn failing_insert(inner: R) -> Self {
        Self {
            fail_insert: true,
            ..Self::new(inner)
        }
    }

    pub fn failing_attach(inner: R) -> Self {
        Self {
            fail_attach: true,
            ..Self::new(inner)
        }
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    pub fn calls(&self) -> Vec<RepositoryCall> {
        self.calls.lock().clone()
    }

    /// URLs passed to `insert`, in call order.
    pub fn inserted(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                RepositoryCall::Insert(url) => Some(url.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl<R: Repository> Repository for RecordingRepository<R> {
    async fn insert(&self, original_url: &str) -> Result<u64> {
        self.calls
            .lock()
            .push(RepositoryCall::Insert(original_url.to_string()));
        if self.fail_insert {
            return Err(StorageError::Unavailable("insert refused".to_string()));
        }
        self.inner.insert(original_url).await
    }

    async fn attach_short_code(&self, key: u64, code: &ShortCode) -> Result<()> {
        self.calls
            .lock()
            .push(RepositoryCall::Attach(key, code.clone()));
        if self.fail_attach {
            return Err(StorageError::Unavailable("attach refused".to_string()));
        }
        self.inner.attach_short_code(key, code).await
    }

    async fn resolve(&self, code: &ShortCode) -> Result<String> {
        self.calls.lock().push(RepositoryCall::Resolve(code.clone()));
        self.inner.resolve(code).await
    }

    async fn discard(&self, key: u64) -> Result<bool> {
        self.calls.lock().push(RepositoryCall::Discard(key));
        self.inner.discard(key).await
    }
}
