use crate::error::{Result, ShortenerError, Stage};
use crate::redirect::RedirectResolver;
use crate::shortener::Shortener;
use crate::threat::ThreatChecker;
use async_trait::async_trait;
use fluster_core::{base58, validate_url, Repository, ShortCode, StorageError};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// The shortening pipeline.
///
/// `shorten` runs validate, resolve, check, insert, encode and attach in that
/// order and stops at the first failing stage. Nothing is written before the
/// safety check passes.
///
/// Insert and attach are two separate writes. If attaching fails the record
/// is discarded on a best-effort basis so no orphaned row is left behind.
#[derive(Debug)]
pub struct ShortenerService<R, D, C> {
    repository: Arc<R>,
    resolver: Arc<D>,
    checker: Arc<C>,
}

impl<R, D, C> Clone for ShortenerService<R, D, C> {
    fn clone(&self) -> Self {
        Self {
            repository: Arc::clone(&self.repository),
            resolver: Arc::clone(&self.resolver),
            checker: Arc::clone(&self.checker),
        }
    }
}

impl<R: Repository, D: RedirectResolver, C: ThreatChecker> ShortenerService<R, D, C> {
    pub fn new(repository: R, resolver: D, checker: C) -> Self {
        Self {
            repository: Arc::new(repository),
            resolver: Arc::new(resolver),
            checker: Arc::new(checker),
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    async fn attach(&self, key: u64, code: &ShortCode) -> Result<()> {
        let Err(source) = self.repository.attach_short_code(key, code).await else {
            return Ok(());
        };

        match self.repository.discard(key).await {
            Ok(removed) => debug!(key, removed, "discarded record after failed attach"),
            Err(e) => warn!(key, error = %e, "could not discard record after failed attach"),
        }

        Err(ShortenerError::Storage {
            stage: Stage::Attaching,
            source,
        })
    }
}

#[async_trait]
impl<R: Repository, D: RedirectResolver, C: ThreatChecker> Shortener for ShortenerService<R, D, C> {
    #[instrument(name = "shorten", skip(self))]
    async fn shorten(&self, url: &str) -> Result<ShortCode> {
        let submitted = validate_url(url).inspect_err(|e| {
            debug!(stage = %Stage::Validating, error = %e, "rejected url");
        })?;

        let resolved = self
            .resolver
            .resolve_final(&submitted)
            .await
            .inspect_err(|e| {
                warn!(stage = %Stage::Resolving, url = %submitted, error = %e, "redirect resolution failed");
            })?;
        if resolved != submitted {
            debug!(from = %submitted, to = %resolved, "collapsed redirect chain");
        }

        let malicious = self.checker.is_malicious(&resolved).await.inspect_err(|e| {
            warn!(stage = %Stage::CheckingSafety, url = %resolved, error = %e, "threat check failed");
        })?;
        if malicious {
            warn!(url = %resolved, "refusing to shorten malicious url");
            return Err(ShortenerError::MaliciousUrl(resolved.to_string()));
        }

        let key = self
            .repository
            .insert(resolved.as_str())
            .await
            .map_err(|source| ShortenerError::Storage {
                stage: Stage::Persisting,
                source,
            })?;

        let code = base58::encode(key);
        debug!(stage = %Stage::Encoding, key, code = %code, "encoded key");

        self.attach(key, &code).await?;

        info!(key, code = %code, url = %resolved, "shortened url");
        Ok(code)
    }

    #[instrument(name = "lookup", skip(self))]
    async fn resolve(&self, code: &str) -> Result<String> {
        // Strings outside the code alphabet can never have been issued.
        let Ok(code) = ShortCode::parse(code) else {
            return Err(ShortenerError::NotFound(code.to_string()));
        };

        match self.repository.resolve(&code).await {
            Ok(url) => Ok(url),
            Err(StorageError::NotFound(_)) => Err(ShortenerError::NotFound(code.to_string())),
            Err(source) => Err(ShortenerError::Storage {
                stage: Stage::Lookup,
                source,
            }),
        }
    }
}
