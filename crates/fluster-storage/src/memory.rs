use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fluster_core::error::{Result, StorageError};
use fluster_core::{Repository, ShortCode, UrlRecord};
use std::sync::atomic::{AtomicU64, Ordering};

/// In-memory implementation of the Repository trait using DashMap.
///
/// Keys come from an atomic counter starting at 1, so they are unique and
/// never reused within one instance. A second map indexes records by short
/// code and enforces code uniqueness.
#[derive(Debug)]
pub struct InMemoryRepository {
    next_key: AtomicU64,
    records: DashMap<u64, UrlRecord>,
    codes: DashMap<ShortCode, u64>,
}

impl InMemoryRepository {
    /// Creates a new, empty in-memory repository.
    pub fn new() -> Self {
        Self {
            next_key: AtomicU64::new(1),
            records: DashMap::new(),
            codes: DashMap::new(),
        }
    }

    /// Creates an empty repository whose first assigned key is `first_key`.
    ///
    /// Useful for resuming from a known state. A `first_key` of 0 starts at 1.
    pub fn with_offset(first_key: u64) -> Self {
        Self {
            next_key: AtomicU64::new(first_key.max(1)),
            ..Self::new()
        }
    }

    /// Returns a snapshot of the record stored under `key`.
    pub fn record(&self, key: u64) -> Option<UrlRecord> {
        self.records.get(&key).map(|r| r.clone())
    }

    /// Number of stored records, with or without a short code.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn insert(&self, original_url: &str) -> Result<u64> {
        let key = self.next_key.fetch_add(1, Ordering::SeqCst);
        self.records.insert(
            key,
            UrlRecord {
                key,
                original_url: original_url.to_string(),
                short_code: None,
            },
        );
        Ok(key)
    }

    async fn attach_short_code(&self, key: u64, code: &ShortCode) -> Result<()> {
        let Some(mut record) = self.records.get_mut(&key) else {
            return Err(StorageError::MissingRecord(key));
        };

        match &record.short_code {
            Some(existing) if existing == code => return Ok(()),
            Some(_) => return Err(StorageError::Conflict(code.to_string())),
            None => {}
        }

        // Lock order is always records -> codes; `resolve` never holds a
        // codes guard while touching records.
        match self.codes.entry(code.clone()) {
            Entry::Occupied(owner) if *owner.get() != key => {
                return Err(StorageError::Conflict(code.to_string()));
            }
            Entry::Occupied(_) => {}
            Entry::Vacant(slot) => {
                slot.insert(key);
            }
        }

        record.short_code = Some(code.clone());
        Ok(())
    }

    async fn resolve(&self, code: &ShortCode) -> Result<String> {
        let key = match self.codes.get(code) {
            Some(key) => *key,
            None => return Err(StorageError::NotFound(code.to_string())),
        };

        match self.records.get(&key) {
            Some(record) if !record.original_url.is_empty() => Ok(record.original_url.clone()),
            _ => Err(StorageError::NotFound(code.to_string())),
        }
    }

    async fn discard(&self, key: u64) -> Result<bool> {
        Ok(self
            .records
            .remove_if(&key, |_, record| record.short_code.is_none())
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fluster_core::base58::encode;
    use std::sync::Arc;

    #[tokio::test]
    async fn keys_start_at_one_and_increase() {
        let repo = InMemoryRepository::new();

        let first = repo.insert("https://one.example").await.unwrap();
        let second = repo.insert("https://two.example").await.unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[tokio::test]
    async fn offset_sets_first_key() {
        let repo = InMemoryRepository::with_offset(42);
        assert_eq!(repo.insert("https://example.com").await.unwrap(), 42);
        assert_eq!(repo.insert("https://example.com").await.unwrap(), 43);

        let repo = InMemoryRepository::with_offset(0);
        assert_eq!(repo.insert("https://example.com").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn insert_attach_resolve() {
        let repo = InMemoryRepository::new();

        let key = repo.insert("https://example.com").await.unwrap();
        let code = encode(key);
        repo.attach_short_code(key, &code).await.unwrap();

        assert_eq!(repo.resolve(&code).await.unwrap(), "https://example.com");
        assert_eq!(repo.record(key).unwrap().short_code, Some(code));
    }

    #[tokio::test]
    async fn unattached_record_is_not_resolvable() {
        let repo = InMemoryRepository::new();

        let key = repo.insert("https://example.com").await.unwrap();

        let err = repo.resolve(&encode(key)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn resolve_unknown_code() {
        let repo = InMemoryRepository::new();

        let err = repo.resolve(&encode(99)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn blank_url_is_not_found() {
        let repo = InMemoryRepository::new();

        let key = repo.insert("").await.unwrap();
        repo.attach_short_code(key, &encode(key)).await.unwrap();

        let err = repo.resolve(&encode(key)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn attach_to_missing_record() {
        let repo = InMemoryRepository::new();

        let err = repo.attach_short_code(7, &encode(7)).await.unwrap_err();
        assert!(matches!(err, StorageError::MissingRecord(7)));
    }

    #[tokio::test]
    async fn attach_code_owned_by_other_record() {
        let repo = InMemoryRepository::new();

        let first = repo.insert("https://one.example").await.unwrap();
        let second = repo.insert("https://two.example").await.unwrap();
        repo.attach_short_code(first, &encode(first)).await.unwrap();

        let err = repo
            .attach_short_code(second, &encode(first))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn attach_is_set_once() {
        let repo = InMemoryRepository::new();

        let key = repo.insert("https://example.com").await.unwrap();
        repo.attach_short_code(key, &encode(key)).await.unwrap();

        // same code again is a no-op, a different one is refused
        repo.attach_short_code(key, &encode(key)).await.unwrap();
        let err = repo
            .attach_short_code(key, &encode(key + 1))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn discard_only_removes_unattached_records() {
        let repo = InMemoryRepository::new();

        let orphan = repo.insert("https://orphan.example").await.unwrap();
        let live = repo.insert("https://live.example").await.unwrap();
        repo.attach_short_code(live, &encode(live)).await.unwrap();

        assert!(repo.discard(orphan).await.unwrap());
        assert!(!repo.discard(orphan).await.unwrap());
        assert!(!repo.discard(live).await.unwrap());
        assert_eq!(repo.len(), 1);

        // discarded keys are not handed out again
        let next = repo.insert("https://next.example").await.unwrap();
        assert_eq!(next, 3);
    }

    #[tokio::test]
    async fn concurrent_inserts_get_unique_keys() {
        let repo = Arc::new(InMemoryRepository::new());
        let mut handles = vec![];

        for i in 0..32u64 {
            let repo = Arc::clone(&repo);
            handles.push(tokio::spawn(async move {
                let key = repo
                    .insert(&format!("https://example{}.com", i))
                    .await
                    .unwrap();
                repo.attach_short_code(key, &encode(key)).await.unwrap();
                key
            }));
        }

        let mut keys = vec![];
        for handle in handles {
            keys.push(handle.await.unwrap());
        }
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), 32);

        for key in keys {
            let url = repo.resolve(&encode(key)).await.unwrap();
            assert_eq!(url, repo.record(key).unwrap().original_url);
        }
    }
}
