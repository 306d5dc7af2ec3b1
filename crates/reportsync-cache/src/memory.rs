//! In-process cache store using moka
//!
//! Concurrent, bounded, optionally time-limited. Entries on different keys
//! never contend.

use crate::error::CacheError;
use crate::store::{CacheKey, CacheStore};
use async_trait::async_trait;
use moka::future::Cache;
use reportsync_artifact::{AnalysisResult, FolderFingerprint};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Snapshot of cache occupancy
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    /// Approximate number of entries
    pub entry_count: u64,
}

/// Analysis results held in memory
#[derive(Debug, Clone)]
pub struct MemoryCacheStore {
    inner: Cache<CacheKey, Arc<AnalysisResult>>,
}

impl MemoryCacheStore {
    /// Create store with max capacity
    #[inline]
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        Self {
            inner: Cache::new(max_capacity),
        }
    }

    /// Create store whose entries expire after `ttl`
    #[inline]
    #[must_use]
    pub fn with_ttl(max_capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    /// Check if a key is cached
    #[inline]
    pub async fn contains(&self, key: &CacheKey) -> bool {
        self.inner.get(key).await.is_some()
    }

    /// Get cache statistics
    ///
    /// Counts lag behind writes until pending maintenance has run.
    #[inline]
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.inner.entry_count(),
        }
    }

    /// Drop everything
    #[inline]
    pub fn clear(&self) {
        self.inner.invalidate_all();
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(1024)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<AnalysisResult>, CacheError> {
        Ok(self.inner.get(key).await.map(|arc| (*arc).clone()))
    }

    async fn put(&self, key: CacheKey, result: AnalysisResult) -> Result<(), CacheError> {
        debug!(key = %key, "caching analysis result");
        self.inner.insert(key, Arc::new(result)).await;
        Ok(())
    }

    async fn invalidate_folder(&self, folder: &FolderFingerprint) -> Result<u64, CacheError> {
        let doomed: Vec<CacheKey> = self
            .inner
            .iter()
            .filter(|(key, _)| key.folder == *folder)
            .map(|(key, _)| *key)
            .collect();

        let mut removed = 0;
        for key in &doomed {
            if self.inner.remove(key).await.is_some() {
                removed += 1;
            }
        }
        debug!(folder = %folder.short(), removed, "invalidated folder");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportsync_artifact::{fingerprint_contents, fingerprint_path, ContentFingerprint};

    fn empty_content() -> ContentFingerprint {
        fingerprint_contents(&[]).unwrap()
    }

    fn result(report: &str) -> AnalysisResult {
        AnalysisResult {
            report: report.into(),
            ..AnalysisResult::default()
        }
    }

    #[tokio::test]
    async fn get_after_put_returns_value() {
        let store = MemoryCacheStore::new(16);
        let key = CacheKey::new(fingerprint_path("/data/a"), empty_content());

        assert!(store.get(&key).await.unwrap().is_none());
        store.put(key, result("first")).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().unwrap().report, "first");
        assert!(store.contains(&key).await);
    }

    #[tokio::test]
    async fn put_replaces_previous_value() {
        let store = MemoryCacheStore::default();
        let key = CacheKey::new(fingerprint_path("/data/a"), empty_content());

        store.put(key, result("first")).await.unwrap();
        store.put(key, result("second")).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap().unwrap().report, "second");
    }

    #[tokio::test]
    async fn invalidate_folder_leaves_other_folders() {
        let store = MemoryCacheStore::new(16);
        let a = CacheKey::new(fingerprint_path("/data/a"), empty_content());
        let b = CacheKey::new(fingerprint_path("/data/b"), empty_content());
        store.put(a, result("a")).await.unwrap();
        store.put(b, result("b")).await.unwrap();

        let removed = store.invalidate_folder(&a.folder).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.get(&a).await.unwrap().is_none());
        assert!(store.get(&b).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let store = MemoryCacheStore::with_ttl(16, Duration::from_millis(20));
        let key = CacheKey::new(fingerprint_path("/data/a"), empty_content());
        store.put(key, result("short-lived")).await.unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.get(&key).await.unwrap().is_none());
    }
}
