//! JSON-file cache store
//!
//! Layout: `<root>/<folder>/<content>.json`, hex fingerprints. Entries are
//! written to a temporary sibling and renamed into place, so a reader sees
//! either the old entry or the new one.

use crate::error::CacheError;
use crate::store::{CacheKey, CacheStore};
use async_trait::async_trait;
use reportsync_artifact::{AnalysisResult, FolderFingerprint};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tracing::{debug, warn};

const ENTRY_EXTENSION: &str = "json";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Analysis results persisted as JSON files
#[derive(Debug, Clone)]
pub struct DiskCacheStore {
    root: PathBuf,
}

impl DiskCacheStore {
    /// Store rooted at `root`; the directory is created on first write
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn folder_dir(&self, folder: &FolderFingerprint) -> PathBuf {
        self.root.join(folder.to_string())
    }

    /// File holding the entry for `key`
    #[must_use]
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.folder_dir(&key.folder)
            .join(format!("{}.{ENTRY_EXTENSION}", key.content))
    }

    fn temp_path(target: &Path) -> PathBuf {
        let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut name = target
            .file_name()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{}.{n}.tmp", std::process::id()));
        target.with_file_name(name)
    }
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    async fn get(&self, key: &CacheKey) -> Result<Option<AnalysisResult>, CacheError> {
        let path = self.entry_path(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CacheError::io(path, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| CacheError::Corrupt { path, source })
    }

    async fn put(&self, key: CacheKey, result: AnalysisResult) -> Result<(), CacheError> {
        let path = self.entry_path(&key);
        let dir = self.folder_dir(&key.folder);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| CacheError::io(&dir, e))?;

        let bytes = serde_json::to_vec_pretty(&result)?;
        let tmp = Self::temp_path(&path);
        fs::write(&tmp, &bytes)
            .await
            .map_err(|e| CacheError::io(&tmp, e))?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(CacheError::io(&path, e));
        }

        debug!(key = %key, bytes = bytes.len(), "cache entry written");
        Ok(())
    }

    async fn invalidate_folder(&self, folder: &FolderFingerprint) -> Result<u64, CacheError> {
        let dir = self.folder_dir(folder);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(CacheError::io(dir, e)),
        };

        let mut removed = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| CacheError::io(&dir, e))?
        {
            if entry.path().extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                removed += 1;
            }
        }

        match fs::remove_dir_all(&dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(dir = %dir.display(), "folder vanished during invalidation");
            }
            Err(e) => return Err(CacheError::io(dir, e)),
        }
        debug!(folder = %folder.short(), removed, "invalidated folder");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reportsync_artifact::{fingerprint_contents, fingerprint_path};

    fn key(folder: &str) -> CacheKey {
        CacheKey::new(fingerprint_path(folder), fingerprint_contents(&[]).unwrap())
    }

    #[test]
    fn entry_path_uses_hex_fingerprints() {
        let store = DiskCacheStore::new("/cache");
        let k = key("/data/a");
        let path = store.entry_path(&k);
        assert_eq!(
            path,
            PathBuf::from(format!("/cache/{}/{}.json", k.folder, k.content))
        );
    }

    #[tokio::test]
    async fn missing_entry_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStore::new(dir.path());
        assert!(store.get(&key("/data/a")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_entry_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStore::new(dir.path());
        let k = key("/data/a");
        let path = store.entry_path(&k);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"{not json").unwrap();

        let err = store.get(&k).await.unwrap_err();
        assert!(matches!(err, CacheError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn put_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStore::new(dir.path());
        let k = key("/data/a");
        store.put(k, AnalysisResult::default()).await.unwrap();
        store.put(k, AnalysisResult::default()).await.unwrap();

        let names: Vec<_> = std::fs::read_dir(store.entry_path(&k).parent().unwrap())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
    }

    #[tokio::test]
    async fn invalidate_missing_folder_is_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskCacheStore::new(dir.path());
        assert_eq!(store.invalidate_folder(&key("/x").folder).await.unwrap(), 0);
    }
}
