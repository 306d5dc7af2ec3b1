//! Cache store contract

use crate::error::CacheError;
use async_trait::async_trait;
use reportsync_artifact::{AnalysisResult, ContentFingerprint, FolderFingerprint};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};

/// Cache key: which folder, and what its documents contained
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub folder: FolderFingerprint,
    pub content: ContentFingerprint,
}

impl CacheKey {
    /// Create key
    #[inline]
    #[must_use]
    pub const fn new(folder: FolderFingerprint, content: ContentFingerprint) -> Self {
        Self { folder, content }
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.folder.short(), self.content.short())
    }
}

/// Key-value store of analysis results
///
/// # Contract
/// - `get` after a successful `put` with the same key returns an equal value
/// - `put` fully replaces any previous value under the key; racing puts on
///   one key resolve last-write-wins
/// - operations on different keys never wait on each other
#[async_trait]
pub trait CacheStore: Send + Sync + Debug {
    /// Look up a cached result
    async fn get(&self, key: &CacheKey) -> Result<Option<AnalysisResult>, CacheError>;

    /// Store a result, replacing whatever was there
    async fn put(&self, key: CacheKey, result: AnalysisResult) -> Result<(), CacheError>;

    /// Drop every entry for a folder; returns how many were removed
    async fn invalidate_folder(&self, folder: &FolderFingerprint) -> Result<u64, CacheError>;
}
