//! Error types for update orchestration

use reportsync_artifact::{FingerprintError, MetricsError};
use reportsync_cache::CacheError;
use reportsync_viz::ReconcileError;
use std::path::PathBuf;

/// Why an update was rejected
///
/// The cache is never written when an update fails.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// The supplied metrics cannot be used
    #[error(transparent)]
    InvalidMetricsDocument(#[from] MetricsError),

    /// Source documents could not be read
    #[error("fingerprint failed: {0}")]
    Fingerprint(#[from] FingerprintError),

    /// The folder could not be listed or a document could not be read
    #[error("document discovery failed at {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    /// No cached baseline and the full analysis failed
    #[error("full analysis failed: {0}")]
    FullAnalysis(#[source] anyhow::Error),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error("report evaluation failed: {0}")]
    Evaluation(#[source] anyhow::Error),
}

impl UpdateError {
    /// Whether the update produced too few artifacts
    #[inline]
    #[must_use]
    pub fn is_insufficient_artifacts(&self) -> bool {
        matches!(
            self,
            Self::Reconcile(ReconcileError::InsufficientArtifacts { .. })
        )
    }
}
