//! reportsync artifact model
//!
//! Metrics documents, analysis results, fingerprints and structural change
//! detection.
//!
//! # Core Concepts
//!
//! - [`MetricsDocument`]: named metric series supplied with each update
//! - [`AnalysisResult`]: metrics, report, chart artifacts and evaluation
//! - [`FolderFingerprint`] / [`ContentFingerprint`]: the two halves of a cache key
//! - [`ChangeDetector`]: which metrics changed between two documents
//!
//! # Example
//!
//! ```rust
//! use reportsync_artifact::{ChangeDetector, MetricsDocument};
//! use serde_json::json;
//!
//! let old = MetricsDocument::new().with_metric("Defects", json!([{"version": "1.0", "value": 3}]));
//! let new = MetricsDocument::new().with_metric("Defects", json!([{"version": "1.0", "value": 5}]));
//!
//! let changes = ChangeDetector::new().detect(&old, &new);
//! assert_eq!(changes.to_vec(), vec!["Defects".to_string()]);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod analysis;
mod change;
mod diff;
mod fingerprint;
mod hash;
mod merkle;
mod metrics;
mod path;

pub use analysis::{AnalysisResult, Evaluation, MapError, VisualizationArtifact, VisualizationMap};
pub use change::{ChangeDetector, ChangeSet};
pub use diff::{diff_values, equivalent, ChangeKind, DiffEntry};
pub use fingerprint::{
    fingerprint_contents, fingerprint_normalized, fingerprint_path, normalize_folder_path,
    ContentFingerprint, FingerprintError, FolderFingerprint,
};
pub use hash::{ContentHash, HashError};
pub use merkle::{merkle_root, Blake3Hasher};
pub use metrics::{
    parse_series, MetricsDocument, MetricsError, PayloadIssue, SeriesPayload, SeriesPoint,
};
pub use path::{DiffExtractionFailure, DiffPath, PathSegment};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
