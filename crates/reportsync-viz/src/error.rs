//! Error types for chart rendering and reconciliation

use reportsync_artifact::MapError;
use std::path::PathBuf;

/// Failures while drawing one chart
///
/// Recovered inside the generator; never surfaced by
/// [`ChartGenerator::generate`](crate::ChartGenerator::generate).
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("a figure is already open")]
    FigureAlreadyOpen,

    #[error("no figure is open")]
    NoOpenFigure,

    #[error("non-finite coordinate in {element}")]
    NonFinite { element: &'static str },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures that abort a reconciliation
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Fewer artifacts than the configured minimum
    #[error("only {actual} visualizations available, at least {required} required")]
    InsufficientArtifacts { actual: usize, required: usize },

    /// The prior result's map points outside its artifact list
    #[error("corrupt visualization map: {0}")]
    CorruptMap(#[from] MapError),

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ReconcileError {
    /// Create IO error for path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
