//! Chart artifacts for metrics
//!
//! - [`classify`] / [`filename`]: metric name → chart shape and artifact name
//! - [`ChartGenerator`]: draws one chart, or a placeholder, never fails outward
//! - [`ConcurrencyGuard`]: the single drawing surface, leased one caller at a time
//! - [`VisualizationReconciler`]: regenerates changed metrics and merges them
//!   into an existing artifact list

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod classifier;
mod error;
mod generator;
mod primary;
mod reconciler;
mod surface;

pub use classifier::{
    artifact_filename, classify, filename, ChartShape, COMPARATIVE_METRICS, COUNT_METRICS,
    PASS_FAIL_METRIC, TREND_METRICS,
};
pub use error::{ReconcileError, RenderError};
pub use generator::{ChartGenerator, ChartLayout, GenerationOutcome};
pub use primary::{
    CommandGenerator, PrimaryError, PrimaryGenerator, PrimaryTarget, ARTIFACT_DIR_ENV, TARGETS_ENV,
};
pub use reconciler::{
    GenerationSource, MetricOutcome, Reconciliation, VisualizationReconciler, MIN_ARTIFACTS,
};
pub use surface::{xml_escape, ConcurrencyGuard, DrawingSurface, SurfaceLease};
