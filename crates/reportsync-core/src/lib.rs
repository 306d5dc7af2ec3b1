//! reportsync core
//!
//! Incremental updates of cached metrics reports:
//!
//! 1. Fingerprint the folder and its documents
//! 2. Load the cached result, or run a full analysis
//! 3. Detect which metrics changed
//! 4. Regenerate only their charts, keeping every other artifact in place
//! 5. Re-evaluate the report and store the result
//!
//! # Example
//!
//! ```rust,no_run
//! use reportsync_core::{BaselineFileAnalysis, EngineConfig, OfflineEvaluator, UpdateOrchestrator};
//! use reportsync_artifact::MetricsDocument;
//! use reportsync_cache::MemoryCacheStore;
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::new();
//! let orchestrator = UpdateOrchestrator::new(
//!     &config,
//!     Arc::new(MemoryCacheStore::new(config.cache_capacity)),
//!     Arc::new(BaselineFileAnalysis::new("baseline.json")),
//!     Arc::new(OfflineEvaluator),
//! );
//! let metrics = MetricsDocument::from_json_str(r#"{"metrics": {"Defects": []}}"#)?;
//! let result = orchestrator.update("/reports/q3", metrics, "Q3 report".into()).await?;
//! println!("{} charts", result.visualizations.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod collaborators;
mod config;
mod error;
mod orchestrator;

pub use collaborators::{
    BaselineFileAnalysis, DocumentSource, FlatDirectorySource, FullAnalysis, OfflineEvaluator,
    ReportEvaluator,
};
pub use config::{ConfigError, EngineConfig};
pub use error::UpdateError;
pub use orchestrator::{UpdateOrchestrator, UpdateOutcome};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
