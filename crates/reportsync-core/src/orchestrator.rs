//! The update operation
//!
//! Ties fingerprinting, caching, change detection and reconciliation into
//! one request: "here are new metrics and a new report for this folder".

use crate::collaborators::{DocumentSource, FlatDirectorySource, FullAnalysis, ReportEvaluator};
use crate::config::EngineConfig;
use crate::error::UpdateError;
use reportsync_artifact::{
    fingerprint_contents, fingerprint_normalized, normalize_folder_path, AnalysisResult,
    ChangeDetector, ChangeSet, ContentFingerprint, Evaluation, MetricsDocument,
};
use reportsync_cache::{CacheKey, CacheStore};
use reportsync_viz::{
    ChartGenerator, CommandGenerator, ConcurrencyGuard, PrimaryGenerator, VisualizationReconciler,
};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Documents of one folder, read once per update
#[derive(Debug)]
struct FolderScan {
    content: ContentFingerprint,
    source_text: String,
}

fn scan_folder(source: &dyn DocumentSource, folder: &Path) -> Result<FolderScan, UpdateError> {
    let discovery = |path: &Path, source: io::Error| UpdateError::Discovery {
        path: path.to_path_buf(),
        source,
    };

    let files = source.discover(folder).map_err(|e| discovery(folder, e))?;
    let content = fingerprint_contents(&files)?;

    let mut sections = Vec::with_capacity(files.len());
    for file in &files {
        let text = source.extract_text(file).map_err(|e| discovery(file, e))?;
        let name = file
            .file_name()
            .map_or_else(|| file.display().to_string(), |n| n.to_string_lossy().into_owned());
        sections.push(format!("File: {name}\n{text}"));
    }

    Ok(FolderScan {
        content,
        source_text: sections.join("\n"),
    })
}

/// What an update did, besides the result itself
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub result: AnalysisResult,
    pub changes: ChangeSet,
    pub cache_hit: bool,
}

/// Answers update requests against a cache
#[derive(Debug, Clone)]
pub struct UpdateOrchestrator {
    cache: Arc<dyn CacheStore>,
    full_analysis: Arc<dyn FullAnalysis>,
    evaluator: Arc<dyn ReportEvaluator>,
    documents: Arc<dyn DocumentSource>,
    detector: ChangeDetector,
    reconciler: VisualizationReconciler,
}

impl UpdateOrchestrator {
    /// Create orchestrator from configuration and collaborators
    ///
    /// Documents are discovered with a [`FlatDirectorySource`] over the
    /// configured extensions; a configured `primary_command` becomes a
    /// [`CommandGenerator`].
    #[must_use]
    pub fn new(
        config: &EngineConfig,
        cache: Arc<dyn CacheStore>,
        full_analysis: Arc<dyn FullAnalysis>,
        evaluator: Arc<dyn ReportEvaluator>,
    ) -> Self {
        let mut reconciler = VisualizationReconciler::new(ChartGenerator::new(&config.artifact_dir))
            .with_min_artifacts(config.min_artifacts);
        if let Some(primary) = config
            .primary_command
            .as_deref()
            .and_then(CommandGenerator::from_words)
        {
            reconciler = reconciler.with_primary(Arc::new(primary));
        }

        Self {
            cache,
            full_analysis,
            evaluator,
            documents: Arc::new(FlatDirectorySource::new(config.document_extensions.iter().cloned())),
            detector: ChangeDetector::with_excluded(config.excluded_metrics.iter().cloned()),
            reconciler,
        }
    }

    /// Builder: discover documents with `source`
    #[must_use]
    pub fn with_document_source(mut self, source: Arc<dyn DocumentSource>) -> Self {
        self.documents = source;
        self
    }

    /// Builder: try `primary` before the built-in chart generator
    #[must_use]
    pub fn with_primary_generator(mut self, primary: Arc<dyn PrimaryGenerator>) -> Self {
        self.reconciler = self.reconciler.with_primary(primary);
        self
    }

    /// Builder: draw under a specific guard instead of the process-wide one
    #[must_use]
    pub fn with_guard(mut self, guard: Arc<ConcurrencyGuard>) -> Self {
        self.reconciler = self.reconciler.with_guard(guard);
        self
    }

    /// Apply new metrics and a new report to a folder's cached result
    ///
    /// # Errors
    /// Returns [`UpdateError`] on any failure; the cache is then untouched.
    pub async fn update(
        &self,
        folder_path: &str,
        metrics: MetricsDocument,
        report: String,
    ) -> Result<AnalysisResult, UpdateError> {
        self.update_detailed(folder_path, metrics, report)
            .await
            .map(|outcome| outcome.result)
    }

    /// [`update`](Self::update), also reporting the change set and whether
    /// the cache had a baseline
    ///
    /// # Errors
    /// Returns [`UpdateError`] on any failure; the cache is then untouched.
    #[tracing::instrument(skip(self, metrics, report), fields(metric_count = metrics.len()))]
    pub async fn update_detailed(
        &self,
        folder_path: &str,
        metrics: MetricsDocument,
        report: String,
    ) -> Result<UpdateOutcome, UpdateError> {
        match self.run_update(folder_path, metrics, report).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(folder = folder_path, error = %e, "update rejected");
                Err(e)
            }
        }
    }

    async fn run_update(
        &self,
        folder_path: &str,
        metrics: MetricsDocument,
        report: String,
    ) -> Result<UpdateOutcome, UpdateError> {
        metrics.validate()?;

        let folder = normalize_folder_path(folder_path);
        let scan = self.scan(folder.clone()).await?;
        let key = CacheKey::new(fingerprint_normalized(&folder), scan.content);
        debug!(key = %key, "fingerprinted folder");

        let (prior, cache_hit) = match self.cache.get(&key).await? {
            Some(prior) => (prior, true),
            None => {
                info!(folder = %folder.display(), "no cached result, running full analysis");
                let baseline = self
                    .full_analysis
                    .run_full_analysis(&folder)
                    .await
                    .map_err(UpdateError::FullAnalysis)?;
                (baseline, false)
            }
        };

        let changes = self.detector.detect(&prior.metrics, &metrics);
        let mut draft = prior.carry_forward(metrics, report);

        if changes.is_empty() {
            debug!("no metric changed");
        } else {
            info!(changes = ?changes.to_vec(), "regenerating visualizations");
            let reconciliation = self.reconciler.reconcile(&changes, &draft.metrics, &prior).await?;
            reconciliation.apply_to(&mut draft);
        }

        let (score, text) = self
            .evaluator
            .evaluate(&scan.source_text, &draft.report)
            .await
            .map_err(UpdateError::Evaluation)?;
        draft.evaluation = Evaluation::new(score, text);

        self.cache.put(key, draft.clone()).await?;
        info!(
            key = %key,
            changed = changes.len(),
            visualizations = draft.visualizations.len(),
            score,
            "update stored"
        );

        Ok(UpdateOutcome {
            result: draft,
            changes,
            cache_hit,
        })
    }

    async fn scan(&self, folder: PathBuf) -> Result<FolderScan, UpdateError> {
        let source = Arc::clone(&self.documents);
        let path = folder.clone();
        tokio::task::spawn_blocking(move || scan_folder(source.as_ref(), &path))
            .await
            .map_err(|e| UpdateError::Discovery {
                path: folder,
                source: io::Error::other(e),
            })?
    }

    /// Drop every cached result for a folder
    ///
    /// # Errors
    /// Returns [`UpdateError::Cache`] if the store fails.
    pub async fn clear_folder(&self, folder_path: &str) -> Result<u64, UpdateError> {
        let folder = fingerprint_normalized(&normalize_folder_path(folder_path));
        let removed = self.cache.invalidate_folder(&folder).await?;
        info!(folder = folder_path, removed, "cleared cached results");
        Ok(removed)
    }
}
