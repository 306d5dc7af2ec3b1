//! Visualization reconciliation
//!
//! Given the metrics that changed, regenerate exactly their artifacts and
//! splice them into the prior artifact list without moving any existing
//! index.
//!
//! # Flow
//!
//! 1. Check the prior map against the prior artifact list
//! 2. Plan one distinct file per changed metric
//! 3. Under the surface lease: delete stale files, run the primary generator
//!    (else the fallback generator) and read back every produced file
//! 4. Replace in place or append
//! 5. Enforce the minimum artifact count
//!
//! The artifact directory is shared by every folder, so its files are only
//! touched while the lease is held.

use crate::classifier::{classify, filename, ChartShape, ARTIFACT_EXTENSION};
use crate::error::ReconcileError;
use crate::generator::{ChartGenerator, GenerationOutcome};
use crate::primary::{PrimaryGenerator, PrimaryTarget};
use crate::surface::{ConcurrencyGuard, SurfaceLease};
use reportsync_artifact::{
    AnalysisResult, ChangeSet, MetricsDocument, VisualizationArtifact, VisualizationMap,
};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Default minimum number of artifacts a result must carry
pub const MIN_ARTIFACTS: usize = 5;

/// Which path produced an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationSource {
    Primary,
    Fallback,
}

/// Per-metric record of a reconciliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricOutcome {
    pub metric: String,
    pub source: GenerationSource,
    pub outcome: GenerationOutcome,
}

/// New artifact list and map produced by a reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub visualizations: Vec<VisualizationArtifact>,
    pub visualization_map: VisualizationMap,
    pub outcomes: Vec<MetricOutcome>,
}

impl Reconciliation {
    /// Splice the new artifacts and map into a draft result
    pub fn apply_to(self, draft: &mut AnalysisResult) -> Vec<MetricOutcome> {
        draft.visualizations = self.visualizations;
        draft.visualization_map = self.visualization_map;
        self.outcomes
    }
}

#[derive(Debug)]
struct PlannedArtifact {
    metric: String,
    shape: ChartShape,
    filename: String,
    path: PathBuf,
}

/// One file per changed metric; colliding names get a numeric suffix
fn plan_artifacts(changes: &ChangeSet, dir: &Path) -> Vec<PlannedArtifact> {
    let mut taken = HashSet::new();
    changes
        .iter()
        .map(|metric| {
            let shape = classify(metric);
            let natural = filename(metric, shape);
            let mut name = natural.clone();
            let stem = natural.trim_end_matches(&format!(".{ARTIFACT_EXTENSION}")).to_string();
            let mut n = 2;
            while !taken.insert(name.clone()) {
                name = format!("{stem}_{n}.{ARTIFACT_EXTENSION}");
                n += 1;
            }
            if name != natural {
                warn!(metric, natural = %natural, file = %name, "artifact filename collision");
            }
            PlannedArtifact {
                metric: metric.to_string(),
                shape,
                path: dir.join(&name),
                filename: name,
            }
        })
        .collect()
}

/// Regenerates the artifacts of changed metrics
#[derive(Debug, Clone)]
pub struct VisualizationReconciler {
    generator: ChartGenerator,
    primary: Option<Arc<dyn PrimaryGenerator>>,
    guard: Arc<ConcurrencyGuard>,
    min_artifacts: usize,
}

impl VisualizationReconciler {
    /// Reconciler drawing with `generator` under the process-wide guard
    #[must_use]
    pub fn new(generator: ChartGenerator) -> Self {
        Self {
            generator,
            primary: None,
            guard: ConcurrencyGuard::global(),
            min_artifacts: MIN_ARTIFACTS,
        }
    }

    /// Builder: try `primary` before the fallback generator
    #[must_use]
    pub fn with_primary(mut self, primary: Arc<dyn PrimaryGenerator>) -> Self {
        self.primary = Some(primary);
        self
    }

    /// Builder: draw under a specific guard
    #[must_use]
    pub fn with_guard(mut self, guard: Arc<ConcurrencyGuard>) -> Self {
        self.guard = guard;
        self
    }

    /// Builder: minimum artifact count
    #[must_use]
    pub fn with_min_artifacts(mut self, min_artifacts: usize) -> Self {
        self.min_artifacts = min_artifacts;
        self
    }

    /// Directory artifacts are written to
    #[inline]
    #[must_use]
    pub fn artifact_dir(&self) -> &Path {
        self.generator.artifact_dir()
    }

    /// Regenerate the artifacts of `changes` and merge them into `prior`'s
    ///
    /// # Errors
    /// - [`ReconcileError::CorruptMap`] if `prior`'s map is inconsistent
    /// - [`ReconcileError::Io`] if the artifact directory cannot be prepared
    ///   or a produced file cannot be read
    /// - [`ReconcileError::InsufficientArtifacts`] if the merged list is
    ///   shorter than the configured minimum
    #[tracing::instrument(skip_all, fields(changes = changes.len()))]
    pub async fn reconcile(
        &self,
        changes: &ChangeSet,
        metrics: &MetricsDocument,
        prior: &AnalysisResult,
    ) -> Result<Reconciliation, ReconcileError> {
        prior.visualization_map.check(prior.visualizations.len())?;

        let dir = self.artifact_dir();
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| ReconcileError::io(dir, e))?;

        let plan = plan_artifacts(changes, dir);

        let (outcomes, produced) = {
            let mut lease = self.guard.acquire().await;
            for planned in &plan {
                remove_stale(&planned.path).await?;
            }
            let outcomes = self.generate_all(&mut lease, &plan, metrics).await;
            let produced = read_produced(&plan).await?;
            (outcomes, produced)
        };

        let mut visualizations = prior.visualizations.clone();
        let mut visualization_map = prior.visualization_map.clone();
        for (planned, artifact) in plan.iter().zip(produced) {
            let Some(artifact) = artifact else {
                warn!(metric = %planned.metric, "no artifact produced");
                continue;
            };
            match visualization_map.get(&planned.metric) {
                Some(index) => visualizations[index] = artifact,
                None => {
                    visualizations.push(artifact);
                    visualization_map.assign(&planned.metric, visualizations.len() - 1);
                }
            }
        }

        if visualizations.len() < self.min_artifacts {
            return Err(ReconcileError::InsufficientArtifacts {
                actual: visualizations.len(),
                required: self.min_artifacts,
            });
        }

        info!(
            regenerated = outcomes.len(),
            total = visualizations.len(),
            "visualizations reconciled"
        );
        Ok(Reconciliation {
            visualizations,
            visualization_map,
            outcomes,
        })
    }

    async fn generate_all(
        &self,
        lease: &mut SurfaceLease<'_>,
        plan: &[PlannedArtifact],
        metrics: &MetricsDocument,
    ) -> Vec<MetricOutcome> {
        if let Some(primary) = &self.primary {
            if let Some(outcomes) = self.try_primary(primary.as_ref(), lease, plan, metrics).await {
                return outcomes;
            }
        }

        let mut outcomes = Vec::with_capacity(plan.len());
        for planned in plan {
            let outcome = self
                .generator
                .generate_at(
                    lease,
                    &planned.metric,
                    planned.shape,
                    metrics.get(&planned.metric),
                    planned.path.clone(),
                )
                .await;
            outcomes.push(MetricOutcome {
                metric: planned.metric.clone(),
                source: GenerationSource::Fallback,
                outcome,
            });
        }
        outcomes
    }

    /// `None` means the fallback must run for every metric
    async fn try_primary(
        &self,
        primary: &dyn PrimaryGenerator,
        lease: &mut SurfaceLease<'_>,
        plan: &[PlannedArtifact],
        metrics: &MetricsDocument,
    ) -> Option<Vec<MetricOutcome>> {
        let (present, removed): (Vec<&PlannedArtifact>, Vec<&PlannedArtifact>) =
            plan.iter().partition(|p| metrics.contains(&p.metric));
        let targets: Vec<PrimaryTarget> = present
            .iter()
            .map(|p| PrimaryTarget::new(&p.metric, &p.filename))
            .collect();

        if let Err(e) = primary.generate(metrics, &targets, self.artifact_dir()).await {
            warn!(generator = primary.name(), error = %e, "primary generation failed, falling back");
            return None;
        }

        let mut missing = Vec::new();
        for p in &present {
            if tokio::fs::metadata(&p.path).await.is_err() {
                missing.push(p.metric.as_str());
            }
        }
        if !missing.is_empty() {
            warn!(generator = primary.name(), ?missing, "primary generation left artifacts missing, falling back");
            return None;
        }
        debug!(generator = primary.name(), count = present.len(), "primary generation succeeded");

        let mut outcomes: Vec<MetricOutcome> = present
            .iter()
            .map(|p| MetricOutcome {
                metric: p.metric.clone(),
                source: GenerationSource::Primary,
                outcome: GenerationOutcome::Rendered { path: p.path.clone() },
            })
            .collect();
        for p in removed {
            let outcome = self
                .generator
                .generate_at(lease, &p.metric, p.shape, None, p.path.clone())
                .await;
            outcomes.push(MetricOutcome {
                metric: p.metric.clone(),
                source: GenerationSource::Fallback,
                outcome,
            });
        }
        Some(outcomes)
    }
}

/// Encoded artifact of each planned file, `None` where nothing was written
async fn read_produced(plan: &[PlannedArtifact]) -> Result<Vec<Option<VisualizationArtifact>>, ReconcileError> {
    let mut produced = Vec::with_capacity(plan.len());
    for planned in plan {
        let artifact = match tokio::fs::read(&planned.path).await {
            Ok(bytes) => Some(VisualizationArtifact::from_bytes(&planned.metric, &bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => return Err(ReconcileError::io(&planned.path, e)),
        };
        produced.push(artifact);
    }
    Ok(produced)
}

async fn remove_stale(path: &Path) -> Result<(), ReconcileError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!(path = %path.display(), "removed stale artifact");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(ReconcileError::io(path, e)),
    }
}
