//! End-to-end update behaviour
//!
//! Each test builds an orchestrator over a temporary folder of documents,
//! an in-memory cache and recording collaborators, then drives `update`
//! the way a caller would.

use pretty_assertions::assert_eq;
use reportsync_artifact::{AnalysisResult, MetricsDocument};
use reportsync_cache::{CacheKey, CacheStore, MemoryCacheStore};
use reportsync_core::{EngineConfig, UpdateError, UpdateOrchestrator};
use reportsync_test_utils::{
    baseline_result, sample_metrics, single_series, FailingPrimary, RecordingEvaluator,
    StaticAnalysis, WritingPrimary,
};
use reportsync_viz::{artifact_filename, ConcurrencyGuard};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

struct Harness {
    docs: TempDir,
    charts: TempDir,
    cache: Arc<MemoryCacheStore>,
    analysis: Arc<StaticAnalysis>,
    evaluator: Arc<RecordingEvaluator>,
    orchestrator: UpdateOrchestrator,
}

impl Harness {
    fn new(baseline: AnalysisResult) -> Self {
        Self::with_config(baseline, |c| c)
    }

    fn with_config(baseline: AnalysisResult, tweak: impl FnOnce(EngineConfig) -> EngineConfig) -> Self {
        let docs = tempfile::tempdir().unwrap();
        std::fs::write(docs.path().join("release_notes.pdf"), "Defects: 3 open, 61.5% coverage").unwrap();
        std::fs::write(docs.path().join("test_summary.pdf"), "Regression issues: 4").unwrap();
        let charts = tempfile::tempdir().unwrap();

        let cache = Arc::new(MemoryCacheStore::new(64));
        let analysis = Arc::new(StaticAnalysis::new(baseline));
        let evaluator = Arc::new(RecordingEvaluator::new(8.5));
        let config = tweak(EngineConfig::new().with_artifact_dir(charts.path()));
        let orchestrator = UpdateOrchestrator::new(&config, cache.clone(), analysis.clone(), evaluator.clone())
            .with_guard(Arc::new(ConcurrencyGuard::new()));

        Self {
            docs,
            charts,
            cache,
            analysis,
            evaluator,
            orchestrator,
        }
    }

    fn folder(&self) -> &str {
        self.docs.path().to_str().unwrap()
    }

    fn chart(&self, metric: &str) -> std::path::PathBuf {
        self.charts.path().join(artifact_filename(metric))
    }
}

fn with_defects(value: f64) -> MetricsDocument {
    let mut doc = sample_metrics();
    doc.insert("Defects", single_series(&[("1.0", value)]));
    doc
}

/// Changing one metric regenerates exactly its artifact; every other index
/// and artifact is carried over untouched.
#[tokio::test]
async fn changed_metric_regenerates_only_its_artifact() {
    let prior = baseline_result(&with_defects(3.0));
    let h = Harness::new(prior.clone());

    let outcome = h
        .orchestrator
        .update_detailed(h.folder(), with_defects(5.0), "new report".into())
        .await
        .unwrap();

    assert_eq!(outcome.changes.to_vec(), vec!["Defects".to_string()]);
    assert_eq!(outcome.result.visualization_map, prior.visualization_map);
    let defects = prior.visualization_map.get("Defects").unwrap();
    for (i, (old, new)) in prior.visualizations.iter().zip(&outcome.result.visualizations).enumerate() {
        if i == defects {
            assert_ne!(old, new);
        } else {
            assert_eq!(old, new);
        }
    }
    assert!(h.chart("Defects").exists());
    assert!(!h.chart("Regression Issues").exists());
    assert_eq!(h.analysis.calls(), 1);
}

/// The evaluator sees every document under a `File:` header, and the
/// stored result carries its score.
#[tokio::test]
async fn evaluator_receives_labelled_source_text() {
    let h = Harness::new(baseline_result(&sample_metrics()));
    let result = h
        .orchestrator
        .update(h.folder(), sample_metrics(), "report body".into())
        .await
        .unwrap();

    let seen = h.evaluator.seen();
    assert_eq!(seen.len(), 1);
    assert_eq!(
        seen[0].0,
        "File: release_notes.pdf\nDefects: 3 open, 61.5% coverage\nFile: test_summary.pdf\nRegression issues: 4"
    );
    assert_eq!(seen[0].1, "report body");
    assert_eq!(result.evaluation.score, 8.5);
}

/// A second identical update changes nothing but the evaluation.
#[tokio::test]
async fn repeated_update_is_idempotent() {
    let h = Harness::new(baseline_result(&with_defects(3.0)));

    let first = h
        .orchestrator
        .update_detailed(h.folder(), with_defects(5.0), "same".into())
        .await
        .unwrap();
    let second = h
        .orchestrator
        .update_detailed(h.folder(), with_defects(5.0), "same".into())
        .await
        .unwrap();

    assert!(second.cache_hit);
    assert!(second.changes.is_empty());
    let mut expected = first.result.clone();
    expected.evaluation = second.result.evaluation.clone();
    assert_eq!(second.result, expected);
    assert_eq!(h.analysis.calls(), 1);
}

/// Too few artifacts rejects the update and leaves the cache as it was.
#[tokio::test]
async fn insufficient_artifacts_leave_cache_unchanged() {
    let small = MetricsDocument::new()
        .with_metric("A", single_series(&[("1.0", 1.0)]))
        .with_metric("B", single_series(&[("1.0", 1.0)]));
    let h = Harness::new(baseline_result(&small));

    let mut changed = small.clone();
    changed.insert("A", single_series(&[("1.0", 2.0)]));
    let err = h
        .orchestrator
        .update(h.folder(), changed, "r".into())
        .await
        .unwrap_err();

    assert!(err.is_insufficient_artifacts());
    assert!(matches!(err, UpdateError::Reconcile(_)));
    assert!(h.evaluator.seen().is_empty());
    assert_eq!(h.cache.stats().entry_count, 0);
}

/// A rejected reconciliation leaves a stored entry exactly as it was.
#[tokio::test]
async fn insufficient_artifacts_keep_stored_entry() {
    let small = MetricsDocument::new()
        .with_metric("A", single_series(&[("1.0", 1.0)]))
        .with_metric("B", single_series(&[("1.0", 1.0)]));
    let h = Harness::new(baseline_result(&small));

    let stored = h
        .orchestrator
        .update(h.folder(), small.clone(), "first".into())
        .await
        .unwrap();
    let key = key_for(h.docs.path());
    assert_eq!(h.cache.get(&key).await.unwrap(), Some(stored.clone()));

    let mut changed = small;
    changed.insert("B", single_series(&[("1.0", 7.0)]));
    let err = h
        .orchestrator
        .update(h.folder(), changed, "second".into())
        .await
        .unwrap_err();

    assert!(err.is_insufficient_artifacts());
    assert_eq!(h.cache.get(&key).await.unwrap(), Some(stored));
    assert_eq!(h.evaluator.seen().len(), 1);
}

/// A failed update does not replace an existing cache entry.
#[tokio::test]
async fn failed_update_keeps_previous_entry() {
    let h = Harness::new(baseline_result(&with_defects(3.0)));
    let stored = h
        .orchestrator
        .update(h.folder(), with_defects(4.0), "good".into())
        .await
        .unwrap();

    let mut broken = with_defects(4.0);
    broken.insert("", json!([]));
    assert!(h.orchestrator.update(h.folder(), broken, "bad".into()).await.is_err());

    let key = key_for(h.docs.path());
    assert_eq!(h.cache.get(&key).await.unwrap(), Some(stored));
}

/// Excluded metrics keep their artifact even when their data changes.
#[tokio::test]
async fn excluded_metric_is_never_regenerated() {
    let prior = baseline_result(&with_defects(3.0));
    let h = Harness::with_config(prior.clone(), |c| c.with_excluded_metrics(["Defects"]));

    let outcome = h
        .orchestrator
        .update_detailed(h.folder(), with_defects(9.0), "r".into())
        .await
        .unwrap();

    assert!(outcome.changes.is_empty());
    assert_eq!(outcome.result.visualizations, prior.visualizations);
    assert!(!h.chart("Defects").exists());
}

/// Two updates on disjoint metrics never move a known index.
#[tokio::test]
async fn indices_survive_successive_updates() {
    let h = Harness::new(baseline_result(&sample_metrics()));
    let before = h
        .orchestrator
        .update(h.folder(), sample_metrics(), "r0".into())
        .await
        .unwrap();

    let mut first = sample_metrics();
    first.insert("Unit Test Coverage", single_series(&[("24.1", 10.0)]));
    first.insert("Mean Time To Recovery", single_series(&[("24.1", 3.0)]));
    let after_first = h.orchestrator.update(h.folder(), first.clone(), "r1".into()).await.unwrap();

    let mut second = first;
    second.insert("Regression Issues", single_series(&[("24.1", 0.0)]));
    let after_second = h.orchestrator.update(h.folder(), second, "r2".into()).await.unwrap();

    for (metric, index) in before.visualization_map.iter() {
        assert_eq!(after_first.visualization_map.get(metric), Some(index));
        assert_eq!(after_second.visualization_map.get(metric), Some(index));
    }
    assert_eq!(
        after_second.visualization_map.get("Mean Time To Recovery"),
        Some(before.visualizations.len())
    );
}

/// A working primary generator is used; a failing one falls back.
#[tokio::test]
async fn primary_generator_with_fallback() {
    let h = Harness::new(baseline_result(&with_defects(3.0)));
    let primary = Arc::new(WritingPrimary::new());
    let orchestrator = h.orchestrator.clone().with_primary_generator(primary.clone());

    orchestrator
        .update(h.folder(), with_defects(5.0), "r".into())
        .await
        .unwrap();
    assert_eq!(primary.requests(), vec![vec!["Defects".to_string()]]);
    assert_eq!(
        std::fs::read_to_string(h.chart("Defects")).unwrap(),
        "<svg>primary Defects</svg>"
    );

    let fallback = h.orchestrator.clone().with_primary_generator(Arc::new(FailingPrimary));
    fallback
        .update(h.folder(), with_defects(6.0), "r".into())
        .await
        .unwrap();
    assert!(std::fs::read_to_string(h.chart("Defects")).unwrap().starts_with("<svg xmlns"));
}

/// Changing a document's bytes moves the update to a new cache key.
#[tokio::test]
async fn content_change_triggers_new_baseline() {
    let h = Harness::new(baseline_result(&sample_metrics()));
    h.orchestrator
        .update(h.folder(), sample_metrics(), "r".into())
        .await
        .unwrap();

    std::fs::write(h.docs.path().join("release_notes.pdf"), "Defects: 2 open").unwrap();
    let outcome = h
        .orchestrator
        .update_detailed(h.folder(), sample_metrics(), "r".into())
        .await
        .unwrap();

    assert!(!outcome.cache_hit);
    assert_eq!(h.analysis.calls(), 2);
}

fn key_for(folder: &Path) -> CacheKey {
    let normalized = reportsync_artifact::normalize_folder_path(folder.to_str().unwrap());
    let mut files: Vec<_> = std::fs::read_dir(&normalized)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    files.sort();
    CacheKey::new(
        reportsync_artifact::fingerprint_normalized(&normalized),
        reportsync_artifact::fingerprint_contents(&files).unwrap(),
    )
}
