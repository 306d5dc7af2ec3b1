//! Testing utilities for the reportsync workspace
//!
//! Shared fixtures and recording collaborator fakes.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use reportsync_artifact::{AnalysisResult, Evaluation, MetricsDocument, VisualizationArtifact};
use reportsync_core::{FullAnalysis, ReportEvaluator};
use reportsync_viz::{PrimaryError, PrimaryGenerator, PrimaryTarget};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn point(version: &str, value: f64) -> Value {
    json!({"version": version, "value": value})
}

pub fn single_series(values: &[(&str, f64)]) -> Value {
    Value::Array(values.iter().map(|(v, x)| point(v, *x)).collect())
}

pub fn paired_series(key_a: &str, a: &[(&str, f64)], key_b: &str, b: &[(&str, f64)]) -> Value {
    json!({ key_a: single_series(a), key_b: single_series(b) })
}

/// Every known metric with a well-formed payload
pub fn sample_metrics() -> MetricsDocument {
    let releases = |a: f64, b: f64| [("24.1", a), ("24.2", b)];
    let mut doc = MetricsDocument::new();
    for (i, name) in reportsync_viz::COMPARATIVE_METRICS.iter().enumerate() {
        let base = i as f64;
        doc.insert(
            *name,
            paired_series("ATLS", &releases(base + 3.0, base + 1.0), "BTLS", &releases(base, base + 2.0)),
        );
    }
    for name in reportsync_viz::TREND_METRICS {
        doc.insert(name, single_series(&releases(61.0, 64.5)));
    }
    for name in reportsync_viz::COUNT_METRICS {
        doc.insert(name, single_series(&releases(4.0, 2.0)));
    }
    doc.insert(
        reportsync_viz::PASS_FAIL_METRIC,
        paired_series("Pass", &releases(40.0, 44.0), "Fail", &releases(3.0, 1.0)),
    );
    doc
}

/// A cached-looking result: one placeholder artifact per metric of
/// `metrics`, mapped in document order
pub fn baseline_result(metrics: &MetricsDocument) -> AnalysisResult {
    let names: Vec<String> = metrics.names().map(str::to_string).collect();
    AnalysisResult {
        metrics: metrics.clone(),
        report: "# Baseline report".to_string(),
        visualizations: names
            .iter()
            .map(|n| VisualizationArtifact::from_bytes(n, format!("<svg>baseline {n}</svg>").as_bytes()))
            .collect(),
        visualization_map: names.into_iter().enumerate().map(|(i, n)| (n, i)).collect(),
        evaluation: Evaluation::new(7.0, "baseline evaluation"),
        hyperlinks: Vec::new(),
    }
}

/// Full analysis returning a fixed result and counting calls
#[derive(Debug)]
pub struct StaticAnalysis {
    result: AnalysisResult,
    calls: AtomicUsize,
}

impl StaticAnalysis {
    pub fn new(result: AnalysisResult) -> Self {
        Self {
            result,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FullAnalysis for StaticAnalysis {
    async fn run_full_analysis(&self, _folder: &Path) -> anyhow::Result<AnalysisResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.result.clone())
    }
}

/// Evaluator recording every `(source, report)` pair it sees
#[derive(Debug)]
pub struct RecordingEvaluator {
    score: f64,
    seen: Mutex<Vec<(String, String)>>,
}

impl RecordingEvaluator {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<(String, String)> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl ReportEvaluator for RecordingEvaluator {
    async fn evaluate(&self, source_text: &str, report_text: &str) -> anyhow::Result<(f64, String)> {
        self.seen
            .lock()
            .push((source_text.to_string(), report_text.to_string()));
        Ok((self.score, format!("evaluated {} chars", report_text.len())))
    }
}

/// Primary generator that writes a stub SVG for every target
#[derive(Debug, Default)]
pub struct WritingPrimary {
    requests: Mutex<Vec<Vec<String>>>,
}

impl WritingPrimary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Metrics requested, one list per call
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl PrimaryGenerator for WritingPrimary {
    async fn generate(
        &self,
        _metrics: &MetricsDocument,
        targets: &[PrimaryTarget],
        artifact_dir: &Path,
    ) -> Result<(), PrimaryError> {
        self.requests
            .lock()
            .push(targets.iter().map(|t| t.metric.clone()).collect());
        for target in targets {
            let path: PathBuf = artifact_dir.join(&target.filename);
            std::fs::write(&path, format!("<svg>primary {}</svg>", target.metric)).map_err(PrimaryError::Io)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "writing"
    }
}

/// Primary generator that always fails
#[derive(Debug, Default)]
pub struct FailingPrimary;

#[async_trait]
impl PrimaryGenerator for FailingPrimary {
    async fn generate(
        &self,
        _metrics: &MetricsDocument,
        _targets: &[PrimaryTarget],
        _artifact_dir: &Path,
    ) -> Result<(), PrimaryError> {
        Err(PrimaryError::Other("renderer unavailable".to_string()))
    }

    fn name(&self) -> &str {
        "failing"
    }
}
