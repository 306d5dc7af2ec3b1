//! External collaborators of an update
//!
//! The orchestrator depends on these seams only through traits; the
//! implementations here are the ones the `reportsync` binary wires up.

use anyhow::Context as _;
use async_trait::async_trait;
use reportsync_artifact::AnalysisResult;
use std::collections::HashSet;
use std::fmt::Debug;
use std::io;
use std::path::{Path, PathBuf};

/// Produces a baseline result for a folder that has no cache entry
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FullAnalysis: Send + Sync + Debug {
    async fn run_full_analysis(&self, folder: &Path) -> anyhow::Result<AnalysisResult>;
}

/// Scores a report against the documents it was written from
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ReportEvaluator: Send + Sync + Debug {
    /// Returns `(score, evaluation text)`
    async fn evaluate(&self, source_text: &str, report_text: &str) -> anyhow::Result<(f64, String)>;
}

/// Finds and reads the source documents of a folder
pub trait DocumentSource: Send + Sync + Debug {
    /// Document paths, in a stable order
    fn discover(&self, folder: &Path) -> io::Result<Vec<PathBuf>>;

    /// Plain text of one document
    fn extract_text(&self, document: &Path) -> io::Result<String>;
}

/// Regular files directly inside the folder, filtered by extension
#[derive(Debug, Clone)]
pub struct FlatDirectorySource {
    extensions: Vec<String>,
}

impl FlatDirectorySource {
    /// Source accepting the given extensions (case-insensitive, no dot)
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|e| e.into().trim_start_matches('.').to_lowercase())
                .collect(),
        }
    }

    fn accepts(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
    }
}

impl Default for FlatDirectorySource {
    fn default() -> Self {
        Self::new(["pdf"])
    }
}

impl DocumentSource for FlatDirectorySource {
    fn discover(&self, folder: &Path) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(folder)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_file() && self.accepts(&path) {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }

    fn extract_text(&self, document: &Path) -> io::Result<String> {
        let bytes = std::fs::read(document)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// Full analysis that loads a previously produced result from JSON
#[derive(Debug, Clone, Default)]
pub struct BaselineFileAnalysis {
    path: Option<PathBuf>,
}

impl BaselineFileAnalysis {
    /// Load baselines from `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }

    /// No baseline available; every cache miss fails
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FullAnalysis for BaselineFileAnalysis {
    async fn run_full_analysis(&self, folder: &Path) -> anyhow::Result<AnalysisResult> {
        let Some(path) = &self.path else {
            anyhow::bail!("no cached result for {} and no baseline supplied", folder.display());
        };
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("reading baseline {}", path.display()))?;
        serde_json::from_slice(&raw).with_context(|| format!("parsing baseline {}", path.display()))
    }
}

/// Evaluator that needs no model: scores how many figures quoted in the
/// report also appear in the source text
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineEvaluator;

fn numeric_tokens(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_ascii_digit() || c == '.'))
        .map(|t| t.trim_matches('.'))
        .filter(|t| t.chars().any(|c| c.is_ascii_digit()))
}

#[async_trait]
impl ReportEvaluator for OfflineEvaluator {
    async fn evaluate(&self, source_text: &str, report_text: &str) -> anyhow::Result<(f64, String)> {
        let known: HashSet<&str> = numeric_tokens(source_text).collect();
        let quoted: Vec<&str> = numeric_tokens(report_text).collect();
        if quoted.is_empty() {
            return Ok((10.0, "report quotes no figures".to_string()));
        }
        let supported = quoted.iter().filter(|t| known.contains(*t)).count();
        #[allow(clippy::cast_precision_loss)]
        let score = 10.0 * supported as f64 / quoted.len() as f64;
        Ok((
            (score * 10.0).round() / 10.0,
            format!("{supported} of {} quoted figures found in source documents", quoted.len()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_source_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), b"b").unwrap();
        std::fs::write(dir.path().join("a.PDF"), b"a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"n").unwrap();
        std::fs::create_dir(dir.path().join("nested.pdf")).unwrap();

        let files = FlatDirectorySource::default().discover(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn extract_text_is_lossy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, [b'o', b'k', 0xff]).unwrap();
        let text = FlatDirectorySource::default().extract_text(&path).unwrap();
        assert!(text.starts_with("ok"));
    }

    #[tokio::test]
    async fn offline_evaluator_scores_supported_figures() {
        let (score, text) = OfflineEvaluator
            .evaluate("Defects: 3 open, coverage 61.5%", "We have 3 defects and 61.5% coverage, up from 58.")
            .await
            .unwrap();
        assert!((score - 6.7).abs() < 1e-9);
        assert!(text.starts_with("2 of 3"));
    }

    #[tokio::test]
    async fn baseline_without_path_fails() {
        let err = BaselineFileAnalysis::none()
            .run_full_analysis(Path::new("/reports/a"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no baseline"));
    }

    #[tokio::test]
    async fn baseline_loads_result() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let result = AnalysisResult {
            report: "baseline".into(),
            ..AnalysisResult::default()
        };
        std::fs::write(&path, serde_json::to_vec(&result).unwrap()).unwrap();

        let loaded = BaselineFileAnalysis::new(&path)
            .run_full_analysis(dir.path())
            .await
            .unwrap();
        assert_eq!(loaded, result);
    }

    #[tokio::test]
    async fn baseline_with_score_and_text_only_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        let raw = serde_json::json!({
            "metrics": {"metrics": {"Defects": [{"version": "1.0", "value": 3}]}},
            "report": "# Release report",
            "visualizations": [],
            "visualization_map": {},
            "evaluation": {"score": 7.5, "text": "grounded"}
        });
        std::fs::write(&path, serde_json::to_vec(&raw).unwrap()).unwrap();

        let loaded = BaselineFileAnalysis::new(&path)
            .run_full_analysis(dir.path())
            .await
            .unwrap();
        assert_eq!(loaded.evaluation.score, 7.5);
        assert_eq!(loaded.evaluation.text, "grounded");
        assert!(loaded.metrics.contains("Defects"));
    }
}
