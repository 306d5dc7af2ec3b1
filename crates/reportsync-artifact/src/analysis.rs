//! Analysis results and their visualization artifacts

use crate::metrics::MetricsDocument;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One rendered chart, text-safe encoded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisualizationArtifact {
    /// Metric the chart represents
    pub metric: String,
    /// Base64 of the artifact file bytes
    pub encoded: String,
}

impl VisualizationArtifact {
    /// Encode raw artifact bytes
    #[must_use]
    pub fn from_bytes(metric: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            metric: metric.into(),
            encoded: STANDARD.encode(bytes),
        }
    }

    /// Decode the artifact bytes
    ///
    /// # Errors
    /// Returns an error if `encoded` is not valid base64.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.encoded)
    }
}

/// Stable metric name → artifact position index
///
/// Indices are assigned once and never reassigned; the map only grows.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisualizationMap(IndexMap<String, usize>);

impl VisualizationMap {
    /// Create empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of a metric
    #[inline]
    #[must_use]
    pub fn get(&self, metric: &str) -> Option<usize> {
        self.0.get(metric).copied()
    }

    /// Assign an index to a metric that has none
    ///
    /// Returns the metric's index, which is the existing one if the metric
    /// was already mapped.
    pub fn assign(&mut self, metric: impl Into<String>, index: usize) -> usize {
        *self.0.entry(metric.into()).or_insert(index)
    }

    /// Number of mapped metrics
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no metric is mapped
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate `(metric, index)` in assignment order
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Verify every index points into a list of `len` artifacts
    ///
    /// # Errors
    /// Returns the first out-of-range entry.
    pub fn check(&self, len: usize) -> Result<(), MapError> {
        match self.0.iter().find(|(_, index)| **index >= len) {
            Some((metric, index)) => Err(MapError {
                metric: metric.clone(),
                index: *index,
                len,
            }),
            None => Ok(()),
        }
    }
}

impl FromIterator<(String, usize)> for VisualizationMap {
    fn from_iter<I: IntoIterator<Item = (String, usize)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// A visualization map entry pointing past the artifact list
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("visualization map entry '{metric}' points at index {index} but only {len} artifacts exist")]
pub struct MapError {
    pub metric: String,
    pub index: usize,
    pub len: usize,
}

/// Quality score of a report
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Evaluation {
    pub score: f64,
    pub text: String,
    #[serde(default)]
    pub evaluated_at: DateTime<Utc>,
}

impl Evaluation {
    /// Evaluation stamped now
    #[must_use]
    pub fn new(score: f64, text: impl Into<String>) -> Self {
        Self {
            score,
            text: text.into(),
            evaluated_at: Utc::now(),
        }
    }
}

/// Everything produced for one folder's documents
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub metrics: MetricsDocument,
    pub report: String,
    pub visualizations: Vec<VisualizationArtifact>,
    pub visualization_map: VisualizationMap,
    pub evaluation: Evaluation,
    #[serde(default)]
    pub hyperlinks: Vec<String>,
}

impl AnalysisResult {
    /// Draft for an update: new metrics and report, everything else carried
    /// over unchanged
    #[must_use]
    pub fn carry_forward(&self, metrics: MetricsDocument, report: String) -> Self {
        Self {
            metrics,
            report,
            visualizations: self.visualizations.clone(),
            visualization_map: self.visualization_map.clone(),
            evaluation: self.evaluation.clone(),
            hyperlinks: self.hyperlinks.clone(),
        }
    }

    /// Artifact currently shown for a metric
    #[must_use]
    pub fn visualization_for(&self, metric: &str) -> Option<&VisualizationArtifact> {
        self.visualization_map
            .get(metric)
            .and_then(|index| self.visualizations.get(index))
    }
}
