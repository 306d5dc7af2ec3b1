//! Change detection between two metrics documents

use crate::diff::diff_values;
use crate::metrics::MetricsDocument;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Ordered, de-duplicated set of changed metric names
///
/// Order is diff discovery order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSet(IndexSet<String>);

impl ChangeSet {
    /// Create empty change set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a metric name; returns `false` if it was already present
    pub fn insert(&mut self, metric: impl Into<String>) -> bool {
        self.0.insert(metric.into())
    }

    /// Whether a metric is in the set
    #[inline]
    #[must_use]
    pub fn contains(&self, metric: &str) -> bool {
        self.0.contains(metric)
    }

    /// Number of changed metrics
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing changed
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate names in discovery order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Names as an owned vector
    #[must_use]
    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl<S: Into<String>> FromIterator<S> for ChangeSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// Finds the metrics whose payload differs between two documents
///
/// Metrics in the exclusion set never appear in a change set, even when
/// their payload changed.
#[derive(Debug, Clone, Default)]
pub struct ChangeDetector {
    excluded: BTreeSet<String>,
}

impl ChangeDetector {
    /// Detector without exclusions
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector with the given exclusions
    #[must_use]
    pub fn with_excluded<I, S>(excluded: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            excluded: excluded.into_iter().map(Into::into).collect(),
        }
    }

    /// Excluded metric names
    #[inline]
    #[must_use]
    pub fn excluded(&self) -> &BTreeSet<String> {
        &self.excluded
    }

    /// Metrics added, removed or changed between `old` and `new`
    #[must_use]
    pub fn detect(&self, old: &MetricsDocument, new: &MetricsDocument) -> ChangeSet {
        let entries = diff_values(&old.to_metrics_value(), &new.to_metrics_value());
        let mut changes = ChangeSet::new();

        for entry in &entries {
            match entry.path.metric_name() {
                Ok(name) if self.excluded.contains(name) => {
                    tracing::trace!(metric = name, path = %entry.path, "change in excluded metric ignored");
                }
                Ok(name) => {
                    if changes.insert(name) {
                        tracing::debug!(metric = name, kind = ?entry.kind, path = %entry.path, "metric changed");
                    }
                }
                Err(failure) => {
                    tracing::warn!(%failure, "skipping diff entry");
                }
            }
        }

        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn doc(pairs: &[(&str, serde_json::Value)]) -> MetricsDocument {
        pairs
            .iter()
            .fold(MetricsDocument::new(), |d, (k, v)| d.with_metric(*k, v.clone()))
    }

    #[test]
    fn scalar_edit_in_one_metric() {
        let old = doc(&[
            ("Defects", json!([{"version": "1.0", "value": 3}])),
            ("Coverage", json!([{"version": "1.0", "value": 80}])),
        ]);
        let new = doc(&[
            ("Defects", json!([{"version": "1.0", "value": 5}])),
            ("Coverage", json!([{"version": "1.0", "value": 80}])),
        ]);
        let changes = ChangeDetector::new().detect(&old, &new);
        assert_eq!(changes.to_vec(), vec!["Defects".to_string()]);
    }

    #[test]
    fn multiple_nested_changes_collapse_to_one_name() {
        let old = doc(&[("P", json!({"ATLS": [{"version": "1", "value": 1}], "BTLS": [{"version": "1", "value": 2}]}))]);
        let new = doc(&[("P", json!({"ATLS": [{"version": "1", "value": 9}], "BTLS": [{"version": "1", "value": 8}]}))]);
        assert_eq!(ChangeDetector::new().detect(&old, &new).len(), 1);
    }

    #[test]
    fn added_and_removed_metrics_are_changes() {
        let old = doc(&[("A", json!([])), ("B", json!([]))]);
        let new = doc(&[("B", json!([])), ("C", json!([]))]);
        let changes = ChangeDetector::new().detect(&old, &new);
        assert_eq!(changes.to_vec(), vec!["A".to_string(), "C".to_string()]);
    }

    #[test]
    fn excluded_metric_hides_only_itself() {
        let old = doc(&[
            ("Load/Performance", json!({"ATLS": [{"version": "1", "value": 1}], "BTLS": []})),
            ("Defects", json!([{"version": "1", "value": 1}])),
        ]);
        let new = doc(&[
            ("Load/Performance", json!({"ATLS": [{"version": "1", "value": 2}], "BTLS": []})),
            ("Defects", json!([{"version": "1", "value": 1}])),
        ]);
        let detector = ChangeDetector::with_excluded(["Load/Performance"]);
        assert!(detector.detect(&old, &new).is_empty());
        assert!(!ChangeDetector::new().detect(&old, &new).is_empty());
    }

    #[test]
    fn identical_documents_have_no_changes() {
        let d = doc(&[("A", json!([{"version": "1", "value": 1}]))]);
        assert!(ChangeDetector::new().detect(&d, &d.clone()).is_empty());
    }
}
