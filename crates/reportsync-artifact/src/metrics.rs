//! Metrics documents and their series payloads
//!
//! A [`MetricsDocument`] keeps each metric's payload as raw JSON so that
//! malformed data survives until chart generation, where it turns into a
//! placeholder instead of a failed request. Payloads are resolved into a
//! typed [`SeriesPayload`] exactly once, by the generator.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named metric series supplied by a caller
///
/// Wire form: `{"metrics": {"<name>": <payload>, ...}}`. Metric order is the
/// order of the document.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsDocument {
    metrics: IndexMap<String, Value>,
}

impl MetricsDocument {
    /// Create an empty document
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add or replace a metric
    #[must_use]
    pub fn with_metric(mut self, name: impl Into<String>, payload: Value) -> Self {
        self.insert(name, payload);
        self
    }

    /// Add or replace a metric, keeping its original position
    pub fn insert(&mut self, name: impl Into<String>, payload: Value) -> Option<Value> {
        self.metrics.insert(name.into(), payload)
    }

    /// Parse from a JSON value
    ///
    /// # Errors
    /// Returns [`MetricsError::InvalidMetricsDocument`] if the value is not an
    /// object carrying a `metrics` object.
    pub fn from_value(value: Value) -> Result<Self, MetricsError> {
        serde_json::from_value(value)
            .map_err(|e| MetricsError::InvalidMetricsDocument(e.to_string()))
    }

    /// Parse from JSON text
    ///
    /// # Errors
    /// Returns [`MetricsError::InvalidMetricsDocument`] on malformed input.
    pub fn from_json_str(raw: &str) -> Result<Self, MetricsError> {
        serde_json::from_str(raw).map_err(|e| MetricsError::InvalidMetricsDocument(e.to_string()))
    }

    /// Check the document is usable as the input of an update
    ///
    /// # Errors
    /// Returns [`MetricsError::InvalidMetricsDocument`] for a document without
    /// metrics or with a blank metric name.
    pub fn validate(&self) -> Result<(), MetricsError> {
        if self.metrics.is_empty() {
            return Err(MetricsError::InvalidMetricsDocument(
                "document contains no metrics".to_string(),
            ));
        }
        if self.metrics.keys().any(|name| name.trim().is_empty()) {
            return Err(MetricsError::InvalidMetricsDocument(
                "metric names must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    /// Payload of a metric
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.metrics.get(name)
    }

    /// Whether the document carries a metric
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    /// Metric names in document order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.keys().map(String::as_str)
    }

    /// Number of metrics
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    /// Whether the document is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    /// The metrics map as a single JSON object
    #[must_use]
    pub fn to_metrics_value(&self) -> Value {
        Value::Object(
            self.metrics
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// Errors in a supplied metrics document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetricsError {
    /// The document cannot be used at all
    #[error("invalid metrics document: {0}")]
    InvalidMetricsDocument(String),
}

/// One `{version, value}` point of a series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub version: String,
    pub value: f64,
}

impl SeriesPoint {
    /// Create a point
    #[must_use]
    pub fn new(version: impl Into<String>, value: f64) -> Self {
        Self {
            version: version.into(),
            value,
        }
    }

    /// Read a point from raw JSON
    ///
    /// Returns `None` when `version` or `value` is missing (or null). A numeric
    /// version is stringified. A value that is not a number is parsed if it is
    /// a finite numeric string and coerced to `0.0` otherwise.
    #[must_use]
    pub fn from_value(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;
        let version = match obj.get("version")? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        let value = match obj.get("value")? {
            Value::Null => return None,
            Value::Number(n) => n.as_f64().unwrap_or(0.0),
            Value::String(s) => s.trim().parse().ok().filter(|v: &f64| v.is_finite()).unwrap_or(0.0),
            _ => 0.0,
        };
        Some(Self { version, value })
    }
}

/// Read an ordered series, dropping malformed points
///
/// Returns `None` if the value is not an array.
#[must_use]
pub fn parse_series(raw: &Value) -> Option<Vec<SeriesPoint>> {
    raw.as_array()
        .map(|items| items.iter().filter_map(SeriesPoint::from_value).collect())
}

/// Why a payload cannot be charted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadIssue {
    /// Payload absent or of the wrong shape
    NoData,
    /// Paired series empty or of unequal length
    IncompleteData,
}

impl PayloadIssue {
    /// Placeholder text for this issue
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NoData => "no data",
            Self::IncompleteData => "incomplete data",
        }
    }
}

/// A payload resolved against its chart shape
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesPayload {
    /// Two aligned series (comparative and pass/fail metrics)
    Paired {
        a: Vec<SeriesPoint>,
        b: Vec<SeriesPoint>,
    },
    /// One series (trend and count metrics)
    Single(Vec<SeriesPoint>),
}

impl SeriesPayload {
    /// Resolve a two-series payload keyed by `key_a` and `key_b`
    ///
    /// # Errors
    /// [`PayloadIssue::NoData`] if either series is missing or not an array;
    /// [`PayloadIssue::IncompleteData`] if the filtered series are empty or
    /// differ in length.
    pub fn resolve_paired(
        raw: Option<&Value>,
        key_a: &str,
        key_b: &str,
    ) -> Result<Self, PayloadIssue> {
        let obj = raw.and_then(Value::as_object).ok_or(PayloadIssue::NoData)?;
        let a = obj
            .get(key_a)
            .and_then(parse_series)
            .ok_or(PayloadIssue::NoData)?;
        let b = obj
            .get(key_b)
            .and_then(parse_series)
            .ok_or(PayloadIssue::NoData)?;
        if a.is_empty() || a.len() != b.len() {
            return Err(PayloadIssue::IncompleteData);
        }
        Ok(Self::Paired { a, b })
    }

    /// Resolve a single-series payload
    ///
    /// # Errors
    /// [`PayloadIssue::NoData`] if the payload is missing, not an array, or has
    /// no well-formed points.
    pub fn resolve_single(raw: Option<&Value>) -> Result<Self, PayloadIssue> {
        let points = raw.and_then(parse_series).ok_or(PayloadIssue::NoData)?;
        if points.is_empty() {
            return Err(PayloadIssue::NoData);
        }
        Ok(Self::Single(points))
    }

    /// Category labels (versions of the first series)
    #[must_use]
    pub fn versions(&self) -> Vec<&str> {
        let points = match self {
            Self::Paired { a, .. } => a,
            Self::Single(points) => points,
        };
        points.iter().map(|p| p.version.as_str()).collect()
    }
}
