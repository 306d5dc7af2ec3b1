//! Paths into a metrics document
//!
//! Provides [`DiffPath`], the typed location a structural diff entry refers to.
//! The first segment of a path inside a metrics map is the metric name.

use std::fmt::{self, Display, Formatter};

/// One step into a JSON value
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSegment {
    /// Object member
    Key(String),
    /// Array element (position in the side that owns the element)
    Index(usize),
}

/// Location of a change inside a JSON value
///
/// # Examples
/// - `[Key("Defects")]` → `Defects`
/// - `[Key("Defects"), Index(0), Key("value")]` → `Defects[0].value`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DiffPath(Vec<PathSegment>);

impl DiffPath {
    /// Empty path (the compared value itself)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is the root
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append an object key, returning the new path
    #[must_use]
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.0.push(PathSegment::Key(key.into()));
        next
    }

    /// Append an array index, returning the new path
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        let mut next = self.clone();
        next.0.push(PathSegment::Index(index));
        next
    }

    /// Metric name this path belongs to
    ///
    /// # Errors
    /// Returns [`DiffExtractionFailure`] if the path does not start with an
    /// object key.
    pub fn metric_name(&self) -> Result<&str, DiffExtractionFailure> {
        match self.0.first() {
            Some(PathSegment::Key(name)) => Ok(name),
            _ => Err(DiffExtractionFailure { path: self.clone() }),
        }
    }
}

impl Display for DiffPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(key) if i == 0 => write!(f, "{key}")?,
                PathSegment::Key(key) => write!(f, ".{key}")?,
                PathSegment::Index(index) => write!(f, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// A diff entry whose path cannot be attributed to a metric
///
/// Not fatal: the detector logs and skips such entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot map diff path '{path}' to a metric name")]
pub struct DiffExtractionFailure {
    /// The offending path
    pub path: DiffPath,
}
