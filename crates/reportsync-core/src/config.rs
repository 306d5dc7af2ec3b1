//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Settings of an update engine
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Flat directory all chart artifacts are written to
    pub artifact_dir: PathBuf,
    /// Fewest artifacts an updated result may carry
    pub min_artifacts: usize,
    /// Metrics whose charts are never regenerated automatically
    pub excluded_metrics: Vec<String>,
    /// Entries held by the in-memory cache
    pub cache_capacity: u64,
    /// Persist the cache as JSON files here instead of in memory
    pub cache_dir: Option<PathBuf>,
    /// Extensions of the source documents in a folder
    pub document_extensions: Vec<String>,
    /// External chart generator: program followed by its arguments
    pub primary_command: Option<Vec<String>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("visualizations"),
            min_artifacts: reportsync_viz::MIN_ARTIFACTS,
            excluded_metrics: Vec::new(),
            cache_capacity: 1024,
            cache_dir: None,
            document_extensions: vec!["pdf".to_string()],
            primary_command: None,
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With artifact directory
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    /// With minimum artifact count
    #[inline]
    #[must_use]
    pub fn with_min_artifacts(mut self, min: usize) -> Self {
        self.min_artifacts = min;
        self
    }

    /// With excluded metrics
    #[must_use]
    pub fn with_excluded_metrics<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_metrics = names.into_iter().map(Into::into).collect();
        self
    }

    /// With on-disk cache
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// With document extensions
    #[must_use]
    pub fn with_document_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.document_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// Parse from TOML text; absent fields keep their defaults
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] on malformed TOML.
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load from a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.artifact_dir, PathBuf::from("visualizations"));
        assert_eq!(config.min_artifacts, 5);
        assert!(config.excluded_metrics.is_empty());
        assert_eq!(config.document_extensions, vec!["pdf".to_string()]);
        assert!(config.cache_dir.is_none());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            artifact_dir = "/srv/charts"
            excluded_metrics = ["Load/Performance"]
            primary_command = ["python3", "render.py"]
            "#,
        )
        .unwrap();
        assert_eq!(config.artifact_dir, PathBuf::from("/srv/charts"));
        assert_eq!(config.excluded_metrics, vec!["Load/Performance".to_string()]);
        assert_eq!(config.min_artifacts, 5);
        assert_eq!(config.cache_capacity, 1024);
        assert_eq!(config.primary_command.unwrap().len(), 2);
    }

    #[test]
    fn unknown_types_are_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("min_artifacts = \"five\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reportsync.toml");
        std::fs::write(&path, "cache_capacity = 16\n").unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.cache_capacity, 16);
        assert!(EngineConfig::load(&dir.path().join("missing.toml")).is_err());
    }
}
