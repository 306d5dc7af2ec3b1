//! Primary (external) chart generation
//!
//! A [`PrimaryGenerator`] receives the whole metrics document and the list of
//! files it is expected to produce. The reconciler does not trust its return
//! value alone: it checks that every expected file exists afterwards.

use async_trait::async_trait;
use reportsync_artifact::MetricsDocument;
use std::fmt::Debug;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Environment variable carrying the artifact directory
pub const ARTIFACT_DIR_ENV: &str = "REPORTSYNC_ARTIFACT_DIR";

/// Environment variable carrying `filename<TAB>metric` lines
pub const TARGETS_ENV: &str = "REPORTSYNC_TARGETS";

/// One file the primary generator must produce
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryTarget {
    pub metric: String,
    pub filename: String,
}

impl PrimaryTarget {
    /// Create target
    pub fn new(metric: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            filename: filename.into(),
        }
    }
}

/// Failures of a primary generator
#[derive(Debug, thiserror::Error)]
pub enum PrimaryError {
    #[error("failed to start generator: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("generator io error: {0}")]
    Io(#[source] std::io::Error),

    #[error("generator exited with {status:?}: {stderr}")]
    Exited { status: Option<i32>, stderr: String },

    #[error("could not encode metrics: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// An external chart generation path
#[async_trait]
pub trait PrimaryGenerator: Send + Sync + Debug {
    /// Produce every target under `artifact_dir`
    async fn generate(
        &self,
        metrics: &MetricsDocument,
        targets: &[PrimaryTarget],
        artifact_dir: &Path,
    ) -> Result<(), PrimaryError>;

    /// Name for logs
    fn name(&self) -> &str;
}

/// Runs an external program as the primary generator
///
/// The program gets the metrics document as JSON on stdin, the artifact
/// directory in [`ARTIFACT_DIR_ENV`] and its targets in [`TARGETS_ENV`].
#[derive(Debug, Clone)]
pub struct CommandGenerator {
    program: PathBuf,
    args: Vec<String>,
}

impl CommandGenerator {
    /// Generator running `program`
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Builder: append arguments
    #[must_use]
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build from a shell-style word list: program followed by arguments
    #[must_use]
    pub fn from_words(words: &[String]) -> Option<Self> {
        let (program, args) = words.split_first()?;
        Some(Self::new(program).with_args(args.iter().cloned()))
    }
}

fn target_lines(targets: &[PrimaryTarget]) -> String {
    targets
        .iter()
        .map(|t| format!("{}\t{}", t.filename, t.metric))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl PrimaryGenerator for CommandGenerator {
    async fn generate(
        &self,
        metrics: &MetricsDocument,
        targets: &[PrimaryTarget],
        artifact_dir: &Path,
    ) -> Result<(), PrimaryError> {
        let input = serde_json::to_vec(metrics)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .env(ARTIFACT_DIR_ENV, artifact_dir)
            .env(TARGETS_ENV, target_lines(targets))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(PrimaryError::Spawn)?;

        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(&input).await {
                Ok(()) => {}
                // The program may exit without reading its input.
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
                Err(e) => return Err(PrimaryError::Io(e)),
            }
        }

        let output = child.wait_with_output().await.map_err(PrimaryError::Io)?;
        if !output.status.success() {
            return Err(PrimaryError::Exited {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(program = %self.program.display(), targets = targets.len(), "primary generator finished");
        Ok(())
    }

    fn name(&self) -> &str {
        self.program
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("command")
    }
}
