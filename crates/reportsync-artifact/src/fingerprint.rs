//! Folder and content fingerprints
//!
//! A cache entry is addressed by two keys: where the documents live
//! ([`FolderFingerprint`]) and what they contain ([`ContentFingerprint`]).
//! Both are pure functions of their input; only reading file bytes can fail.

use crate::hash::ContentHash;
use crate::merkle::merkle_root;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

/// Identity of a source folder, independent of how its path was spelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderFingerprint(ContentHash);

impl FolderFingerprint {
    /// Underlying hash
    #[inline]
    #[must_use]
    pub const fn hash(&self) -> &ContentHash {
        &self.0
    }

    /// Short hex form for logs
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        self.0.short()
    }
}

impl Display for FolderFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Identity of the byte contents of a folder's documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentFingerprint(ContentHash);

impl ContentFingerprint {
    /// Underlying hash
    #[inline]
    #[must_use]
    pub const fn hash(&self) -> &ContentHash {
        &self.0
    }

    /// Short hex form for logs
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        self.0.short()
    }
}

impl Display for ContentFingerprint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Errors raised while fingerprinting document contents
#[derive(Debug, thiserror::Error)]
pub enum FingerprintError {
    /// A document could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Normalize a folder path written in either POSIX or Windows syntax
///
/// Windows drive paths map onto their `/mnt/<drive>` mount (`C:\data\q3`
/// becomes `/mnt/c/data/q3`). The result is normalized lexically: repeated
/// separators and `.` segments are dropped, `..` pops the previous segment,
/// and trailing separators are removed. The filesystem is never consulted.
#[must_use]
pub fn normalize_folder_path(raw: &str) -> PathBuf {
    let unified = raw.trim().replace('\\', "/");
    let unified = match split_drive(&unified) {
        Some((drive, rest)) => format!(
            "/mnt/{}/{}",
            drive.to_ascii_lowercase(),
            rest.trim_start_matches('/')
        ),
        None => unified,
    };
    lexical_normalize(&unified)
}

fn split_drive(path: &str) -> Option<(char, &str)> {
    let mut chars = path.chars();
    let drive = chars.next()?;
    if drive.is_ascii_alphabetic() && chars.next() == Some(':') {
        Some((drive, &path[2..]))
    } else {
        None
    }
}

fn lexical_normalize(path: &str) -> PathBuf {
    let absolute = path.starts_with('/');
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                if parts.last().is_some_and(|p| *p != "..") {
                    parts.pop();
                } else if !absolute {
                    parts.push("..");
                }
            }
            other => parts.push(other),
        }
    }

    let joined = parts.join("/");
    if absolute {
        PathBuf::from(format!("/{joined}"))
    } else if joined.is_empty() {
        PathBuf::from(".")
    } else {
        PathBuf::from(joined)
    }
}

/// Fingerprint a folder path after normalization
#[must_use]
pub fn fingerprint_path(raw: &str) -> FolderFingerprint {
    fingerprint_normalized(&normalize_folder_path(raw))
}

/// Fingerprint a path that has already been through [`normalize_folder_path`]
#[must_use]
pub fn fingerprint_normalized(path: &Path) -> FolderFingerprint {
    FolderFingerprint(ContentHash::compute(
        path.to_string_lossy().as_bytes(),
    ))
}

/// Fingerprint the byte contents of a set of documents
///
/// Paths are sorted (and de-duplicated) before hashing, so the result does
/// not depend on discovery order. Each document contributes its Blake3
/// digest as one Merkle leaf.
///
/// # Errors
/// Returns [`FingerprintError::Io`] if any document cannot be read.
pub fn fingerprint_contents(files: &[PathBuf]) -> Result<ContentFingerprint, FingerprintError> {
    let mut sorted: Vec<&PathBuf> = files.iter().collect();
    sorted.sort();
    sorted.dedup();

    let leaves = sorted
        .into_iter()
        .map(|path| {
            std::fs::read(path)
                .map(|bytes| ContentHash::compute(&bytes))
                .map_err(|source| FingerprintError::Io {
                    path: path.clone(),
                    source,
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ContentFingerprint(merkle_root(&leaves)))
}
