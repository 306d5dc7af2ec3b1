//! Merkle combination of per-document digests
//!
//! A thin wrapper around `rs_merkle` so that a folder's content fingerprint is
//! the root over its documents' Blake3 digests.

use crate::hash::ContentHash;
use rs_merkle::{Hasher, MerkleTree};

/// Blake3 hasher adapter for rs_merkle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Blake3Hasher;

impl Hasher for Blake3Hasher {
    type Hash = [u8; 32];

    #[inline]
    fn hash(data: &[u8]) -> Self::Hash {
        *blake3::hash(data).as_bytes()
    }
}

/// Root hash over the given leaves, in the given order
///
/// Returns the zero hash for an empty leaf set.
#[must_use]
pub fn merkle_root(leaves: &[ContentHash]) -> ContentHash {
    let leaves: Vec<[u8; 32]> = leaves.iter().map(|h| *h.as_bytes()).collect();
    MerkleTree::<Blake3Hasher>::from_leaves(&leaves)
        .root()
        .map_or_else(ContentHash::default, ContentHash::new)
}
