//! Errors for trie node decoding and proof verification.

use alloy_primitives::B256;
use thiserror::Error;

/// An error type for [`TrieNode`](crate::TrieNode) decoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrieNodeError {
    /// Invalid trie node type encountered.
    #[error("invalid trie node type encountered")]
    InvalidNodeType,
    /// Invalid hex-prefix byte on a leaf or extension path: an unknown flag
    /// nibble, or a nonzero padding nibble on an even-length path.
    #[error("invalid hex-prefix byte: {0:#04x}")]
    InvalidPathFlag(u8),
    /// Failed to decode trie node.
    #[error("failed to decode trie node: {0}")]
    Rlp(alloy_rlp::Error),
}

/// A [Result] type alias where the error is [`ProofError`].
pub type ProofResult<T> = Result<T, ProofError>;

/// An error type for inclusion proof verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// A supplied node's digest did not match the commitment that led to it.
    #[error("node hash mismatch: expected {expected}, computed {computed}")]
    HashMismatch {
        /// The commitment the walk expected.
        expected: B256,
        /// The digest computed over the supplied node bytes.
        computed: B256,
    },
    /// The walk required a node that was not present in the sequence.
    #[error("proof is missing the node for commitment {commitment}")]
    MissingNode {
        /// The unresolved commitment.
        commitment: B256,
    },
    /// A supplied node could not be decoded.
    #[error("{0}")]
    Node(#[from] TrieNodeError),
    /// The proven value does not match the expected value, or the key was
    /// absent while a value was expected.
    #[error("proven value does not match expected value")]
    ValueMismatch,
    /// The key resolved to a value although absence was expected.
    #[error("key is present in the trie, expected absence")]
    UnexpectedValue,
}
