//! Merkle-Patricia trie inclusion proof verification.
//!
//! This crate verifies that a key maps to a value (or to nothing) under a
//! claimed 256-bit trie root, given an ordered sequence of trie nodes. The
//! node sequence itself is untrusted: trust derives only from keccak-chaining
//! each node's bytes back to the root commitment.
//!
//! The verifier is pure and deterministic. It performs no I/O and never
//! retries, so it can be unit-tested exhaustively against synthetic tries.

mod errors;
pub use errors::{ProofError, ProofResult, TrieNodeError};

mod node;
pub use node::TrieNode;

mod proof;
pub use proof::{process_proof, verify_proof};

// Re-export the canonical empty-trie root commitment.
pub use alloy_trie::EMPTY_ROOT_HASH;
