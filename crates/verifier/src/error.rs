//! Error types for the verifier.

use alloy_primitives::{Address, B256};
use thiserror::Error;
use vote_relay_mpt::ProofError;

/// A [Result] type alias where the error is [`VerifierError`].
pub type VerifierResult<T> = Result<T, VerifierError>;

/// Main error type for verification operations.
///
/// Cryptographic failures are never recovered locally: they indicate either a
/// bug or an adversarial input, and abort verification of the affected voter
/// or header without touching other voters' state.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VerifierError {
    /// The header bytes could not be decoded as a canonical 15-field header.
    #[error("malformed header: {0}")]
    MalformedHeader(alloy_rlp::Error),

    /// The header's computed digest does not match the chain-reported block
    /// hash. Always fatal to the verification run.
    #[error("untrusted header: claimed block hash {claimed}, computed {computed}")]
    UntrustedHeader {
        /// The block hash reported by the chain.
        claimed: B256,
        /// The digest computed over the header's canonical encoding.
        computed: B256,
    },

    /// A proof failed hash-chaining, node decoding, or terminal matching.
    #[error("invalid proof: {0}")]
    ProofInvalid(ProofError),

    /// The proof walk required a node not present in the sequence.
    #[error("incomplete proof: walk requires a node not present in the sequence")]
    ProofIncomplete,

    /// The account proof proves the token account's absence. Fatal to the
    /// whole batch: there is no storage root to verify against.
    #[error("account {0} is not present in the state trie")]
    AccountNotFound(Address),

    /// A proven value could not be decoded into its expected shape.
    #[error("invalid proven value encoding: {0}")]
    ValueDecode(alloy_rlp::Error),

    /// A collaborator (proof or header source) failed or timed out. Retryable
    /// by the caller with backoff; never retried here.
    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(String),
}

impl From<ProofError> for VerifierError {
    fn from(err: ProofError) -> Self {
        match err {
            ProofError::MissingNode { .. } => Self::ProofIncomplete,
            other => Self::ProofInvalid(other),
        }
    }
}
