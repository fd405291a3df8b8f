//! Error types for the relayer.

use alloy_primitives::{B256, U256};
use thiserror::Error;
use vote_relay_verifier::VerifierError;

use crate::rpc::RpcError;

/// A [Result] type alias where the error is [`RelayerError`].
pub type RelayerResult<T> = Result<T, RelayerError>;

/// Main error type for relay operations.
#[derive(Debug, Error)]
pub enum RelayerError {
    /// Source-chain RPC error.
    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    /// Proof verification error.
    #[error("verification error: {0}")]
    Verifier(#[from] VerifierError),

    /// Contract interaction error.
    #[error("contract error: {0}")]
    Contract(String),

    /// An identical payload is already pending or submitted. Reported to the
    /// operator, never auto-corrected.
    #[error("duplicate submission for proposal {proposal_id}: payload {payload_hash} is already in flight")]
    DuplicateSubmission {
        /// The proposal being relayed.
        proposal_id: B256,
        /// Hash of the in-flight payload.
        payload_hash: B256,
    },

    /// The attached value exceeds the configured budget. Reported to the
    /// operator, never auto-corrected.
    #[error("budget exceeded: attached value {value} exceeds budget {budget}")]
    BudgetExceeded {
        /// The value attached to the submission.
        value: U256,
        /// The configured value budget.
        budget: U256,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}
