//! Concurrent per-voter proof verification.
//!
//! Weight extraction is embarrassingly parallel: each voter's proof depends
//! only on the previously resolved storage root. Proof retrieval is I/O-bound
//! and verification is CPU-bound hashing, so voters are processed by a
//! bounded worker pool with per-call timeouts and explicit cancellation.

use std::{fmt::Display, sync::Arc, time::Duration};

use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use tokio::{sync::Semaphore, task::JoinSet, time};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::{
    error::VerifierError,
    weight::{SlotLayout, StorageProof, extract_weight},
};

/// Supplies storage proof nodes for balance slots at the snapshot block.
///
/// This is the external collaborator boundary: implementations may fetch over
/// RPC and should apply their own bounded retry. Failures surface as
/// [`VerifierError::CollaboratorUnavailable`] in the per-voter result.
#[async_trait]
pub trait StorageProofSource: Send + Sync {
    /// The error type for proof retrieval.
    type Error: Display + Send;

    /// Fetches the ordered trie nodes proving `slot` under the token's
    /// storage root at the snapshot block.
    async fn storage_proof(&self, slot: B256) -> Result<Vec<Bytes>, Self::Error>;
}

/// The outcome of verifying one voter's balance proof.
///
/// A batch reports every voter, success or failure, so a single bad proof
/// never blocks aggregation of the voters that verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterResult {
    /// The voter whose balance slot was verified.
    pub voter: Address,
    /// The derived balance slot.
    pub slot: B256,
    /// The verified weight, or the failure kind.
    pub outcome: Result<U256, VerifierError>,
}

/// Verifies many voters' storage proofs concurrently under one storage root.
#[derive(Debug)]
pub struct BatchVerifier {
    concurrency: usize,
    timeout: Duration,
    cancel: CancellationToken,
}

impl BatchVerifier {
    /// Creates a batch verifier with the given worker bound and per-fetch
    /// timeout.
    pub fn new(concurrency: usize, timeout: Duration) -> Self {
        Self { concurrency: concurrency.max(1), timeout, cancel: CancellationToken::new() }
    }

    /// Returns a token that cancels all in-flight proof fetches.
    ///
    /// Cancellation is per-voter atomic: a cancelled voter reports a
    /// collaborator failure and contributes no weight, while voters that
    /// already completed keep their results.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fetches and verifies every voter's balance slot concurrently.
    ///
    /// The caller must have resolved `storage_root` from a sealed header
    /// before calling this: header and account resolution are a strict
    /// ordering barrier ahead of any per-voter work. Results are returned
    /// sorted by voter address so identical inputs produce identical output
    /// regardless of completion order.
    pub async fn extract_weights<S>(
        &self,
        source: Arc<S>,
        storage_root: B256,
        layout: SlotLayout,
        voters: &[Address],
    ) -> Vec<VoterResult>
    where
        S: StorageProofSource + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();

        for &voter in voters {
            let source = Arc::clone(&source);
            let semaphore = Arc::clone(&semaphore);
            let cancel = self.cancel.clone();
            let timeout = self.timeout;

            set.spawn(async move {
                let _permit =
                    semaphore.acquire_owned().await.expect("semaphore is never closed");
                let slot = layout.balance_slot(voter);
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(VerifierError::CollaboratorUnavailable(
                        "verification batch cancelled".to_string(),
                    )),
                    fetched = time::timeout(timeout, source.storage_proof(slot)) => {
                        match fetched {
                            Err(_) => Err(VerifierError::CollaboratorUnavailable(format!(
                                "storage proof fetch timed out after {timeout:?}"
                            ))),
                            Ok(Err(e)) => {
                                Err(VerifierError::CollaboratorUnavailable(e.to_string()))
                            }
                            Ok(Ok(nodes)) => {
                                extract_weight(storage_root, &StorageProof { slot, proof: nodes })
                            }
                        }
                    }
                };
                VoterResult { voter, slot, outcome }
            });
        }

        let mut results = Vec::with_capacity(voters.len());
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(result) => {
                    match &result.outcome {
                        Ok(weight) => {
                            debug!(voter = %result.voter, %weight, "voter proof verified");
                        }
                        Err(error) => {
                            warn!(voter = %result.voter, %error, "voter proof verification failed");
                        }
                    }
                    results.push(result);
                }
                Err(error) => warn!(%error, "verification worker terminated abnormally"),
            }
        }

        results.sort_by_key(|result| result.voter);
        results
    }
}
