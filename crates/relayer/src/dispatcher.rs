//! Idempotent relay submission.
//!
//! Each submission is keyed by the proposal and a commitment to its voter
//! set. A payload that is already pending, submitted, or confirmed is never
//! sent again; the duplicate is reported to the operator instead. A failed
//! submission releases its key so the operator can retry explicitly.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use alloy_primitives::{Address, B256, U256};
use tracing::{info, warn};

use crate::{
    aggregator::Tally,
    contracts::VotingMachineClient,
    error::{RelayerError, RelayerResult},
};

/// Lifecycle of one relay submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    /// Reserved; the transaction has not been sent yet.
    Pending,
    /// The transaction was sent and accepted by the node.
    Submitted,
    /// The destination confirmed the relayed total.
    Confirmed,
    /// The transaction was rejected or could not be sent.
    Failed,
}

/// Identity of a relay payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmissionKey {
    /// The proposal being relayed.
    pub proposal_id: B256,
    /// Commitment to the sorted voter set.
    pub voter_set_hash: B256,
}

/// One tracked relay submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelaySubmission {
    /// The proposal being relayed.
    pub proposal_id: B256,
    /// The voting machine the payload was sent to.
    pub destination: Address,
    /// Commitment to the relayed voter set.
    pub payload_hash: B256,
    /// Current lifecycle state.
    pub status: SubmissionStatus,
    /// Transaction hash, once the payload has been sent.
    pub tx_hash: Option<B256>,
}

/// Dispatches relay submissions to the voting machine, at most once per
/// payload.
#[derive(Debug)]
pub struct RelayDispatcher<C> {
    client: Arc<C>,
    submissions: Mutex<HashMap<SubmissionKey, RelaySubmission>>,
}

impl<C: VotingMachineClient> RelayDispatcher<C> {
    /// Creates a dispatcher over the given voting machine client.
    pub fn new(client: Arc<C>) -> Self {
        Self { client, submissions: Mutex::new(HashMap::new()) }
    }

    /// Submits a tally to the voting machine.
    ///
    /// The attached value is checked against the budget before anything is
    /// sent. An in-flight or confirmed submission with the same key is
    /// reported as [`RelayerError::DuplicateSubmission`] and never resent;
    /// a previously failed key may be retried.
    pub async fn submit(
        &self,
        tally: &Tally,
        destination: Address,
        gas_budget: u64,
        value: U256,
        value_budget: U256,
    ) -> RelayerResult<RelaySubmission> {
        if value > value_budget {
            return Err(RelayerError::BudgetExceeded { value, budget: value_budget });
        }

        let key =
            SubmissionKey { proposal_id: tally.proposal_id, voter_set_hash: tally.voter_set_hash };

        // Reserve the key before sending so a concurrent submit of the same
        // payload observes it as in flight.
        {
            let mut submissions = self.submissions.lock().unwrap();
            if let Some(existing) = submissions.get(&key) {
                if existing.status != SubmissionStatus::Failed {
                    return Err(RelayerError::DuplicateSubmission {
                        proposal_id: key.proposal_id,
                        payload_hash: key.voter_set_hash,
                    });
                }
            }
            submissions.insert(key, RelaySubmission {
                proposal_id: tally.proposal_id,
                destination,
                payload_hash: tally.voter_set_hash,
                status: SubmissionStatus::Pending,
                tx_hash: None,
            });
        }

        let sent = self
            .client
            .relay_result(tally.proposal_id, tally.voters.clone(), gas_budget, value)
            .await;

        let mut submissions = self.submissions.lock().unwrap();
        let submission = submissions.get_mut(&key).expect("key was reserved before sending");
        match sent {
            Ok(tx_hash) => {
                submission.status = SubmissionStatus::Submitted;
                submission.tx_hash = Some(tx_hash);
                info!(
                    proposal_id = %key.proposal_id,
                    payload_hash = %key.voter_set_hash,
                    %tx_hash,
                    voters = tally.voters.len(),
                    "relay submitted"
                );
                Ok(submission.clone())
            }
            Err(error) => {
                submission.status = SubmissionStatus::Failed;
                warn!(
                    proposal_id = %key.proposal_id,
                    payload_hash = %key.voter_set_hash,
                    %error,
                    "relay submission failed"
                );
                Err(error)
            }
        }
    }

    /// Marks a submitted payload as confirmed.
    pub fn confirm(&self, key: &SubmissionKey) {
        if let Some(submission) = self.submissions.lock().unwrap().get_mut(key) {
            if submission.status == SubmissionStatus::Submitted {
                submission.status = SubmissionStatus::Confirmed;
            }
        }
    }

    /// Marks a submitted payload as failed, releasing the key for retry.
    pub fn mark_failed(&self, key: &SubmissionKey) {
        if let Some(submission) = self.submissions.lock().unwrap().get_mut(key) {
            submission.status = SubmissionStatus::Failed;
        }
    }

    /// Returns the tracked state for a payload, if any.
    pub fn status(&self, key: &SubmissionKey) -> Option<RelaySubmission> {
        self.submissions.lock().unwrap().get(key).cloned()
    }
}
