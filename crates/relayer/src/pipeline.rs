//! End-to-end relay flows.
//!
//! Every flow starts the same way: fetch the snapshot header, recompute its
//! hash, prove the token account under the sealed state root, and only then
//! touch per-voter storage proofs. Header and account resolution are a strict
//! ordering barrier; no storage proof is examined against an unverified root.

use std::sync::Arc;

use alloy_primitives::{Address, B256, Bytes, U256};
use async_trait::async_trait;
use num_bigint::BigUint;
use tracing::{debug, info, warn};
use vote_relay_verifier::{
    BatchVerifier, SealedHeader, StorageProof, StorageProofSource, extract_weight,
    resolve_storage_root,
};

use crate::{
    aggregator::{VoteAggregator, VoteRecord},
    config::RelayConfig,
    contracts::{GovernorClient, ProofVote, VotingMachineClient, encode_account_proof},
    dispatcher::{RelayDispatcher, RelaySubmission, SubmissionKey},
    error::RelayerResult,
    rpc::{ProofBundle, RpcError, SourceChain},
};

/// Adapts the source-chain proof endpoint to the per-slot interface the
/// batch verifier consumes.
struct SlotProofSource<S> {
    source: Arc<S>,
    token: Address,
    block_number: u64,
}

#[async_trait]
impl<S: SourceChain> StorageProofSource for SlotProofSource<S> {
    type Error = RpcError;

    async fn storage_proof(&self, slot: B256) -> Result<Vec<Bytes>, RpcError> {
        let bundle = self.source.proof(self.token, vec![slot], self.block_number).await?;
        let entry = bundle
            .storage
            .into_iter()
            .next()
            .ok_or_else(|| RpcError::ProofNotFound(format!("no storage proof for slot {slot}")))?;
        Ok(entry.proof)
    }
}

/// Drives votes from the source chain to the destination voting machine.
pub struct RelayPipeline<S, G, V> {
    source: Arc<S>,
    governor: G,
    voting_machine: Arc<V>,
    dispatcher: RelayDispatcher<V>,
    aggregator: VoteAggregator,
    config: RelayConfig,
}

impl<S, G, V> RelayPipeline<S, G, V>
where
    S: SourceChain + 'static,
    G: GovernorClient,
    V: VotingMachineClient,
{
    /// Creates a pipeline over the given collaborators. The configuration is
    /// validated up front.
    pub fn new(
        source: Arc<S>,
        governor: G,
        voting_machine: Arc<V>,
        config: RelayConfig,
    ) -> RelayerResult<Self> {
        config.validate()?;
        Ok(Self {
            source,
            governor,
            dispatcher: RelayDispatcher::new(Arc::clone(&voting_machine)),
            voting_machine,
            aggregator: VoteAggregator::new(),
            config,
        })
    }

    /// Returns the vote aggregator.
    pub fn aggregator(&self) -> &VoteAggregator {
        &self.aggregator
    }

    /// Returns the relay dispatcher.
    pub fn dispatcher(&self) -> &RelayDispatcher<V> {
        &self.dispatcher
    }

    /// Fetches and seals the header at `block_number`, then proves the token
    /// account under its state root.
    ///
    /// Returns the sealed header, the fetched proof bundle, and the token's
    /// verified storage root.
    pub async fn resolve_snapshot_root(
        &self,
        block_number: u64,
    ) -> RelayerResult<(SealedHeader, ProofBundle, B256)> {
        let (header, claimed_hash) = self.source.header_by_number(block_number).await?;
        let sealed = header.seal(claimed_hash)?;

        let bundle = self.source.proof(self.config.token, Vec::new(), block_number).await?;
        let storage_root = resolve_storage_root(&sealed, &bundle.account)?;

        debug!(
            block_number,
            block_hash = %sealed.hash(),
            token = %self.config.token,
            %storage_root,
            "resolved snapshot storage root"
        );

        Ok((sealed, bundle, storage_root))
    }

    /// Verifies every voter's weight at the proposal's snapshot block,
    /// aggregates the verified weights, and dispatches the tally to the
    /// voting machine.
    ///
    /// Voters whose proofs fail are excluded from the tally and logged; they
    /// never abort the batch.
    pub async fn relay_votes(
        &self,
        proposal_id: B256,
        voters: &[Address],
    ) -> RelayerResult<RelaySubmission> {
        let snapshot_block =
            self.governor.proposal_snapshot(U256::from_be_bytes(proposal_id.0)).await?;
        let (_, _, storage_root) = self.resolve_snapshot_root(snapshot_block).await?;

        let verifier = BatchVerifier::new(self.config.concurrency, self.config.rpc_timeout);
        let proof_source = Arc::new(SlotProofSource {
            source: Arc::clone(&self.source),
            token: self.config.token,
            block_number: snapshot_block,
        });
        let results = verifier
            .extract_weights(proof_source, storage_root, self.config.slot_layout, voters)
            .await;

        for result in results {
            match result.outcome {
                Ok(weight) => self.aggregator.add_vote(VoteRecord {
                    proposal_id,
                    voter: result.voter,
                    weight,
                    slot: result.slot,
                    snapshot_block,
                }),
                Err(error) => {
                    warn!(voter = %result.voter, %error, "excluding voter from tally");
                }
            }
        }

        let tally = self.aggregator.tally(proposal_id);
        info!(
            %proposal_id,
            snapshot_block,
            voters = tally.voters.len(),
            total = %tally.total,
            "dispatching relay"
        );

        self.dispatcher
            .submit(
                &tally,
                self.config.voting_machine,
                self.config.gas_budget,
                self.config.relay_value,
                self.config.value_budget,
            )
            .await
    }

    /// Publishes the token's storage root for `block_number` to the voting
    /// machine, verifying it locally first.
    pub async fn publish_root(&self, block_number: u64) -> RelayerResult<B256> {
        let (sealed, bundle, storage_root) = self.resolve_snapshot_root(block_number).await?;
        info!(block_number, %storage_root, "publishing storage root");

        let header_rlp = Bytes::from(sealed.header().encoded());
        let account_proof = encode_account_proof(&bundle.account.proof);
        self.voting_machine
            .process_storage_root(self.config.token, block_number, header_rlp, account_proof)
            .await
    }

    /// Casts a single proven vote on the voting machine, verifying the proof
    /// locally before sending it.
    pub async fn submit_vote_with_proof(
        &self,
        proposal_id: B256,
        voter: Address,
    ) -> RelayerResult<B256> {
        let snapshot_block =
            self.governor.proposal_snapshot(U256::from_be_bytes(proposal_id.0)).await?;
        let (_, _, storage_root) = self.resolve_snapshot_root(snapshot_block).await?;

        let slot = self.config.slot_layout.balance_slot(voter);
        let bundle = self.source.proof(self.config.token, vec![slot], snapshot_block).await?;
        let storage = bundle
            .storage
            .into_iter()
            .next()
            .unwrap_or(StorageProof { slot, proof: Vec::new() });

        let weight = extract_weight(storage_root, &storage)?;
        debug!(%voter, %weight, snapshot_block, "proven vote verified locally");

        self.voting_machine
            .vote_with_proof(ProofVote {
                proposal_id,
                snapshot_block,
                token: self.config.token,
                voter,
                slot: U256::from_be_bytes(slot.0),
                proof: encode_account_proof(&storage.proof),
            })
            .await
    }

    /// Reads back the destination's recorded total for a proposal and
    /// compares it against the local tally. On a match the tracked
    /// submission is marked confirmed.
    pub async fn confirm_relay(&self, proposal_id: B256) -> RelayerResult<bool> {
        let tally = self.aggregator.tally(proposal_id);
        let recorded = self.voting_machine.total_votes(proposal_id).await?;
        let matches = BigUint::from_bytes_be(&recorded.to_be_bytes::<32>()) == tally.total;

        if matches {
            self.dispatcher.confirm(&SubmissionKey {
                proposal_id,
                voter_set_hash: tally.voter_set_hash,
            });
        } else {
            warn!(%proposal_id, %recorded, local = %tally.total, "relayed total mismatch");
        }

        Ok(matches)
    }
}
