//! Voting machine contract bindings.
//!
//! The voting machine lives on the destination chain. It accepts published
//! storage roots, individual votes proven against those roots, and aggregated
//! relay results covering many voters at once.

use alloy_primitives::{Address, B256, Bytes, U256};
use alloy_provider::RootProvider;
use alloy_sol_types::{SolCall, sol};
use async_trait::async_trait;

use crate::RelayerError;

sol! {
    /// Voting machine contract interface.
    #[sol(rpc)]
    interface IVotingMachine {
        /// Submits an aggregated relay result for the given voter set.
        function relayResult(
            bytes32 proposalId,
            address[] calldata voters,
            uint256 gasLimit
        ) external payable;

        /// Casts a single vote proven against a published storage root.
        function voteWithProof(
            bytes32 proposalId,
            uint256 snapshotBlock,
            address token,
            address voter,
            uint256 slot,
            bytes calldata proof
        ) external;

        /// Publishes an account's storage root for a block, verified on
        /// chain against the supplied header and account proof.
        function processStorageRoot(
            address account,
            uint256 blockNumber,
            bytes calldata blockHeaderRLP,
            bytes calldata accountProof
        ) external;

        /// Returns the recorded weight of a voter on a proposal.
        function voteWeight(bytes32 proposalId, address voter) external view returns (uint256);

        /// Returns the total recorded weight on a proposal.
        function totalVotes(bytes32 proposalId) external view returns (uint256);
    }
}

/// A single vote to be proven on chain.
#[derive(Debug, Clone)]
pub struct ProofVote {
    /// The proposal being voted on.
    pub proposal_id: B256,
    /// The snapshot block the weight is read at.
    pub snapshot_block: u64,
    /// The governance token on the source chain.
    pub token: Address,
    /// The voter whose balance is proven.
    pub voter: Address,
    /// The derived storage slot holding the voter's balance.
    pub slot: U256,
    /// RLP-encoded storage proof node list.
    pub proof: Bytes,
}

/// Async trait for interacting with the voting machine.
#[async_trait]
pub trait VotingMachineClient: Send + Sync {
    /// Submits an aggregated relay result. Returns the transaction hash.
    async fn relay_result(
        &self,
        proposal_id: B256,
        voters: Vec<Address>,
        gas_limit: u64,
        value: U256,
    ) -> Result<B256, RelayerError>;

    /// Casts a single proven vote. Returns the transaction hash.
    async fn vote_with_proof(&self, vote: ProofVote) -> Result<B256, RelayerError>;

    /// Publishes a storage root. Returns the transaction hash.
    async fn process_storage_root(
        &self,
        account: Address,
        block_number: u64,
        header_rlp: Bytes,
        account_proof: Bytes,
    ) -> Result<B256, RelayerError>;

    /// Returns the recorded weight of a voter on a proposal.
    async fn vote_weight(&self, proposal_id: B256, voter: Address) -> Result<U256, RelayerError>;

    /// Returns the total recorded weight on a proposal.
    async fn total_votes(&self, proposal_id: B256) -> Result<U256, RelayerError>;
}

/// Concrete implementation backed by Alloy's sol-generated contract bindings.
///
/// Transactions are signed by the node managing the configured endpoint.
#[allow(missing_debug_implementations)]
pub struct VotingMachineContractClient {
    contract: IVotingMachine::IVotingMachineInstance<RootProvider>,
}

impl VotingMachineContractClient {
    /// Creates a new client for the given contract address and RPC URL.
    pub fn new(address: Address, rpc_url: url::Url) -> Self {
        let provider = RootProvider::new_http(rpc_url);
        let contract = IVotingMachine::IVotingMachineInstance::new(address, provider);
        Self { contract }
    }
}

#[async_trait]
impl VotingMachineClient for VotingMachineContractClient {
    async fn relay_result(
        &self,
        proposal_id: B256,
        voters: Vec<Address>,
        gas_limit: u64,
        value: U256,
    ) -> Result<B256, RelayerError> {
        let pending = self
            .contract
            .relayResult(proposal_id, voters, U256::from(gas_limit))
            .value(value)
            .gas(gas_limit)
            .send()
            .await
            .map_err(|e| RelayerError::Contract(format!("relayResult failed: {e}")))?;

        Ok(*pending.tx_hash())
    }

    async fn vote_with_proof(&self, vote: ProofVote) -> Result<B256, RelayerError> {
        let pending = self
            .contract
            .voteWithProof(
                vote.proposal_id,
                U256::from(vote.snapshot_block),
                vote.token,
                vote.voter,
                vote.slot,
                vote.proof,
            )
            .send()
            .await
            .map_err(|e| RelayerError::Contract(format!("voteWithProof failed: {e}")))?;

        Ok(*pending.tx_hash())
    }

    async fn process_storage_root(
        &self,
        account: Address,
        block_number: u64,
        header_rlp: Bytes,
        account_proof: Bytes,
    ) -> Result<B256, RelayerError> {
        let pending = self
            .contract
            .processStorageRoot(account, U256::from(block_number), header_rlp, account_proof)
            .send()
            .await
            .map_err(|e| RelayerError::Contract(format!("processStorageRoot failed: {e}")))?;

        Ok(*pending.tx_hash())
    }

    async fn vote_weight(&self, proposal_id: B256, voter: Address) -> Result<U256, RelayerError> {
        self.contract
            .voteWeight(proposal_id, voter)
            .call()
            .await
            .map_err(|e| RelayerError::Contract(format!("voteWeight failed: {e}")))
    }

    async fn total_votes(&self, proposal_id: B256) -> Result<U256, RelayerError> {
        self.contract
            .totalVotes(proposal_id)
            .call()
            .await
            .map_err(|e| RelayerError::Contract(format!("totalVotes failed: {e}")))
    }
}

/// RLP-encodes a proof node list into the single `bytes` argument the voting
/// machine expects for account and storage proofs.
pub fn encode_account_proof(nodes: &[Bytes]) -> Bytes {
    Bytes::from(alloy_rlp::encode(nodes.to_vec()))
}

/// Encodes the calldata for `VotingMachine.relayResult()`.
pub fn encode_relay_result_calldata(proposal_id: B256, voters: &[Address], gas_limit: u64) -> Bytes {
    let call = IVotingMachine::relayResultCall {
        proposalId: proposal_id,
        voters: voters.to_vec(),
        gasLimit: U256::from(gas_limit),
    };
    Bytes::from(call.abi_encode())
}

/// Encodes the calldata for `VotingMachine.voteWithProof()`.
pub fn encode_vote_with_proof_calldata(vote: &ProofVote) -> Bytes {
    let call = IVotingMachine::voteWithProofCall {
        proposalId: vote.proposal_id,
        snapshotBlock: U256::from(vote.snapshot_block),
        token: vote.token,
        voter: vote.voter,
        slot: vote.slot,
        proof: vote.proof.clone(),
    };
    Bytes::from(call.abi_encode())
}

/// Encodes the calldata for `VotingMachine.processStorageRoot()`.
pub fn encode_process_storage_root_calldata(
    account: Address,
    block_number: u64,
    header_rlp: Bytes,
    account_proof: Bytes,
) -> Bytes {
    let call = IVotingMachine::processStorageRootCall {
        account,
        blockNumber: U256::from(block_number),
        blockHeaderRLP: header_rlp,
        accountProof: account_proof,
    };
    Bytes::from(call.abi_encode())
}

#[cfg(test)]
mod tests {
    use alloy_rlp::Decodable;

    use super::*;

    fn sample_vote() -> ProofVote {
        ProofVote {
            proposal_id: B256::repeat_byte(0x11),
            snapshot_block: 100,
            token: Address::repeat_byte(0x70),
            voter: Address::repeat_byte(0xaa),
            slot: U256::from(7u64),
            proof: Bytes::from(vec![0xc0]),
        }
    }

    #[test]
    fn test_encode_account_proof_round_trips() {
        let nodes = vec![Bytes::from(vec![0x01, 0x02]), Bytes::from(vec![0x03])];
        let encoded = encode_account_proof(&nodes);

        let decoded = Vec::<Bytes>::decode(&mut encoded.as_ref()).unwrap();
        assert_eq!(decoded, nodes);
    }

    #[test]
    fn test_encode_account_proof_empty_list() {
        let encoded = encode_account_proof(&[]);
        assert_eq!(encoded.as_ref(), &[0xc0]);
    }

    #[test]
    fn test_relay_result_calldata_has_selector() {
        let calldata = encode_relay_result_calldata(
            B256::repeat_byte(0x11),
            &[Address::repeat_byte(0xaa), Address::repeat_byte(0xbb)],
            1_000_000,
        );
        assert_eq!(&calldata[..4], &IVotingMachine::relayResultCall::SELECTOR);
    }

    #[test]
    fn test_vote_with_proof_calldata_has_selector() {
        let calldata = encode_vote_with_proof_calldata(&sample_vote());
        assert_eq!(&calldata[..4], &IVotingMachine::voteWithProofCall::SELECTOR);
    }

    #[test]
    fn test_process_storage_root_calldata_has_selector() {
        let calldata = encode_process_storage_root_calldata(
            Address::repeat_byte(0x70),
            100,
            Bytes::from(vec![0xf8, 0x00]),
            Bytes::from(vec![0xc0]),
        );
        assert_eq!(&calldata[..4], &IVotingMachine::processStorageRootCall::SELECTOR);
    }
}
