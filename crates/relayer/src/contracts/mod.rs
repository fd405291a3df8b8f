//! Destination-chain contract bindings.
//!
//! The governor exposes proposal metadata (in particular the snapshot block
//! each proposal reads balances at). The voting machine accepts published
//! storage roots, individual proven votes, and aggregated relay results.

mod governor;
mod voting_machine;

pub use governor::{GovernorClient, GovernorContractClient};
pub use voting_machine::{
    ProofVote, VotingMachineClient, VotingMachineContractClient, encode_account_proof,
    encode_process_storage_root_calldata, encode_relay_result_calldata,
    encode_vote_with_proof_calldata,
};
