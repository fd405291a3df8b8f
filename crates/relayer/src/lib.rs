//! Cross-chain governance vote aggregation and relay dispatch.
//!
//! Relays governance votes from a source chain to a destination voting
//! contract without requiring voters to transact on the destination chain.
//! Voting weight is proven with storage proofs verified by
//! `vote-relay-verifier`; this crate aggregates the verified weights into a
//! deduplicated tally and dispatches it idempotently.
//!
//! # Components
//!
//! - [`aggregator`]: deduplicated, order-independent vote tallying
//! - [`dispatcher`]: idempotent relay submission with gas/value budgets
//! - [`rpc`]: source-chain header and proof retrieval
//! - [`contracts`]: governor and voting-machine bindings
//! - [`pipeline`]: end-to-end relay flows tying the above together

pub mod aggregator;
pub use aggregator::{Tally, VoteAggregator, VoteRecord, hash_voter_set};

pub mod config;
pub use config::{ConfigError, RelayConfig, RetryConfig, validate_url};

pub mod contracts;
pub use contracts::{
    GovernorClient, GovernorContractClient, ProofVote, VotingMachineClient,
    VotingMachineContractClient, encode_account_proof, encode_process_storage_root_calldata,
    encode_relay_result_calldata, encode_vote_with_proof_calldata,
};

pub mod dispatcher;
pub use dispatcher::{RelayDispatcher, RelaySubmission, SubmissionKey, SubmissionStatus};

pub mod error;
pub use error::{RelayerError, RelayerResult};

pub mod pipeline;
pub use pipeline::RelayPipeline;

pub mod rpc;
pub use rpc::{
    ProofBundle, RpcError, RpcResult, SourceChain, SourceChainClient, SourceChainConfig,
};
