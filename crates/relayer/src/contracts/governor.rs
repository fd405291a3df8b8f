//! Governor contract bindings.
//!
//! Used to look up the snapshot block a proposal reads voting weight at.

use alloy_primitives::{Address, U256};
use alloy_provider::RootProvider;
use alloy_sol_types::sol;
use async_trait::async_trait;

use crate::RelayerError;

sol! {
    /// Governor contract interface.
    #[sol(rpc)]
    interface IGovernor {
        /// Returns the block number at which voting weight is snapshotted
        /// for the given proposal.
        function proposalSnapshot(uint256 proposalId) external view returns (uint256);
    }
}

/// Async trait for reading proposal metadata from the governor.
#[async_trait]
pub trait GovernorClient: Send + Sync {
    /// Returns the snapshot block number for the given proposal.
    async fn proposal_snapshot(&self, proposal_id: U256) -> Result<u64, RelayerError>;
}

/// Concrete implementation backed by Alloy's sol-generated contract bindings.
#[allow(missing_debug_implementations)]
pub struct GovernorContractClient {
    contract: IGovernor::IGovernorInstance<RootProvider>,
}

impl GovernorContractClient {
    /// Creates a new client for the given contract address and RPC URL.
    pub fn new(address: Address, rpc_url: url::Url) -> Self {
        let provider = RootProvider::new_http(rpc_url);
        let contract = IGovernor::IGovernorInstance::new(address, provider);
        Self { contract }
    }
}

#[async_trait]
impl GovernorClient for GovernorContractClient {
    async fn proposal_snapshot(&self, proposal_id: U256) -> Result<u64, RelayerError> {
        let result = self
            .contract
            .proposalSnapshot(proposal_id)
            .call()
            .await
            .map_err(|e| RelayerError::Contract(format!("proposalSnapshot failed: {e}")))?;

        result
            .try_into()
            .map_err(|_| RelayerError::Contract("proposalSnapshot overflows u64".to_string()))
    }
}
