//! Source-chain RPC client implementation.

use std::time::Duration;

use alloy_eips::BlockNumberOrTag;
use alloy_primitives::{Address, B256};
use alloy_provider::{Provider, RootProvider};
use alloy_rpc_client::RpcClient;
use alloy_rpc_types_eth::BlockId;
use alloy_transport_http::{Http, reqwest::Client};
use async_trait::async_trait;
use backon::Retryable;
use url::Url;
use vote_relay_verifier::{AccountProof, BlockHeader, StorageProof};

use super::{
    HttpProvider,
    error::{RpcError, RpcResult},
};
use crate::config::RetryConfig;

/// Account and storage proofs fetched for one account at one block.
#[derive(Debug, Clone)]
pub struct ProofBundle {
    /// The account proof against the block's state root.
    pub account: AccountProof,
    /// Storage proofs in the order the slots were requested.
    pub storage: Vec<StorageProof>,
}

/// Read access to the source chain.
#[async_trait]
pub trait SourceChain: Send + Sync {
    /// Fetches the header at the given block number along with the hash the
    /// node claims for it. The claimed hash is recomputed locally before the
    /// header is trusted.
    async fn header_by_number(&self, number: u64) -> RpcResult<(BlockHeader, B256)>;

    /// Fetches the account proof and storage proofs for the given slots at
    /// the given block.
    async fn proof(
        &self,
        address: Address,
        slots: Vec<B256>,
        block_number: u64,
    ) -> RpcResult<ProofBundle>;
}

/// Configuration for the source-chain client.
#[derive(Debug, Clone)]
pub struct SourceChainConfig {
    /// RPC endpoint URL.
    pub endpoint: Url,
    /// Request timeout.
    pub timeout: Duration,
    /// Retry configuration.
    pub retry_config: RetryConfig,
}

impl SourceChainConfig {
    /// Creates a new source-chain configuration with defaults.
    pub fn new(endpoint: Url) -> Self {
        Self { endpoint, timeout: Duration::from_secs(30), retry_config: RetryConfig::default() }
    }

    /// Sets the request timeout.
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }
}

/// Source-chain RPC client implementation using Alloy.
#[derive(Debug)]
pub struct SourceChainClient {
    /// The underlying HTTP provider.
    provider: HttpProvider,
    /// Retry configuration.
    retry_config: RetryConfig,
}

impl SourceChainClient {
    /// Creates a new source-chain client from the given configuration.
    pub fn new(config: SourceChainConfig) -> RpcResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RpcError::Connection(format!("Failed to build HTTP client: {e}")))?;

        let http = Http::with_client(client, config.endpoint);
        let rpc_client = RpcClient::new(http, false);

        // No fillers; all operations are read-only.
        let provider = RootProvider::new(rpc_client);

        Ok(Self { provider, retry_config: config.retry_config })
    }
}

#[async_trait]
impl SourceChain for SourceChainClient {
    async fn header_by_number(&self, number: u64) -> RpcResult<(BlockHeader, B256)> {
        let block_id: BlockId = BlockNumberOrTag::Number(number).into();

        let backoff = self.retry_config.to_backoff_builder();

        let block = (|| async { self.provider.get_block(block_id).await.map_err(RpcError::from) })
            .retry(backoff)
            .when(|e| e.is_retryable())
            .notify(|err, dur| {
                tracing::debug!(error = %err, delay = ?dur, "Retrying SourceChain::header_by_number");
            })
            .await?
            .ok_or_else(|| RpcError::BlockNotFound(format!("Block not found for {block_id:?}")))?;

        let hash = block.header.hash;
        let header = BlockHeader {
            parent_hash: block.header.parent_hash,
            ommers_hash: block.header.ommers_hash,
            beneficiary: block.header.beneficiary,
            state_root: block.header.state_root,
            transactions_root: block.header.transactions_root,
            receipts_root: block.header.receipts_root,
            logs_bloom: block.header.logs_bloom,
            difficulty: block.header.difficulty,
            number: block.header.number,
            gas_limit: block.header.gas_limit,
            gas_used: block.header.gas_used,
            timestamp: block.header.timestamp,
            extra_data: block.header.extra_data.clone(),
            mix_hash: block.header.mix_hash,
            nonce: block.header.nonce,
        };

        Ok((header, hash))
    }

    async fn proof(
        &self,
        address: Address,
        slots: Vec<B256>,
        block_number: u64,
    ) -> RpcResult<ProofBundle> {
        let block_id = BlockId::Number(BlockNumberOrTag::Number(block_number));

        let backoff = self.retry_config.to_backoff_builder();

        let response = (|| async {
            self.provider
                .get_proof(address, slots.clone())
                .block_id(block_id)
                .await
                .map_err(RpcError::from)
        })
        .retry(backoff)
        .when(|e| e.is_retryable())
        .notify(|err, dur| {
            tracing::debug!(error = %err, delay = ?dur, "Retrying SourceChain::proof");
        })
        .await?;

        if response.storage_proof.len() != slots.len() {
            return Err(RpcError::InvalidResponse(format!(
                "requested {} storage proofs, got {}",
                slots.len(),
                response.storage_proof.len()
            )));
        }

        let account = AccountProof {
            address,
            nonce: response.nonce,
            balance: response.balance,
            storage_root: response.storage_hash,
            code_hash: response.code_hash,
            proof: response.account_proof,
        };

        // Pair returned proofs with the requested slots in request order
        // rather than trusting the response keys.
        let storage = slots
            .into_iter()
            .zip(response.storage_proof)
            .map(|(slot, entry)| StorageProof { slot, proof: entry.proof })
            .collect();

        Ok(ProofBundle { account, storage })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_chain_config_defaults() {
        let config = SourceChainConfig::new(Url::parse("http://localhost:8545").unwrap());
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry_config.max_attempts, 5);
    }

    #[test]
    fn test_source_chain_config_builder() {
        let config = SourceChainConfig::new(Url::parse("http://localhost:8545").unwrap())
            .with_timeout(Duration::from_secs(60));
        assert_eq!(config.timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_client_construction() {
        let config = SourceChainConfig::new(Url::parse("http://localhost:8545").unwrap());
        assert!(SourceChainClient::new(config).is_ok());
    }
}
