use alloy_provider::RootProvider;

/// Shared type alias for the source-chain HTTP provider.
/// Uses `RootProvider` directly since the relayer only performs read
/// operations against the source chain.
pub type HttpProvider = RootProvider;

mod error;
mod source;

pub use error::{RpcError, RpcResult};
pub use source::{ProofBundle, SourceChain, SourceChainClient, SourceChainConfig};
