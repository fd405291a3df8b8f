//! Canonical block header encoding, decoding, and hashing.

use alloy_primitives::{Address, B64, B256, Bloom, Bytes, U256, keccak256};
use alloy_rlp::{Decodable, Encodable, RlpDecodable, RlpEncodable};

use crate::error::{VerifierError, VerifierResult};

/// A source-chain block header: the ordered 15-field canonical form.
///
/// The content hash of the canonical encoding is the trust anchor for every
/// proof verified against this header; see [`BlockHeader::seal`].
#[derive(Debug, Clone, Default, PartialEq, Eq, RlpEncodable, RlpDecodable)]
pub struct BlockHeader {
    /// Hash of the parent block's header.
    pub parent_hash: B256,
    /// Hash of the uncle headers list.
    pub ommers_hash: B256,
    /// Beneficiary (miner) address.
    pub beneficiary: Address,
    /// Root of the state trie after this block.
    pub state_root: B256,
    /// Root of the transactions trie.
    pub transactions_root: B256,
    /// Root of the receipts trie.
    pub receipts_root: B256,
    /// Bloom filter over the block's logs.
    pub logs_bloom: Bloom,
    /// Block difficulty.
    pub difficulty: U256,
    /// Block number.
    pub number: u64,
    /// Gas limit.
    pub gas_limit: u64,
    /// Gas used.
    pub gas_used: u64,
    /// Block timestamp.
    pub timestamp: u64,
    /// Arbitrary extra data.
    pub extra_data: Bytes,
    /// Mix hash.
    pub mix_hash: B256,
    /// Proof-of-work nonce.
    pub nonce: B64,
}

impl BlockHeader {
    /// Returns the canonical RLP encoding of the header.
    pub fn encoded(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.length());
        self.encode(&mut out);
        out
    }

    /// Computes the keccak digest of the canonical encoding.
    pub fn hash_slow(&self) -> B256 {
        keccak256(self.encoded())
    }

    /// Decodes a header from its canonical encoding.
    ///
    /// The inverse of [`BlockHeader::encoded`]: `decode(encode(h)) == h` for
    /// all valid headers. Fails with [`VerifierError::MalformedHeader`] on an
    /// invalid field count, nesting, or length prefix.
    pub fn decode_rlp(buf: &[u8]) -> VerifierResult<Self> {
        let mut b = buf;
        let header = Self::decode(&mut b).map_err(VerifierError::MalformedHeader)?;
        if !b.is_empty() {
            return Err(VerifierError::MalformedHeader(alloy_rlp::Error::UnexpectedLength));
        }
        Ok(header)
    }

    /// Seals the header against the chain-reported block hash.
    ///
    /// This is the anchor of the entire verification chain: a mismatch means
    /// the header cannot be trusted and fails with
    /// [`VerifierError::UntrustedHeader`].
    pub fn seal(self, claimed: B256) -> VerifierResult<SealedHeader> {
        let computed = self.hash_slow();
        if computed != claimed {
            return Err(VerifierError::UntrustedHeader { claimed, computed });
        }
        Ok(SealedHeader { hash: claimed, header: self })
    }
}

/// A header whose digest has been checked against the chain-reported hash.
///
/// Only a sealed header may anchor proof verification; its state root is
/// valid exclusively in the context of this header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedHeader {
    hash: B256,
    header: BlockHeader,
}

impl SealedHeader {
    /// The verified block hash.
    pub const fn hash(&self) -> B256 {
        self.hash
    }

    /// The underlying header.
    pub const fn header(&self) -> &BlockHeader {
        &self.header
    }

    /// The state root this header commits to.
    pub const fn state_root(&self) -> B256 {
        self.header.state_root
    }

    /// The block number.
    pub const fn number(&self) -> u64 {
        self.header.number
    }
}
