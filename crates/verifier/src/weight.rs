//! Voting-weight extraction from verified storage slots.

use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_rlp::Decodable;
use vote_relay_mpt::process_proof;

use crate::error::{VerifierError, VerifierResult};

/// How a token contract derives the storage slot of a holder's balance from
/// the mapping's base slot.
///
/// Different token contracts lay out balances differently; the convention is
/// a configuration input and must be confirmed against the specific token
/// contract in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotDerivation {
    /// Solidity mapping layout: `keccak256(pad32(holder) ++ pad32(base))`.
    AddressThenSlot,
    /// Vyper mapping layout: `keccak256(pad32(base) ++ pad32(holder))`.
    SlotThenAddress,
}

/// Balance-mapping layout for a token contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLayout {
    /// The declared base slot of the balance mapping.
    pub base_slot: U256,
    /// The slot-derivation convention.
    pub derivation: SlotDerivation,
}

impl SlotLayout {
    /// A solidity-style layout rooted at `base_slot`.
    pub const fn solidity(base_slot: U256) -> Self {
        Self { base_slot, derivation: SlotDerivation::AddressThenSlot }
    }

    /// A vyper-style layout rooted at `base_slot`.
    pub const fn vyper(base_slot: U256) -> Self {
        Self { base_slot, derivation: SlotDerivation::SlotThenAddress }
    }

    /// Returns the storage slot holding `holder`'s balance.
    pub fn balance_slot(&self, holder: Address) -> B256 {
        let mut buf = [0u8; 64];
        match self.derivation {
            SlotDerivation::AddressThenSlot => {
                buf[12..32].copy_from_slice(holder.as_slice());
                buf[32..64].copy_from_slice(&self.base_slot.to_be_bytes::<32>());
            }
            SlotDerivation::SlotThenAddress => {
                buf[0..32].copy_from_slice(&self.base_slot.to_be_bytes::<32>());
                buf[44..64].copy_from_slice(holder.as_slice());
            }
        }
        keccak256(buf)
    }
}

/// A storage inclusion proof for a single slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageProof {
    /// The (derived) storage slot being proven.
    pub slot: B256,
    /// Ordered trie nodes from the storage root to the slot's leaf.
    pub proof: Vec<Bytes>,
}

/// Resolves a balance slot under a verified storage root and decodes it into
/// a voting weight.
///
/// The storage trie key is the keccak digest of the 32-byte big-endian slot.
/// Proven absence yields weight zero: a voter with no balance is a valid
/// zero-weight vote, not an error.
pub fn extract_weight(storage_root: B256, proof: &StorageProof) -> VerifierResult<U256> {
    let key = keccak256(proof.slot);
    match process_proof(storage_root, key, &proof.proof)? {
        None => Ok(U256::ZERO),
        Some(proven) => {
            U256::decode(&mut proven.as_ref()).map_err(VerifierError::ValueDecode)
        }
    }
}
