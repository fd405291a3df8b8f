//! Token account resolution against a sealed header's state root.

use alloy_primitives::{Address, B256, Bytes, U256, keccak256};
use alloy_rlp::Encodable;
use alloy_trie::TrieAccount;
use vote_relay_mpt::process_proof;

use crate::{
    error::{VerifierError, VerifierResult},
    header::SealedHeader,
};

/// An account inclusion proof, as supplied by the source chain's
/// `eth_getProof`: the claimed account state plus the ordered trie nodes
/// proving it under the state root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountProof {
    /// The account's address.
    pub address: Address,
    /// Claimed account nonce.
    pub nonce: u64,
    /// Claimed account balance.
    pub balance: U256,
    /// Claimed root of the account's storage trie.
    pub storage_root: B256,
    /// Claimed hash of the account's code.
    pub code_hash: B256,
    /// Ordered trie nodes from the state root to the account leaf.
    pub proof: Vec<Bytes>,
}

impl AccountProof {
    /// RLP-encodes the claimed account state, the expected trie value.
    pub fn encoded_account(&self) -> Vec<u8> {
        let account = TrieAccount {
            nonce: self.nonce,
            balance: self.balance,
            storage_root: self.storage_root,
            code_hash: self.code_hash,
        };
        let mut out = Vec::with_capacity(account.length());
        account.encode(&mut out);
        out
    }
}

/// Derives the token contract's storage root from a verified account proof.
///
/// The account trie key is the keccak digest of the address. The proof must
/// place the claimed account state under the sealed header's state root;
/// proven absence of the account is [`VerifierError::AccountNotFound`], which
/// is fatal to the whole batch.
pub fn resolve_storage_root(
    header: &SealedHeader,
    proof: &AccountProof,
) -> VerifierResult<B256> {
    let key = keccak256(proof.address);
    match process_proof(header.state_root(), key, &proof.proof)? {
        None => Err(VerifierError::AccountNotFound(proof.address)),
        Some(proven) => {
            if proven.as_ref() != proof.encoded_account() {
                return Err(VerifierError::ProofInvalid(
                    vote_relay_mpt::ProofError::ValueMismatch,
                ));
            }
            Ok(proof.storage_root)
        }
    }
}

#[cfg(test)]
mod tests {
    use alloy_trie::{HashBuilder, Nibbles, proof::ProofRetainer};

    use super::*;
    use crate::header::BlockHeader;

    /// Builds a single-account state trie and a sealed header committing to
    /// its root.
    fn fixture(token: Address) -> (SealedHeader, AccountProof) {
        let account_key = Nibbles::unpack(keccak256(token));
        let retainer = ProofRetainer::new(vec![account_key.clone()]);
        let mut hb = HashBuilder::default().with_proof_retainer(retainer);

        let storage_root = B256::repeat_byte(0x5a);
        let account = AccountProof {
            address: token,
            nonce: 1,
            balance: U256::from(1_000_000u64),
            storage_root,
            code_hash: keccak256(b"token bytecode"),
            proof: vec![],
        };
        hb.add_leaf(account_key, &account.encoded_account());

        let state_root = hb.root();
        let proof = hb
            .take_proof_nodes()
            .into_nodes_sorted()
            .into_iter()
            .map(|(_, node)| node)
            .collect();

        let header = BlockHeader { state_root, number: 100, ..Default::default() };
        let hash = header.hash_slow();
        let sealed = header.seal(hash).unwrap();

        (sealed, AccountProof { proof, ..account })
    }

    #[test]
    fn test_resolves_storage_root() {
        let token = Address::repeat_byte(0x70);
        let (sealed, proof) = fixture(token);

        let root = resolve_storage_root(&sealed, &proof).unwrap();
        assert_eq!(root, B256::repeat_byte(0x5a));
    }

    #[test]
    fn test_absent_account_is_fatal() {
        let token = Address::repeat_byte(0x70);
        let (sealed, proof) = fixture(token);

        // An address whose hashed key diverges at the (single) leaf.
        let absent = Address::repeat_byte(0x71);
        let tampered = AccountProof { address: absent, ..proof };
        let err = resolve_storage_root(&sealed, &tampered).unwrap_err();
        assert_eq!(err, VerifierError::AccountNotFound(absent));
    }

    #[test]
    fn test_tampered_account_state_fails() {
        let token = Address::repeat_byte(0x70);
        let (sealed, proof) = fixture(token);

        let tampered = AccountProof { balance: U256::from(2u64), ..proof };
        let err = resolve_storage_root(&sealed, &tampered).unwrap_err();
        assert!(matches!(err, VerifierError::ProofInvalid(_)));
    }

    #[test]
    fn test_tampered_storage_root_fails() {
        let token = Address::repeat_byte(0x70);
        let (sealed, proof) = fixture(token);

        let tampered = AccountProof { storage_root: B256::repeat_byte(0x66), ..proof };
        let err = resolve_storage_root(&sealed, &tampered).unwrap_err();
        assert!(matches!(err, VerifierError::ProofInvalid(_)));
    }
}
