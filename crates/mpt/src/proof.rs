//! Proof verification against a claimed trie root.

use alloy_primitives::{B256, Bytes, keccak256};
use alloy_trie::EMPTY_ROOT_HASH;

use crate::{
    errors::{ProofError, ProofResult},
    node::TrieNode,
};

/// Walks an ordered trie node sequence from `root` along `key`, returning the
/// proven value, or `None` if the proof demonstrates the key's absence.
///
/// Each node consumed from the sequence must hash to the commitment the walk
/// expects at that step; inline children are decoded in place without
/// consuming a sequence element. Nodes beyond what hash-chaining required are
/// ignored.
pub fn process_proof(root: B256, key: B256, proof: &[Bytes]) -> ProofResult<Option<Bytes>> {
    if root == EMPTY_ROOT_HASH {
        return Ok(None);
    }

    let path = unpack_nibbles(key);
    let mut nodes = proof.iter();
    let mut node = take_node(&mut nodes, root)?;
    let mut pos = 0usize;

    loop {
        match node {
            TrieNode::Empty => return Ok(None),
            TrieNode::Blinded { commitment } => {
                node = take_node(&mut nodes, commitment)?;
            }
            TrieNode::Leaf { prefix, value } => {
                return Ok((path[pos..] == prefix[..]).then_some(value));
            }
            TrieNode::Extension { prefix, node: child } => {
                if path[pos..].starts_with(&prefix) {
                    pos += prefix.len();
                    node = *child;
                } else {
                    // The shared run diverges from the key: proven absence.
                    return Ok(None);
                }
            }
            TrieNode::Branch { mut stack, value } => {
                if pos == path.len() {
                    return Ok(value);
                }
                let idx = path[pos] as usize;
                pos += 1;
                node = core::mem::replace(&mut stack[idx], TrieNode::Empty);
            }
        }
    }
}

/// Verifies that `key` maps to `expected` under `root`.
///
/// `expected = None` asserts proven absence. Fails with
/// [`ProofError::ValueMismatch`] when the proven value differs (or the key is
/// absent while a value was expected), and with
/// [`ProofError::UnexpectedValue`] when the key is present while absence was
/// expected.
pub fn verify_proof(
    root: B256,
    key: B256,
    expected: Option<&[u8]>,
    proof: &[Bytes],
) -> ProofResult<()> {
    match (process_proof(root, key, proof)?, expected) {
        (None, None) => Ok(()),
        (Some(proven), Some(expected)) if proven.as_ref() == expected => Ok(()),
        (Some(_) | None, Some(_)) => Err(ProofError::ValueMismatch),
        (Some(_), None) => Err(ProofError::UnexpectedValue),
    }
}

/// Resolves the next node in the sequence against `commitment`.
fn take_node<'a>(
    nodes: &mut impl Iterator<Item = &'a Bytes>,
    commitment: B256,
) -> ProofResult<TrieNode> {
    let raw = nodes.next().ok_or(ProofError::MissingNode { commitment })?;
    let computed = keccak256(raw);
    if computed != commitment {
        return Err(ProofError::HashMismatch { expected: commitment, computed });
    }
    Ok(TrieNode::decode(raw)?)
}

/// Unpacks a 32-byte trie key into its 64-nibble path.
fn unpack_nibbles(key: B256) -> Vec<u8> {
    key.iter().flat_map(|byte| [byte >> 4, byte & 0x0f]).collect()
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use alloy_rlp::Encodable;
    use alloy_trie::{HashBuilder, Nibbles, proof::ProofRetainer};

    use super::*;

    /// Builds a trie from `entries` and retains the proof for `target`.
    ///
    /// Returns the root and the proof nodes in root-to-leaf order. The target
    /// key does not have to be present in the entry set.
    fn build_trie(entries: &[(B256, Vec<u8>)], target: B256) -> (B256, Vec<Bytes>) {
        let retainer = ProofRetainer::new(vec![Nibbles::unpack(target)]);
        let mut hb = HashBuilder::default().with_proof_retainer(retainer);

        let mut sorted = entries.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, value) in &sorted {
            hb.add_leaf(Nibbles::unpack(key), value);
        }

        let root = hb.root();
        let proof = hb
            .take_proof_nodes()
            .into_nodes_sorted()
            .into_iter()
            .map(|(_, node)| node)
            .collect();
        (root, proof)
    }

    fn rlp_value(value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        U256::from(value).encode(&mut out);
        out
    }

    fn synthetic_entries(count: u64) -> Vec<(B256, Vec<u8>)> {
        (0..count)
            .map(|i| (keccak256(i.to_be_bytes()), rlp_value(1000 + i)))
            .collect()
    }

    #[test]
    fn test_inclusion_proof_verifies() {
        let entries = synthetic_entries(8);
        let (key, value) = entries[3].clone();
        let (root, proof) = build_trie(&entries, key);

        let proven = process_proof(root, key, &proof).unwrap();
        assert_eq!(proven.as_ref().map(|b| b.as_ref()), Some(value.as_slice()));
        verify_proof(root, key, Some(&value), &proof).unwrap();
    }

    #[test]
    fn test_completeness_every_key_proves() {
        let entries = synthetic_entries(20);
        for (key, value) in &entries {
            let (root, proof) = build_trie(&entries, *key);
            verify_proof(root, *key, Some(value), &proof).unwrap();
        }
    }

    #[test]
    fn test_non_inclusion_proof() {
        let entries = synthetic_entries(8);
        let absent = keccak256(b"not in the trie");
        let (root, proof) = build_trie(&entries, absent);

        assert_eq!(process_proof(root, absent, &proof).unwrap(), None);
        verify_proof(root, absent, None, &proof).unwrap();

        // Claiming any non-absent value for a missing key must fail.
        let err = verify_proof(root, absent, Some(&rlp_value(1)), &proof).unwrap_err();
        assert_eq!(err, ProofError::ValueMismatch);
    }

    #[test]
    fn test_present_key_cannot_prove_absence() {
        let entries = synthetic_entries(8);
        let (key, _) = entries[0].clone();
        let (root, proof) = build_trie(&entries, key);

        let err = verify_proof(root, key, None, &proof).unwrap_err();
        assert_eq!(err, ProofError::UnexpectedValue);
    }

    #[test]
    fn test_soundness_any_flipped_byte_fails() {
        let entries = synthetic_entries(4);
        let (key, value) = entries[1].clone();
        let (root, proof) = build_trie(&entries, key);

        for node_idx in 0..proof.len() {
            let mut tampered = proof.clone();
            let mut bytes = tampered[node_idx].to_vec();
            for byte_idx in 0..bytes.len() {
                bytes[byte_idx] ^= 0x01;
                tampered[node_idx] = Bytes::from(bytes.clone());
                assert!(
                    verify_proof(root, key, Some(&value), &tampered).is_err(),
                    "flipping byte {byte_idx} of node {node_idx} must invalidate the proof"
                );
                bytes[byte_idx] ^= 0x01;
            }
            tampered[node_idx] = proof[node_idx].clone();
        }
    }

    #[test]
    fn test_soundness_altered_value_fails() {
        let entries = synthetic_entries(4);
        let (key, _) = entries[2].clone();
        let (root, proof) = build_trie(&entries, key);

        let err = verify_proof(root, key, Some(&rlp_value(999_999)), &proof).unwrap_err();
        assert_eq!(err, ProofError::ValueMismatch);
    }

    #[test]
    fn test_missing_node_is_incomplete() {
        let entries = synthetic_entries(16);
        let (key, value) = entries[5].clone();
        let (root, mut proof) = build_trie(&entries, key);
        assert!(proof.len() > 1, "fixture needs a multi-node proof");

        proof.pop();
        let err = verify_proof(root, key, Some(&value), &proof).unwrap_err();
        assert!(matches!(err, ProofError::MissingNode { .. }));
    }

    #[test]
    fn test_excess_trailing_nodes_are_ignored() {
        let entries = synthetic_entries(8);
        let (key, value) = entries[3].clone();
        let (root, mut proof) = build_trie(&entries, key);

        proof.push(Bytes::from_static(&[0xc0]));
        verify_proof(root, key, Some(&value), &proof).unwrap();
    }

    #[test]
    fn test_empty_trie_proves_absence() {
        let key = keccak256(b"anything");
        assert_eq!(process_proof(EMPTY_ROOT_HASH, key, &[]).unwrap(), None);
        verify_proof(EMPTY_ROOT_HASH, key, None, &[]).unwrap();

        let err = verify_proof(EMPTY_ROOT_HASH, key, Some(&[0x01]), &[]).unwrap_err();
        assert_eq!(err, ProofError::ValueMismatch);
    }

    #[test]
    fn test_single_entry_trie() {
        let key = keccak256(b"only");
        let value = rlp_value(7);
        let (root, proof) = build_trie(&[(key, value.clone())], key);

        verify_proof(root, key, Some(&value), &proof).unwrap();
    }

    #[test]
    fn test_empty_proof_for_nonempty_root_is_incomplete() {
        let entries = synthetic_entries(2);
        let (key, value) = entries[0].clone();
        let (root, _) = build_trie(&entries, key);

        let err = verify_proof(root, key, Some(&value), &[]).unwrap_err();
        assert!(matches!(err, ProofError::MissingNode { .. }));
    }
}
