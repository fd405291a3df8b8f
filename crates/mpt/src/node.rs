//! Trie node representation and decoding.

use alloy_primitives::{B256, Bytes};
use alloy_rlp::Header;

use crate::errors::TrieNodeError;

/// Hex-prefix flag for an even-length extension path.
const PREFIX_EXTENSION_EVEN: u8 = 0;
/// Hex-prefix flag for an odd-length extension path.
const PREFIX_EXTENSION_ODD: u8 = 1;
/// Hex-prefix flag for an even-length leaf path.
const PREFIX_LEAF_EVEN: u8 = 2;
/// Hex-prefix flag for an odd-length leaf path.
const PREFIX_LEAF_ODD: u8 = 3;

/// Length of a keccak digest, in bytes.
const HASH_LEN: usize = 32;

/// Number of items in a branch node's RLP list.
const BRANCH_ITEMS: usize = 17;
/// Number of items in a leaf or extension node's RLP list.
const PAIR_ITEMS: usize = 2;

/// A decoded Merkle-Patricia trie node.
///
/// Node shapes form a closed sum type so that an unexpected encoding can
/// never be silently mis-handled. Child references shorter than a keccak
/// digest are embedded in the parent's encoding and decoded in place;
/// digest-length references decode to [`TrieNode::Blinded`] and must be
/// resolved against the next node in the proof sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrieNode {
    /// An empty child slot.
    Empty,
    /// A node referenced by its keccak commitment, not yet revealed.
    Blinded {
        /// The keccak digest of the referenced node's encoding.
        commitment: B256,
    },
    /// A leaf node, terminating the path for its key suffix.
    Leaf {
        /// The remaining key nibbles covered by this leaf.
        prefix: Vec<u8>,
        /// The value stored at the key.
        value: Bytes,
    },
    /// An extension node, compressing a shared nibble run.
    Extension {
        /// The shared key nibbles.
        prefix: Vec<u8>,
        /// The single child under the shared run.
        node: Box<TrieNode>,
    },
    /// A branch node with one child slot per nibble.
    Branch {
        /// The 16 child slots, indexed by nibble.
        stack: Vec<TrieNode>,
        /// The value stored at the key ending exactly at this branch.
        value: Option<Bytes>,
    },
}

impl TrieNode {
    /// Decodes a trie node from its full RLP encoding.
    ///
    /// Fails if the input contains trailing bytes beyond the node.
    pub fn decode(buf: &[u8]) -> Result<Self, TrieNodeError> {
        let mut b = buf;
        let node = Self::decode_inner(&mut b)?;
        if !b.is_empty() {
            return Err(TrieNodeError::Rlp(alloy_rlp::Error::UnexpectedLength));
        }
        Ok(node)
    }

    fn decode_inner(buf: &mut &[u8]) -> Result<Self, TrieNodeError> {
        let header = Header::decode(buf).map_err(TrieNodeError::Rlp)?;
        if !header.list {
            return Err(TrieNodeError::InvalidNodeType);
        }
        if header.payload_length > buf.len() {
            return Err(TrieNodeError::Rlp(alloy_rlp::Error::InputTooShort));
        }
        let (payload, rest) = buf.split_at(header.payload_length);
        *buf = rest;

        let items = split_items(payload)?;
        match items.len() {
            PAIR_ITEMS => {
                let path = decode_string(items[0].raw)?;
                let (is_leaf, prefix) = decode_path(path)?;
                if is_leaf {
                    let value = decode_string(items[1].raw)?;
                    Ok(Self::Leaf { prefix, value: Bytes::copy_from_slice(value) })
                } else {
                    let node = Self::decode_child(&items[1])?;
                    if matches!(node, Self::Empty) {
                        return Err(TrieNodeError::InvalidNodeType);
                    }
                    Ok(Self::Extension { prefix, node: Box::new(node) })
                }
            }
            BRANCH_ITEMS => {
                let mut stack = Vec::with_capacity(BRANCH_ITEMS - 1);
                for item in &items[..BRANCH_ITEMS - 1] {
                    stack.push(Self::decode_child(item)?);
                }
                let raw_value = decode_string(items[BRANCH_ITEMS - 1].raw)?;
                let value =
                    (!raw_value.is_empty()).then(|| Bytes::copy_from_slice(raw_value));
                Ok(Self::Branch { stack, value })
            }
            _ => Err(TrieNodeError::InvalidNodeType),
        }
    }

    /// Decodes a child slot: the empty string, a digest-length reference, or
    /// an embedded node.
    fn decode_child(item: &Item<'_>) -> Result<Self, TrieNodeError> {
        if item.is_list {
            let mut b = item.raw;
            return Self::decode_inner(&mut b);
        }
        let payload = decode_string(item.raw)?;
        match payload.len() {
            0 => Ok(Self::Empty),
            HASH_LEN => Ok(Self::Blinded { commitment: B256::from_slice(payload) }),
            _ => Err(TrieNodeError::InvalidNodeType),
        }
    }
}

/// A raw RLP list item, header included.
struct Item<'a> {
    raw: &'a [u8],
    is_list: bool,
}

/// Splits an RLP list payload into its raw items.
fn split_items(mut payload: &[u8]) -> Result<Vec<Item<'_>>, TrieNodeError> {
    let mut items = Vec::new();
    while !payload.is_empty() {
        let raw = payload;
        let mut rest = payload;
        let header = Header::decode(&mut rest).map_err(TrieNodeError::Rlp)?;
        let total = (raw.len() - rest.len()) + header.payload_length;
        if total > raw.len() {
            return Err(TrieNodeError::Rlp(alloy_rlp::Error::InputTooShort));
        }
        items.push(Item { raw: &raw[..total], is_list: header.list });
        payload = &raw[total..];
    }
    Ok(items)
}

/// Decodes an RLP string item, returning its payload.
fn decode_string(raw: &[u8]) -> Result<&[u8], TrieNodeError> {
    let mut b = raw;
    let header = Header::decode(&mut b).map_err(TrieNodeError::Rlp)?;
    if header.list {
        return Err(TrieNodeError::InvalidNodeType);
    }
    Ok(&b[..header.payload_length])
}

/// Decodes a hex-prefix encoded path into (is_leaf, nibbles).
fn decode_path(path: &[u8]) -> Result<(bool, Vec<u8>), TrieNodeError> {
    let Some(&first) = path.first() else {
        return Err(TrieNodeError::InvalidNodeType);
    };
    let (is_leaf, odd) = match first >> 4 {
        PREFIX_EXTENSION_EVEN => (false, false),
        PREFIX_EXTENSION_ODD => (false, true),
        PREFIX_LEAF_EVEN => (true, false),
        PREFIX_LEAF_ODD => (true, true),
        _ => return Err(TrieNodeError::InvalidPathFlag(first)),
    };
    // Even-length paths pad the first byte with a zero nibble; any other
    // padding is a non-canonical encoding.
    if !odd && first & 0x0f != 0 {
        return Err(TrieNodeError::InvalidPathFlag(first));
    }
    let mut nibbles = Vec::with_capacity(path.len() * 2);
    if odd {
        nibbles.push(first & 0x0f);
    }
    for &byte in &path[1..] {
        nibbles.push(byte >> 4);
        nibbles.push(byte & 0x0f);
    }
    Ok((is_leaf, nibbles))
}
