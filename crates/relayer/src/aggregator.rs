//! Deduplicated, order-independent vote tallying.
//!
//! Votes are keyed by proposal and voter. Re-adding a voter replaces the
//! earlier record, so a tally never counts the same voter twice and is
//! identical for every insertion order of the same records.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
};

use alloy_primitives::{Address, B256, U256, keccak256};
use num_bigint::BigUint;
use tracing::debug;

/// A verified vote, ready for aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoteRecord {
    /// The proposal being voted on.
    pub proposal_id: B256,
    /// The voter whose weight was proven.
    pub voter: Address,
    /// The proven voting weight. Zero for proven absence.
    pub weight: U256,
    /// The storage slot the weight was read from.
    pub slot: B256,
    /// The snapshot block the weight was read at.
    pub snapshot_block: u64,
}

/// The aggregated result for one proposal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tally {
    /// The proposal the tally covers.
    pub proposal_id: B256,
    /// Sum of all voter weights. Held wide so it cannot overflow no matter
    /// how many voters contribute.
    pub total: BigUint,
    /// The distinct voters contributing to the total, in address order.
    pub voters: Vec<Address>,
    /// Commitment to the voter set, stable across insertion orders.
    pub voter_set_hash: B256,
}

/// Hashes a voter set into a stable commitment.
///
/// The input must be sorted; [`Tally::voters`] already is.
pub fn hash_voter_set(voters: &[Address]) -> B256 {
    let mut preimage = Vec::with_capacity(voters.len() * Address::len_bytes());
    for voter in voters {
        preimage.extend_from_slice(voter.as_slice());
    }
    keccak256(&preimage)
}

/// Accumulates verified votes across proposals.
#[derive(Debug, Default)]
pub struct VoteAggregator {
    /// Votes keyed by proposal, then voter. The inner map is ordered so
    /// tallies come out in address order without re-sorting.
    votes: Mutex<HashMap<B256, BTreeMap<Address, VoteRecord>>>,
}

impl VoteAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a verified vote. A later record for the same (proposal, voter)
    /// pair replaces the earlier one.
    pub fn add_vote(&self, record: VoteRecord) {
        let mut votes = self.votes.lock().unwrap();
        let proposal_votes = votes.entry(record.proposal_id).or_default();
        if let Some(previous) = proposal_votes.insert(record.voter, record.clone()) {
            debug!(
                proposal_id = %record.proposal_id,
                voter = %record.voter,
                old_weight = %previous.weight,
                new_weight = %record.weight,
                "replaced existing vote"
            );
        }
    }

    /// Returns the number of distinct voters recorded for a proposal.
    pub fn voter_count(&self, proposal_id: B256) -> usize {
        self.votes.lock().unwrap().get(&proposal_id).map_or(0, BTreeMap::len)
    }

    /// Computes the tally for a proposal. An unknown proposal yields an
    /// empty tally with a zero total.
    pub fn tally(&self, proposal_id: B256) -> Tally {
        let votes = self.votes.lock().unwrap();
        let proposal_votes = votes.get(&proposal_id);

        let mut total = BigUint::from(0u8);
        let mut voters = Vec::new();
        if let Some(proposal_votes) = proposal_votes {
            voters.reserve(proposal_votes.len());
            for (voter, record) in proposal_votes {
                total += BigUint::from_bytes_be(&record.weight.to_be_bytes::<32>());
                voters.push(*voter);
            }
        }

        let voter_set_hash = hash_voter_set(&voters);
        Tally { proposal_id, total, voters, voter_set_hash }
    }

    /// Removes all votes for a proposal, returning how many were dropped.
    pub fn clear_proposal(&self, proposal_id: B256) -> usize {
        self.votes.lock().unwrap().remove(&proposal_id).map_or(0, |removed| removed.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(proposal: u8, voter: u8, weight: u64) -> VoteRecord {
        VoteRecord {
            proposal_id: B256::repeat_byte(proposal),
            voter: Address::repeat_byte(voter),
            weight: U256::from(weight),
            slot: B256::repeat_byte(0x55),
            snapshot_block: 100,
        }
    }

    #[test]
    fn test_tally_sums_distinct_voters() {
        let aggregator = VoteAggregator::new();
        aggregator.add_vote(record(0x11, 0xaa, 1000));
        aggregator.add_vote(record(0x11, 0xbb, 500));

        let tally = aggregator.tally(B256::repeat_byte(0x11));
        assert_eq!(tally.total, BigUint::from(1500u64));
        assert_eq!(tally.voters.len(), 2);
    }

    #[test]
    fn test_duplicate_voter_replaces() {
        let aggregator = VoteAggregator::new();
        aggregator.add_vote(record(0x11, 0xaa, 1000));
        aggregator.add_vote(record(0x11, 0xaa, 700));

        let tally = aggregator.tally(B256::repeat_byte(0x11));
        assert_eq!(tally.total, BigUint::from(700u64));
        assert_eq!(tally.voters, vec![Address::repeat_byte(0xaa)]);
        assert_eq!(aggregator.voter_count(B256::repeat_byte(0x11)), 1);
    }

    #[test]
    fn test_tally_is_insertion_order_independent() {
        let forward = VoteAggregator::new();
        forward.add_vote(record(0x11, 0xaa, 1));
        forward.add_vote(record(0x11, 0xbb, 2));
        forward.add_vote(record(0x11, 0xcc, 3));

        let reverse = VoteAggregator::new();
        reverse.add_vote(record(0x11, 0xcc, 3));
        reverse.add_vote(record(0x11, 0xbb, 2));
        reverse.add_vote(record(0x11, 0xaa, 1));

        let a = forward.tally(B256::repeat_byte(0x11));
        let b = reverse.tally(B256::repeat_byte(0x11));
        assert_eq!(a, b);
        assert_eq!(a.voters, vec![
            Address::repeat_byte(0xaa),
            Address::repeat_byte(0xbb),
            Address::repeat_byte(0xcc)
        ]);
    }

    #[test]
    fn test_proposals_are_isolated() {
        let aggregator = VoteAggregator::new();
        aggregator.add_vote(record(0x11, 0xaa, 1000));
        aggregator.add_vote(record(0x22, 0xaa, 42));

        assert_eq!(aggregator.tally(B256::repeat_byte(0x11)).total, BigUint::from(1000u64));
        assert_eq!(aggregator.tally(B256::repeat_byte(0x22)).total, BigUint::from(42u64));
    }

    #[test]
    fn test_empty_tally() {
        let aggregator = VoteAggregator::new();
        let tally = aggregator.tally(B256::repeat_byte(0x99));
        assert_eq!(tally.total, BigUint::from(0u8));
        assert!(tally.voters.is_empty());
        assert_eq!(tally.voter_set_hash, hash_voter_set(&[]));
    }

    #[test]
    fn test_zero_weight_voter_is_counted() {
        let aggregator = VoteAggregator::new();
        aggregator.add_vote(record(0x11, 0xaa, 0));

        let tally = aggregator.tally(B256::repeat_byte(0x11));
        assert_eq!(tally.total, BigUint::from(0u8));
        assert_eq!(tally.voters, vec![Address::repeat_byte(0xaa)]);
    }

    #[test]
    fn test_total_exceeds_word_size() {
        let aggregator = VoteAggregator::new();
        let mut a = record(0x11, 0xaa, 0);
        a.weight = U256::MAX;
        let mut b = record(0x11, 0xbb, 0);
        b.weight = U256::MAX;
        aggregator.add_vote(a);
        aggregator.add_vote(b);

        let max = BigUint::from_bytes_be(&U256::MAX.to_be_bytes::<32>());
        let tally = aggregator.tally(B256::repeat_byte(0x11));
        assert_eq!(tally.total, &max + &max);
    }

    #[test]
    fn test_voter_set_hash_tracks_membership() {
        let aggregator = VoteAggregator::new();
        aggregator.add_vote(record(0x11, 0xaa, 1));
        let one = aggregator.tally(B256::repeat_byte(0x11)).voter_set_hash;

        aggregator.add_vote(record(0x11, 0xbb, 1));
        let two = aggregator.tally(B256::repeat_byte(0x11)).voter_set_hash;

        assert_ne!(one, two);
    }

    #[test]
    fn test_clear_proposal() {
        let aggregator = VoteAggregator::new();
        aggregator.add_vote(record(0x11, 0xaa, 1));
        aggregator.add_vote(record(0x11, 0xbb, 2));

        assert_eq!(aggregator.clear_proposal(B256::repeat_byte(0x11)), 2);
        assert!(aggregator.tally(B256::repeat_byte(0x11)).voters.is_empty());
    }
}
