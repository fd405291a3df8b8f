//! Storage-proof verification of governance voting weight.
//!
//! Establishes a trusted storage root for a token contract at a snapshot
//! block, then resolves individual voters' balance slots under that root.
//! The trust anchor is the block hash: a header is only used once its keccak
//! digest matches the chain-reported hash, and every proof chains back to the
//! sealed header's state root.
//!
//! Verification order is strict: the header is sealed and the token's storage
//! root resolved before any per-voter work begins. Per-voter proofs are then
//! independent and verified concurrently by [`BatchVerifier`].

mod error;
pub use error::{VerifierError, VerifierResult};

mod header;
pub use header::{BlockHeader, SealedHeader};

mod account;
pub use account::{AccountProof, resolve_storage_root};

mod weight;
pub use weight::{SlotDerivation, SlotLayout, StorageProof, extract_weight};

mod batch;
pub use batch::{BatchVerifier, StorageProofSource, VoterResult};
