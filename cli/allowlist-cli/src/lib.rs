//! Merkle allowlist commitments.
//!
//! Build an [`AllowlistTree`] from [`AllowlistEntry`] values, publish its
//! root, hand each member a [`Proof`], and check claims with [`verify`].

pub mod artifact;
pub mod common;
pub mod entry;
pub mod error;
pub mod options;
pub mod proof;
pub mod tree;
pub mod verify;

pub use common::{
    hash_pair, hex_encode, keccak256, keccak256_hash, parse_address, parse_hash,
    validate_merkle_root, write_file_atomic, Address, Hash,
};
pub use entry::{encode_leaf, AllowlistEntry};
pub use error::{AllowlistError, Result};
pub use options::{DuplicatePolicy, OddNodePolicy, PairOrdering, TreeOptions};
pub use proof::{Proof, ProofStep, Side};
pub use tree::AllowlistTree;
pub use verify::{compute_root, ensure_member, verify, verify_leaf, MAX_PROOF_DEPTH};
