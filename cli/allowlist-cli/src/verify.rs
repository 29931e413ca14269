//! Stateless proof verification.
//!
//! Starting from the leaf, each proof step combines the running hash with the
//! sibling: `hash_pair(sibling, acc)` for a left sibling, `hash_pair(acc,
//! sibling)` for a right one. With [`PairOrdering::Sorted`] the side makes no
//! difference, which is the rule OpenZeppelin's `MerkleProof.verify` applies.
//! The final hash must equal the root byte for byte.

use crate::common::{hash_pair, hex_encode, Hash};
use crate::entry::AllowlistEntry;
use crate::error::{AllowlistError, Result};
use crate::options::PairOrdering;
use crate::proof::{Proof, Side};

/// Longest proof accepted. A binary tree this deep would need 2^64 leaves.
pub const MAX_PROOF_DEPTH: usize = 64;

/// Folds `proof` over `leaf` and returns the implied root.
pub fn compute_root(leaf: Hash, proof: &Proof, ordering: PairOrdering) -> Result<Hash> {
    if proof.len() > MAX_PROOF_DEPTH {
        return Err(AllowlistError::InvalidProof(format!(
            "proof has {} steps, maximum is {}",
            proof.len(),
            MAX_PROOF_DEPTH
        )));
    }

    Ok(proof
        .steps
        .iter()
        .fold(leaf, |acc, step| match step.side {
            Side::Left => hash_pair(step.sibling, acc, ordering),
            Side::Right => hash_pair(acc, step.sibling, ordering),
        }))
}

/// Checks a pre-encoded leaf against `root`.
pub fn verify_leaf(leaf: Hash, proof: &Proof, root: &Hash, ordering: PairOrdering) -> bool {
    matches!(compute_root(leaf, proof, ordering), Ok(computed) if computed == *root)
}

/// Returns true iff `proof` links `entry` to `root`. Malformed proofs are
/// rejected, never accepted.
pub fn verify(entry: &AllowlistEntry, proof: &Proof, root: &Hash, ordering: PairOrdering) -> bool {
    verify_leaf(entry.leaf(), proof, root, ordering)
}

/// Like [`verify`], but reports a mismatch as `InvalidProof`.
pub fn ensure_member(
    entry: &AllowlistEntry,
    proof: &Proof,
    root: &Hash,
    ordering: PairOrdering,
) -> Result<()> {
    let computed = compute_root(entry.leaf(), proof, ordering)?;
    if computed != *root {
        return Err(AllowlistError::InvalidProof(format!(
            "proof for {} recomputes root {}, expected {}",
            entry,
            hex_encode(computed),
            hex_encode(root)
        )));
    }
    Ok(())
}
