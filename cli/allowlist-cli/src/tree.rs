//! Merkle tree construction and proof generation.
//!
//! Layer 0 holds the leaves (sorted ascending when
//! [`TreeOptions::sort_leaves`] is set). Layer `k + 1` is built by hashing
//! adjacent pairs of layer `k` with [`hash_pair`]; an unpaired last node is
//! carried or duplicated according to [`OddNodePolicy`]. The last layer holds
//! only the root.

use std::collections::{HashMap, HashSet};
use std::fmt;

use tracing::{debug, info};

use crate::common::{hash_pair, hex_encode, Hash};
use crate::entry::AllowlistEntry;
use crate::error::{AllowlistError, Result};
use crate::options::{DuplicatePolicy, OddNodePolicy, TreeOptions};
use crate::proof::{Proof, ProofStep, Side};
use crate::verify::verify;

/// Layers at least this wide are hashed on the rayon pool.
#[cfg(feature = "parallel")]
const PARALLEL_MIN_NODES: usize = 1 << 12;

/// An immutable Merkle tree over an allowlist.
#[derive(Debug, Clone)]
pub struct AllowlistTree {
    options: TreeOptions,
    layers: Vec<Vec<Hash>>,
    leaf_index: HashMap<Hash, usize>,
}

impl AllowlistTree {
    /// Encodes every entry and builds the tree.
    pub fn build<I>(entries: I, options: &TreeOptions) -> Result<Self>
    where
        I: IntoIterator<Item = AllowlistEntry>,
    {
        let mut seen = HashSet::new();
        let mut leaves = Vec::new();

        for entry in entries {
            let leaf = entry.leaf();
            if !seen.insert(leaf) {
                match options.duplicates {
                    DuplicatePolicy::Reject => {
                        return Err(AllowlistError::DuplicateEntry(entry.to_string()));
                    }
                    DuplicatePolicy::Dedup => {
                        debug!(%entry, "dropping duplicate entry");
                        continue;
                    }
                }
            }
            leaves.push(leaf);
        }

        Self::from_unique_leaves(leaves, options)
    }

    /// Builds a tree from already-encoded leaves.
    pub fn from_leaves(leaves: Vec<Hash>, options: &TreeOptions) -> Result<Self> {
        let mut seen = HashSet::with_capacity(leaves.len());
        let mut unique = Vec::with_capacity(leaves.len());
        for leaf in leaves {
            if seen.insert(leaf) {
                unique.push(leaf);
            } else if options.duplicates == DuplicatePolicy::Reject {
                return Err(AllowlistError::DuplicateEntry(format!(
                    "with leaf {}",
                    hex_encode(leaf)
                )));
            }
        }
        Self::from_unique_leaves(unique, options)
    }

    fn from_unique_leaves(mut leaves: Vec<Hash>, options: &TreeOptions) -> Result<Self> {
        if leaves.is_empty() {
            return Err(AllowlistError::EmptyAllowlist);
        }
        if options.sort_leaves {
            leaves.sort_unstable();
        }

        let mut layers = vec![leaves];
        while let Some(current) = layers.last().filter(|layer| layer.len() > 1) {
            let next = next_layer(current, options);
            debug!(layer = layers.len(), nodes = next.len(), "hashed layer");
            layers.push(next);
        }

        let tree = Self {
            options: *options,
            leaf_index: index_leaves(&layers[0]),
            layers,
        };
        info!(
            leaves = tree.len(),
            depth = tree.depth(),
            root = %hex_encode(tree.root()),
            "built allowlist tree"
        );
        Ok(tree)
    }

    /// Re-hydrates a tree from a layer dump, recomputing every parent.
    ///
    /// Fails with `InvalidTree` if any layer disagrees with the one below it
    /// under `options`, or if the leaves break the sorting or uniqueness rules.
    pub fn from_layers(layers: Vec<Vec<Hash>>, options: &TreeOptions) -> Result<Self> {
        let leaves = match layers.first() {
            Some(leaves) if !leaves.is_empty() => leaves,
            _ => return Err(AllowlistError::EmptyAllowlist),
        };
        if options.sort_leaves && !leaves.windows(2).all(|pair| pair[0] < pair[1]) {
            return Err(AllowlistError::InvalidTree(
                "leaves are not strictly ascending".to_string(),
            ));
        }
        let leaf_index = index_leaves(leaves);
        if leaf_index.len() != leaves.len() {
            return Err(AllowlistError::InvalidTree(
                "leaf layer contains duplicates".to_string(),
            ));
        }

        for (level, pair) in layers.windows(2).enumerate() {
            if pair[0].len() == 1 {
                return Err(AllowlistError::InvalidTree(format!(
                    "layer {} follows the root",
                    level + 1
                )));
            }
            if next_layer(&pair[0], options) != pair[1] {
                return Err(AllowlistError::InvalidTree(format!(
                    "layer {} does not hash to layer {}",
                    level,
                    level + 1
                )));
            }
        }
        if layers.last().map(Vec::len) != Some(1) {
            return Err(AllowlistError::InvalidTree(
                "top layer must hold exactly one root".to_string(),
            ));
        }

        Ok(Self {
            options: *options,
            layers,
            leaf_index,
        })
    }

    pub fn root(&self) -> Hash {
        self.layers[self.layers.len() - 1][0]
    }

    pub fn leaves(&self) -> &[Hash] {
        &self.layers[0]
    }

    pub fn layers(&self) -> &[Vec<Hash>] {
        &self.layers
    }

    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// Number of leaves.
    pub fn len(&self) -> usize {
        self.layers[0].len()
    }

    /// Always false: an empty allowlist is rejected at build time.
    pub fn is_empty(&self) -> bool {
        self.layers[0].is_empty()
    }

    /// Number of layers below the root. Upper bound on proof length.
    pub fn depth(&self) -> usize {
        self.layers.len() - 1
    }

    pub fn leaf_index(&self, leaf: &Hash) -> Option<usize> {
        self.leaf_index.get(leaf).copied()
    }

    pub fn contains(&self, entry: &AllowlistEntry) -> bool {
        self.leaf_index.contains_key(&entry.leaf())
    }

    /// Generates the membership proof for `entry`.
    pub fn prove(&self, entry: &AllowlistEntry) -> Result<Proof> {
        let index = self
            .leaf_index(&entry.leaf())
            .ok_or_else(|| AllowlistError::LeafNotFound(entry.to_string()))?;
        self.prove_index(index)
    }

    /// Generates the membership proof for the leaf at `leaf_index` in layer 0.
    pub fn prove_index(&self, leaf_index: usize) -> Result<Proof> {
        if leaf_index >= self.len() {
            return Err(AllowlistError::LeafNotFound(format!(
                "leaf index {} (tree has {} leaves)",
                leaf_index,
                self.len()
            )));
        }

        let mut steps = Vec::with_capacity(self.depth());
        let mut index = leaf_index;

        for layer in &self.layers[..self.depth()] {
            let sibling_index = index ^ 1;
            if let Some(&sibling) = layer.get(sibling_index) {
                let side = if index % 2 == 0 { Side::Right } else { Side::Left };
                steps.push(ProofStep { sibling, side });
            } else if self.options.odd_node == OddNodePolicy::Duplicate {
                steps.push(ProofStep {
                    sibling: layer[index],
                    side: Side::Right,
                });
            }
            index /= 2;
        }

        Ok(Proof { leaf_index, steps })
    }

    /// Checks `proof` against this tree's root and pairing rule.
    pub fn verify(&self, entry: &AllowlistEntry, proof: &Proof) -> bool {
        verify(entry, proof, &self.root(), self.options.pair_ordering)
    }
}

/// Renders the tree root first, one layer per block.
impl fmt::Display for AllowlistTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (level, layer) in self.layers.iter().enumerate().rev() {
            writeln!(f, "layer {} ({} nodes)", level, layer.len())?;
            for (i, hash) in layer.iter().enumerate() {
                writeln!(f, "  {:>4}: {}", i, hex_encode(hash))?;
            }
        }
        Ok(())
    }
}

fn index_leaves(leaves: &[Hash]) -> HashMap<Hash, usize> {
    leaves
        .iter()
        .enumerate()
        .map(|(index, leaf)| (*leaf, index))
        .collect()
}

fn combine(chunk: &[Hash], options: &TreeOptions) -> Hash {
    match *chunk {
        [left, right] => hash_pair(left, right, options.pair_ordering),
        [last] => match options.odd_node {
            OddNodePolicy::Carry => last,
            OddNodePolicy::Duplicate => hash_pair(last, last, options.pair_ordering),
        },
        _ => unreachable!("chunks(2) yields one or two nodes"),
    }
}

#[cfg(feature = "parallel")]
fn next_layer(current: &[Hash], options: &TreeOptions) -> Vec<Hash> {
    use rayon::prelude::*;

    if current.len() >= PARALLEL_MIN_NODES {
        current
            .par_chunks(2)
            .map(|chunk| combine(chunk, options))
            .collect()
    } else {
        current
            .chunks(2)
            .map(|chunk| combine(chunk, options))
            .collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn next_layer(current: &[Hash], options: &TreeOptions) -> Vec<Hash> {
    current
        .chunks(2)
        .map(|chunk| combine(chunk, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::keccak256_hash;
    use crate::options::PairOrdering;
    use crate::verify::verify_leaf;

    fn address(last: u8) -> [u8; 20] {
        let mut addr = [0xaa; 20];
        addr[19] = last;
        addr
    }

    fn entries(count: u8) -> Vec<AllowlistEntry> {
        (1..=count).map(|i| AllowlistEntry::new(address(i))).collect()
    }

    #[test]
    fn test_four_entry_scenario() {
        let tree = AllowlistTree::build(entries(4), &TreeOptions::default()).unwrap();
        let target = AllowlistEntry::new(address(3));
        let proof = tree.prove(&target).unwrap();

        assert_eq!(proof.len(), 2);
        assert!(tree.verify(&target, &proof));

        let mut other_root = tree.root();
        other_root[0] ^= 0xff;
        assert!(!verify(&target, &proof, &other_root, PairOrdering::Sorted));

        let mut outsider = [0xbb; 20];
        outsider[19] = 0x09;
        assert!(!tree.verify(&AllowlistEntry::new(outsider), &proof));
    }

    #[test]
    fn test_single_entry_root_is_leaf() {
        let entry = AllowlistEntry::new(address(1));
        let tree = AllowlistTree::build([entry], &TreeOptions::default()).unwrap();
        assert_eq!(tree.root(), entry.leaf());
        assert_eq!(tree.depth(), 0);

        let proof = tree.prove(&entry).unwrap();
        assert!(proof.is_empty());
        assert!(tree.verify(&entry, &proof));
    }

    #[test]
    fn test_two_leaves_match_hand_computation() {
        let tree = AllowlistTree::build(entries(2), &TreeOptions::default()).unwrap();
        let a = AllowlistEntry::new(address(1)).leaf();
        let b = AllowlistEntry::new(address(2)).leaf();
        let expected = if a < b {
            keccak256_hash(a, b)
        } else {
            keccak256_hash(b, a)
        };
        assert_eq!(tree.root(), expected);
    }

    #[test]
    fn test_empty_allowlist_rejected() {
        let err = AllowlistTree::build(Vec::new(), &TreeOptions::default()).unwrap_err();
        assert_eq!(err, AllowlistError::EmptyAllowlist);
        let err = AllowlistTree::from_leaves(Vec::new(), &TreeOptions::default()).unwrap_err();
        assert_eq!(err, AllowlistError::EmptyAllowlist);
    }

    #[test]
    fn test_duplicate_policy() {
        let mut list = entries(3);
        list.push(list[1]);

        let err = AllowlistTree::build(list.clone(), &TreeOptions::default()).unwrap_err();
        assert!(matches!(err, AllowlistError::DuplicateEntry(_)));

        let dedup = TreeOptions {
            duplicates: DuplicatePolicy::Dedup,
            ..TreeOptions::default()
        };
        let tree = AllowlistTree::build(list, &dedup).unwrap();
        let reference = AllowlistTree::build(entries(3), &TreeOptions::default()).unwrap();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree.root(), reference.root());
    }

    #[test]
    fn test_same_address_different_allocation_is_not_duplicate() {
        let list = vec![
            AllowlistEntry::with_allocation(address(1), 2),
            AllowlistEntry::with_allocation(address(1), 3),
        ];
        let tree = AllowlistTree::build(list, &TreeOptions::default()).unwrap();
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_order_independence() {
        let mut reversed = entries(7);
        reversed.reverse();
        let a = AllowlistTree::build(entries(7), &TreeOptions::default()).unwrap();
        let b = AllowlistTree::build(reversed, &TreeOptions::default()).unwrap();
        assert_eq!(a.root(), b.root());
    }

    #[test]
    fn test_keep_order_depends_on_input_order() {
        let opts = TreeOptions::legacy_unsorted();
        let mut reversed = entries(4);
        reversed.reverse();
        let a = AllowlistTree::build(entries(4), &opts).unwrap();
        let b = AllowlistTree::build(reversed, &opts).unwrap();
        assert_ne!(a.root(), b.root());
    }

    #[test]
    fn test_adding_entry_changes_root() {
        let a = AllowlistTree::build(entries(5), &TreeOptions::default()).unwrap();
        let b = AllowlistTree::build(entries(6), &TreeOptions::default()).unwrap();
        assert_ne!(a.root(), b.root());
    }

    #[test]
    fn test_odd_node_carry_shortens_proof() {
        let tree = AllowlistTree::build(entries(5), &TreeOptions::default()).unwrap();
        let layer_sizes: Vec<usize> = tree.layers().iter().map(Vec::len).collect();
        assert_eq!(layer_sizes, vec![5, 3, 2, 1]);

        let proof = tree.prove_index(4).unwrap();
        assert_eq!(proof.len(), 1);
        // The carried node reaches layer 2 unchanged.
        assert_eq!(tree.layers()[2][1], tree.leaves()[4]);
        let leaf = tree.leaves()[4];
        assert!(verify_leaf(leaf, &proof, &tree.root(), PairOrdering::Sorted));
    }

    #[test]
    fn test_odd_node_duplicate_keeps_full_depth() {
        let opts = TreeOptions {
            odd_node: OddNodePolicy::Duplicate,
            ..TreeOptions::default()
        };
        let tree = AllowlistTree::build(entries(5), &opts).unwrap();
        let proof = tree.prove_index(4).unwrap();
        assert_eq!(proof.len(), 3);
        assert_eq!(proof.steps[0].sibling, tree.leaves()[4]);
    }

    #[test]
    fn test_every_entry_verifies_under_all_policies() {
        let list = entries(11);
        for pair_ordering in [PairOrdering::Sorted, PairOrdering::Positional] {
            for odd_node in [OddNodePolicy::Carry, OddNodePolicy::Duplicate] {
                for sort_leaves in [true, false] {
                    let opts = TreeOptions {
                        sort_leaves,
                        pair_ordering,
                        odd_node,
                        duplicates: DuplicatePolicy::Reject,
                    };
                    let tree = AllowlistTree::build(list.clone(), &opts).unwrap();
                    for entry in &list {
                        let proof = tree.prove(entry).unwrap();
                        assert!(tree.verify(entry, &proof), "{opts:?} {entry}");
                    }
                }
            }
        }
    }

    #[test]
    fn test_positional_proof_fails_under_sorted_rule() {
        let opts = TreeOptions::legacy_unsorted();
        // Descending leaves: every positional pair differs from its sorted form.
        let leaves = vec![[4u8; 32], [3u8; 32], [2u8; 32], [1u8; 32]];
        let tree = AllowlistTree::from_leaves(leaves, &opts).unwrap();
        let proof = tree.prove_index(0).unwrap();
        let root = tree.root();
        assert!(verify_leaf([4u8; 32], &proof, &root, PairOrdering::Positional));
        assert!(!verify_leaf([4u8; 32], &proof, &root, PairOrdering::Sorted));
    }

    #[test]
    fn test_prove_missing_entry() {
        let tree = AllowlistTree::build(entries(4), &TreeOptions::default()).unwrap();
        let err = tree.prove(&AllowlistEntry::new(address(9))).unwrap_err();
        assert!(matches!(err, AllowlistError::LeafNotFound(_)));

        let err = tree.prove_index(4).unwrap_err();
        assert!(matches!(err, AllowlistError::LeafNotFound(_)));
    }

    #[test]
    fn test_from_layers_roundtrip() {
        let tree = AllowlistTree::build(entries(6), &TreeOptions::default()).unwrap();
        let restored =
            AllowlistTree::from_layers(tree.layers().to_vec(), &TreeOptions::default()).unwrap();
        assert_eq!(restored.root(), tree.root());
        let entry = AllowlistEntry::new(address(2));
        assert_eq!(restored.prove(&entry).unwrap(), tree.prove(&entry).unwrap());
    }

    #[test]
    fn test_from_layers_rejects_tampering() {
        let tree = AllowlistTree::build(entries(6), &TreeOptions::default()).unwrap();

        let mut layers = tree.layers().to_vec();
        layers[1][0][5] ^= 1;
        let err = AllowlistTree::from_layers(layers, &TreeOptions::default()).unwrap_err();
        assert!(matches!(err, AllowlistError::InvalidTree(_)));

        let mut layers = tree.layers().to_vec();
        layers.pop();
        let err = AllowlistTree::from_layers(layers, &TreeOptions::default()).unwrap_err();
        assert!(matches!(err, AllowlistError::InvalidTree(_)));

        let mut layers = tree.layers().to_vec();
        layers[0].swap(0, 1);
        let err = AllowlistTree::from_layers(layers, &TreeOptions::default()).unwrap_err();
        assert!(matches!(err, AllowlistError::InvalidTree(_)));
    }

    #[test]
    fn test_from_layers_rejects_options_mismatch() {
        let tree = AllowlistTree::build(entries(5), &TreeOptions::default()).unwrap();
        let duplicate = TreeOptions {
            odd_node: OddNodePolicy::Duplicate,
            ..TreeOptions::default()
        };
        assert!(AllowlistTree::from_layers(tree.layers().to_vec(), &duplicate).is_err());
    }

    #[test]
    fn test_display_lists_root_first() {
        let tree = AllowlistTree::build(entries(2), &TreeOptions::default()).unwrap();
        let rendered = tree.to_string();
        assert!(rendered.starts_with("layer 1 (1 nodes)"));
        assert!(rendered.contains(&hex_encode(tree.root())));
    }
}
