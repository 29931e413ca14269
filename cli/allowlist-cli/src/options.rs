use serde::{Deserialize, Serialize};

/// How two sibling hashes are ordered before being hashed together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairOrdering {
    /// `keccak256(min(a, b) || max(a, b))`. Proofs need no side information.
    #[default]
    Sorted,
    /// `keccak256(left || right)` in tree position order.
    Positional,
}

/// What happens to the last node of a layer with an odd number of nodes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OddNodePolicy {
    /// Promote the node to the next layer unchanged.
    #[default]
    Carry,
    /// Hash the node with itself.
    Duplicate,
}

/// Treatment of two entries that encode to the same leaf.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    #[default]
    Reject,
    /// Keep the first occurrence and drop the rest.
    Dedup,
}

/// Every policy knob that affects the root. Builders and verifiers of the same
/// allowlist must agree on all of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeOptions {
    pub sort_leaves: bool,
    pub pair_ordering: PairOrdering,
    pub odd_node: OddNodePolicy,
    pub duplicates: DuplicatePolicy,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            sort_leaves: true,
            pair_ordering: PairOrdering::Sorted,
            odd_node: OddNodePolicy::Carry,
            duplicates: DuplicatePolicy::Reject,
        }
    }
}

impl TreeOptions {
    /// Options matching a JS `merkletreejs` tree built without sorting: leaves
    /// in input order, positional pairs, carried odd nodes.
    pub fn legacy_unsorted() -> Self {
        Self {
            sort_leaves: false,
            pair_ordering: PairOrdering::Positional,
            odd_node: OddNodePolicy::Carry,
            duplicates: DuplicatePolicy::Reject,
        }
    }
}
