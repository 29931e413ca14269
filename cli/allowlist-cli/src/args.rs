use allowlist_cli::{DuplicatePolicy, OddNodePolicy, PairOrdering, TreeOptions};
use clap::{Args, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OddNode {
    /// Promote the unpaired node unchanged
    Carry,
    /// Hash the unpaired node with itself
    Duplicate,
}

/// Tree policy flags. Build and prove must be run with the same values.
#[derive(Args, Debug, Clone)]
pub struct TreeArgs {
    /// Hash pairs in tree position order instead of ascending byte order
    #[arg(long, env = "ALLOWLIST_POSITIONAL")]
    pub positional: bool,

    /// Handling of the last node in an odd-sized layer
    #[arg(long, value_enum, default_value_t = OddNode::Carry, env = "ALLOWLIST_ODD_NODE")]
    pub odd_node: OddNode,

    /// Keep leaves in input order instead of sorting them
    #[arg(long, env = "ALLOWLIST_KEEP_ORDER")]
    pub keep_order: bool,

    /// Drop duplicate entries instead of failing
    #[arg(long, env = "ALLOWLIST_DEDUP")]
    pub dedup: bool,
}

impl From<&TreeArgs> for TreeOptions {
    fn from(args: &TreeArgs) -> Self {
        Self {
            sort_leaves: !args.keep_order,
            pair_ordering: if args.positional {
                PairOrdering::Positional
            } else {
                PairOrdering::Sorted
            },
            odd_node: match args.odd_node {
                OddNode::Carry => OddNodePolicy::Carry,
                OddNode::Duplicate => OddNodePolicy::Duplicate,
            },
            duplicates: if args.dedup {
                DuplicatePolicy::Dedup
            } else {
                DuplicatePolicy::Reject
            },
        }
    }
}
