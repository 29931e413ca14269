use serde::{Deserialize, Serialize};

use crate::common::{hex_encode, parse_hash, Hash};
use crate::error::{AllowlistError, Result};

/// Which side of the running hash a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProofStep {
    pub sibling: Hash,
    pub side: Side,
}

/// Membership proof for one leaf: sibling hashes ordered from the leaf layer
/// up to (but excluding) the root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    /// Position of the leaf in layer 0. Informational; the verifier does not
    /// read it.
    pub leaf_index: usize,
    pub steps: Vec<ProofStep>,
}

impl Proof {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn siblings(&self) -> impl Iterator<Item = &Hash> + '_ {
        self.steps.iter().map(|step| &step.sibling)
    }

    pub fn sides(&self) -> Vec<Side> {
        self.steps.iter().map(|step| step.side).collect()
    }

    /// Sibling hashes as `0x`-prefixed hex, the shape a contract call takes.
    pub fn hex_siblings(&self) -> Vec<String> {
        self.siblings().map(hex_encode).collect()
    }

    /// Parses a proof received from outside.
    ///
    /// `sides` may be empty when the proof is only ever checked with sorted
    /// pairing; every step then defaults to [`Side::Right`]. Otherwise it must
    /// have one entry per sibling.
    pub fn from_hex(leaf_index: usize, siblings: &[String], sides: &[Side]) -> Result<Self> {
        if !sides.is_empty() && sides.len() != siblings.len() {
            return Err(AllowlistError::InvalidProof(format!(
                "{} siblings but {} sides",
                siblings.len(),
                sides.len()
            )));
        }

        let steps = siblings
            .iter()
            .enumerate()
            .map(|(i, hex_str)| {
                let sibling = parse_hash(hex_str).ok_or_else(|| {
                    AllowlistError::InvalidProof(format!(
                        "sibling {i} is not a 32-byte hex hash: '{hex_str}'"
                    ))
                })?;
                let side = sides.get(i).copied().unwrap_or(Side::Right);
                Ok(ProofStep { sibling, side })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { leaf_index, steps })
    }
}
