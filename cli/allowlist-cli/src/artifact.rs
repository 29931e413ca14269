//! On-disk formats exchanged between `build-tree`, `prove` and `verify`.
//!
//! * allowlist input: `0xADDRESS` or `0xADDRESS,ALLOCATION` per line,
//! * index map: `0xADDRESS:INDEX` or `0xADDRESS:ALLOCATION:INDEX` per line,
//! * layer dump: `LAYER:INDEX:0xHASH` per line,
//! * claim: JSON, see [`ClaimFile`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::BufRead;

use crate::common::{hex_encode, parse_address, parse_hash, Address, Hash};
use crate::entry::AllowlistEntry;
use crate::error::AllowlistError;
use crate::proof::{Proof, Side};
use crate::tree::AllowlistTree;

/// Reads allowlist entries, skipping blank lines and `#` comments.
pub fn parse_allowlist(reader: impl BufRead) -> Result<Vec<AllowlistEntry>> {
    let mut entries = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let entry: AllowlistEntry = trimmed
            .parse()
            .with_context(|| format!("Invalid entry at line {}", line_num + 1))?;
        entries.push(entry);
    }

    Ok(entries)
}

/// One line of the index map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRecord {
    pub entry: AllowlistEntry,
    pub leaf_index: usize,
}

/// Lists every entry of `tree` with its position in layer 0, in leaf order.
pub fn index_records(entries: &[AllowlistEntry], tree: &AllowlistTree) -> Vec<IndexRecord> {
    let mut records: Vec<IndexRecord> = entries
        .iter()
        .filter_map(|entry| {
            tree.leaf_index(&entry.leaf()).map(|leaf_index| IndexRecord {
                entry: *entry,
                leaf_index,
            })
        })
        .collect();
    records.sort_by_key(|record| record.leaf_index);
    records.dedup_by_key(|record| record.leaf_index);
    records
}

pub fn format_index_map(records: &[IndexRecord]) -> String {
    records
        .iter()
        .map(|record| {
            let address = hex_encode(record.entry.address);
            match record.entry.allocation {
                Some(allocation) => format!("{}:{}:{}\n", address, allocation, record.leaf_index),
                None => format!("{}:{}\n", address, record.leaf_index),
            }
        })
        .collect()
}

pub fn parse_index_map(reader: impl BufRead) -> Result<Vec<IndexRecord>> {
    let mut records = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parts: Vec<&str> = trimmed.split(':').collect();
        let (address, allocation, index) = match parts.as_slice() {
            [address, index] => (*address, None, *index),
            [address, allocation, index] => (*address, Some(*allocation), *index),
            _ => anyhow::bail!(
                "Invalid format at line {}: expected 'address[:allocation]:index', got '{}'",
                line_num + 1,
                trimmed
            ),
        };
        let address = parse_address(address).context("Invalid address format")?;
        let allocation = allocation
            .map(|text| text.parse::<u128>())
            .transpose()
            .context("Invalid allocation format")?;
        let leaf_index: usize = index.parse().context("Invalid index format")?;
        records.push(IndexRecord {
            entry: AllowlistEntry {
                address,
                allocation,
            },
            leaf_index,
        });
    }

    if records.is_empty() {
        anyhow::bail!("Index map file is empty");
    }

    Ok(records)
}

/// Picks the record for `address`.
///
/// An exact match on `allocation` wins, so `None` selects the address-only
/// entry even when the address is also listed with allocations. Without an
/// exact match, `None` accepts the address's single record and is ambiguous
/// when there are several.
pub fn find_record(
    records: &[IndexRecord],
    address: &Address,
    allocation: Option<u128>,
) -> Result<IndexRecord> {
    let listed: Vec<&IndexRecord> = records
        .iter()
        .filter(|record| record.entry.address == *address)
        .collect();

    if let Some(exact) = listed
        .iter()
        .find(|record| record.entry.allocation == allocation)
    {
        return Ok(**exact);
    }
    if allocation.is_some() {
        return Err(AllowlistError::LeafNotFound(format!(
            "{},{}",
            hex_encode(address),
            allocation.unwrap_or_default()
        ))
        .into());
    }

    match listed.as_slice() {
        [] => Err(AllowlistError::LeafNotFound(hex_encode(address)).into()),
        [record] => Ok(**record),
        _ => anyhow::bail!(
            "Address {} has {} allocations; pass --allocation to pick one",
            hex_encode(address),
            listed.len()
        ),
    }
}

pub fn format_layers(tree: &AllowlistTree) -> String {
    tree.layers()
        .iter()
        .enumerate()
        .flat_map(|(level_num, level)| {
            level
                .iter()
                .enumerate()
                .map(move |(i, hash)| format!("{}:{}:{}\n", level_num, i, hex_encode(hash)))
        })
        .collect()
}

/// Reads a layer dump back into dense layers. Structural checks against the
/// hash rule are left to [`AllowlistTree::from_layers`].
pub fn parse_layers(reader: impl BufRead) -> Result<Vec<Vec<Hash>>> {
    let mut level_entries: Vec<HashMap<usize, Hash>> = Vec::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let parts: Vec<&str> = trimmed.split(':').collect();
        if parts.len() != 3 {
            anyhow::bail!(
                "Invalid format at line {}: expected 'layer:index:hash', got '{}'",
                line_num + 1,
                trimmed
            );
        }
        let level: usize = parts[0].parse().context("Invalid level format")?;
        let index: usize = parts[1].parse().context("Invalid index format")?;
        let hash = parse_hash(parts[2])
            .with_context(|| format!("Invalid hash format at line {}", line_num + 1))?;

        if level > level_entries.len() {
            anyhow::bail!("Layer {} appears before layer {}", level, level_entries.len());
        }
        if level == level_entries.len() {
            level_entries.push(HashMap::new());
        }
        if level_entries[level].insert(index, hash).is_some() {
            anyhow::bail!("Duplicate entry at level {}, index {}", level, index);
        }
    }

    if level_entries.is_empty() {
        anyhow::bail!("Merkle tree file is empty");
    }

    let mut layers = Vec::with_capacity(level_entries.len());
    for (level_num, level_map) in level_entries.into_iter().enumerate() {
        let mut level = Vec::with_capacity(level_map.len());
        for i in 0..level_map.len() {
            let hash = level_map
                .get(&i)
                .with_context(|| format!("Layer {} is missing index {}", level_num, i))?;
            level.push(*hash);
        }
        layers.push(level);
    }

    Ok(layers)
}

/// Everything a claimant hands to a verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimFile {
    pub merkle_root: String,
    pub address: String,
    /// Decimal string so JSON consumers keep full `u128` precision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<String>,
    pub leaf: String,
    pub leaf_index: usize,
    pub merkle_proof: Vec<String>,
    pub sides: Vec<Side>,
}

impl ClaimFile {
    pub fn new(root: &Hash, entry: &AllowlistEntry, proof: &Proof) -> Self {
        Self {
            merkle_root: hex_encode(root),
            address: hex_encode(entry.address),
            allocation: entry.allocation.map(|a| a.to_string()),
            leaf: hex_encode(entry.leaf()),
            leaf_index: proof.leaf_index,
            merkle_proof: proof.hex_siblings(),
            sides: proof.sides(),
        }
    }

    pub fn entry(&self) -> crate::error::Result<AllowlistEntry> {
        let address = parse_address(&self.address)?;
        let allocation = self
            .allocation
            .as_deref()
            .map(|text| {
                text.parse::<u128>().map_err(|e| {
                    AllowlistError::InvalidEntry(format!("invalid allocation '{text}': {e}"))
                })
            })
            .transpose()?;
        Ok(AllowlistEntry {
            address,
            allocation,
        })
    }

    pub fn proof(&self) -> crate::error::Result<Proof> {
        Proof::from_hex(self.leaf_index, &self.merkle_proof, &self.sides)
    }
}
