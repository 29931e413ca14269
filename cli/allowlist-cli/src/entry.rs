//! Allowlist entries and their leaf encoding.
//!
//! A leaf is the Keccak-256 of the packed entry bytes:
//!
//! * address only: `keccak256(address)` (20 bytes in),
//! * with allocation: `keccak256(address || uint256_be(allocation))` (52 bytes in).
//!
//! These match Solidity's `keccak256(abi.encodePacked(...))` for the same
//! arguments. Neither preimage is 64 bytes long, so a leaf can never be
//! replayed as an internal node.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::{hex_encode, keccak256, parse_address, Address, Hash};
use crate::error::{AllowlistError, Result};

/// One admitted participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AllowlistEntry {
    pub address: Address,
    /// Optional entitlement, e.g. the maximum number of tokens claimable.
    pub allocation: Option<u128>,
}

impl AllowlistEntry {
    pub fn new(address: Address) -> Self {
        Self {
            address,
            allocation: None,
        }
    }

    pub fn with_allocation(address: Address, allocation: u128) -> Self {
        Self {
            address,
            allocation: Some(allocation),
        }
    }

    /// Builds an entry from a raw identifier, which must be exactly 20 bytes.
    pub fn from_bytes(bytes: &[u8], allocation: Option<u128>) -> Result<Self> {
        let address: Address = bytes.try_into().map_err(|_| {
            AllowlistError::InvalidEntry(format!(
                "identifier must be 20 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self {
            address,
            allocation,
        })
    }

    /// The exact byte string fed to the hash.
    pub fn packed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(52);
        out.extend_from_slice(&self.address);
        if let Some(allocation) = self.allocation {
            let mut word = [0u8; 32];
            word[16..].copy_from_slice(&allocation.to_be_bytes());
            out.extend_from_slice(&word);
        }
        out
    }

    pub fn leaf(&self) -> Hash {
        keccak256(&self.packed())
    }
}

/// Maps an entry to its leaf hash.
pub fn encode_leaf(entry: &AllowlistEntry) -> Hash {
    entry.leaf()
}

impl fmt::Display for AllowlistEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex_encode(self.address))?;
        if let Some(allocation) = self.allocation {
            write!(f, ",{allocation}")?;
        }
        Ok(())
    }
}

/// Parses `0xADDRESS` or `0xADDRESS,ALLOCATION`.
impl FromStr for AllowlistEntry {
    type Err = AllowlistError;

    fn from_str(s: &str) -> Result<Self> {
        let (addr_part, allocation_part) = match s.split_once(',') {
            Some((addr, alloc)) => (addr, Some(alloc.trim())),
            None => (s, None),
        };
        let address = parse_address(addr_part)?;
        let allocation = allocation_part
            .map(|text| {
                text.parse::<u128>().map_err(|e| {
                    AllowlistError::InvalidEntry(format!("invalid allocation '{text}': {e}"))
                })
            })
            .transpose()?;
        Ok(Self {
            address,
            allocation,
        })
    }
}
