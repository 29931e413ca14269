use anyhow::Context;
use sha3::{Digest, Keccak256};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::error::{AllowlistError, Result};
use crate::options::PairOrdering;

/// A 20-byte account address.
pub type Address = [u8; 20];

/// A 32-byte Keccak-256 digest: leaves, internal nodes and roots.
pub type Hash = [u8; 32];

/// Parses an account address from a hex string.
///
/// # Arguments
/// * `addr_str` - The address string, with or without "0x" prefix
///
/// # Errors
/// Returns `InvalidEntry` if the address is not 40 hex characters, contains
/// invalid hex, or is the zero address.
pub fn parse_address(addr_str: &str) -> Result<Address> {
    let trimmed = addr_str.trim();
    let cleaned = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if cleaned.len() != 40 {
        return Err(AllowlistError::InvalidEntry(format!(
            "invalid address length: expected 40 hex chars, got {}",
            cleaned.len()
        )));
    }
    let mut address = [0u8; 20];
    hex::decode_to_slice(cleaned, &mut address)
        .map_err(|e| AllowlistError::InvalidEntry(format!("invalid hex encoding: {e}")))?;
    if address == [0u8; 20] {
        return Err(AllowlistError::InvalidEntry(
            "zero address not allowed".to_string(),
        ));
    }
    Ok(address)
}

/// Parses a 32-byte hash (a root, leaf or proof sibling) from hex.
///
/// Returns `None` unless the input is exactly 64 hex characters after an
/// optional "0x" prefix. Callers pick the error that fits their context.
pub fn parse_hash(hash_str: &str) -> Option<Hash> {
    let trimmed = hash_str.trim();
    let cleaned = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    if cleaned.len() != 64 {
        return None;
    }
    let mut hash = [0u8; 32];
    hex::decode_to_slice(cleaned, &mut hash).ok()?;
    Some(hash)
}

/// Parses a Merkle root given on the command line or in a root file.
pub fn validate_merkle_root(root_str: &str) -> anyhow::Result<Hash> {
    match parse_hash(root_str) {
        Some(root) => Ok(root),
        None => anyhow::bail!(
            "Invalid Merkle root '{}': expected 32 bytes of hex",
            root_str.trim()
        ),
    }
}

/// Lowercase hex with a "0x" prefix.
pub fn hex_encode(bytes: impl AsRef<[u8]>) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Keccak-256 of an arbitrary byte string.
pub fn keccak256(data: &[u8]) -> Hash {
    Keccak256::digest(data).into()
}

/// Computes a Keccak256 hash of two 32-byte values concatenated.
pub fn keccak256_hash(left: Hash, right: Hash) -> Hash {
    let hash = Keccak256::new()
        .chain_update(left)
        .chain_update(right)
        .finalize();
    hash.into()
}

/// Combines a node with its sibling under the given ordering rule.
///
/// `left` and `right` are tree positions. With [`PairOrdering::Sorted`] they
/// are reordered so the smaller hash comes first.
pub fn hash_pair(left: Hash, right: Hash, ordering: PairOrdering) -> Hash {
    match ordering {
        PairOrdering::Sorted if right < left => keccak256_hash(right, left),
        _ => keccak256_hash(left, right),
    }
}

/// Writes `contents` to a sibling temp file, then renames it over `path`.
pub fn write_file_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path).context("Failed to create temp file")?;
    file.write_all(contents.as_bytes())
        .context("Failed to write to temp file")?;
    file.flush().context("Failed to flush temp file")?;
    std::fs::rename(&temp_path, path).context("Failed to move temp file to output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_with_prefix() {
        let addr = "0x1234567890abcdef1234567890abcdef12345678";
        let result = parse_address(addr).unwrap();
        assert_eq!(result[0], 0x12);
        assert_eq!(result[19], 0x78);
    }

    #[test]
    fn test_parse_address_without_prefix() {
        let addr = "  1234567890ABCDEF1234567890abcdef12345678 ";
        let result = parse_address(addr).unwrap();
        assert_eq!(hex_encode(result), "0x1234567890abcdef1234567890abcdef12345678");
    }

    #[test]
    fn test_parse_address_invalid_length() {
        let result = parse_address("0x1234");
        assert!(matches!(result, Err(AllowlistError::InvalidEntry(_))));
    }

    #[test]
    fn test_parse_address_invalid_hex() {
        let result = parse_address("0xghijklmnopqrstuvwxyz1234567890abcdef1234");
        assert!(matches!(result, Err(AllowlistError::InvalidEntry(_))));
    }

    #[test]
    fn test_parse_address_zero() {
        let result = parse_address("0x0000000000000000000000000000000000000000");
        assert!(matches!(result, Err(AllowlistError::InvalidEntry(_))));
    }

    #[test]
    fn test_parse_hash() {
        let hex_str = format!("0x{}", "ab".repeat(32));
        assert_eq!(parse_hash(&hex_str), Some([0xab; 32]));
        assert_eq!(parse_hash(&"ab".repeat(31)), None);
        assert_eq!(parse_hash(&"zz".repeat(32)), None);
    }

    #[test]
    fn test_validate_merkle_root_rejects_short() {
        assert!(validate_merkle_root("0x1234").is_err());
        assert!(validate_merkle_root(&"00".repeat(32)).is_ok());
    }

    #[test]
    fn test_keccak256_empty() {
        // Well-known Keccak-256 of the empty string.
        assert_eq!(
            hex_encode(keccak256(&[])),
            "0xc5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_hash_pair_sorted_is_symmetric() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(
            hash_pair(a, b, PairOrdering::Sorted),
            hash_pair(b, a, PairOrdering::Sorted)
        );
        assert_eq!(hash_pair(b, a, PairOrdering::Sorted), keccak256_hash(a, b));
    }

    #[test]
    fn test_hash_pair_positional_keeps_order() {
        let a = [1u8; 32];
        let b = [2u8; 32];
        assert_eq!(hash_pair(b, a, PairOrdering::Positional), keccak256_hash(b, a));
        assert_ne!(
            hash_pair(a, b, PairOrdering::Positional),
            hash_pair(b, a, PairOrdering::Positional)
        );
    }

    #[test]
    fn test_write_file_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("root.txt");
        write_file_atomic(&path, "0xabc\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "0xabc\n");
        assert!(!path.with_extension("tmp").exists());
    }
}
