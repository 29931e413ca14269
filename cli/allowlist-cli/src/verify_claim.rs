use allowlist_cli::artifact::ClaimFile;
use allowlist_cli::{ensure_member, hex_encode, parse_hash, validate_merkle_root, PairOrdering};
use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "verify")]
#[command(about = "Check a claim JSON against a Merkle root", long_about = None)]
pub struct Cli {
    /// Claim JSON produced by `prove`
    #[arg(short, long)]
    claim: PathBuf,

    /// Trusted Merkle root (hex format)
    #[arg(short, long)]
    root: String,

    /// Hash pairs in tree position order instead of ascending byte order
    #[arg(long, env = "ALLOWLIST_POSITIONAL")]
    positional: bool,
}

pub fn run(cli: Cli) -> Result<()> {
    let root = validate_merkle_root(&cli.root).context("Invalid Merkle root")?;

    info!("Reading claim from {:?}", cli.claim);
    let content = fs::read_to_string(&cli.claim).context("Failed to read claim file")?;
    let claim: ClaimFile = serde_json::from_str(&content).context("Failed to parse claim JSON")?;

    let entry = claim.entry().context("Invalid claim entry")?;
    let proof = claim.proof().context("Invalid claim proof")?;
    if parse_hash(&claim.leaf) != Some(entry.leaf()) {
        anyhow::bail!(
            "Claim leaf {} does not encode {} (expected {})",
            claim.leaf,
            entry,
            hex_encode(entry.leaf())
        );
    }
    if parse_hash(&claim.merkle_root) != Some(root) {
        warn!(
            claim_root = %claim.merkle_root,
            "Claim was generated for a different root"
        );
    }

    let ordering = if cli.positional {
        PairOrdering::Positional
    } else {
        PairOrdering::Sorted
    };
    ensure_member(&entry, &proof, &root, ordering).context("proof rejected")?;

    println!("Proof accepted: {} is in the allowlist", entry);
    Ok(())
}
