use allowlist_cli::artifact::{find_record, parse_index_map, parse_layers, ClaimFile};
use allowlist_cli::{
    hex_encode, parse_address, validate_merkle_root, write_file_atomic, AllowlistTree, TreeOptions,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;

use crate::args::TreeArgs;

#[derive(Parser, Debug)]
#[command(name = "prove")]
#[command(about = "Generate an allowlist membership proof", long_about = None)]
pub struct Cli {
    /// Path to Merkle tree file
    #[arg(short = 't', long)]
    tree: PathBuf,

    /// Path to index map file
    #[arg(short = 'i', long)]
    index_map: PathBuf,

    /// Address to prove membership for
    #[arg(short = 'a', long)]
    address: String,

    /// Allocation to prove, when the address is listed with several
    #[arg(long)]
    allocation: Option<u128>,

    /// Published Merkle root (hex format)
    #[arg(short, long)]
    root: String,

    /// Output JSON file
    #[arg(short, long)]
    output: PathBuf,

    #[command(flatten)]
    options: TreeArgs,
}

pub fn run(cli: Cli) -> Result<()> {
    let expected_root = validate_merkle_root(&cli.root).context("Invalid Merkle root")?;
    let options = TreeOptions::from(&cli.options);

    info!("Loading Merkle tree from {:?}", cli.tree);
    let file = File::open(&cli.tree).context("Failed to open Merkle tree file")?;
    let layers = parse_layers(BufReader::new(file)).context("Failed to load Merkle tree")?;
    let tree = AllowlistTree::from_layers(layers, &options)
        .context("Merkle tree file is inconsistent with the tree options")?;
    if tree.root() != expected_root {
        anyhow::bail!(
            "Merkle tree root {} does not match the published root {}",
            hex_encode(tree.root()),
            hex_encode(expected_root)
        );
    }

    info!("Loading index map from {:?}", cli.index_map);
    let file = File::open(&cli.index_map).context("Failed to open index map file")?;
    let records = parse_index_map(BufReader::new(file)).context("Failed to load index map")?;

    let address = parse_address(&cli.address).context("Invalid address")?;
    let record = find_record(&records, &address, cli.allocation)
        .context("Address not found in allowlist")?;
    if record.leaf_index >= tree.len() {
        anyhow::bail!(
            "Leaf index {} is out of bounds for tree with {} leaves",
            record.leaf_index,
            tree.len()
        );
    }

    info!(entry = %record.entry, "Generating Merkle proof");
    let proof = tree
        .prove(&record.entry)
        .context("Failed to generate Merkle proof")?;
    if proof.leaf_index != record.leaf_index {
        anyhow::bail!(
            "Index map places {} at leaf {}, but the tree has it at leaf {}",
            record.entry,
            record.leaf_index,
            proof.leaf_index
        );
    }
    if proof.is_empty() && tree.len() > 1 {
        anyhow::bail!("Invalid Merkle proof: proof is empty but tree has multiple leaves");
    }
    if !tree.verify(&record.entry, &proof) {
        anyhow::bail!("Generated proof does not verify against the tree root");
    }

    let claim = ClaimFile::new(&tree.root(), &record.entry, &proof);
    info!("Writing claim JSON to {:?}", cli.output);
    let json_output = serde_json::to_string_pretty(&claim).context("Failed to serialize JSON")?;
    write_file_atomic(&cli.output, &json_output).context("Failed to write claim file")?;

    println!("Address: {}", claim.address);
    if let Some(allocation) = &claim.allocation {
        println!("Allocation: {allocation}");
    }
    println!("Leaf: {} (index {})", claim.leaf, claim.leaf_index);
    println!("Proof length: {} nodes", proof.len());
    for sibling in &claim.merkle_proof {
        println!("  {sibling}");
    }

    Ok(())
}
