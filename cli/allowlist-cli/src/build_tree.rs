use allowlist_cli::artifact::{format_index_map, format_layers, index_records, parse_allowlist};
use allowlist_cli::{hex_encode, write_file_atomic, AllowlistTree, TreeOptions};
use anyhow::{Context, Result};
use clap::Parser;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;

use crate::args::TreeArgs;

#[derive(Parser, Debug)]
#[command(name = "build-tree")]
#[command(about = "Build Merkle tree from allowlisted accounts", long_about = None)]
pub struct Cli {
    /// Input file with one address per line, optionally followed by ",ALLOCATION"
    #[arg(short, long)]
    input: PathBuf,

    /// Output file for Merkle root
    #[arg(short, long)]
    root_output: PathBuf,

    /// Output file for index map (address -> leaf index)
    #[arg(short = 'x', long)]
    index_output: PathBuf,

    /// Output file for Merkle tree layers (for proof generation)
    #[arg(short, long)]
    tree_output: Option<PathBuf>,

    #[command(flatten)]
    tree: TreeArgs,
}

pub fn run(cli: Cli) -> Result<()> {
    info!("Reading allowlist from {:?}", cli.input);
    let file = File::open(&cli.input).context("Failed to open input file")?;
    let entries = parse_allowlist(BufReader::new(file)).context("Failed to parse allowlist")?;

    let options = TreeOptions::from(&cli.tree);
    info!(entries = entries.len(), ?options, "Building Merkle tree");
    let tree = AllowlistTree::build(entries.iter().copied(), &options)
        .context("Failed to build Merkle tree")?;
    let root = hex_encode(tree.root());

    // The root file is written only after every other output.
    let records = index_records(&entries, &tree);
    write_file_atomic(&cli.index_output, &format_index_map(&records))
        .context("Failed to write index")?;

    if let Some(tree_path) = &cli.tree_output {
        info!("Writing Merkle tree to {:?}", tree_path);
        write_file_atomic(tree_path, &format_layers(&tree)).context("Failed to write tree")?;
    }

    write_file_atomic(&cli.root_output, &format!("{root}\n")).context("Failed to write root")?;

    println!("Merkle root: {root}");
    println!("Leaves: {} (depth {})", tree.len(), tree.depth());
    Ok(())
}
