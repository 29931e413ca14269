#![forbid(unsafe_code)]
#![allow(unreachable_pub)]

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::EnvFilter;

mod args;
mod build_tree;
mod prove;
mod verify_claim;


#[derive(Parser, Debug)]
#[command(name = "allowlist")]
#[command(about = "Merkle allowlist CLI tools", long_about = None)]
#[command(version)]
struct Cli {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    BuildTree(build_tree::Cli),
    Prove(prove::Cli),
    Verify(verify_claim::Cli),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::BuildTree(args) => build_tree::run(args)?,
        Commands::Prove(args) => prove::run(args)?,
        Commands::Verify(args) => verify_claim::run(args)?,
    }

    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
