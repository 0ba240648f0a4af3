use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "confector",
    about = "Confector: build typed, validated Kubun archives",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate schema files and resolve the links between them
    Check(CheckArgs),
    /// Build an archive from a manifest
    Build(BuildArgs),
    /// Show the entries, node counts and metadata of an archive
    Inspect(InspectArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    /// Schema files; each collection is named after its file stem
    #[arg(required = true)]
    pub schemata: Vec<PathBuf>,
}

#[derive(Args)]
pub struct BuildArgs {
    /// Build manifest (TOML)
    pub manifest: PathBuf,
    /// Write the archive here instead of the manifest's `archive` path
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct InspectArgs {
    pub archive: PathBuf,
}
