pub mod query;
pub mod update_tags;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "galaxy")]
#[command(version, about = "Resolve labels against MISP galaxies and keep applied tags current")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve free text to canonical galaxy tags
    Query(QueryArgs),
    /// Replace stale galaxy tags on events and attributes
    UpdateTags(UpdateTagsArgs),
}

#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Text to resolve
    #[arg(short, long)]
    pub query: String,

    /// Galaxies to query
    #[arg(
        short,
        long = "galaxy",
        default_values_t = [
            "mitre-intrusion-set".to_string(),
            "mitre-malware".to_string(),
            "mitre-tool".to_string(),
        ]
    )]
    pub galaxies: Vec<String>,

    /// Also accept substring matches against index keys
    #[arg(long)]
    pub partial: bool,

    /// Split the query on spaces and commas and resolve each fragment
    #[arg(long)]
    pub compound: bool,

    /// Re-download cluster data even when cached
    #[arg(short, long)]
    pub force_download: bool,

    /// Cluster cache directory (defaults to the system temp dir)
    #[arg(long, env = "GALAXY_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct UpdateTagsArgs {
    /// MISP connection config (TOML)
    #[arg(short, long, env = "GALAXY_MISP_CONFIG", default_value = "./conf/misp-tools.toml")]
    pub config: PathBuf,

    /// Log proposed renames without applying them
    #[arg(short, long)]
    pub dry_run: bool,

    /// Restrict the run to these galaxies (default: every galaxy
    /// referenced by a tag in the store)
    #[arg(short, long = "galaxy")]
    pub galaxies: Vec<String>,

    /// Cluster cache directory (defaults to the system temp dir)
    #[arg(long, env = "GALAXY_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,
}
