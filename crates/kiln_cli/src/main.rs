//! Kiln CLI — the administrative interface for the Kiln compiler cache.
//!
//! Provides `kiln stats` for the cross-shard usage summary, `kiln zero` to
//! reset counters, `kiln set-limits` to configure cache-wide capacity
//! limits, and `kiln set-sizes` for rebuild tooling that has rescanned a
//! shard directory.

#![warn(missing_docs)]

mod admin;
mod stats;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use kiln_stats::StatsStore;

/// Kiln — a fast compiler cache.
#[derive(Parser, Debug)]
#[command(name = "kiln", version, about = "Kiln compiler cache")]
pub struct Cli {
    /// Cache directory (defaults to `$KILN_DIR`, then `~/.kiln`).
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show summary statistics across all cache shards.
    Stats(StatsArgs),
    /// Reset statistics counters; configured limits are kept.
    Zero,
    /// Set cache-wide limits, divided evenly across the 16 shards.
    SetLimits(SetLimitsArgs),
    /// Overwrite the recorded file count and size of one shard directory.
    SetSizes(SetSizesArgs),
}

/// Arguments for the `kiln stats` subcommand.
#[derive(Parser, Debug)]
pub struct StatsArgs {
    /// Output format.
    #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,
}

/// Arguments for the `kiln set-limits` subcommand.
#[derive(Parser, Debug)]
pub struct SetLimitsArgs {
    /// Maximum number of files across the whole cache (0 means no limit).
    #[arg(long)]
    pub max_files: Option<u64>,

    /// Maximum total cache size, e.g. "10G", "500M", or a kibibyte count
    /// (0 means no limit).
    #[arg(long)]
    pub max_size: Option<String>,
}

/// Arguments for the `kiln set-sizes` subcommand.
#[derive(Parser, Debug)]
pub struct SetSizesArgs {
    /// The shard directory whose counters to overwrite.
    pub shard_dir: PathBuf,

    /// Number of files in the shard.
    pub num_files: u64,

    /// Total size of the shard, e.g. "800K" or a kibibyte count.
    pub total_size: String,
}

/// Summary output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

fn main() {
    let cli = Cli::parse();

    let result = run(cli);
    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let config = kiln_config::load_config(cli.cache_dir.as_deref())?;
    let store = StatsStore::new(&config.cache_dir, config.lock_staleness);

    match cli.command {
        Command::Stats(ref args) => stats::run(&store, args),
        Command::Zero => admin::zero(&store),
        Command::SetLimits(ref args) => admin::set_limits(&store, args),
        Command::SetSizes(ref args) => admin::set_sizes(&store, args),
    }
}
