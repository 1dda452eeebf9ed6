//! Command-line interface definitions.
//!
//! Flags override the matching fields of the YAML configuration; anything not
//! given keeps its configured (or default) value.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the snapshot pipeline.
///
/// # Examples
///
/// ```sh
/// # Full run with defaults
/// news_snapshot
///
/// # Custom seeds, no git/DVC side effects
/// news_snapshot --seed https://www.dawn.com/ --skip-versioning
///
/// # Run one step in isolation, e.g. from an external scheduler
/// news_snapshot --config pipeline.yaml --step preprocess_data
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Optional path to a YAML config file
    #[arg(short, long, env = "NEWS_SNAPSHOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Seed homepage to scan for links (repeatable; replaces configured seeds)
    #[arg(short, long = "seed")]
    pub seeds: Vec<String>,

    /// Path of the raw extraction CSV
    #[arg(long)]
    pub raw_output: Option<PathBuf>,

    /// Path of the deduplicated, filtered CSV
    #[arg(long)]
    pub filtered_output: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Delay in seconds before a failed step is retried
    #[arg(long)]
    pub retry_delay_secs: Option<u64>,

    /// Working tree for git and dvc commands
    #[arg(long, env = "NEWS_SNAPSHOT_REPO_DIR")]
    pub repo_dir: Option<PathBuf>,

    /// Do not run the git/DVC steps
    #[arg(long)]
    pub skip_versioning: bool,

    /// Run only the named step
    #[arg(long)]
    pub step: Option<String>,

    /// Print the step names in execution order and exit
    #[arg(long)]
    pub list_steps: bool,
}
