//! # News Snapshot
//!
//! A batch pipeline that scrapes news homepages for article links, extracts
//! each article's title and `og:description`, deduplicates and filters the
//! result, and tracks the cleaned dataset with DVC and git.
//!
//! ## Usage
//!
//! ```sh
//! news_snapshot --config pipeline.yaml
//! news_snapshot --skip-versioning --seed https://www.bbc.com/
//! news_snapshot --step preprocess_data
//! ```
//!
//! ## Architecture
//!
//! The application is a strictly linear chain of named steps:
//! 1. **extract_data**: discover links on each seed, fetch every link, write
//!    the raw CSV
//! 2. **preprocess_data**: reload the raw CSV, deduplicate, drop non-ASCII
//!    entries, write the filtered CSV
//! 3. **setup_dvc**, **add_data_to_dvc**, **push_to_remote**,
//!    **integrate_with_git**: version the filtered CSV
//!
//! Each step gets one retry on failure before the run is reported as failed.

use clap::Parser;
use std::error::Error;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod dataset;
mod errors;
mod fetch;
mod filter;
mod models;
mod pipeline;
mod scrapers;
mod utils;
mod versioning;

use cli::Cli;
use config::PipelineConfig;
use fetch::HttpFetcher;
use pipeline::build_pipeline;
use utils::ensure_writable_dir;
use versioning::ProcessRunner;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news_snapshot starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let mut config = PipelineConfig::load(args.config.as_deref()).await?;
    config.apply_cli(&args);
    config.validate()?;
    debug!(?config, "Effective configuration");

    let fetcher = HttpFetcher::new(config.fetch_timeout(), &config.user_agent)?;
    let pipeline = build_pipeline(&config, Arc::new(fetcher), ProcessRunner);

    if args.list_steps {
        for name in pipeline.names() {
            println!("{name}");
        }
        return Ok(());
    }

    // Early check: fail before any network work if outputs cannot be written
    for output in [&config.raw_output, &config.filtered_output] {
        let dir = output
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        if let Err(e) = ensure_writable_dir(dir).await {
            error!(path = %dir.display(), error = %e, "Output directory is not writable");
            return Err(e.into());
        }
    }

    let result = match args.step.as_deref() {
        Some(name) => pipeline.run_step(name).await,
        None => pipeline.run().await,
    };

    let elapsed = start_time.elapsed();
    match result {
        Ok(artifacts) => {
            info!(
                ?artifacts,
                secs = elapsed.as_secs(),
                millis = elapsed.subsec_millis(),
                "Execution complete"
            );
            Ok(())
        }
        Err(e) => {
            error!(error = %e, secs = elapsed.as_secs(), "Pipeline run failed");
            Err(e.into())
        }
    }
}
