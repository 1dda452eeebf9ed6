//! Error types for the snapshot pipeline.
//!
//! Two layers of failure exist:
//! - [`FetchError`]: a single page could not be retrieved. Article fetches
//!   recover from it per link; seed fetches escalate it.
//! - [`PipelineError`]: a step-level failure that aborts the current step and
//!   is handed to the step retry wrapper.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to retrieve one page.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP status {status} for {url}")]
    Status { url: String, status: u16 },
}

/// Step-level failures.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("seed fetch failed for {url}: {source}")]
    SeedFetch {
        url: String,
        #[source]
        source: FetchError,
    },

    #[error("dataset io error at {}: {source}", path.display())]
    DatasetIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("dataset format error at {}: {source}", path.display())]
    DatasetFormat {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("`{command}` exited with status {code:?}: {stderr}")]
    Command {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("config error: {0}")]
    Config(String),

    #[error("unknown step: {0}")]
    UnknownStep(String),
}
