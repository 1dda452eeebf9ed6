//! Pipeline configuration.
//!
//! Settings come from an optional YAML file; every field has a default so an
//! empty file (or no file at all) yields a runnable configuration. Selected
//! fields can then be overridden from the command line.
//!
//! ```yaml
//! seeds:
//!   - https://www.dawn.com/
//!   - https://www.bbc.com/
//! raw_output: data/extracted_data.csv
//! filtered_output: data/preprocessed_data.csv
//! fetch_timeout_secs: 30
//! step_retries: 1
//! retry_delay_secs: 300
//! versioning:
//!   enabled: true
//!   repo_dir: .
//!   dvc_remote_name: gdrive
//!   dvc_remote_url: gdrive://<folder-id>
//!   git_remote_url: https://github.com/<owner>/<repo>.git
//!   branch: main
//! ```

use crate::cli::Cli;
use crate::errors::PipelineError;
use crate::versioning::repo_relative;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};
use url::Url;

pub const DEFAULT_SEEDS: [&str; 2] = ["https://www.dawn.com/", "https://www.bbc.com/"];

/// Top-level pipeline settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Homepages scanned for article links, in order.
    pub seeds: Vec<String>,
    /// Snapshot written straight after extraction.
    pub raw_output: PathBuf,
    /// Snapshot written after deduplication and filtering.
    pub filtered_output: PathBuf,
    /// Upper bound for any single page fetch.
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// Extra attempts granted to a failed step.
    pub step_retries: usize,
    /// Wait before retrying a failed step.
    pub retry_delay_secs: u64,
    pub versioning: VersioningConfig,
}

/// Settings for the git + DVC steps.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VersioningConfig {
    pub enabled: bool,
    /// Working tree the git and dvc commands run in.
    pub repo_dir: PathBuf,
    pub dvc_remote_name: String,
    /// Remote storage URL; no remote is configured when unset.
    pub dvc_remote_url: Option<String>,
    /// Git remote for `origin`; nothing is pushed to git when unset.
    pub git_remote_url: Option<String>,
    pub branch: String,
    pub commit_message: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            seeds: DEFAULT_SEEDS.iter().map(|s| s.to_string()).collect(),
            raw_output: PathBuf::from("data/extracted_data.csv"),
            filtered_output: PathBuf::from("data/preprocessed_data.csv"),
            fetch_timeout_secs: 30,
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
            step_retries: 1,
            retry_delay_secs: 300,
            versioning: VersioningConfig::default(),
        }
    }
}

impl Default for VersioningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repo_dir: PathBuf::from("."),
            dvc_remote_name: "gdrive".to_string(),
            dvc_remote_url: None,
            git_remote_url: None,
            branch: "main".to_string(),
            commit_message: "Update preprocessed dataset".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Parse a YAML document.
    pub fn from_yaml(text: &str) -> Result<Self, PipelineError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text).map_err(|e| PipelineError::Config(e.to_string()))
    }

    /// Load from `path`, or use defaults when no path is given.
    #[instrument(level = "info")]
    pub async fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let Some(path) = path else {
            debug!("No config file given; using defaults");
            return Ok(Self::default());
        };
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            PipelineError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config = Self::from_yaml(&text)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Apply command-line overrides on top of file settings.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if !cli.seeds.is_empty() {
            self.seeds = cli.seeds.clone();
        }
        if let Some(p) = &cli.raw_output {
            self.raw_output = p.clone();
        }
        if let Some(p) = &cli.filtered_output {
            self.filtered_output = p.clone();
        }
        if let Some(t) = cli.timeout_secs {
            self.fetch_timeout_secs = t;
        }
        if let Some(d) = cli.retry_delay_secs {
            self.retry_delay_secs = d;
        }
        if let Some(dir) = &cli.repo_dir {
            self.versioning.repo_dir = dir.clone();
        }
        if cli.skip_versioning {
            self.versioning.enabled = false;
        }
    }

    /// Reject settings that would make the run meaningless.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.seeds.is_empty() {
            return Err(PipelineError::Config("at least one seed URL is required".into()));
        }
        for seed in &self.seeds {
            let url = Url::parse(seed)
                .map_err(|e| PipelineError::Config(format!("invalid seed {seed}: {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(PipelineError::Config(format!(
                    "seed {seed} must use http or https"
                )));
            }
        }
        if self.raw_output == self.filtered_output {
            return Err(PipelineError::Config(
                "raw and filtered outputs must be different files".into(),
            ));
        }
        if self.fetch_timeout_secs == 0 {
            return Err(PipelineError::Config("fetch_timeout_secs must be positive".into()));
        }
        if self.versioning.enabled {
            repo_relative(&self.versioning.repo_dir, &self.filtered_output)?;
        }
        Ok(())
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }
}
