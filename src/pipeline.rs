//! Ordered, named pipeline steps.
//!
//! Every unit of work implements [`Step`]: it takes input artifact paths and
//! returns output artifact paths. A [`Pipeline`] owns the steps in execution
//! order and feeds each step's outputs to the next one. A scheduler can also
//! run a single step by name with that step's configured inputs.
//!
//! # Retry Strategy
//!
//! [`RetryStep`] wraps any step with a fixed number of extra attempts
//! (one by default). The delay between attempts is constant plus a small
//! random jitter; records are never retried individually.
//!
//! # Steps
//!
//! | Name                 | Inputs           | Outputs          |
//! |----------------------|------------------|------------------|
//! | `extract_data`       | none             | raw dataset      |
//! | `preprocess_data`    | raw dataset      | filtered dataset |
//! | `setup_dvc`          | filtered dataset | same             |
//! | `add_data_to_dvc`    | filtered dataset | same             |
//! | `push_to_remote`     | filtered dataset | same             |
//! | `integrate_with_git` | filtered dataset | same             |

use crate::config::PipelineConfig;
use crate::dataset::{read_records, write_records};
use crate::errors::PipelineError;
use crate::fetch::PageFetcher;
use crate::filter::preprocess;
use crate::scrapers::{articles, links};
use crate::versioning::{CommandRunner, VersionControl};
use async_trait::async_trait;
use rand::{Rng, rng};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// A named unit of work mapping input artifacts to output artifacts.
#[async_trait]
pub trait Step: Send + Sync {
    fn name(&self) -> &str;

    /// Artifacts used when the step is run on its own.
    fn default_inputs(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    async fn run(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>, PipelineError>;
}

/// Adds step-level retries with a fixed delay to any [`Step`].
pub struct RetryStep<S> {
    inner: S,
    max_retries: usize,
    delay: Duration,
}

impl<S: Step> RetryStep<S> {
    pub fn new(inner: S, max_retries: usize, delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            delay,
        }
    }
}

impl<S> fmt::Debug for RetryStep<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryStep")
            .field("max_retries", &self.max_retries)
            .field("delay", &self.delay)
            .finish()
    }
}

#[async_trait]
impl<S: Step> Step for RetryStep<S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn default_inputs(&self) -> Vec<PathBuf> {
        self.inner.default_inputs()
    }

    async fn run(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>, PipelineError> {
        let step = self.inner.name();
        let mut attempt = 0usize;
        loop {
            let t0 = Instant::now();
            match self.inner.run(inputs).await {
                Ok(outputs) => return Ok(outputs),
                Err(e) => {
                    attempt += 1;
                    let elapsed_ms = t0.elapsed().as_millis() as u64;
                    if attempt > self.max_retries {
                        error!(
                            step,
                            attempt,
                            max = self.max_retries,
                            elapsed_ms,
                            error = %e,
                            "Step exhausted retries"
                        );
                        return Err(e);
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = self.delay + Duration::from_millis(jitter_ms);
                    warn!(
                        step,
                        attempt,
                        max = self.max_retries,
                        elapsed_ms,
                        ?delay,
                        error = %e,
                        "Step failed; retrying"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// An ordered list of steps.
#[derive(Default)]
pub struct Pipeline {
    steps: Vec<Box<dyn Step>>,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step.
    pub fn then(mut self, step: impl Step + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Run every step in order, piping outputs into the next step.
    ///
    /// Returns the artifacts produced by the last step.
    #[instrument(level = "info", skip_all, fields(steps = self.steps.len()))]
    pub async fn run(&self) -> Result<Vec<PathBuf>, PipelineError> {
        let mut artifacts = Vec::new();
        for step in &self.steps {
            let t0 = Instant::now();
            info!(step = step.name(), inputs = ?artifacts, "Starting step");
            let outputs = step.run(&artifacts).await?;
            artifacts = outputs;
            info!(
                step = step.name(),
                outputs = ?artifacts,
                elapsed_ms = t0.elapsed().as_millis() as u64,
                "Step completed"
            );
        }
        Ok(artifacts)
    }

    /// Run one step by name with its configured inputs.
    #[instrument(level = "info", skip(self))]
    pub async fn run_step(&self, name: &str) -> Result<Vec<PathBuf>, PipelineError> {
        let step = self
            .steps
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| PipelineError::UnknownStep(name.to_string()))?;
        let inputs = step.default_inputs();
        step.run(&inputs).await
    }
}

/// Discover links, fetch articles, write the raw dataset.
pub struct ExtractStep {
    fetcher: Arc<dyn PageFetcher>,
    seeds: Vec<String>,
    output: PathBuf,
}

impl ExtractStep {
    pub fn new(fetcher: Arc<dyn PageFetcher>, seeds: Vec<String>, output: PathBuf) -> Self {
        Self {
            fetcher,
            seeds,
            output,
        }
    }
}

#[async_trait]
impl Step for ExtractStep {
    fn name(&self) -> &str {
        "extract_data"
    }

    async fn run(&self, _inputs: &[PathBuf]) -> Result<Vec<PathBuf>, PipelineError> {
        let candidates = links::index_links(self.fetcher.as_ref(), &self.seeds).await?;
        let records = articles::fetch_articles(self.fetcher.as_ref(), &candidates).await;
        write_records(&self.output, &records).await?;
        Ok(vec![self.output.clone()])
    }
}

/// Reload the raw dataset, deduplicate and filter, write the filtered dataset.
pub struct PreprocessStep {
    input: PathBuf,
    output: PathBuf,
}

impl PreprocessStep {
    pub fn new(input: PathBuf, output: PathBuf) -> Self {
        Self { input, output }
    }
}

#[async_trait]
impl Step for PreprocessStep {
    fn name(&self) -> &str {
        "preprocess_data"
    }

    fn default_inputs(&self) -> Vec<PathBuf> {
        vec![self.input.clone()]
    }

    async fn run(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>, PipelineError> {
        let input = inputs.first().unwrap_or(&self.input);
        let raw = read_records(input).await?;
        let outcome = preprocess(raw);
        write_records(&self.output, &outcome.records).await?;
        Ok(vec![self.output.clone()])
    }
}

/// Which version-control operation a [`VersioningStep`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersioningAction {
    Setup,
    Track,
    Push,
    Integrate,
}

impl VersioningAction {
    pub const ALL: [VersioningAction; 4] = [
        VersioningAction::Setup,
        VersioningAction::Track,
        VersioningAction::Push,
        VersioningAction::Integrate,
    ];

    pub fn step_name(self) -> &'static str {
        match self {
            VersioningAction::Setup => "setup_dvc",
            VersioningAction::Track => "add_data_to_dvc",
            VersioningAction::Push => "push_to_remote",
            VersioningAction::Integrate => "integrate_with_git",
        }
    }
}

/// One git/DVC operation over the filtered dataset; passes its inputs through.
pub struct VersioningStep<R> {
    action: VersioningAction,
    vc: Arc<VersionControl<R>>,
    dataset: PathBuf,
}

impl<R> VersioningStep<R> {
    pub fn new(action: VersioningAction, vc: Arc<VersionControl<R>>, dataset: PathBuf) -> Self {
        Self {
            action,
            vc,
            dataset,
        }
    }
}

#[async_trait]
impl<R: CommandRunner + 'static> Step for VersioningStep<R> {
    fn name(&self) -> &str {
        self.action.step_name()
    }

    fn default_inputs(&self) -> Vec<PathBuf> {
        vec![self.dataset.clone()]
    }

    async fn run(&self, inputs: &[PathBuf]) -> Result<Vec<PathBuf>, PipelineError> {
        let dataset = inputs.first().unwrap_or(&self.dataset);
        match self.action {
            VersioningAction::Setup => self.vc.setup().await?,
            VersioningAction::Track => self.vc.track(dataset).await?,
            VersioningAction::Push => self.vc.push().await?,
            VersioningAction::Integrate => self.vc.integrate().await?,
        }
        Ok(inputs.to_vec())
    }
}

/// Assemble the standard pipeline from configuration.
pub fn build_pipeline<R>(
    config: &PipelineConfig,
    fetcher: Arc<dyn PageFetcher>,
    runner: R,
) -> Pipeline
where
    R: CommandRunner + 'static,
{
    let retries = config.step_retries;
    let delay = config.retry_delay();

    let mut pipeline = Pipeline::new()
        .then(RetryStep::new(
            ExtractStep::new(fetcher, config.seeds.clone(), config.raw_output.clone()),
            retries,
            delay,
        ))
        .then(RetryStep::new(
            PreprocessStep::new(config.raw_output.clone(), config.filtered_output.clone()),
            retries,
            delay,
        ));

    if config.versioning.enabled {
        let vc = Arc::new(VersionControl::new(runner, config.versioning.clone()));
        for action in VersioningAction::ALL {
            pipeline = pipeline.then(RetryStep::new(
                VersioningStep::new(action, Arc::clone(&vc), config.filtered_output.clone()),
                retries,
                delay,
            ));
        }
    }
    pipeline
}
