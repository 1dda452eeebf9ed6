//! Git and DVC integration for the filtered dataset.
//!
//! Every command goes through a [`CommandRunner`] and its exit status is
//! checked. A non-zero exit is a [`PipelineError::Command`], except for the
//! few query commands whose exit code is the answer (staged changes, existing
//! remote).
//!
//! # Operations
//!
//! | Step                 | Commands                                               |
//! |----------------------|--------------------------------------------------------|
//! | `setup_dvc`          | `git init`, `dvc init`, `dvc remote add`               |
//! | `add_data_to_dvc`    | `dvc add`, `git add`, `git commit`, `dvc commit`       |
//! | `push_to_remote`     | `dvc push`                                             |
//! | `integrate_with_git` | `git add .dvc`, `git commit`, `git remote`, `git push` |

use crate::config::VersioningConfig;
use crate::errors::PipelineError;
use async_trait::async_trait;
use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

/// Outcome of one finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs an external program to completion.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program args...` inside `cwd`.
    ///
    /// Only a failure to launch is an error here; exit codes are returned.
    async fn run(
        &self,
        cwd: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<CommandOutput, PipelineError>;
}

/// [`CommandRunner`] spawning real processes.
#[derive(Debug, Default, Clone)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        cwd: &Path,
        program: &str,
        args: &[&str],
    ) -> Result<CommandOutput, PipelineError> {
        let output = Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .await
            .map_err(|e| PipelineError::Command {
                command: render(program, args),
                code: None,
                stderr: e.to_string(),
            })?;
        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn render(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Git + DVC operations over one working tree.
#[derive(Debug, Clone)]
pub struct VersionControl<R> {
    runner: R,
    settings: VersioningConfig,
}

impl<R: CommandRunner> VersionControl<R> {
    pub fn new(runner: R, settings: VersioningConfig) -> Self {
        Self { runner, settings }
    }

    async fn query(&self, program: &str, args: &[&str]) -> Result<CommandOutput, PipelineError> {
        debug!(command = %render(program, args), "Querying");
        self.runner.run(&self.settings.repo_dir, program, args).await
    }

    async fn checked(&self, program: &str, args: &[&str]) -> Result<CommandOutput, PipelineError> {
        let command = render(program, args);
        info!(%command, "Running");
        let output = self.runner.run(&self.settings.repo_dir, program, args).await?;
        if !output.success() {
            warn!(%command, code = ?output.code, stderr = %output.stderr.trim(), "Command failed");
            return Err(PipelineError::Command {
                command,
                code: output.code,
                stderr: output.stderr.trim().to_string(),
            });
        }
        Ok(output)
    }

    /// Commit staged changes, if there are any.
    ///
    /// Returns whether a commit was made.
    async fn commit_if_staged(&self, message: &str) -> Result<bool, PipelineError> {
        let diff = self.query("git", &["diff", "--cached", "--quiet"]).await?;
        match diff.code {
            Some(0) => {
                info!("Nothing staged; skipping commit");
                Ok(false)
            }
            Some(1) => {
                self.checked("git", &["commit", "-m", message]).await?;
                Ok(true)
            }
            code => Err(PipelineError::Command {
                command: "git diff --cached --quiet".to_string(),
                code,
                stderr: diff.stderr.trim().to_string(),
            }),
        }
    }

    fn stamped_message(&self) -> String {
        format!(
            "{} ({})",
            self.settings.commit_message,
            Local::now().format("%Y-%m-%d %H:%M")
        )
    }

    /// Initialize git and DVC and register the default DVC remote.
    #[instrument(level = "info", skip(self))]
    pub async fn setup(&self) -> Result<(), PipelineError> {
        self.checked("git", &["init"]).await?;

        if self.settings.repo_dir.join(".dvc").is_dir() {
            info!("DVC already initialized");
        } else {
            self.checked("dvc", &["init"]).await?;
        }

        if let Some(url) = &self.settings.dvc_remote_url {
            let name = self.settings.dvc_remote_name.as_str();
            self.checked(
                "dvc",
                &["remote", "add", "--default", "--force", name, url.as_str()],
            )
            .await?;
        } else {
            warn!("No DVC remote configured; push will use whatever remote exists");
        }
        Ok(())
    }

    /// Track `dataset` with DVC and commit its pointer file to git.
    ///
    /// `dataset` is resolved against the process working directory and must
    /// lie inside `repo_dir`; dvc and git receive the repo-relative path.
    #[instrument(level = "info", skip_all, fields(dataset = %dataset.display()))]
    pub async fn track(&self, dataset: &Path) -> Result<(), PipelineError> {
        let dataset = repo_relative(&self.settings.repo_dir, dataset)?;
        let dataset = dataset.as_path();
        let dataset_arg = dataset.to_string_lossy().into_owned();
        self.checked("dvc", &["add", dataset_arg.as_str()]).await?;

        let pointer = pointer_file(dataset);
        let ignore = dataset
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.join(".gitignore"))
            .unwrap_or_else(|| PathBuf::from(".gitignore"));
        let pointer_arg = pointer.to_string_lossy().into_owned();
        let ignore_arg = ignore.to_string_lossy().into_owned();
        self.checked("git", &["add", pointer_arg.as_str(), ignore_arg.as_str()])
            .await?;

        self.commit_if_staged(&self.stamped_message()).await?;
        self.checked("dvc", &["commit", "--force"]).await?;
        Ok(())
    }

    /// Upload tracked data to the DVC remote.
    #[instrument(level = "info", skip(self))]
    pub async fn push(&self) -> Result<(), PipelineError> {
        self.checked("dvc", &["push"]).await?;
        Ok(())
    }

    /// Commit DVC metadata and push the branch to the git remote.
    #[instrument(level = "info", skip(self))]
    pub async fn integrate(&self) -> Result<(), PipelineError> {
        self.checked("git", &["add", ".dvc"]).await?;
        self.commit_if_staged("Add DVC metafiles").await?;

        let Some(url) = &self.settings.git_remote_url else {
            warn!("No git remote configured; skipping git push");
            return Ok(());
        };
        let branch = self.settings.branch.as_str();

        let existing = self.query("git", &["remote", "get-url", "origin"]).await?;
        if existing.success() {
            if existing.stdout.trim() != url.as_str() {
                self.checked("git", &["remote", "set-url", "origin", url.as_str()])
                    .await?;
            }
        } else {
            self.checked("git", &["remote", "add", "origin", url.as_str()])
                .await?;
        }
        self.checked("git", &["branch", "-M", branch]).await?;
        self.checked("git", &["push", "-u", "origin", branch]).await?;
        Ok(())
    }
}

/// Express `path` relative to `repo_dir`.
///
/// Both are made absolute against the current directory first.
///
/// # Errors
///
/// [`PipelineError::Config`] when `path` is outside `repo_dir` or either path
/// cannot be made absolute.
pub fn repo_relative(repo_dir: &Path, path: &Path) -> Result<PathBuf, PipelineError> {
    let absolute = |p: &Path| {
        std::path::absolute(p)
            .map_err(|e| PipelineError::Config(format!("cannot resolve {}: {e}", p.display())))
    };
    let repo = absolute(repo_dir)?;
    let file = absolute(path)?;
    file.strip_prefix(&repo)
        .map(Path::to_path_buf)
        .map_err(|_| {
            PipelineError::Config(format!(
                "{} is outside the versioned repository {}",
                file.display(),
                repo.display()
            ))
        })
}

/// The `.dvc` pointer file DVC writes next to a tracked file.
pub fn pointer_file(dataset: &Path) -> PathBuf {
    let mut name = dataset.file_name().unwrap_or_default().to_os_string();
    name.push(".dvc");
    dataset.with_file_name(name)
}

#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    /// Records invocations; exit codes default to 0 unless scripted.
    #[derive(Debug, Default, Clone)]
    pub struct RecordingRunner {
        calls: Arc<Mutex<Vec<String>>>,
        cwds: Arc<Mutex<Vec<PathBuf>>>,
        codes: HashMap<String, i32>,
        stdout: HashMap<String, String>,
    }

    impl RecordingRunner {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn exit(mut self, command: &str, code: i32) -> Self {
            self.codes.insert(command.to_string(), code);
            self
        }

        pub fn output(mut self, command: &str, stdout: &str) -> Self {
            self.stdout.insert(command.to_string(), stdout.to_string());
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn cwds(&self) -> Vec<PathBuf> {
            self.cwds.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CommandRunner for RecordingRunner {
        async fn run(
            &self,
            cwd: &Path,
            program: &str,
            args: &[&str],
        ) -> Result<CommandOutput, PipelineError> {
            let command = render(program, args);
            self.calls.lock().unwrap().push(command.clone());
            self.cwds.lock().unwrap().push(cwd.to_path_buf());
            Ok(CommandOutput {
                code: Some(self.codes.get(&command).copied().unwrap_or(0)),
                stdout: self.stdout.get(&command).cloned().unwrap_or_default(),
                stderr: String::new(),
            })
        }
    }
}
