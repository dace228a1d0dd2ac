//! External version-control tool and the per-repository clone executor.
//!
//! `CloneTool` is the command-line contract (`clone`, fast-forward `pull`,
//! availability check). `GitCli` runs the real `git` binary; tests plug in
//! scripted tools. `CloneExecutor` adds the existence pre-check, the per-job
//! timeout and cleanup of partial clones on top of any tool.

mod executor;
mod local;

use std::ffi::OsStr;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::process::{Output, Stdio};

use tokio::process::Command;

use crate::error::ToolError;

pub use executor::CloneExecutor;
pub use local::{probe, LocalRepoInfo, GIT_DIR};

/// Opaque external clone/update operations. Each call is one attempt.
pub trait CloneTool: Send + Sync + 'static {
    /// Confirms the tool can be run; returns its version banner.
    fn check_available(&self) -> impl Future<Output = Result<String, ToolError>> + Send;

    /// Clone `url` into `dest`. `dest` does not exist when this is called.
    fn clone_repo(
        &self,
        url: &str,
        dest: &Path,
    ) -> impl Future<Output = Result<(), ToolError>> + Send;

    /// Fast-forward-only update of the repository at `repo_path`.
    fn pull_ff_only(&self, repo_path: &Path) -> impl Future<Output = Result<(), ToolError>> + Send;
}

/// Runs the `git` binary found on `PATH` (or an explicit program path).
#[derive(Debug, Clone)]
pub struct GitCli {
    program: PathBuf,
}

impl Default for GitCli {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs git non-interactively. Credential prompts would otherwise block a worker
    /// until the timeout, so prompting is disabled and stdin is closed.
    /// The child is killed if the returned future is dropped (per-job timeout).
    async fn run<I, S>(&self, verb: &str, args: I) -> Result<Output, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let output = Command::new(&self.program)
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ToolError::new(format!("failed to run {}: {}", self.program.display(), e))
            })?;

        if output.status.success() {
            return Ok(output);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(ToolError::new(format!(
            "git {} failed ({}): {}",
            verb,
            output.status,
            summarize_stderr(&stderr)
        )))
    }
}

impl CloneTool for GitCli {
    async fn check_available(&self) -> Result<String, ToolError> {
        let output = self.run("--version", ["--version"]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn clone_repo(&self, url: &str, dest: &Path) -> Result<(), ToolError> {
        self.run("clone", [OsStr::new("clone"), OsStr::new(url), dest.as_os_str()])
            .await
            .map(|_| ())
    }

    async fn pull_ff_only(&self, repo_path: &Path) -> Result<(), ToolError> {
        self.run(
            "pull",
            [
                OsStr::new("-C"),
                repo_path.as_os_str(),
                OsStr::new("pull"),
                OsStr::new("--ff-only"),
            ],
        )
        .await
        .map(|_| ())
    }
}

/// Last non-empty stderr lines, which carry git's `fatal:` reason.
fn summarize_stderr(stderr: &str) -> String {
    let lines: Vec<&str> = stderr
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    if lines.is_empty() {
        return "no error output".to_string();
    }
    let start = lines.len().saturating_sub(2);
    lines[start..].join(" | ")
}
