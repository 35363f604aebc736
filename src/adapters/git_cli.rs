//! Git command-line implementation of the CommandExecutor port.

use crate::ports::{CommandExecutor, ExecError, GitCommand};
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub struct GitCli {
    root: PathBuf,
    timeout: Duration,
}

impl GitCli {
    /// Locate the repository containing `path` and run git from its work tree.
    pub fn open(path: &Path, timeout: Duration) -> Result<Self> {
        let repo = git2::Repository::discover(path).context("Failed to open git repository")?;
        let root = repo
            .workdir()
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("Repository has no working directory (bare repo?)"))?;
        Ok(Self { root, timeout })
    }

    pub fn open_current_dir(timeout: Duration) -> Result<Self> {
        Self::open(Path::new("."), timeout)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl CommandExecutor for GitCli {
    async fn execute(&self, command: &GitCommand) -> Result<String, ExecError> {
        debug!(%command, "running");
        let mut child = tokio::process::Command::new("git");
        // Non-ASCII paths come back verbatim; only control characters stay quoted.
        child
            .args(["-c", "core.quotePath=false"])
            .args(command.as_args())
            .current_dir(&self.root)
            .env("GIT_PAGER", "cat")
            .env("LC_ALL", "C")
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, child.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(ExecError::Spawn {
                    command: command.to_string(),
                    source,
                })
            }
            Err(_) => {
                return Err(ExecError::Timeout {
                    command: command.to_string(),
                    seconds: self.timeout.as_secs(),
                })
            }
        };

        if !output.status.success() {
            return Err(ExecError::Failed {
                command: command.to_string(),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
