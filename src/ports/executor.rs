//! Command executor port (trait).
//! The compare pipeline only ever talks to version control through this interface.

use std::fmt;
use thiserror::Error;

/// A git invocation as an argument array. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GitCommand {
    args: Vec<String>,
}

impl GitCommand {
    pub fn new(subcommand: &str) -> Self {
        Self {
            args: vec![subcommand.to_string()],
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn as_args(&self) -> &[String] {
        &self.args
    }

    // ─── Command shapes used by the compare pipeline ───

    /// `rev-parse --verify --quiet <branch>^{commit}`
    pub fn verify_branch(branch: &str) -> Self {
        Self::new("rev-parse")
            .args(["--verify", "--quiet"])
            .arg(format!("{}^{{commit}}", branch))
    }

    /// Local branches with the current one flagged by `*`.
    pub fn list_branches() -> Self {
        Self::new("branch")
            .arg("--list")
            .arg("--format=%(HEAD)%09%(refname:short)")
    }

    pub fn name_status(target: &str, source: &str) -> Self {
        Self::new("diff")
            .args(["--name-status", "-M", "--no-color"])
            .args([target, source])
    }

    pub fn numstat(target: &str, source: &str) -> Self {
        Self::new("diff")
            .args(["--numstat", "-M", "--no-color"])
            .args([target, source])
    }

    pub fn full_diff(target: &str, source: &str) -> Self {
        Self::new("diff")
            .args(["-M", "--no-color", "--no-ext-diff"])
            .args([target, source])
    }

    /// Diff restricted to `paths`, with `context` lines around each hunk.
    pub fn path_diff(target: &str, source: &str, paths: &[&str], context: usize) -> Self {
        Self::new("diff")
            .args(["-M", "--no-color", "--no-ext-diff"])
            .arg(format!("-U{}", context))
            .args([target, source])
            .arg("--")
            .args(paths.iter().copied())
    }

    pub fn whitespace_insensitive_diff(target: &str, source: &str, paths: &[&str]) -> Self {
        Self::new("diff")
            .args(["-M", "--no-color", "--no-ext-diff", "-w", "--ignore-cr-at-eol"])
            .args([target, source])
            .arg("--")
            .args(paths.iter().copied())
    }

    /// File content as of `reference`.
    pub fn show_file(reference: &str, path: &str) -> Self {
        Self::new("show").arg(format!("{}:{}", reference, path))
    }

    /// Commits reachable from `source` but not from `target`.
    pub fn log_range(target: &str, source: &str) -> Self {
        Self::new("log")
            .arg("--no-color")
            .arg("--format=%H%x09%an%x09%ae%x09%at%x09%s")
            .arg(format!("{}..{}", target, source))
    }
}

impl fmt::Display for GitCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "git {}", self.args.join(" "))
    }
}

/// Failure of a single command invocation.
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {code:?}: {stderr}")]
    Failed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("`{command}` timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },
}

impl ExecError {
    /// The command's own complaint, if it produced one.
    pub fn stderr(&self) -> &str {
        match self {
            ExecError::Failed { stderr, .. } => stderr,
            _ => "",
        }
    }

    pub fn is_not_a_repository(&self) -> bool {
        self.stderr().to_lowercase().contains("not a git repository")
    }
}

/// Port for running version-control commands.
/// Implementations may shell out to git or replay scripted output in tests.
#[allow(async_fn_in_trait)]
pub trait CommandExecutor {
    /// Run `command`, returning its standard output.
    async fn execute(&self, command: &GitCommand) -> Result<String, ExecError>;
}

impl<T: CommandExecutor + ?Sized> CommandExecutor for &T {
    async fn execute(&self, command: &GitCommand) -> Result<String, ExecError> {
        (**self).execute(command).await
    }
}
