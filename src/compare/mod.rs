//! Branch comparison pipeline.
//!
//! Validates both branches, fetches the name-status listing and the full diff,
//! classifies every changed file, and aggregates the summary. Failures before
//! classification abort the comparison; per-file problems only become notes.

pub mod classifier;
#[cfg(test)]
pub(crate) mod testing;

use crate::config::Settings;
use crate::domain::listing::{parse_branch_list, parse_commit_log, parse_name_status, parse_numstat};
use crate::domain::{BranchRef, ComparisonResult, ComparisonSummary};
use crate::ports::{CommandExecutor, ExecError, GitCommand};
use classifier::{ClassifyOptions, FileClassifier};
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Fatal comparison failures. No partial result accompanies these.
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("source and target are the same branch '{0}'")]
    SameBranch(String),

    #[error("branch '{0}' not found")]
    BranchNotFound(String),

    #[error("repository unavailable: {0}")]
    RepositoryUnavailable(String),

    #[error("failed to read branch differences: {0}")]
    Command(#[from] ExecError),
}

pub struct BranchComparer<E> {
    executor: E,
    options: ClassifyOptions,
}

impl<E: CommandExecutor> BranchComparer<E> {
    pub fn new(executor: E, options: ClassifyOptions) -> Self {
        Self { executor, options }
    }

    pub fn from_settings(executor: E, settings: &Settings) -> Self {
        Self::new(executor, ClassifyOptions::from(settings))
    }

    /// List local branches, flagging the checked-out one.
    pub async fn list_branches(&self) -> Result<Vec<BranchRef>, CompareError> {
        let output = self
            .executor
            .execute(&GitCommand::list_branches())
            .await
            .map_err(|e| CompareError::RepositoryUnavailable(e.to_string()))?;
        Ok(parse_branch_list(&output))
    }

    /// Compare `source` (post-change) against `target` (pre-change).
    pub async fn compare(
        &self,
        source: &str,
        target: &str,
    ) -> Result<ComparisonResult, CompareError> {
        if source == target {
            return Err(CompareError::SameBranch(source.to_string()));
        }

        for branch in [source, target] {
            self.verify_branch(branch).await?;
        }
        debug!(source, target, "branches verified");

        let listing = self
            .executor
            .execute(&GitCommand::name_status(target, source))
            .await?;
        let full_diff = self
            .executor
            .execute(&GitCommand::full_diff(target, source))
            .await?;

        let reported = match self.executor.execute(&GitCommand::numstat(target, source)).await {
            Ok(output) => parse_numstat(&output),
            Err(e) => {
                warn!(error = %e, "numstat unavailable; skipping reconciliation");
                HashMap::new()
            }
        };
        let commits = match self.executor.execute(&GitCommand::log_range(target, source)).await {
            Ok(output) => parse_commit_log(&output),
            Err(e) => {
                warn!(error = %e, "commit log unavailable");
                Vec::new()
            }
        };

        let entries = parse_name_status(&listing);
        info!(files = entries.len(), source, target, "classifying changed files");

        let classifier =
            FileClassifier::new(&self.executor, target, source, &full_diff, reported, self.options);
        let files_changed = classifier.classify_all(&entries).await;
        let summary = ComparisonSummary::from_changes(&files_changed);

        Ok(ComparisonResult {
            source_branch: source.to_string(),
            target_branch: target.to_string(),
            files_changed,
            summary,
            commits,
            diff_content: full_diff,
        })
    }

    async fn verify_branch(&self, branch: &str) -> Result<(), CompareError> {
        match self.executor.execute(&GitCommand::verify_branch(branch)).await {
            Ok(output) if !output.trim().is_empty() => Ok(()),
            Ok(_) => Err(CompareError::BranchNotFound(branch.to_string())),
            Err(e) if e.is_not_a_repository() => {
                Err(CompareError::RepositoryUnavailable(e.to_string()))
            }
            Err(e) => {
                debug!(branch, error = %e, "branch verification failed");
                Err(CompareError::BranchNotFound(branch.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::ScriptedExecutor;
    use super::*;
    use crate::domain::{DiffStats, FileStatus};
    use pretty_assertions::assert_eq;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567\n";

    fn verified() -> ScriptedExecutor {
        ScriptedExecutor::new()
            .ok(GitCommand::verify_branch("feature"), SHA)
            .ok(GitCommand::verify_branch("main"), SHA)
    }

    #[tokio::test]
    async fn same_branch_fails_without_commands() {
        let executor = ScriptedExecutor::new();
        let comparer = BranchComparer::new(&executor, ClassifyOptions::default());

        let err = comparer.compare("main", "main").await.unwrap_err();

        assert!(matches!(err, CompareError::SameBranch(ref b) if b == "main"));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_branch_short_circuits() {
        let executor = ScriptedExecutor::new()
            .ok(GitCommand::verify_branch("feature"), SHA)
            .fail(GitCommand::verify_branch("nope"), "");
        let comparer = BranchComparer::new(&executor, ClassifyOptions::default());

        let err = comparer.compare("feature", "nope").await.unwrap_err();

        assert!(matches!(err, CompareError::BranchNotFound(ref b) if b == "nope"));
        assert_eq!(
            executor.calls(),
            vec![
                GitCommand::verify_branch("feature"),
                GitCommand::verify_branch("nope")
            ]
        );
    }

    #[tokio::test]
    async fn outside_repository_is_reported_once() {
        let executor = ScriptedExecutor::new().fail(
            GitCommand::verify_branch("feature"),
            "fatal: not a git repository (or any of the parent directories): .git",
        );
        let comparer = BranchComparer::new(&executor, ClassifyOptions::default());

        let err = comparer.compare("feature", "main").await.unwrap_err();

        assert!(matches!(err, CompareError::RepositoryUnavailable(_)));
        assert_eq!(executor.call_count(), 1);
    }

    #[tokio::test]
    async fn status_fetch_failure_is_fatal() {
        let executor = verified();
        let comparer = BranchComparer::new(&executor, ClassifyOptions::default());

        let err = comparer.compare("feature", "main").await.unwrap_err();

        assert!(matches!(err, CompareError::Command(_)));
    }

    #[tokio::test]
    async fn identical_tips_produce_empty_result() {
        let executor = verified()
            .ok(GitCommand::name_status("main", "feature"), "")
            .ok(GitCommand::full_diff("main", "feature"), "")
            .ok(GitCommand::numstat("main", "feature"), "")
            .ok(GitCommand::log_range("main", "feature"), "");
        let comparer = BranchComparer::new(&executor, ClassifyOptions::default());

        let result = comparer.compare("feature", "main").await.unwrap();

        assert!(result.files_changed.is_empty());
        assert_eq!(result.summary, ComparisonSummary::default());
    }

    #[tokio::test]
    async fn assembles_files_summary_and_commits() {
        let diff = "\
diff --git a/src/app.rs b/src/app.rs
index 1..2 100644
--- a/src/app.rs
+++ b/src/app.rs
@@ -1,2 +1,2 @@
-let x = 1;
+let x = 2;
 done();
diff --git a/docs/new.md b/docs/new.md
new file mode 100644
--- /dev/null
+++ b/docs/new.md
@@ -0,0 +1,2 @@
+# Title
+text
";
        let executor = verified()
            .ok(
                GitCommand::name_status("main", "feature"),
                "M\tsrc/app.rs\nA\tdocs/new.md\n",
            )
            .ok(GitCommand::full_diff("main", "feature"), diff)
            .ok(
                GitCommand::numstat("main", "feature"),
                "1\t1\tsrc/app.rs\n2\t0\tdocs/new.md\n",
            )
            .ok(
                GitCommand::log_range("main", "feature"),
                "abcdef0123456789\tAlice\talice@example.com\t1700000000\tTweak app\n",
            );
        let comparer = BranchComparer::new(&executor, ClassifyOptions::default());

        let result = comparer.compare("feature", "main").await.unwrap();

        assert_eq!(result.source_branch, "feature");
        assert_eq!(result.target_branch, "main");
        assert_eq!(result.diff_content, diff);
        assert_eq!(result.commits.len(), 1);
        let stats: Vec<_> = result
            .files_changed
            .iter()
            .map(|f| (f.path.as_str(), f.status, f.stats()))
            .collect();
        assert_eq!(
            stats,
            vec![
                ("src/app.rs", FileStatus::Modified, DiffStats::new(1, 1)),
                ("docs/new.md", FileStatus::Added, DiffStats::new(2, 0)),
            ]
        );
        assert_eq!(
            result.summary,
            ComparisonSummary {
                total_files: 2,
                additions: 3,
                deletions: 1,
                moved_lines: 0,
                added: 1,
                modified: 1,
                deleted: 0,
                renamed: 0,
            }
        );
    }

    #[tokio::test]
    async fn optional_fetches_do_not_fail_comparison() {
        let executor = verified()
            .ok(GitCommand::name_status("main", "feature"), "")
            .ok(GitCommand::full_diff("main", "feature"), "");
        let comparer = BranchComparer::new(&executor, ClassifyOptions::default());

        let result = comparer.compare("feature", "main").await.unwrap();

        assert!(result.commits.is_empty());
    }

    #[tokio::test]
    async fn list_branches_failure_means_no_repository() {
        let executor = ScriptedExecutor::new();
        let comparer = BranchComparer::new(&executor, ClassifyOptions::default());

        let err = comparer.list_branches().await.unwrap_err();

        assert!(matches!(err, CompareError::RepositoryUnavailable(_)));
    }

    #[tokio::test]
    async fn list_branches_parses_current() {
        let executor =
            ScriptedExecutor::new().ok(GitCommand::list_branches(), "*\tmain\n \tfeature\n");
        let comparer = BranchComparer::new(&executor, ClassifyOptions::default());

        let branches = comparer.list_branches().await.unwrap();

        assert_eq!(branches.len(), 2);
        assert!(branches[0].is_current);
        assert_eq!(branches[1].name, "feature");
    }
}
