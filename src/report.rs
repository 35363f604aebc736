//! Markdown rendering of a comparison result.

use crate::domain::{Commit, ComparisonResult, FileChange, FileStatus};
use std::collections::BTreeMap;
use std::fmt::Write;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Append each file's (move-annotated) diff.
    pub include_diff: bool,
}

/// Render the whole report.
pub fn render_markdown(result: &ComparisonResult, options: ReportOptions) -> String {
    let mut out = String::new();
    let summary = &result.summary;

    let _ = writeln!(
        out,
        "# Changes: `{}` vs `{}`\n",
        result.source_branch, result.target_branch
    );

    if result.files_changed.is_empty() {
        out.push_str("No differences between the branches.\n");
        return out;
    }

    let _ = write!(
        out,
        "{} file{} changed, {} insertions(+), {} deletions(-)",
        summary.total_files,
        if summary.total_files == 1 { "" } else { "s" },
        summary.additions,
        summary.deletions
    );
    if summary.moved_lines > 0 {
        let _ = write!(out, ", {} moved", summary.moved_lines);
    }
    out.push_str("\n\n");

    out.push_str("| Status | Files |\n|---|---|\n");
    for (label, count) in [
        ("Added", summary.added),
        ("Modified", summary.modified),
        ("Deleted", summary.deleted),
        ("Renamed", summary.renamed),
    ] {
        if count > 0 {
            let _ = writeln!(out, "| {} | {} |", label, count);
        }
    }
    out.push('\n');

    out.push_str("## Files\n\n");
    render_tree(&mut out, &result.files_changed);
    out.push('\n');

    if !result.commits.is_empty() {
        let _ = writeln!(out, "## Commits ({})\n", result.commits.len());
        render_commits(&mut out, &result.commits);
        out.push('\n');
    }

    let noted: Vec<&FileChange> = result
        .files_changed
        .iter()
        .filter(|f| !f.notes.is_empty())
        .collect();
    if !noted.is_empty() {
        out.push_str("## Notes\n\n");
        for file in noted {
            let _ = writeln!(out, "- `{}`", file.display_path());
            for note in &file.notes {
                let _ = writeln!(out, "  - {}", note);
            }
        }
        out.push('\n');
    }

    if options.include_diff {
        out.push_str("## Diffs\n\n");
        for file in files_by_churn(&result.files_changed) {
            if file.diff.trim().is_empty() {
                continue;
            }
            let _ = writeln!(out, "### {}\n", file.display_path());
            out.push_str("```diff\n");
            out.push_str(&file.diff);
            if !file.diff.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```\n\n");
        }
    }

    out
}

/// Files grouped by directory, each with its status marker and counts.
fn render_tree(out: &mut String, files: &[FileChange]) {
    let mut dir_map: BTreeMap<&str, Vec<(&str, &FileChange)>> = BTreeMap::new();
    for file in files {
        let (dir, name) = file.path.rsplit_once('/').unwrap_or(("", file.path.as_str()));
        dir_map.entry(dir).or_default().push((name, file));
    }

    for (dir, entries) in dir_map {
        let indent = if dir.is_empty() {
            ""
        } else {
            let _ = writeln!(out, "- `{}/`", dir);
            "  "
        };
        for (name, file) in entries {
            let _ = writeln!(out, "{}- {}", indent, file_line(name, file));
        }
    }
}

fn file_line(name: &str, file: &FileChange) -> String {
    let mut line = format!("[{}] `{}`", file.status.indicator(), name);
    if file.status == FileStatus::Renamed {
        if let Some(old) = &file.old_path {
            let _ = write!(line, " (from `{}`", old);
            if let Some(similarity) = file.similarity {
                let _ = write!(line, ", {}% similar", similarity);
            }
            line.push(')');
        }
    }
    if file.binary {
        line.push_str(" binary");
    } else {
        let _ = write!(line, " +{} -{}", file.additions, file.deletions);
    }
    if let Some(moved) = file.moved_lines {
        let _ = write!(line, " ~{}", moved);
    }
    line
}

fn render_commits(out: &mut String, commits: &[Commit]) {
    for commit in commits {
        let _ = writeln!(
            out,
            "- `{}` {} ({}, {})",
            commit.short_hash,
            commit.summary(),
            commit.author,
            commit.relative_time()
        );
    }
}

/// Files sorted by most changes (additions + deletions), stable for ties.
fn files_by_churn(files: &[FileChange]) -> Vec<&FileChange> {
    let mut sorted: Vec<&FileChange> = files.iter().collect();
    sorted.sort_by(|a, b| b.stats().total().cmp(&a.stats().total()));
    sorted
}
