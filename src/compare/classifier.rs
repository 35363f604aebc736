//! Builds one `FileChange` per name-status entry.
//!
//! Statistics come from the first stage of the fallback ladder that yields
//! usable diff content: the full branch diff, a path-scoped diff, a local
//! comparison of both blobs, a whitespace-insensitive diff, a plain line count
//! for added/deleted files, and finally the `+1/-0` floor for modified files.
//! Executor failures inside the ladder only mean "this stage yielded nothing".

use crate::config::Settings;
use crate::domain::diff_stats::{analyze, extract_section, split_sections, FileSection};
use crate::domain::listing::StatusEntry;
use crate::domain::moves::{count_related_pairs, detect_moves_within, is_likely_reorganization};
use crate::domain::synthetic::{count_lines, local_unified_diff};
use crate::domain::{Advisory, DiffStats, DiscrepancyCause, FileChange, FileStatus, ResolutionStage};
use crate::ports::{CommandExecutor, GitCommand};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Context radius of locally computed diffs.
const LOCAL_CONTEXT: usize = 3;
/// Absolute difference above which reported and derived counts disagree.
const DISCREPANCY_LINES: usize = 5;
/// Relative difference above which reported and derived counts disagree.
const DISCREPANCY_RATIO: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifyOptions {
    pub context_lines: usize,
    pub concurrency: usize,
    pub detect_moves: bool,
    pub move_window: usize,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for ClassifyOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            context_lines: settings.context_lines,
            concurrency: settings.concurrency,
            detect_moves: settings.detect_moves,
            move_window: settings.move_window,
        }
    }
}

/// What the ladder produced for one file.
#[derive(Debug)]
enum Resolution {
    Diff { text: String, stage: ResolutionStage },
    Counted { text: String, stats: DiffStats, branch: String },
    /// Both blobs are identical and even `-w` shows nothing.
    Unchanged,
    Unavailable,
}

pub struct FileClassifier<'a, E> {
    executor: &'a E,
    target: &'a str,
    source: &'a str,
    sections: Vec<FileSection>,
    reported: HashMap<String, Option<DiffStats>>,
    options: ClassifyOptions,
}

impl<'a, E: CommandExecutor> FileClassifier<'a, E> {
    /// `target` is the pre-change branch, `source` the post-change one.
    pub fn new(
        executor: &'a E,
        target: &'a str,
        source: &'a str,
        full_diff: &str,
        reported: HashMap<String, Option<DiffStats>>,
        options: ClassifyOptions,
    ) -> Self {
        Self {
            executor,
            target,
            source,
            sections: split_sections(full_diff),
            reported,
            options,
        }
    }

    /// Classify every entry. Output order follows `entries`.
    pub async fn classify_all(&self, entries: &[StatusEntry]) -> Vec<FileChange> {
        stream::iter(entries)
            .map(|entry| self.classify(entry))
            .buffered(self.options.concurrency.max(1))
            .collect()
            .await
    }

    pub async fn classify(&self, entry: &StatusEntry) -> FileChange {
        let section = self.section_for(entry);
        let binary = section.is_some_and(|s| s.is_binary)
            || matches!(self.reported.get(&entry.path), Some(None));

        let mut change = FileChange {
            path: entry.path.clone(),
            status: entry.status,
            additions: 0,
            deletions: 0,
            old_path: entry.old_path.clone(),
            similarity: entry.similarity,
            moved_lines: None,
            binary,
            notes: Vec::new(),
            diff: section.map(|s| s.text.clone()).unwrap_or_default(),
        };

        if binary {
            change.notes.push(Advisory::Binary);
            self.apply_floor(&mut change);
            return change;
        }

        if entry.status == FileStatus::Renamed
            && entry.similarity == Some(100)
            && section.map_or(true, |s| !s.has_hunks)
        {
            change.notes.push(Advisory::MetadataOnly);
            return change;
        }

        let mut whitespace_stage = false;
        match self.resolve(entry, section).await {
            Resolution::Diff { text, stage } => {
                let stats = analyze(&text);
                change.additions = stats.additions;
                change.deletions = stats.deletions;
                if stage != ResolutionStage::FullDiff {
                    info!(path = %entry.path, %stage, "statistics recovered by fallback");
                    change.notes.push(Advisory::RecoveredVia { stage });
                }
                whitespace_stage = stage == ResolutionStage::WhitespaceInsensitive;
                self.annotate_moves(&mut change, text);
            }
            Resolution::Counted {
                text,
                stats,
                branch,
            } => {
                change.additions = stats.additions;
                change.deletions = stats.deletions;
                change.notes.push(Advisory::RecoveredVia {
                    stage: ResolutionStage::BlobLineCount,
                });
                change.notes.push(Advisory::CountedFromBranch { branch });
                change.diff = text;
            }
            Resolution::Unchanged => {
                if change.diff.contains("\nold mode ") {
                    change.notes.push(Advisory::MetadataOnly);
                } else {
                    change.notes.push(Advisory::WhitespaceOnly);
                }
            }
            Resolution::Unavailable => {
                if entry.status != FileStatus::Modified {
                    warn!(path = %entry.path, "no diff obtainable");
                    change.notes.push(Advisory::DiffUnavailable);
                }
            }
        }

        if change.status == FileStatus::Modified
            && is_likely_reorganization(&change.path, change.additions, change.deletions)
        {
            change.notes.push(Advisory::LikelyReorganization);
        }

        if change.status == FileStatus::Modified && change.stats().is_empty() {
            self.apply_floor(&mut change);
        } else {
            self.reconcile(&mut change, whitespace_stage);
        }

        change
    }

    async fn resolve(&self, entry: &StatusEntry, section: Option<&FileSection>) -> Resolution {
        let path = entry.path.as_str();

        if let Some(section) = section {
            if accepts(entry.status, &section.text) {
                return Resolution::Diff {
                    text: section.text.clone(),
                    stage: ResolutionStage::FullDiff,
                };
            }
        }
        debug!(path, "full diff has no usable section");

        let mut paths: Vec<&str> = Vec::new();
        if let Some(old) = entry.old_path.as_deref() {
            paths.push(old);
        }
        paths.push(path);

        let command =
            GitCommand::path_diff(self.target, self.source, &paths, self.options.context_lines);
        if let Some(text) = self.try_execute(&command).await {
            let text = extract_section(&text, path).map(|s| s.text).unwrap_or(text);
            if accepts(entry.status, &text) {
                return Resolution::Diff {
                    text,
                    stage: ResolutionStage::PathDiff,
                };
            }
        }
        debug!(path, "path-scoped diff empty");

        match entry.status {
            FileStatus::Modified | FileStatus::Renamed => {
                let old_path = entry.old_path.as_deref().unwrap_or(path);
                let old = self
                    .try_execute(&GitCommand::show_file(self.target, old_path))
                    .await;
                let new = self.try_execute(&GitCommand::show_file(self.source, path)).await;
                let (Some(old), Some(new)) = (old, new) else {
                    return Resolution::Unavailable;
                };

                if old != new {
                    let text = local_unified_diff(path, &old, &new, LOCAL_CONTEXT);
                    if accepts(entry.status, &text) {
                        return Resolution::Diff {
                            text,
                            stage: ResolutionStage::LocalComparison,
                        };
                    }
                    return Resolution::Unavailable;
                }

                debug!(path, "blobs identical; retrying ignoring whitespace");
                let command = GitCommand::whitespace_insensitive_diff(self.target, self.source, &paths);
                if let Some(text) = self.try_execute(&command).await {
                    if accepts(entry.status, &text) {
                        return Resolution::Diff {
                            text,
                            stage: ResolutionStage::WhitespaceInsensitive,
                        };
                    }
                }
                Resolution::Unchanged
            }
            FileStatus::Added => match self.try_execute(&GitCommand::show_file(self.source, path)).await {
                Some(content) => Resolution::Counted {
                    text: local_unified_diff(path, "", &content, LOCAL_CONTEXT),
                    stats: DiffStats::new(count_lines(&content), 0),
                    branch: self.source.to_string(),
                },
                None => Resolution::Unavailable,
            },
            FileStatus::Deleted => match self.try_execute(&GitCommand::show_file(self.target, path)).await {
                Some(content) => Resolution::Counted {
                    text: local_unified_diff(path, &content, "", LOCAL_CONTEXT),
                    stats: DiffStats::new(0, count_lines(&content)),
                    branch: self.target.to_string(),
                },
                None => Resolution::Unavailable,
            },
        }
    }

    fn section_for(&self, entry: &StatusEntry) -> Option<&FileSection> {
        self.sections
            .iter()
            .find(|s| s.path == entry.path)
            .or_else(|| {
                let old = entry.old_path.as_deref()?;
                self.sections.iter().find(|s| s.old_path.as_deref() == Some(old))
            })
    }

    async fn try_execute(&self, command: &GitCommand) -> Option<String> {
        match self.executor.execute(command).await {
            Ok(stdout) => Some(stdout),
            Err(e) => {
                debug!(%command, error = %e, "fallback stage failed");
                None
            }
        }
    }

    fn annotate_moves(&self, change: &mut FileChange, text: String) {
        if !self.options.detect_moves {
            change.diff = text;
            return;
        }
        let analysis = detect_moves_within(&text, self.options.move_window);
        if analysis.moved_lines > 0 {
            change.moved_lines = Some(analysis.moved_lines);
            change.notes.push(Advisory::MovedLines {
                count: analysis.moved_lines,
            });
        }
        change.diff = analysis.annotated;
    }

    fn apply_floor(&self, change: &mut FileChange) {
        if change.status != FileStatus::Modified {
            return;
        }
        warn!(path = %change.path, "no usable diff for modified file; applying +1/-0 floor");
        change.additions = 1;
        change.deletions = 0;
        change.notes.push(Advisory::StatisticsFloor);
    }

    fn reconcile(&self, change: &mut FileChange, whitespace_stage: bool) {
        let Some(Some(reported)) = self.reported.get(&change.path).copied() else {
            return;
        };
        let derived = change.stats();
        if !diverges(reported.additions, derived.additions)
            && !diverges(reported.deletions, derived.deletions)
        {
            return;
        }

        let cause = if change.moved_lines.is_some()
            || change.notes.contains(&Advisory::LikelyReorganization)
        {
            DiscrepancyCause::Reorganization
        } else if whitespace_stage || change.notes.contains(&Advisory::WhitespaceOnly) {
            DiscrepancyCause::FormattingOnly
        } else if derived.is_empty() {
            DiscrepancyCause::NonContent
        } else {
            DiscrepancyCause::Unknown
        };

        let edited_in_place = count_related_pairs(&change.diff);
        info!(
            path = %change.path,
            %reported,
            %derived,
            ?cause,
            edited_in_place,
            "statistics discrepancy"
        );
        change.notes.push(Advisory::Discrepancy {
            reported,
            derived,
            cause,
            edited_in_place,
        });
    }
}

/// Whether `text` is usable diff content for a file with `status`.
fn accepts(status: FileStatus, text: &str) -> bool {
    let stats = analyze(text);
    if stats.is_empty() {
        return false;
    }
    match status {
        FileStatus::Added => stats.deletions == 0,
        FileStatus::Deleted => stats.additions == 0,
        FileStatus::Modified | FileStatus::Renamed => true,
    }
}

fn diverges(reported: usize, derived: usize) -> bool {
    let gap = reported.abs_diff(derived);
    if gap > DISCREPANCY_LINES {
        return true;
    }
    let largest = reported.max(derived);
    largest > 0 && gap as f64 / largest as f64 > DISCREPANCY_RATIO
}
