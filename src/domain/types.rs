//! Pure data types for the branch comparison domain.
//! No I/O; everything here is built by the compare pipeline and handed to the report.

use serde::Serialize;
use std::fmt;

/// Marker prefix for a line the move detector judged relocated.
pub const MOVED_MARKER: char = '~';

/// A branch as listed by the repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchRef {
    pub name: String,
    pub is_current: bool,
}

/// A git commit with metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Commit {
    pub hash: String,
    pub short_hash: String,
    pub message: String,
    pub author: String,
    pub email: String,
    pub timestamp: i64,
}

impl Commit {
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or(&self.message)
    }

    pub fn relative_time(&self) -> String {
        self.age_at(chrono::Utc::now().timestamp())
    }

    /// Coarse age of the commit as seen at `now` (unix seconds).
    pub fn age_at(&self, now: i64) -> String {
        const UNITS: [(i64, &str); 5] = [
            (2_592_000, "month"),
            (604_800, "week"),
            (86_400, "day"),
            (3_600, "hour"),
            (60, "minute"),
        ];

        let elapsed = now - self.timestamp;
        UNITS
            .iter()
            .find(|(secs, _)| elapsed >= *secs)
            .map(|&(secs, unit)| {
                let n = elapsed / secs;
                format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" })
            })
            .unwrap_or_else(|| "just now".to_string())
    }
}

/// A single line in a diff hunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffLine {
    Context(String),
    Addition(String),
    Deletion(String),
    Moved(String),
}

impl DiffLine {
    pub fn content(&self) -> &str {
        match self {
            DiffLine::Context(s)
            | DiffLine::Addition(s)
            | DiffLine::Deletion(s)
            | DiffLine::Moved(s) => s,
        }
    }

    pub fn prefix(&self) -> char {
        match self {
            DiffLine::Context(_) => ' ',
            DiffLine::Addition(_) => '+',
            DiffLine::Deletion(_) => '-',
            DiffLine::Moved(_) => MOVED_MARKER,
        }
    }

    /// The line as it appears in a unified diff.
    pub fn render(&self) -> String {
        format!("{}{}", self.prefix(), self.content())
    }
}

/// Line counts for a diff or a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DiffStats {
    pub additions: usize,
    pub deletions: usize,
}

impl DiffStats {
    pub fn new(additions: usize, deletions: usize) -> Self {
        Self {
            additions,
            deletions,
        }
    }

    pub fn total(&self) -> usize {
        self.additions + self.deletions
    }

    pub fn is_empty(&self) -> bool {
        self.additions == 0 && self.deletions == 0
    }
}

impl fmt::Display for DiffStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{} -{}", self.additions, self.deletions)
    }
}

/// Change classification of one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl FileStatus {
    pub fn indicator(&self) -> char {
        match self {
            FileStatus::Added => 'A',
            FileStatus::Modified => 'M',
            FileStatus::Deleted => 'D',
            FileStatus::Renamed => 'R',
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileStatus::Added => "added",
            FileStatus::Modified => "modified",
            FileStatus::Deleted => "deleted",
            FileStatus::Renamed => "renamed",
        }
    }
}

/// Fallback stage that produced a file's statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStage {
    FullDiff,
    PathDiff,
    LocalComparison,
    WhitespaceInsensitive,
    BlobLineCount,
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResolutionStage::FullDiff => "full branch diff",
            ResolutionStage::PathDiff => "path-scoped diff",
            ResolutionStage::LocalComparison => "local content comparison",
            ResolutionStage::WhitespaceInsensitive => "whitespace-insensitive diff",
            ResolutionStage::BlobLineCount => "line count of the branch blob",
        };
        f.write_str(label)
    }
}

/// Likely reason reported and diff-derived counts disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyCause {
    Reorganization,
    FormattingOnly,
    NonContent,
    Unknown,
}

impl fmt::Display for DiscrepancyCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            DiscrepancyCause::Reorganization => "content was reorganized rather than rewritten",
            DiscrepancyCause::FormattingOnly => "changes are formatting or line endings only",
            DiscrepancyCause::NonContent => "change is not in file content (mode or permissions)",
            DiscrepancyCause::Unknown => "cause could not be determined",
        };
        f.write_str(label)
    }
}

/// Advisory note attached to a file. Never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    RecoveredVia { stage: ResolutionStage },
    WhitespaceOnly,
    StatisticsFloor,
    CountedFromBranch { branch: String },
    Discrepancy {
        reported: DiffStats,
        derived: DiffStats,
        cause: DiscrepancyCause,
        /// Deletion/addition pairs that read as the same line edited in place.
        edited_in_place: usize,
    },
    LikelyReorganization,
    MovedLines { count: usize },
    Binary,
    MetadataOnly,
    DiffUnavailable,
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::RecoveredVia { stage } => {
                write!(f, "Statistics recovered via {}.", stage)
            }
            Advisory::WhitespaceOnly => {
                f.write_str("Only whitespace or line endings differ between the branches.")
            }
            Advisory::StatisticsFloor => f.write_str(
                "No usable diff could be obtained; +1/-0 is a placeholder, not a measured change.",
            ),
            Advisory::CountedFromBranch { branch } => {
                write!(f, "Line count taken from the file as it exists on '{}'.", branch)
            }
            Advisory::Discrepancy {
                reported,
                derived,
                cause,
                edited_in_place,
            } => {
                write!(
                    f,
                    "Git reported {} but the diff shows {}; likely {}.",
                    reported, derived, cause
                )?;
                if *edited_in_place > 0 {
                    write!(
                        f,
                        " {} line{} edited in place.",
                        edited_in_place,
                        if *edited_in_place == 1 { "" } else { "s" }
                    )?;
                }
                Ok(())
            }
            Advisory::LikelyReorganization => {
                f.write_str("Balanced additions and deletions suggest reordering.")
            }
            Advisory::MovedLines { count } => write!(
                f,
                "{} line{} moved without changes.",
                count,
                if *count == 1 { "" } else { "s" }
            ),
            Advisory::Binary => f.write_str("Binary file; line counts do not apply."),
            Advisory::MetadataOnly => {
                f.write_str("Only file metadata changed (mode or rename without edits).")
            }
            Advisory::DiffUnavailable => {
                f.write_str("No diff could be obtained for this file.")
            }
        }
    }
}

/// One path that differs between the two branch tips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileChange {
    pub path: String,
    pub status: FileStatus,
    pub additions: usize,
    pub deletions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub moved_lines: Option<usize>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub binary: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<Advisory>,
    /// Diff text the statistics were derived from.
    #[serde(skip)]
    pub diff: String,
}

impl FileChange {
    pub fn stats(&self) -> DiffStats {
        DiffStats::new(self.additions, self.deletions)
    }

    pub fn display_path(&self) -> String {
        match &self.old_path {
            Some(old) => format!("{} → {}", old, self.path),
            None => self.path.clone(),
        }
    }
}

/// Aggregate counts over a comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ComparisonSummary {
    pub total_files: usize,
    pub additions: usize,
    pub deletions: usize,
    pub moved_lines: usize,
    pub added: usize,
    pub modified: usize,
    pub deleted: usize,
    pub renamed: usize,
}

impl ComparisonSummary {
    pub fn from_changes(changes: &[FileChange]) -> Self {
        changes.iter().fold(Self::default(), |mut acc, change| {
            acc.total_files += 1;
            acc.additions += change.additions;
            acc.deletions += change.deletions;
            acc.moved_lines += change.moved_lines.unwrap_or(0);
            match change.status {
                FileStatus::Added => acc.added += 1,
                FileStatus::Modified => acc.modified += 1,
                FileStatus::Deleted => acc.deleted += 1,
                FileStatus::Renamed => acc.renamed += 1,
            }
            acc
        })
    }
}

/// Result of comparing a source branch against a target branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComparisonResult {
    pub source_branch: String,
    pub target_branch: String,
    pub files_changed: Vec<FileChange>,
    pub summary: ComparisonSummary,
    pub commits: Vec<Commit>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub diff_content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn change(path: &str, status: FileStatus, additions: usize, deletions: usize) -> FileChange {
        FileChange {
            path: path.to_string(),
            status,
            additions,
            deletions,
            old_path: None,
            similarity: None,
            moved_lines: None,
            binary: false,
            notes: Vec::new(),
            diff: String::new(),
        }
    }

    #[test]
    fn summary_counts_by_status() {
        let mut moved = change("b.json", FileStatus::Modified, 3, 3);
        moved.moved_lines = Some(2);
        let changes = vec![
            change("a.rs", FileStatus::Added, 10, 0),
            moved,
            change("c.rs", FileStatus::Deleted, 0, 7),
            change("d.rs", FileStatus::Renamed, 1, 1),
        ];

        let summary = ComparisonSummary::from_changes(&changes);
        assert_eq!(
            summary,
            ComparisonSummary {
                total_files: 4,
                additions: 14,
                deletions: 11,
                moved_lines: 2,
                added: 1,
                modified: 1,
                deleted: 1,
                renamed: 1,
            }
        );
    }

    #[test]
    fn summary_of_nothing_is_zero() {
        assert_eq!(ComparisonSummary::from_changes(&[]), ComparisonSummary::default());
    }

    #[test]
    fn moved_line_renders_with_marker() {
        let line = DiffLine::Moved("\"build\": \"x\",".to_string());
        assert_eq!(line.render(), "~\"build\": \"x\",");
    }

    #[test]
    fn floor_note_is_distinguishable() {
        let text = Advisory::StatisticsFloor.to_string();
        assert!(text.contains("placeholder"));
    }

    #[test]
    fn advisory_serializes_with_kind_tag() {
        let json = serde_json::to_value(Advisory::MovedLines { count: 2 }).unwrap();
        assert_eq!(json["kind"], "moved_lines");
        assert_eq!(json["count"], 2);
    }

    #[test]
    fn commit_age_picks_largest_whole_unit() {
        let commit = Commit {
            hash: "abc".to_string(),
            short_hash: "abc".to_string(),
            message: "Subject\n\nBody".to_string(),
            author: "A".to_string(),
            email: "a@example.com".to_string(),
            timestamp: 1_000_000,
        };
        let at = |offset: i64| commit.age_at(1_000_000 + offset);

        assert_eq!(commit.summary(), "Subject");
        assert_eq!(at(-5), "just now");
        assert_eq!(at(59), "just now");
        assert_eq!(at(60), "1 minute ago");
        assert_eq!(at(2 * 3_600 + 5), "2 hours ago");
        assert_eq!(at(86_400), "1 day ago");
        assert_eq!(at(15 * 86_400), "2 weeks ago");
        assert_eq!(at(95 * 86_400), "3 months ago");
    }
}
