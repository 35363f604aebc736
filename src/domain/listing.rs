//! Parsing of git listing output: name-status, numstat, branches and commit log.

use super::diff_stats::unquote_path;
use super::types::{BranchRef, Commit, DiffStats, FileStatus};
use std::collections::HashMap;
use tracing::warn;

/// One line of a name-status listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub status: FileStatus,
    pub path: String,
    pub old_path: Option<String>,
    pub similarity: Option<u8>,
}

/// Parse a name-status listing (`<CODE>\t<path>` or `<CODE>\t<old>\t<new>`).
/// Unknown codes and malformed lines are skipped. Later duplicates of a path are dropped.
pub fn parse_name_status(listing: &str) -> Vec<StatusEntry> {
    let mut entries: Vec<StatusEntry> = Vec::new();

    for line in listing.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let Some(entry) = parse_status_line(line) else {
            warn!(line, "skipping unrecognized name-status line");
            continue;
        };
        if entries.iter().any(|e| e.path == entry.path) {
            warn!(path = %entry.path, "duplicate path in name-status listing");
            continue;
        }
        entries.push(entry);
    }

    entries
}

fn parse_status_line(line: &str) -> Option<StatusEntry> {
    let mut parts = line.split('\t');
    let code = parts.next()?.trim();
    let first = parts.next().map(|p| unquote_path(p.trim()))?;
    let second = parts.next().map(|p| unquote_path(p.trim()));

    let mut chars = code.chars();
    let letter = chars.next()?;
    let score = chars.as_str().parse::<u8>().ok().map(|s| s.min(100));

    let entry = match letter {
        'A' => StatusEntry::simple(FileStatus::Added, first),
        'M' | 'T' => StatusEntry::simple(FileStatus::Modified, first),
        'D' => StatusEntry::simple(FileStatus::Deleted, first),
        'R' => StatusEntry {
            status: FileStatus::Renamed,
            path: second?,
            old_path: Some(first),
            similarity: score,
        },
        // Copies are reported as plain additions of the new path.
        'C' => StatusEntry::simple(FileStatus::Added, second?),
        _ => return None,
    };

    if entry.path.is_empty() {
        return None;
    }
    Some(entry)
}

impl StatusEntry {
    fn simple(status: FileStatus, path: String) -> Self {
        Self {
            status,
            path,
            old_path: None,
            similarity: None,
        }
    }
}

/// Per-path counts from `--numstat`. `None` marks a binary file.
pub fn parse_numstat(output: &str) -> HashMap<String, Option<DiffStats>> {
    let mut stats = HashMap::new();

    for line in output.lines() {
        // numstat format: "ADDED\tDELETED\tFILEPATH"
        let mut parts = line.splitn(3, '\t');
        let (Some(added), Some(deleted), Some(filepath)) = (parts.next(), parts.next(), parts.next())
        else {
            continue;
        };

        let counts = match (added.parse::<usize>(), deleted.parse::<usize>()) {
            (Ok(a), Ok(d)) => Some(DiffStats::new(a, d)),
            _ if added == "-" && deleted == "-" => None,
            _ => continue,
        };

        stats.insert(numstat_new_path(filepath), counts);
    }

    stats
}

/// Resolve the post-change path from numstat's rename notation:
/// `old => new` or `dir/{old => new}/file`.
fn numstat_new_path(raw: &str) -> String {
    let raw = unquote_path(raw.trim());
    if !raw.contains(" => ") {
        return raw;
    }

    if let (Some(open), Some(close)) = (raw.find('{'), raw.rfind('}')) {
        if open < close {
            let inner = &raw[open + 1..close];
            if let Some((_, new)) = inner.split_once(" => ") {
                let joined = format!("{}{}{}", &raw[..open], new, &raw[close + 1..]);
                return joined.replace("//", "/");
            }
        }
    }

    raw.rsplit_once(" => ")
        .map(|(_, new)| new.to_string())
        .unwrap_or(raw)
}

/// Parse `git branch --format=%(HEAD)%09%(refname:short)` output.
pub fn parse_branch_list(output: &str) -> Vec<BranchRef> {
    output
        .lines()
        .filter_map(|line| {
            let (head, name) = line.split_once('\t')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some(BranchRef {
                name: name.to_string(),
                is_current: head.trim() == "*",
            })
        })
        .collect()
}

/// Parse `git log --format=%H%x09%an%x09%ae%x09%at%x09%s` output.
pub fn parse_commit_log(output: &str) -> Vec<Commit> {
    let mut commits = Vec::new();
    for line in output.lines() {
        let mut parts = line.splitn(5, '\t');
        let hash = parts.next().unwrap_or("").to_string();
        let author = parts.next().unwrap_or("Unknown").to_string();
        let email = parts.next().unwrap_or("").to_string();
        let ts_str = parts.next().unwrap_or("0");
        let message = parts.next().unwrap_or("").to_string();
        if hash.is_empty() {
            continue;
        }
        let timestamp = ts_str.parse::<i64>().unwrap_or(0);
        let short_hash = hash.chars().take(7).collect::<String>();

        commits.push(Commit {
            hash,
            short_hash,
            message,
            author,
            email,
            timestamp,
        });
    }
    commits
}
