//! Moved-versus-modified classification of diff lines.
//!
//! A deleted line and an added line in the same hunk with identical content
//! (trailing whitespace aside) are one relocated line, not an edit. Matched
//! pairs collapse into a single `~` line at the added position. Anything that
//! differs by even one character stays a deletion plus an addition.

use super::diff_stats::analyze;
use super::types::{DiffLine, MOVED_MARKER};
use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

/// Lines shorter than this (after trimming) are never judged related.
const MIN_RELATED_LEN: usize = 8;
const RELATED_RATIO: f32 = 0.6;
/// Upper bound on relatedness checks per diff.
const RELATED_CHECK_LIMIT: usize = 256;
/// Lines longer than this are not compared character by character.
const MAX_RELATED_LEN: usize = 512;

/// Files that routinely get reordered without semantic change.
static REORGANIZABLE_NAMES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "package.json",
        "composer.json",
        "Cargo.toml",
        "pyproject.toml",
        "setup.cfg",
        "requirements.txt",
        "go.mod",
        "Gemfile",
        "Pipfile",
        "deno.json",
        "tsconfig.json",
        "jsconfig.json",
        "renovate.json",
        ".npmrc",
        ".editorconfig",
        ".babelrc",
        ".gitignore",
        ".dockerignore",
    ]
    .into_iter()
    .collect()
});

static REORGANIZABLE_PREFIXES: &[&str] = &[
    ".eslintrc",
    "eslint.config.",
    ".prettierrc",
    "prettier.config.",
    ".stylelintrc",
    "tsconfig.",
    "babel.config.",
    "webpack.config.",
    "vite.config.",
    "rollup.config.",
    "jest.config.",
    "vitest.config.",
];

/// Outcome of running move detection over one file's diff.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MoveAnalysis {
    /// Lines carrying the moved marker in `annotated`.
    pub moved_lines: usize,
    /// Pairs matched on this pass (a subset of `moved_lines`).
    pub matched_pairs: usize,
    pub annotated: String,
}

/// Line counts with relocated lines split out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveStats {
    pub additions: usize,
    pub deletions: usize,
    pub moved_lines: usize,
}

/// Detect moved lines with matching bounded only by the hunk.
pub fn detect_moves(diff: &str) -> MoveAnalysis {
    detect_moves_within(diff, 0)
}

/// Detect moved lines; `window` caps the distance (in hunk lines) between a
/// deletion and its match. Zero means the whole hunk.
pub fn detect_moves_within(diff: &str, window: usize) -> MoveAnalysis {
    let mut analysis = MoveAnalysis::default();
    // Nothing was removed, so nothing can have moved.
    let matching = analyze(diff).deletions > 0;

    let mut hunk: Vec<&str> = Vec::new();
    let mut in_hunk = false;

    for line in diff.lines() {
        let boundary = line.starts_with("@@") || line.starts_with("diff --git ");
        if boundary {
            if in_hunk {
                process_hunk(&hunk, window, matching, &mut analysis);
                hunk.clear();
            }
            in_hunk = line.starts_with("@@");
            push_line(&mut analysis.annotated, line);
            continue;
        }

        if in_hunk {
            hunk.push(line);
        } else {
            push_line(&mut analysis.annotated, line);
        }
    }
    if in_hunk {
        process_hunk(&hunk, window, matching, &mut analysis);
    }

    analysis
}

/// Diff statistics with moved pairs removed from both tallies.
pub fn analyze_with_moves(diff: &str) -> MoveStats {
    let base = analyze(diff);
    let moves = detect_moves(diff);
    MoveStats {
        additions: base.additions.saturating_sub(moves.matched_pairs),
        deletions: base.deletions.saturating_sub(moves.matched_pairs),
        moved_lines: moves.moved_lines,
    }
}

/// Whether two different lines look like the same statement with a new value.
/// Informational only; relatedness never makes a line "moved".
pub fn are_lines_related(a: &str, b: &str) -> bool {
    let a = a.trim();
    let b = b.trim();
    if a == b {
        return false;
    }
    let (len_a, len_b) = (a.chars().count(), b.chars().count());
    if len_a.min(len_b) < MIN_RELATED_LEN || len_a.max(len_b) > MAX_RELATED_LEN {
        return false;
    }
    similar::TextDiff::from_chars(a, b).ratio() >= RELATED_RATIO
}

/// Count deletion/addition pairs that look like in-place edits.
///
/// Within each change block (a run of deletions followed by a run of
/// additions) the n-th deletion is paired with the n-th addition. At most
/// a fixed number of pairs is checked per diff.
pub fn count_related_pairs(diff: &str) -> usize {
    let mut block = ChangeBlock::default();
    let mut budget = RELATED_CHECK_LIMIT;
    let mut related = 0;
    let mut in_hunk = false;

    for line in diff.lines() {
        if line.starts_with("diff --git ") || line.starts_with("@@") {
            related += block.flush(&mut budget);
            in_hunk = line.starts_with("@@");
            continue;
        }
        if !in_hunk {
            continue;
        }
        match classify(line) {
            Kind::Deleted => {
                if !block.added.is_empty() {
                    related += block.flush(&mut budget);
                }
                block.deleted.push(&line[1..]);
            }
            Kind::Added => block.added.push(&line[1..]),
            Kind::Meta => {}
            Kind::Context | Kind::Moved => related += block.flush(&mut budget),
        }
        if budget == 0 {
            break;
        }
    }
    related + block.flush(&mut budget)
}

#[derive(Default)]
struct ChangeBlock<'a> {
    deleted: Vec<&'a str>,
    added: Vec<&'a str>,
}

impl ChangeBlock<'_> {
    fn flush(&mut self, budget: &mut usize) -> usize {
        let mut related = 0;
        for (del, add) in self.deleted.iter().zip(&self.added) {
            if *budget == 0 {
                break;
            }
            *budget -= 1;
            if are_lines_related(del, add) {
                related += 1;
            }
        }
        self.deleted.clear();
        self.added.clear();
        related
    }
}

/// Whether a small, balanced change to a config-like file is probably a reordering.
pub fn is_likely_reorganization(path: &str, additions: usize, deletions: usize) -> bool {
    if additions == 0 || deletions == 0 || additions + deletions > 100 {
        return false;
    }

    let name = path.rsplit('/').next().unwrap_or(path);
    let config_like = REORGANIZABLE_NAMES.contains(name)
        || REORGANIZABLE_PREFIXES.iter().any(|p| name.starts_with(p));
    if !config_like {
        return false;
    }

    let (low, high) = if additions < deletions {
        (additions, deletions)
    } else {
        (deletions, additions)
    };
    high - low <= 1 || low as f32 / high as f32 >= 0.8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Context,
    Added,
    Deleted,
    Moved,
    Meta,
}

fn classify(line: &str) -> Kind {
    match line.chars().next() {
        Some('+') => Kind::Added,
        Some('-') => Kind::Deleted,
        Some('\\') => Kind::Meta,
        Some(c) if c == MOVED_MARKER => Kind::Moved,
        _ => Kind::Context,
    }
}

fn process_hunk(body: &[&str], window: usize, matching: bool, analysis: &mut MoveAnalysis) {
    let kinds: Vec<Kind> = body.iter().map(|l| classify(l)).collect();

    // Added positions keyed by normalized content, in new-file order.
    let mut added: HashMap<&str, Vec<usize>> = HashMap::new();
    for (pos, line) in body.iter().enumerate() {
        if kinds[pos] == Kind::Added {
            added.entry(line[1..].trim_end()).or_default().push(pos);
        }
    }

    let mut matched = vec![false; body.len()];
    for (pos, line) in body.iter().enumerate() {
        if !matching || kinds[pos] != Kind::Deleted {
            continue;
        }
        let Some(candidates) = added.get_mut(line[1..].trim_end()) else {
            continue;
        };
        let hit = candidates
            .iter()
            .position(|&add| window == 0 || add.abs_diff(pos) <= window);
        if let Some(idx) = hit {
            let add = candidates.remove(idx);
            matched[pos] = true;
            matched[add] = true;
            analysis.matched_pairs += 1;
        }
    }

    for (pos, line) in body.iter().enumerate() {
        let moved = match kinds[pos] {
            Kind::Deleted if matched[pos] => continue,
            Kind::Added if matched[pos] => DiffLine::Moved(line[1..].to_string()),
            Kind::Moved => DiffLine::Moved(line[1..].to_string()),
            _ => {
                push_line(&mut analysis.annotated, line);
                continue;
            }
        };
        analysis.moved_lines += 1;
        push_line(&mut analysis.annotated, &moved.render());
    }
}

fn push_line(out: &mut String, line: &str) {
    out.push_str(line);
    out.push('\n');
}
