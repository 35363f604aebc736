//! Unified diffs computed locally from two blob contents.
//! Used when git itself refuses to produce a diff for a path.

use similar::TextDiff;

/// Build a git-style unified diff between `old` and `new` for `path`.
/// Returns an empty string when the contents are identical.
pub fn local_unified_diff(path: &str, old: &str, new: &str, context: usize) -> String {
    if old == new {
        return String::new();
    }

    let diff = TextDiff::from_lines(old, new);
    let old_header = format!("a/{}", path);
    let new_header = format!("b/{}", path);
    let body = diff
        .unified_diff()
        .context_radius(context)
        .missing_newline_hint(true)
        .header(&old_header, &new_header)
        .to_string();

    if body.is_empty() {
        return String::new();
    }
    format!("diff --git a/{} b/{}\n{}", path, path, body)
}

/// Number of lines in a blob, counting an unterminated last line.
pub fn count_lines(content: &str) -> usize {
    content.lines().count()
}
