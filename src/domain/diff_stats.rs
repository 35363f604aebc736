//! Line statistics over unified diff text.
//! No I/O - all functions are data in, data out.

use super::types::DiffStats;
use std::collections::BTreeMap;

/// One file's slice of a multi-file diff.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FileSection {
    /// Post-change path.
    pub path: String,
    pub old_path: Option<String>,
    pub text: String,
    pub has_hunks: bool,
    pub is_binary: bool,
}

/// Count additions and deletions in a diff blob, single- or multi-file.
pub fn analyze(diff: &str) -> DiffStats {
    let mut stats = DiffStats::default();
    let mut in_hunk = false;

    for line in diff.lines() {
        if line.starts_with("diff --git ") {
            in_hunk = false;
            continue;
        }
        if line.starts_with("@@") {
            in_hunk = true;
            continue;
        }
        // File headers only appear before the first hunk of a section.
        if !in_hunk && (line.starts_with("+++") || line.starts_with("---")) {
            continue;
        }

        match line.as_bytes().first() {
            Some(b'+') => stats.additions += 1,
            Some(b'-') => stats.deletions += 1,
            _ => {}
        }
    }

    stats
}

/// Count additions and deletions per file of a complete diff.
/// Header-only sections (mode changes, pure renames) map to `{0, 0}`.
pub fn analyze_per_file(diff: &str) -> BTreeMap<String, DiffStats> {
    split_sections(diff)
        .into_iter()
        .map(|section| {
            let stats = if section.has_hunks {
                analyze(&section.text)
            } else {
                DiffStats::default()
            };
            (section.path, stats)
        })
        .collect()
}

/// Split a complete diff on its `diff --git` boundaries.
pub fn split_sections(diff: &str) -> Vec<FileSection> {
    let mut sections: Vec<FileSection> = Vec::new();
    let mut current: Option<FileSection> = None;
    let mut in_hunk = false;

    for line in diff.lines() {
        if let Some((old_path, new_path)) = parse_diff_header(line) {
            if let Some(section) = current.take() {
                sections.push(section);
            }
            in_hunk = false;
            current = Some(FileSection {
                path: new_path.clone(),
                old_path: if old_path != new_path { Some(old_path) } else { None },
                ..FileSection::default()
            });
        }

        let Some(section) = current.as_mut() else {
            continue;
        };

        section.text.push_str(line);
        section.text.push('\n');

        if line.starts_with("@@") {
            in_hunk = true;
            section.has_hunks = true;
            continue;
        }
        if in_hunk {
            continue;
        }

        if let Some(old) = line.strip_prefix("rename from ") {
            section.old_path = Some(clean_path(old.trim()));
        } else if let Some(new) = line.strip_prefix("rename to ") {
            section.path = clean_path(new.trim());
        } else if line.starts_with("+++ ") {
            if let Some(new) = parse_path_line(line, "+++ ") {
                section.path = new;
            }
        } else if line.starts_with("Binary files ") || line.starts_with("GIT binary patch") {
            section.is_binary = true;
        }
    }

    if let Some(section) = current.take() {
        sections.push(section);
    }

    sections
}

/// Find the section of `diff` whose post-change (or pre-change) path is `path`.
pub fn extract_section(diff: &str, path: &str) -> Option<FileSection> {
    let sections = split_sections(diff);
    let index = sections
        .iter()
        .position(|s| s.path == path)
        .or_else(|| sections.iter().position(|s| s.old_path.as_deref() == Some(path)))?;
    sections.into_iter().nth(index)
}

/// Whether the text contains at least one `+` or `-` content line.
pub fn has_content_changes(diff: &str) -> bool {
    !analyze(diff).is_empty()
}

pub(crate) fn parse_diff_header(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix("diff --git ")?.trim_end();

    // Either side may be C-quoted independently: "a/x" b/y, a/x "b/y", "a/x" "b/y".
    if rest.starts_with('"') {
        let end = closing_quote(rest)?;
        let b = rest[end + 1..].trim_start();
        if b.is_empty() {
            return None;
        }
        return Some((clean_path(&rest[..=end]), clean_path(b)));
    }
    // Unquoted paths never contain '"', so the first ` "` starts the quoted new side.
    if rest.ends_with('"') {
        let split = rest.find(" \"")?;
        return Some((clean_path(&rest[..split]), clean_path(&rest[split + 1..])));
    }

    // Unchanged path with spaces: a/P b/P has a unique symmetric split.
    if rest.starts_with("a/") && rest.len() > 5 && (rest.len() - 5) % 2 == 0 {
        let half = (rest.len() - 5) / 2;
        if rest.is_char_boundary(half + 2) && rest.is_char_boundary(half + 5) {
            let a = &rest[2..half + 2];
            let b = &rest[half + 5..];
            if &rest[half + 2..half + 5] == " b/" && a == b {
                return Some((a.to_string(), b.to_string()));
            }
        }
    }

    let split = rest.rfind(" b/")?;
    let a = &rest[..split];
    let b = &rest[split + 1..];
    Some((clean_path(a), clean_path(b)))
}

/// Byte index of the quote closing the C-quoted token at the start of `s`.
fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, b) in s.bytes().enumerate().skip(1) {
        match b {
            _ if escaped => escaped = false,
            b'\\' => escaped = true,
            b'"' => return Some(i),
            _ => {}
        }
    }
    None
}

fn parse_path_line(line: &str, prefix: &str) -> Option<String> {
    let raw = line.trim_start_matches(prefix).trim_end();
    let raw = raw.split('\t').next().unwrap_or(raw);
    if raw == "/dev/null" {
        return None;
    }
    Some(clean_path(raw))
}

fn clean_path(token: &str) -> String {
    let unquoted = unquote_path(token);
    match unquoted.strip_prefix("a/").or_else(|| unquoted.strip_prefix("b/")) {
        Some(stripped) => stripped.to_string(),
        None => unquoted,
    }
}

/// Decode a path git printed in C-quoted form (`"caf\303\251.txt"`).
/// Unquoted input is returned as is.
pub fn unquote_path(raw: &str) -> String {
    let Some(inner) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) else {
        return raw.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut iter = inner.bytes().peekable();
    while let Some(b) = iter.next() {
        if b != b'\\' {
            bytes.push(b);
            continue;
        }
        let Some(code) = iter.next() else {
            bytes.push(b);
            break;
        };
        let decoded = match code {
            b'n' => b'\n',
            b't' => b'\t',
            b'r' => b'\r',
            b'a' => 0x07,
            b'b' => 0x08,
            b'f' => 0x0c,
            b'v' => 0x0b,
            b'0'..=b'7' => {
                let mut value = u32::from(code - b'0');
                for _ in 0..2 {
                    match iter.peek() {
                        Some(&d @ b'0'..=b'7') => {
                            value = value * 8 + u32::from(d - b'0');
                            iter.next();
                        }
                        _ => break,
                    }
                }
                // Octal escapes encode single bytes.
                (value & 0xff) as u8
            }
            other => other,
        };
        bytes.push(decoded);
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TWO_FILES: &str = "\
diff --git a/src/lib.rs b/src/lib.rs
index 1111111..2222222 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1,3 +1,4 @@
 use std::fmt;
-fn old() {}
+fn new() {}
+fn newer() {}
 fn tail() {}
diff --git a/script.sh b/script.sh
old mode 100644
new mode 100755
";

    #[test]
    fn analyze_ignores_metadata_lines() {
        assert_eq!(analyze(TWO_FILES), DiffStats::new(2, 1));
    }

    #[test]
    fn analyze_ignores_no_newline_marker() {
        let diff = "\
@@ -1 +1 @@
-a
\\ No newline at end of file
+a
";
        assert_eq!(analyze(diff), DiffStats::new(1, 1));
    }

    #[test]
    fn analyze_counts_hunk_lines_that_look_like_headers() {
        let diff = "\
--- a/notes.md
+++ b/notes.md
@@ -1,2 +1,2 @@
--- separator
+++ heading
";
        assert_eq!(analyze(diff), DiffStats::new(1, 1));
    }

    #[test]
    fn per_file_records_header_only_section_as_zero() {
        let stats = analyze_per_file(TWO_FILES);
        assert_eq!(stats.get("src/lib.rs"), Some(&DiffStats::new(2, 1)));
        assert_eq!(stats.get("script.sh"), Some(&DiffStats::default()));
        assert_eq!(stats.len(), 2);
    }

    #[test]
    fn split_sections_tracks_renames() {
        let diff = "\
diff --git a/old name.txt b/new name.txt
similarity index 90%
rename from old name.txt
rename to new name.txt
index 1..2 100644
--- a/old name.txt
+++ b/new name.txt
@@ -1 +1 @@
-x
+y
";
        let sections = split_sections(diff);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].path, "new name.txt");
        assert_eq!(sections[0].old_path.as_deref(), Some("old name.txt"));
        assert!(sections[0].has_hunks);
    }

    #[test]
    fn header_with_spaces_splits_symmetrically() {
        assert_eq!(
            parse_diff_header("diff --git a/my b/file.txt b/my b/file.txt"),
            Some(("my b/file.txt".to_string(), "my b/file.txt".to_string()))
        );
    }

    #[test]
    fn extract_section_finds_by_new_or_old_path() {
        let section = extract_section(TWO_FILES, "script.sh").unwrap();
        assert!(!section.has_hunks);
        assert!(extract_section(TWO_FILES, "missing.rs").is_none());
    }

    #[test]
    fn binary_sections_are_flagged() {
        let diff = "\
diff --git a/logo.png b/logo.png
index 1..2 100644
Binary files a/logo.png and b/logo.png differ
";
        let sections = split_sections(diff);
        assert!(sections[0].is_binary);
        assert!(!has_content_changes(&sections[0].text));
    }

    #[test]
    fn quoted_paths_are_decoded() {
        assert_eq!(unquote_path("\"caf\\303\\251.txt\""), "café.txt");
        assert_eq!(
            unquote_path("\"tab\\there \\\"q\\\" back\\\\slash\""),
            "tab\there \"q\" back\\slash"
        );
        assert_eq!(unquote_path("plain.txt"), "plain.txt");
    }

    #[test]
    fn header_with_one_quoted_side_starts_its_own_section() {
        let diff = "\
diff --git a/x.txt b/x.txt
--- a/x.txt
+++ b/x.txt
@@ -1 +1 @@
-a
+b
diff --git a/plain.txt \"b/caf\\303\\251.txt\"
similarity index 60%
rename from plain.txt
rename to \"caf\\303\\251.txt\"
--- a/plain.txt
+++ \"b/caf\\303\\251.txt\"
@@ -1,2 +1,2 @@
-one
-two
+uno
+dos
";
        let stats = analyze_per_file(diff);
        assert_eq!(stats.get("x.txt"), Some(&DiffStats::new(1, 1)));
        assert_eq!(stats.get("café.txt"), Some(&DiffStats::new(2, 2)));

        let sections = split_sections(diff);
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].old_path.as_deref(), Some("plain.txt"));
    }

    #[test]
    fn header_with_both_sides_quoted() {
        assert_eq!(
            parse_diff_header("diff --git \"a/caf\\303\\251 x\" \"b/caf\\303\\251 x\""),
            Some(("café x".to_string(), "café x".to_string()))
        );
        assert_eq!(
            parse_diff_header("diff --git \"a/q\\\" b/z\" b/plain"),
            Some(("q\" b/z".to_string(), "plain".to_string()))
        );
    }
}
