//! Glob pattern resolution
//!
//! The `glob` crate handles `*`, `**`, `?` and `[...]` but not brace
//! alternation, so braces are expanded first and every alternative is
//! resolved separately. Results are de-duplicated and sorted so the
//! registration order does not depend on filesystem enumeration order.

use std::collections::BTreeSet;
use std::path::PathBuf;

use tracing::debug;

use crate::error::{Error, Result};

/// Resolve `pattern` against the filesystem.
///
/// Returns matching paths sorted lexicographically. A pattern that
/// matches nothing yields an empty list.
pub fn resolve(pattern: &str) -> Result<Vec<PathBuf>> {
    let mut paths = BTreeSet::new();

    for alternative in expand_braces(pattern) {
        let glob_pattern = unescape(&alternative);
        let entries = glob::glob(&glob_pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;

        for entry in entries {
            paths.insert(entry?);
        }
    }

    debug!("Pattern {} matched {} path(s)", pattern, paths.len());
    Ok(paths.into_iter().collect())
}

/// Expand shell-style brace alternation: `a/{b,c}.d` -> `a/b.d`, `a/c.d`.
///
/// Nested groups expand recursively. Unbalanced braces and groups without a
/// top-level comma are kept literally. `\` escapes the next character; the
/// escapes survive expansion and are resolved by [`unescape`].
pub fn expand_braces(pattern: &str) -> Vec<String> {
    let Some((open, close)) = find_group(pattern) else {
        return vec![pattern.to_string()];
    };

    let prefix = &pattern[..open];
    let body = &pattern[open + 1..close];
    let suffix = &pattern[close + 1..];

    let mut expanded = Vec::new();
    for alternative in split_alternatives(body) {
        let candidate = format!("{}{}{}", prefix, alternative, suffix);
        expanded.extend(expand_braces(&candidate));
    }
    expanded
}

/// Byte offsets of the first brace group that contains a top-level comma
fn find_group(pattern: &str) -> Option<(usize, usize)> {
    let bytes = pattern.as_bytes();
    let mut search_from = 0;

    while search_from < bytes.len() {
        let open = find_unescaped(bytes, b'{', search_from)?;
        let mut depth = 0usize;
        let mut has_comma = false;
        let mut i = open;

        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 1,
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        if has_comma {
                            return Some((open, i));
                        }
                        break;
                    }
                }
                b',' if depth == 1 => has_comma = true,
                _ => {}
            }
            i += 1;
        }

        // unbalanced or comma-less: an inner group may still follow
        search_from = open + 1;
    }

    None
}

/// Rewrite `\c` escapes into the form the `glob` crate matches literally.
///
/// `glob` has no escape character, so its metacharacters are wrapped in a
/// one-character class (`[*]`). Other escaped characters lose the backslash.
pub fn unescape(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len());
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(escaped @ ('*' | '?' | '[' | ']')) => {
                out.push('[');
                out.push(escaped);
                out.push(']');
            }
            Some(escaped) => out.push(escaped),
            None => out.push('\\'),
        }
    }
    out
}

fn find_unescaped(bytes: &[u8], needle: u8, from: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b if b == needle => return Some(i),
            _ => i += 1,
        }
    }
    None
}

/// Split a group body on commas that are not nested in inner braces
fn split_alternatives(body: &str) -> Vec<&str> {
    let bytes = body.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'{' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                parts.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    parts.push(&body[start..]);
    parts
}
