//! Path strings.
//!
//! A path is the sequence of keys leading from the root of a value to one location inside it.
//! Payloads store paths as single strings: each segment is escaped (`\` becomes `\\`, `.`
//! becomes `\.`) and the segments are joined with `.`.
//!
//! The empty string is the root path. The path made of one empty key is written as a lone
//! `\`, which no escaped segment can produce, so the two stay distinct.
//!
//! ```rust
//! use serde_lossless::path::{parse_path, stringify_path};
//!
//! let path = vec!["users".to_string(), "a.b".to_string(), "0".to_string()];
//! let key = stringify_path(&path);
//! assert_eq!(key, r"users.a\.b.0");
//! assert_eq!(parse_path(&key), path);
//! ```

pub const DELIMITER: char = '.';
const ESCAPE: char = '\\';
/// The path made of one empty key.
pub(crate) const EMPTY_KEY: &str = "\\";

/// Escapes a single segment.
pub fn escape_key(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len());
    for ch in key.chars() {
        if ch == ESCAPE || ch == DELIMITER {
            escaped.push(ESCAPE);
        }
        escaped.push(ch);
    }
    escaped
}

/// Joins escaped segments into one path string.
pub fn stringify_path<S: AsRef<str>>(path: &[S]) -> String {
    if let [only] = path {
        if only.as_ref().is_empty() {
            return EMPTY_KEY.to_string();
        }
    }

    path.iter()
        .map(|segment| escape_key(segment.as_ref()))
        .collect::<Vec<_>>()
        .join(".")
}

/// Splits a path string back into its unescaped segments.
///
/// A backslash that does not precede `.` or `\` is kept literally.
pub fn parse_path(path: &str) -> Vec<String> {
    if path.is_empty() {
        return Vec::new();
    }
    if path == EMPTY_KEY {
        return vec![String::new()];
    }

    let mut segments = Vec::new();
    let mut segment = String::new();
    let mut chars = path.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            ESCAPE => match chars.peek() {
                Some(&next) if next == ESCAPE || next == DELIMITER => {
                    segment.push(next);
                    chars.next();
                }
                _ => segment.push(ESCAPE),
            },
            DELIMITER => segments.push(std::mem::take(&mut segment)),
            _ => segment.push(ch),
        }
    }
    segments.push(segment);
    segments
}

/// Byte offsets of the unescaped delimiters in a path string.
pub(crate) fn delimiter_positions(path: &str) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut escaped = false;

    for (i, ch) in path.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == ESCAPE {
            escaped = true;
        } else if ch == DELIMITER {
            positions.push(i);
        }
    }
    positions
}
