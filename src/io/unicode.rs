//! Unicode-safe slicing helpers.
//!
//! Byte offsets handed around by the renderer and the digest are only
//! sliced after being snapped to a character boundary; display previews
//! are cut at grapheme clusters so combined characters stay intact.

use unicode_segmentation::UnicodeSegmentation;

/// Finds a valid UTF-8 character boundary at or before the given position.
///
/// # Examples
///
/// ```
/// use devtools_rs::io::find_char_boundary;
///
/// let s = "Hello 世界";
/// assert_eq!(find_char_boundary(s, 6), 6); // Before '世'
/// assert_eq!(find_char_boundary(s, 7), 6); // Middle of '世', backs up
/// ```
#[must_use]
pub const fn find_char_boundary(s: &str, pos: usize) -> usize {
    if pos >= s.len() {
        return s.len();
    }
    let bytes = s.as_bytes();
    let mut boundary = pos;
    // UTF-8 continuation bytes start with 10xxxxxx (0x80-0xBF)
    while boundary > 0 && (bytes[boundary] & 0xC0) == 0x80 {
        boundary -= 1;
    }
    boundary
}

/// Truncates a string to at most `max_graphemes` grapheme clusters.
#[must_use]
pub fn truncate_graphemes(s: &str, max_graphemes: usize) -> &str {
    let end = s
        .grapheme_indices(true)
        .nth(max_graphemes)
        .map_or(s.len(), |(offset, _)| offset);
    &s[..end]
}

/// Shortens `s` for one-line display: newlines become spaces and text
/// beyond `max_graphemes` clusters is replaced by `...`.
///
/// # Examples
///
/// ```
/// use devtools_rs::io::unicode::preview;
///
/// assert_eq!(preview("def add(a, b):\n    return a + b", 10), "def add...");
/// assert_eq!(preview("short", 10), "short");
/// ```
#[must_use]
pub fn preview(s: &str, max_graphemes: usize) -> String {
    let flat = s.replace(['\r', '\n'], " ");
    if flat.graphemes(true).count() <= max_graphemes {
        return flat;
    }
    let keep = max_graphemes.saturating_sub(3);
    format!("{}...", truncate_graphemes(&flat, keep))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_char_boundary() {
        let s = "Hello 世界!";
        assert_eq!(find_char_boundary(s, 0), 0);
        assert_eq!(find_char_boundary(s, 5), 5);
        assert_eq!(find_char_boundary(s, 6), 6); // Space before '世'
        assert_eq!(find_char_boundary(s, 7), 6); // Middle of '世'
        assert_eq!(find_char_boundary(s, 8), 6); // Still in '世'
        assert_eq!(find_char_boundary(s, 9), 9); // After '世'
        assert_eq!(find_char_boundary(s, 100), s.len());
    }

    #[test]
    fn test_truncate_graphemes() {
        assert_eq!(truncate_graphemes("hello", 3), "hel");
        assert_eq!(truncate_graphemes("hello", 10), "hello");
        assert_eq!(truncate_graphemes("", 3), "");
        // e + combining acute accent is one cluster
        assert_eq!(truncate_graphemes("e\u{301}x", 1), "e\u{301}");
    }

    #[test]
    fn test_preview() {
        assert_eq!(preview("a\nb", 10), "a b");
        assert_eq!(preview("abcdefghijkl", 8), "abcde...");
        assert_eq!(preview("世界世界世界", 5), "世界...");
        assert_eq!(preview("abcdef", 2), "...");
    }
}
