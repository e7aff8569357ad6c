//! Fenced code block extraction.
//!
//! A line whose first three characters are ```` ``` ```` toggles an
//! in-block flag; an info string after the marker (```` ```python ````) is
//! allowed and discarded. Lines between an opening and closing marker are
//! collected. Completed blocks are joined with a single newline.

use serde::Serialize;

const FENCE: &str = "```";

/// Result of [`extract_code`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedCode {
    /// Extracted code, or the unchanged input when nothing was fenced.
    pub text: String,

    /// Whether at least one completed block was found.
    pub fenced: bool,
}

/// Extracts the contents of fenced code blocks from `text`.
///
/// Without any completed block the input is returned unchanged. A block
/// left open at end of input is discarded.
///
/// # Examples
///
/// ```
/// use devtools_rs::postprocess::extract_code;
///
/// let out = extract_code("intro\n```\ncode line 1\ncode line 2\n```\noutro");
/// assert_eq!(out.text, "code line 1\ncode line 2");
/// assert!(out.fenced);
///
/// let out = extract_code("plain text, no blocks");
/// assert_eq!(out.text, "plain text, no blocks");
/// assert!(!out.fenced);
/// ```
#[must_use]
pub fn extract_code(text: &str) -> ExtractedCode {
    let mut blocks: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut in_block = false;

    for line in text.lines() {
        if line.starts_with(FENCE) {
            if in_block {
                blocks.push(current.join("\n"));
                current.clear();
            }
            in_block = !in_block;
        } else if in_block {
            current.push(line);
        }
    }

    if blocks.is_empty() {
        return ExtractedCode {
            text: text.to_string(),
            fenced: false,
        };
    }

    ExtractedCode {
        text: blocks.join("\n"),
        fenced: true,
    }
}

/// Shorthand for `extract_code(text).text`.
#[must_use]
pub fn extract_code_or_input(text: &str) -> String {
    extract_code(text).text
}
