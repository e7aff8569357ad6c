//! Cleanup for generated diagram code.
//!
//! Models tend to wrap diagram programs in fences, prefix them with a bare
//! language tag, or ask the renderer to open a viewer. The sanitiser turns
//! that into a script that can be written to disk and run headless.

use crate::postprocess::extract_code;
use regex::Regex;
use std::sync::OnceLock;

/// Bare tags models put on the first line in place of a fence info string.
const LANGUAGE_TAGS: &[&str] = &["python", "python3", "py"];

fn show_true() -> Option<&'static Regex> {
    static SHOW_TRUE: OnceLock<Option<Regex>> = OnceLock::new();
    SHOW_TRUE
        .get_or_init(|| Regex::new(r"\bshow\s*=\s*True\b").ok())
        .as_ref()
}

/// Sanitises model output into runnable diagram code.
///
/// Returns an empty string when nothing usable remains.
///
/// # Examples
///
/// ```
/// use devtools_rs::postprocess::sanitize_diagram_code;
///
/// let raw = "Here you go:\r\n```python\r\nwith Diagram(\"web\", show=True):\r\n    pass\r\n```\r\n";
/// assert_eq!(
///     sanitize_diagram_code(raw),
///     "with Diagram(\"web\", show=False):\n    pass\n"
/// );
/// ```
#[must_use]
pub fn sanitize_diagram_code(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    let code = extract_code(&normalized).text;

    let mut lines: Vec<&str> = code.lines().collect();
    while lines.first().is_some_and(|line| line.trim().is_empty()) {
        lines.remove(0);
    }
    if lines
        .first()
        .is_some_and(|line| LANGUAGE_TAGS.contains(&line.trim().to_lowercase().as_str()))
    {
        lines.remove(0);
    }
    let code = lines.join("\n");

    let code = match show_true() {
        Some(re) => re.replace_all(&code, "show=False").into_owned(),
        None => code,
    };

    let trimmed = code.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    format!("{trimmed}\n")
}
