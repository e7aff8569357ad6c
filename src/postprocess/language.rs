//! Language auto-detection for generated code.
//!
//! Detection is first-match over an ordered rule list: the first language
//! with *any* token occurring as a literal substring wins. Several tokens
//! are shared (`def `, `let `, `print(`), so rule order decides ties.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages the detector (and the code runner) knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Python.
    Python,
    /// JavaScript (Node).
    JavaScript,
    /// C++.
    #[serde(rename = "c++")]
    Cpp,
    /// Ruby.
    Ruby,
    /// Swift.
    Swift,
}

/// Language used when no rule matches.
pub const DEFAULT_LANGUAGE: Language = Language::Python;

/// Ordered detection rules.
pub const LANGUAGE_RULES: &[(Language, &[&str])] = &[
    (
        Language::Python,
        &["def ", "import ", "print(", "if __name__"],
    ),
    (
        Language::JavaScript,
        &["function ", "const ", "let ", "console.log"],
    ),
    (
        Language::Cpp,
        &["#include", "using namespace", "int main()", "cout <<"],
    ),
    (Language::Ruby, &["def ", "puts ", "require '", "attr_"]),
    (Language::Swift, &["func ", "var ", "let ", "print("]),
];

impl Language {
    /// All languages in rule order.
    pub const ALL: [Self; 5] = [
        Self::Python,
        Self::JavaScript,
        Self::Cpp,
        Self::Ruby,
        Self::Swift,
    ];

    /// Returns the lowercase name used for syntax hints and runner lookup.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Cpp => "c++",
            Self::Ruby => "ruby",
            Self::Swift => "swift",
        }
    }

    /// Parses a language name (case-insensitive, common aliases accepted).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "python" | "py" | "python3" => Some(Self::Python),
            "javascript" | "js" | "node" => Some(Self::JavaScript),
            "c++" | "cpp" | "cxx" => Some(Self::Cpp),
            "ruby" | "rb" => Some(Self::Ruby),
            "swift" => Some(Self::Swift),
            _ => None,
        }
    }

    /// Returns the source file extension (without the dot).
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Python => "py",
            Self::JavaScript => "js",
            Self::Cpp => "cpp",
            Self::Ruby => "rb",
            Self::Swift => "swift",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Detects the language of `code`.
///
/// # Examples
///
/// ```
/// use devtools_rs::postprocess::{Language, detect_language};
///
/// assert_eq!(detect_language("console.log('hi')"), Language::JavaScript);
/// assert_eq!(detect_language("#include <iostream>"), Language::Cpp);
/// // `def ` is a Python token and Python is checked first.
/// assert_eq!(detect_language("def greet\n  puts 'hi'\nend"), Language::Python);
/// assert_eq!(detect_language("SELECT 1;"), Language::Python);
/// ```
#[must_use]
pub fn detect_language(code: &str) -> Language {
    LANGUAGE_RULES
        .iter()
        .find(|(_, tokens)| tokens.iter().any(|token| code.contains(token)))
        .map_or(DEFAULT_LANGUAGE, |(language, _)| *language)
}
