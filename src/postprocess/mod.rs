//! Post-processing of finished response text.
//!
//! Post-processors are pure functions over the final buffer text; they
//! never see partial responses.

pub mod diagram;
pub mod fence;
pub mod language;

pub use diagram::sanitize_diagram_code;
pub use fence::{ExtractedCode, extract_code, extract_code_or_input};
pub use language::{DEFAULT_LANGUAGE, LANGUAGE_RULES, Language, detect_language};
