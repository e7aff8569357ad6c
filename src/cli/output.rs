//! Output formatting for CLI commands.
//!
//! Supports text and JSON output formats.

use crate::error::Error;
use crate::io::preview;
use crate::postprocess::{ExtractedCode, Language};
use crate::stream::Aggregation;
use crate::tools::{RepoDigest, RfpAnswer, Tool, ToolOutput, ToolSpec};
use serde::Serialize;
use std::fmt::Write;
use std::path::Path;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output.
    Json,
}

impl OutputFormat {
    /// Parses format from string.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Formats an error for the selected format.
#[must_use]
pub fn format_error(error: &Error, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => error.to_string(),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct ErrorOutput<'a> {
                error: String,
                #[serde(skip_serializing_if = "Option::is_none")]
                partial: Option<&'a str>,
            }
            format_json(&ErrorOutput {
                error: error.to_string(),
                partial: error.partial_text(),
            })
        }
    }
}

/// Formats the tool catalog.
#[must_use]
pub fn format_tools(format: OutputFormat) -> String {
    let specs: Vec<&ToolSpec> = Tool::ALL.iter().map(|t| t.spec()).collect();
    match format {
        OutputFormat::Text => {
            let mut output = String::new();
            let _ = writeln!(output, "{:<16} {:<10} Title", "Tool", "Mode");
            output.push_str(&"-".repeat(70));
            output.push('\n');
            for spec in specs {
                let mode = if spec.streaming { "stream" } else { "complete" };
                let _ = writeln!(output, "{:<16} {:<10} {}", spec.key, mode, spec.title);
                let _ = writeln!(output, "{:<27} {}", "", spec.description);
                let _ = writeln!(
                    output,
                    "{:<27} e.g. {}",
                    "",
                    preview(spec.placeholder, 40)
                );
            }
            output
        }
        OutputFormat::Json => format_json(&specs),
    }
}

/// Formats a tool result.
///
/// With `streamed` text output the response has already been written
/// incrementally, so only post-processing details are added.
#[must_use]
pub fn format_tool_output(output: &ToolOutput, streamed: bool, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if streamed && output.text == output.raw {
                return String::new();
            }
            let mut text = String::new();
            if let Some(language) = output.language {
                let _ = writeln!(text, "Language: {language}");
            }
            if streamed && output.fenced == Some(true) {
                let _ = writeln!(text, "\nExtracted code:");
            }
            text.push_str(&output.text);
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text
        }
        OutputFormat::Json => format_json(output),
    }
}

/// Formats generated code and, if it was run, its output.
#[must_use]
pub fn format_generated(
    output: &ToolOutput,
    language: Language,
    execution: Option<&str>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => {
            let mut text = String::new();
            let _ = writeln!(text, "Language: {language}");
            text.push('\n');
            text.push_str(&output.text);
            if !text.ends_with('\n') {
                text.push('\n');
            }
            if let Some(execution) = execution {
                let _ = writeln!(text, "\nOutput:\n{}", execution.trim_end());
            }
            text
        }
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Generated<'a> {
                #[serde(flatten)]
                output: &'a ToolOutput,
                language: Language,
                #[serde(skip_serializing_if = "Option::is_none")]
                execution: Option<&'a str>,
            }
            format_json(&Generated {
                output,
                language,
                execution,
            })
        }
    }
}

/// Formats RFP answers.
#[must_use]
pub fn format_rfp_answers(answers: &[RfpAnswer], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if answers.is_empty() {
                return "No questions found.\n".to_string();
            }
            let mut output = String::new();
            for answer in answers {
                let _ = writeln!(output, "Q{}: {}", answer.number, answer.question);
                let _ = writeln!(output, "A{}: {}", answer.number, answer.answer);
                output.push('\n');
            }
            let failed = answers.iter().filter(|a| !a.is_answered()).count();
            let _ = writeln!(
                output,
                "{} answered, {failed} failed",
                answers.len() - failed
            );
            output
        }
        OutputFormat::Json => format_json(&answers),
    }
}

/// Formats a repository digest summary (JSON) or the digest itself (text).
#[must_use]
pub fn format_digest(digest: &RepoDigest, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => digest.render(),
        OutputFormat::Json => format_json(digest),
    }
}

/// Formats a replayed aggregation.
#[must_use]
pub fn format_aggregation(
    aggregation: &Aggregation,
    extracted: Option<&ExtractedCode>,
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => match extracted {
            Some(code) => {
                let mut output = format!("\nExtracted code:\n{}", code.text);
                if !output.ends_with('\n') {
                    output.push('\n');
                }
                output
            }
            None => String::new(),
        },
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Replay<'a> {
                state: crate::stream::AggregationState,
                text: &'a str,
                publishes: usize,
                #[serde(skip_serializing_if = "Option::is_none")]
                extracted: Option<&'a ExtractedCode>,
            }
            format_json(&Replay {
                state: aggregation.state,
                text: aggregation.text(),
                publishes: aggregation.publishes,
                extracted,
            })
        }
    }
}

/// Formats diagram code, or where it was written.
#[must_use]
pub fn format_diagram(output: &ToolOutput, written_to: Option<&Path>, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => match written_to {
            Some(path) => format!("Diagram code written to {}\n", path.display()),
            None => output.text.clone(),
        },
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Diagram<'a> {
                #[serde(flatten)]
                output: &'a ToolOutput,
                #[serde(skip_serializing_if = "Option::is_none")]
                written_to: Option<String>,
            }
            format_json(&Diagram {
                output,
                written_to: written_to.map(|p| p.display().to_string()),
            })
        }
    }
}

/// Formats the reference image reported when diagram generation fails.
#[must_use]
pub fn format_diagram_fallback(image: &Path, reason: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!(
            "Diagram generation failed: {reason}\nReference image: {}\n",
            image.display()
        ),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Fallback<'a> {
                error: &'a str,
                fallback_image: String,
            }
            format_json(&Fallback {
                error: reason,
                fallback_image: image.display().to_string(),
            })
        }
    }
}

/// Formats extracted code.
#[must_use]
pub fn format_extracted(extracted: &ExtractedCode, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut output = extracted.text.clone();
            if !output.is_empty() && !output.ends_with('\n') {
                output.push('\n');
            }
            output
        }
        OutputFormat::Json => format_json(extracted),
    }
}

/// Formats a detected language.
#[must_use]
pub fn format_language(language: Language, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{language}\n"),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Detected {
                language: Language,
            }
            format_json(&Detected { language })
        }
    }
}

/// Formats a plain message.
#[must_use]
pub fn format_message(message: &str, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => format!("{message}\n"),
        OutputFormat::Json => {
            #[derive(Serialize)]
            struct Message<'a> {
                message: &'a str,
            }
            format_json(&Message { message })
        }
    }
}

/// Formats a value as JSON.
fn format_json<T: Serialize + ?Sized>(value: &T) -> String {
    let mut json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    json.push('\n');
    json
}
