//! RFP question answering.
//!
//! Every question is answered from the same internal document with its
//! own non-streaming request. A failed question gets a placeholder answer
//! and the run continues with the next one.

use crate::error::{Result, ToolError};
use crate::provider::ChatProvider;
use crate::tools::{Tool, ToolOptions};
use serde::Serialize;
use tracing::{info, warn};

/// Answer recorded for a question whose request failed.
pub const FAILED_ANSWER: &str = "Error processing this question";

/// Header line skipped at the top of a questions file.
const HEADER: &str = "question";

/// One answered question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RfpAnswer {
    /// 1-based position in the questions file.
    pub number: usize,

    /// Question text.
    pub question: String,

    /// Answer text, or [`FAILED_ANSWER`].
    pub answer: String,

    /// Error message if the request failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RfpAnswer {
    /// Returns true if the question was answered.
    #[must_use]
    pub const fn is_answered(&self) -> bool {
        self.error.is_none()
    }
}

/// Parses a questions file: one question per non-blank line, with an
/// optional leading `Question` header.
///
/// # Examples
///
/// ```
/// use devtools_rs::tools::parse_questions;
///
/// let questions = parse_questions("Question\nDo you support SSO?\n\nWhat is your SLA?\n");
/// assert_eq!(questions, vec!["Do you support SSO?", "What is your SLA?"]);
/// ```
#[must_use]
pub fn parse_questions(text: &str) -> Vec<String> {
    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();
    if lines.peek().is_some_and(|first| first.eq_ignore_ascii_case(HEADER)) {
        lines.next();
    }
    lines.map(str::to_string).collect()
}

/// Builds the user prompt for one question.
#[must_use]
pub fn question_prompt(document: &str, question: &str) -> String {
    format!(
        "Answer the question from the document below in one or two lines. \
         If the document does not cover it, say \"Information not available in the provided document.\"\n\n\
         Document: {document}\n\nQuestion: {question}"
    )
}

/// Answers every question in `questions` from `document`.
///
/// # Errors
///
/// Returns [`ToolError::EmptyInput`] if the document is blank. Failures of
/// individual questions are recorded in their [`RfpAnswer`] instead.
pub fn answer_questions(
    provider: &dyn ChatProvider,
    document: &str,
    questions: &[String],
) -> Result<Vec<RfpAnswer>> {
    if document.trim().is_empty() {
        return Err(ToolError::EmptyInput {
            tool: Tool::RfpSolver.key().to_string(),
        }
        .into());
    }

    info!(questions = questions.len(), provider = provider.name(), "answering RFP questions");
    let options = ToolOptions::default();

    let answers = questions
        .iter()
        .enumerate()
        .map(|(index, question)| {
            let number = index + 1;
            let outcome = Tool::RfpSolver
                .build_request(&question_prompt(document, question), &options)
                .and_then(|request| provider.complete(&request));
            match outcome {
                Ok(answer) => RfpAnswer {
                    number,
                    question: question.clone(),
                    answer: answer.trim().to_string(),
                    error: None,
                },
                Err(e) => {
                    warn!(number, error = %e, "failed to answer question");
                    RfpAnswer {
                        number,
                        question: question.clone(),
                        answer: FAILED_ANSWER.to_string(),
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect();

    Ok(answers)
}
