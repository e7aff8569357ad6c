//! Developer tool catalog.
//!
//! Each [`Tool`] has a static [`ToolSpec`] describing how its request is
//! built (sampling parameters, streaming or not) and how the final text
//! is post-processed. [`run_tool`] executes a tool against a provider.

pub mod exec;
pub mod repo;
pub mod rfp;
pub mod runner;

pub use exec::{ExecPolicy, run_code};
pub use repo::{CommitInfo, FileDigest, RepoDigest, RepoInfo, RepoSource};
pub use rfp::{RfpAnswer, answer_questions, parse_questions};
pub use runner::{ToolOutput, run_tool};

use crate::error::{Result, ToolError};
use crate::provider::{ChatMessage, ChatRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target languages offered by the code transformer.
pub const METAMORPH_TARGETS: &[&str] = &[
    "Python",
    "JavaScript",
    "TypeScript",
    "Java",
    "C++",
    "C#",
    "Go",
    "Rust",
    "PHP",
    "Ruby",
];

/// Available developer tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    /// Architecture designer.
    ArchMaster,
    /// Architecture diagram generator.
    DiagramGpt,
    /// Code generator.
    CodeForge,
    /// Code transformer between languages.
    Metamorph,
    /// Code reviewer.
    SyntaxSage,
    /// Test suite generator.
    TestCraft,
    /// Security auditor.
    SecurityAudit,
    /// Repository analyzer.
    LogicLens,
    /// RFP question answering.
    RfpSolver,
}

/// Post-processing applied to a tool's final text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PostProcess {
    /// Text is used as is.
    None,
    /// Fenced-code extraction followed by language detection.
    ExtractAndDetect,
    /// Fenced-code extraction only.
    ExtractCode,
    /// Diagram-code sanitiser.
    Diagram,
}

/// Static description of a tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ToolSpec {
    /// Command-line key.
    pub key: &'static str,
    /// Display title.
    pub title: &'static str,
    /// One-line description.
    pub description: &'static str,
    /// Example input.
    pub placeholder: &'static str,
    /// System message, if the tool sends one.
    pub system_prompt: Option<&'static str>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Token limit.
    pub max_tokens: u32,
    /// Nucleus sampling mass.
    pub top_p: f32,
    /// Whether the response is streamed.
    pub streaming: bool,
    /// Post-processing of the final text.
    pub post_process: PostProcess,
}

const ARCH_MASTER: ToolSpec = ToolSpec {
    key: "arch-master",
    title: "ArchMaster - Architecture Designer",
    description: "Design cloud architectures from requirements",
    placeholder: "A multi-region e-commerce backend with 10k requests per second",
    system_prompt: Some("You are an expert cloud solutions architect."),
    temperature: 0.7,
    max_tokens: 2048,
    top_p: 1.0,
    streaming: true,
    post_process: PostProcess::None,
};

const DIAGRAM_GPT: ToolSpec = ToolSpec {
    key: "diagram-gpt",
    title: "DiagramGPT - Architecture Visualizer",
    description: "Generate architecture diagram code",
    placeholder: "A web tier behind a load balancer talking to a managed database",
    system_prompt: Some(
        "You create cloud architecture diagrams as Python code using the diagrams library.",
    ),
    temperature: 0.7,
    max_tokens: 2048,
    top_p: 1.0,
    streaming: false,
    post_process: PostProcess::Diagram,
};

const CODE_FORGE: ToolSpec = ToolSpec {
    key: "code-forge",
    title: "CodeForge - Code Generator",
    description: "Generate code from a description",
    placeholder: "A function that returns the first n primes",
    system_prompt: Some(
        "You are an expert code generator. Generate clean, optimized code. Always wrap code blocks with ```.",
    ),
    temperature: 0.7,
    max_tokens: 2048,
    top_p: 1.0,
    streaming: false,
    post_process: PostProcess::ExtractAndDetect,
};

const METAMORPH: ToolSpec = ToolSpec {
    key: "metamorph",
    title: "Metamorph - Code Transformer",
    description: "Convert code to another language",
    placeholder: "def add(a, b):\n    return a + b",
    system_prompt: None,
    temperature: 0.3,
    max_tokens: 2048,
    top_p: 1.0,
    streaming: true,
    post_process: PostProcess::ExtractCode,
};

const SYNTAX_SAGE: ToolSpec = ToolSpec {
    key: "syntax-sage",
    title: "SyntaxSage - Code Review",
    description: "Review code for quality and correctness",
    placeholder: "Paste code to review",
    system_prompt: Some("You are a senior engineer reviewing code."),
    temperature: 1.0,
    max_tokens: 1024,
    top_p: 1.0,
    streaming: true,
    post_process: PostProcess::None,
};

const TEST_CRAFT: ToolSpec = ToolSpec {
    key: "test-craft",
    title: "TestCraft - Test Suite Generator",
    description: "Generate a test suite for code",
    placeholder: "Paste code to test",
    system_prompt: Some("You are a test engineer who writes thorough test suites."),
    temperature: 0.7,
    max_tokens: 2048,
    top_p: 1.0,
    streaming: true,
    post_process: PostProcess::None,
};

const SECURITY_AUDIT: ToolSpec = ToolSpec {
    key: "security-audit",
    title: "Security Auditor",
    description: "Audit code for vulnerabilities",
    placeholder: "Paste code to audit",
    system_prompt: Some("You are an application security auditor."),
    temperature: 0.7,
    max_tokens: 2048,
    top_p: 1.0,
    streaming: true,
    post_process: PostProcess::None,
};

const LOGIC_LENS: ToolSpec = ToolSpec {
    key: "logic-lens",
    title: "LogicLens - Repository Analyzer",
    description: "Analyze a repository's structure and code",
    placeholder: "https://github.com/owner/repo",
    system_prompt: Some(
        "You are an expert software architect and code analyst. Provide actionable insights.",
    ),
    temperature: 0.7,
    max_tokens: 4096,
    top_p: 1.0,
    streaming: true,
    post_process: PostProcess::None,
};

const RFP_SOLVER: ToolSpec = ToolSpec {
    key: "rfp-solver",
    title: "RFP Solver",
    description: "Answer RFP questions from an internal document",
    placeholder: "questions.txt",
    system_prompt: Some(
        "You are a professional RFP response generator. Answer concisely and only from the provided document.",
    ),
    temperature: 0.3,
    max_tokens: 200,
    top_p: 1.0,
    streaming: false,
    post_process: PostProcess::None,
};

impl Tool {
    /// Every tool in catalog order.
    pub const ALL: [Self; 9] = [
        Self::ArchMaster,
        Self::DiagramGpt,
        Self::CodeForge,
        Self::Metamorph,
        Self::SyntaxSage,
        Self::TestCraft,
        Self::SecurityAudit,
        Self::LogicLens,
        Self::RfpSolver,
    ];

    /// Returns the static description of this tool.
    #[must_use]
    pub const fn spec(self) -> &'static ToolSpec {
        match self {
            Self::ArchMaster => &ARCH_MASTER,
            Self::DiagramGpt => &DIAGRAM_GPT,
            Self::CodeForge => &CODE_FORGE,
            Self::Metamorph => &METAMORPH,
            Self::SyntaxSage => &SYNTAX_SAGE,
            Self::TestCraft => &TEST_CRAFT,
            Self::SecurityAudit => &SECURITY_AUDIT,
            Self::LogicLens => &LOGIC_LENS,
            Self::RfpSolver => &RFP_SOLVER,
        }
    }

    /// Returns the command-line key.
    #[must_use]
    pub const fn key(self) -> &'static str {
        self.spec().key
    }

    /// Parses a tool key (case-insensitive; `_` accepted for `-`).
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::UnknownTool`] for an unknown key.
    pub fn from_key(key: &str) -> Result<Self> {
        let normalized = key.trim().to_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|tool| tool.key() == normalized)
            .ok_or_else(|| ToolError::UnknownTool(key.to_string()).into())
    }

    /// Builds the chat request for `input`.
    ///
    /// # Errors
    ///
    /// Returns [`ToolError::EmptyInput`] for blank input, or
    /// [`ToolError::UnsupportedTarget`] when the transformer target is
    /// missing or unknown.
    ///
    /// # Examples
    ///
    /// ```
    /// use devtools_rs::tools::{Tool, ToolOptions};
    ///
    /// let options = ToolOptions::default().with_target("Rust");
    /// let request = Tool::Metamorph.build_request("print(1)", &options).unwrap();
    /// assert!(request.user_text().unwrap().contains("to Rust"));
    /// assert!(Tool::TestCraft.build_request("   ", &options).is_err());
    /// ```
    pub fn build_request(self, input: &str, options: &ToolOptions) -> Result<ChatRequest> {
        let spec = self.spec();
        if input.trim().is_empty() {
            return Err(ToolError::EmptyInput {
                tool: spec.key.to_string(),
            }
            .into());
        }

        let content = match self {
            Self::Metamorph => {
                let target = resolve_target(options.target_language.as_deref())?;
                format!(
                    "Convert the following code to {target}. Only return the converted code without any explanations.\n\n{input}"
                )
            }
            _ => input.to_string(),
        };

        let mut messages = Vec::with_capacity(2);
        if let Some(system) = spec.system_prompt {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(content));

        Ok(ChatRequest {
            model: None,
            messages,
            temperature: spec.temperature,
            max_tokens: spec.max_tokens,
            top_p: spec.top_p,
        })
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Tool {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_key(s)
    }
}

/// Matches `target` against [`METAMORPH_TARGETS`] case-insensitively and
/// returns the canonical spelling.
fn resolve_target(target: Option<&str>) -> Result<&'static str> {
    let target = target
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ToolError::UnsupportedTarget("none given".to_string()))?;
    METAMORPH_TARGETS
        .iter()
        .find(|t| t.eq_ignore_ascii_case(target))
        .copied()
        .ok_or_else(|| ToolError::UnsupportedTarget(target.to_string()).into())
}

/// Per-request tool options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOptions {
    /// Target language for the code transformer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,

    /// Whether generated code may be executed locally.
    #[serde(default)]
    pub exec: ExecPolicy,
}

impl ToolOptions {
    /// Sets the transformer target language.
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target_language = Some(target.into());
        self
    }

    /// Sets the execution policy.
    #[must_use]
    pub const fn with_exec(mut self, exec: ExecPolicy) -> Self {
        self.exec = exec;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::provider::Role;
    use test_case::test_case;

    #[test_case("arch-master", Tool::ArchMaster)]
    #[test_case("DIAGRAM-GPT", Tool::DiagramGpt)]
    #[test_case("code_forge", Tool::CodeForge)]
    #[test_case(" metamorph ", Tool::Metamorph)]
    #[test_case("syntax-sage", Tool::SyntaxSage)]
    #[test_case("test-craft", Tool::TestCraft)]
    #[test_case("security-audit", Tool::SecurityAudit)]
    #[test_case("logic-lens", Tool::LogicLens)]
    #[test_case("rfp-solver", Tool::RfpSolver)]
    fn test_from_key(key: &str, expected: Tool) {
        assert_eq!(Tool::from_key(key).unwrap(), expected);
    }

    #[test]
    fn test_unknown_key() {
        let err = Tool::from_key("nope").unwrap_err();
        assert!(matches!(err, Error::Tool(ToolError::UnknownTool(_))));
    }

    #[test]
    fn test_keys_round_trip_through_serde() {
        for tool in Tool::ALL {
            let json = serde_json::to_string(&tool).unwrap();
            assert_eq!(json, format!("\"{}\"", tool.key()));
            assert_eq!(tool.key().parse::<Tool>().unwrap(), tool);
        }
    }

    #[test_case(Tool::ArchMaster, 0.7, 2048, true)]
    #[test_case(Tool::DiagramGpt, 0.7, 2048, false)]
    #[test_case(Tool::CodeForge, 0.7, 2048, false)]
    #[test_case(Tool::Metamorph, 0.3, 2048, true)]
    #[test_case(Tool::SyntaxSage, 1.0, 1024, true)]
    #[test_case(Tool::LogicLens, 0.7, 4096, true)]
    #[test_case(Tool::RfpSolver, 0.3, 200, false)]
    fn test_catalog_parameters(tool: Tool, temperature: f32, max_tokens: u32, streaming: bool) {
        let spec = tool.spec();
        assert!((spec.temperature - temperature).abs() < f32::EPSILON);
        assert_eq!(spec.max_tokens, max_tokens);
        assert_eq!(spec.streaming, streaming);
    }

    #[test]
    fn test_build_request_copies_input_verbatim() {
        let request = Tool::SecurityAudit
            .build_request("eval(input())", &ToolOptions::default())
            .unwrap();
        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        assert_eq!(request.user_text(), Some("eval(input())"));
        assert_eq!(request.max_tokens, 2048);
    }

    #[test]
    fn test_build_request_rejects_blank_input() {
        let err = Tool::ArchMaster
            .build_request(" \n\t", &ToolOptions::default())
            .unwrap_err();
        assert!(matches!(err, Error::Tool(ToolError::EmptyInput { .. })));
    }

    #[test]
    fn test_metamorph_requires_known_target() {
        let missing = Tool::Metamorph.build_request("x = 1", &ToolOptions::default());
        assert!(matches!(
            missing,
            Err(Error::Tool(ToolError::UnsupportedTarget(_)))
        ));

        let unknown = Tool::Metamorph.build_request("x = 1", &ToolOptions::default().with_target("COBOL"));
        assert!(matches!(
            unknown,
            Err(Error::Tool(ToolError::UnsupportedTarget(t))) if t == "COBOL"
        ));

        let request = Tool::Metamorph
            .build_request("x = 1", &ToolOptions::default().with_target("c#"))
            .unwrap();
        assert_eq!(request.messages.len(), 1);
        assert!(request.user_text().unwrap().starts_with("Convert the following code to C#."));
        assert!(request.user_text().unwrap().ends_with("x = 1"));
    }

    #[test]
    fn test_options_serde_defaults() {
        let options: ToolOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, ToolOptions::default());
        assert_eq!(options.exec, ExecPolicy::Denied);
    }
}
