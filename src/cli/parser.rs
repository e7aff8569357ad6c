//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use crate::config::{
    API_KEY_VAR, BASE_URL_VAR, DEFAULT_BASE_URL, DEFAULT_MODEL, MODEL_VAR, ProviderConfig,
    TIMEOUT_VAR,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// devtools-rs: streaming LLM developer tools.
///
/// Architecture design, diagram and code generation, code transformation,
/// review, test generation, security audits, repository analysis and RFP
/// answering against an OpenAI-compatible endpoint.
#[derive(Parser, Debug)]
#[command(name = "devtools-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose (debug) logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// API key for the endpoint.
    #[arg(long, env = API_KEY_VAR, hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// OpenAI-compatible endpoint base URL.
    #[arg(long, env = BASE_URL_VAR, default_value = DEFAULT_BASE_URL, global = true)]
    pub base_url: String,

    /// Model name.
    #[arg(long, env = MODEL_VAR, default_value = DEFAULT_MODEL, global = true)]
    pub model: String,

    /// Request timeout in seconds (0 or unset waits indefinitely).
    #[arg(long, env = TIMEOUT_VAR, global = true)]
    pub timeout: Option<u64>,

    /// Answer from a recorded SSE/NDJSON transcript instead of the endpoint.
    #[arg(long, value_name = "TRANSCRIPT", global = true)]
    pub replay: Option<PathBuf>,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the available tools.
    Tools,

    /// Run a tool on some input.
    ///
    /// Input comes from the argument, `--file`, or stdin.
    Run {
        /// Tool key (see `tools`).
        tool: String,

        /// Input text.
        input: Option<String>,

        /// Read input from a file (`-` for stdin).
        #[arg(short, long, conflicts_with = "input")]
        file: Option<PathBuf>,

        /// Target language for `metamorph`.
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Generate code, detect its language and optionally run it.
    Generate {
        /// Description of the code to generate.
        input: Option<String>,

        /// Read the description from a file (`-` for stdin).
        #[arg(short, long, conflicts_with = "input")]
        file: Option<PathBuf>,

        /// Execute the generated code locally.
        #[arg(long)]
        run: bool,

        /// Allow local execution (required with `--run`).
        #[arg(long)]
        allow_exec: bool,

        /// Override the detected language.
        #[arg(short, long)]
        language: Option<String>,
    },

    /// Generate architecture diagram code.
    Diagram {
        /// Architecture description.
        input: Option<String>,

        /// Read the description from a file (`-` for stdin).
        #[arg(short, long, conflicts_with = "input")]
        file: Option<PathBuf>,

        /// Write the diagram code to this file.
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Reference image reported when generation fails.
        #[arg(long)]
        fallback_image: Option<PathBuf>,
    },

    /// Analyze a GitHub repository or local directory.
    AnalyzeRepo {
        /// `https://github.com/<owner>/<repo>` URL or directory path.
        source: String,

        /// Print the digest sent to the model and exit.
        #[arg(long)]
        digest_only: bool,
    },

    /// Answer RFP questions from an internal document.
    Rfp {
        /// Plain-text document.
        #[arg(short, long)]
        document: PathBuf,

        /// Questions file, one question per line.
        #[arg(short, long)]
        questions: PathBuf,
    },

    /// Aggregate a recorded response stream offline.
    Replay {
        /// SSE or NDJSON transcript (`-` for stdin).
        transcript: PathBuf,

        /// Extract fenced code from the final text.
        #[arg(long)]
        extract: bool,
    },

    /// Extract fenced code blocks from text.
    Extract {
        /// Input file (stdin if omitted).
        file: Option<PathBuf>,
    },

    /// Detect the language of a code snippet.
    Detect {
        /// Input file (stdin if omitted).
        file: Option<PathBuf>,
    },
}

impl Cli {
    /// Returns the provider configuration from flags and environment.
    #[must_use]
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig {
            api_key: self.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: self.base_url.clone(),
            model: self.model.clone(),
            timeout: None,
        }
        .with_timeout_secs(self.timeout)
    }
}
