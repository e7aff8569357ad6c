//! Binary entry point for devtools-rs.
//!
//! devtools-rs: streaming LLM developer tools.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::Parser;
use devtools_rs::cli::output::{OutputFormat, format_error};
use devtools_rs::cli::{Cli, execute};
use devtools_rs::config::load_env_files;
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    // .env must be loaded before clap reads env fallbacks
    let loaded = load_env_files();
    let cli = Cli::parse();
    init_logging(cli.verbose);
    for path in &loaded {
        tracing::debug!(path = %path.display(), "loaded environment file");
    }

    let format = OutputFormat::parse(&cli.format);

    match execute(&cli) {
        Ok(output) => {
            if !output.is_empty() {
                // Handle broken pipe gracefully (e.g., when piped to `head` or `jq`)
                if let Err(e) = write!(io::stdout(), "{output}")
                    && e.kind() != io::ErrorKind::BrokenPipe
                {
                    eprintln!("Error writing to stdout: {e}");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let error_output = format_error(&e, format);
            match format {
                OutputFormat::Json => {
                    // JSON errors go to stdout for programmatic parsing
                    print!("{error_output}");
                }
                OutputFormat::Text => {
                    eprintln!("Error: {error_output}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays clean for tool output.
/// `RUST_LOG` overrides the default level.
fn init_logging(verbose: bool) {
    let default = if verbose {
        "devtools_rs=debug"
    } else {
        "devtools_rs=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
