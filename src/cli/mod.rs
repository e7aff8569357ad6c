//! CLI layer for devtools-rs.
//!
//! Provides the command-line interface using clap, with one subcommand
//! per developer tool plus offline helpers for replaying, extracting and
//! detecting.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::{execute, execute_with};
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
