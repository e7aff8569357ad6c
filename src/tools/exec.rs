//! Local execution of generated code.
//!
//! Off unless the caller passes [`ExecPolicy::Allowed`]. Source is written
//! to a temporary file (C++ is compiled inside a temporary directory) that
//! is removed on every path, including errors.

use crate::error::{ExecError, Result};
use crate::postprocess::Language;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tracing::{debug, info};

/// Message returned when a program prints nothing.
pub const NO_OUTPUT_MESSAGE: &str = "Program executed successfully with no output.";

/// Whether generated code may be executed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecPolicy {
    /// Execution refused.
    #[default]
    Denied,
    /// Execution explicitly allowed by the user.
    Allowed,
}

/// Runner for one language: display name plus executable candidates in
/// lookup order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Runtime {
    /// Name used in messages and install hints.
    pub name: &'static str,
    /// Executables tried on `PATH`, first found wins.
    pub candidates: &'static [&'static str],
    /// Whether the source is compiled before running.
    pub compiled: bool,
}

impl Runtime {
    /// Returns the runtime for `language`.
    #[must_use]
    pub const fn for_language(language: Language) -> Self {
        match language {
            Language::Python => Self {
                name: "python",
                candidates: &["python3", "python"],
                compiled: false,
            },
            Language::JavaScript => Self {
                name: "node",
                candidates: &["node", "nodejs"],
                compiled: false,
            },
            Language::Cpp => Self {
                name: "g++",
                candidates: &["g++", "g++-11", "g++-10"],
                compiled: true,
            },
            Language::Ruby => Self {
                name: "ruby",
                candidates: &["ruby"],
                compiled: false,
            },
            Language::Swift => Self {
                name: "swift",
                candidates: &["swift"],
                compiled: false,
            },
        }
    }

    /// Finds the first candidate on `PATH`.
    #[must_use]
    pub fn locate(&self) -> Option<PathBuf> {
        self.candidates
            .iter()
            .find_map(|candidate| which::which(candidate).ok())
    }
}

/// Returns install instructions for `runtime` on `os` (as in
/// [`std::env::consts::OS`]).
#[must_use]
pub fn install_hint(runtime: &str, os: &str) -> String {
    let hint = match (runtime, os) {
        ("python", "macos") => "brew install python",
        ("python", "linux") => "sudo apt-get install python3",
        ("python", "windows") => "Download Python from https://www.python.org/downloads/",
        ("node", "macos") => "brew install node",
        ("node", "linux") => "sudo apt-get install nodejs",
        ("node", "windows") => "Download Node.js from https://nodejs.org/",
        ("g++", "macos") => "xcode-select --install",
        ("g++", "linux") => "sudo apt-get install g++",
        ("g++", "windows") => "Install MinGW from https://mingw-w64.org/",
        ("ruby", "macos") => "brew install ruby",
        ("ruby", "linux") => "sudo apt-get install ruby",
        ("ruby", "windows") => "Download Ruby from https://rubyinstaller.org/",
        _ => {
            return format!(
                "Please visit the official {runtime} website for installation instructions."
            );
        }
    };
    hint.to_string()
}

/// Runs `code` as `language` and returns its output.
///
/// The output is the program's stderr if non-empty, else its stdout, else
/// [`NO_OUTPUT_MESSAGE`]. A failed C++ compile returns
/// `"Compilation Error:\n<compiler stderr>"`.
///
/// # Errors
///
/// Returns [`ExecError::Disabled`] unless `policy` is
/// [`ExecPolicy::Allowed`], [`ExecError::RuntimeNotFound`] if no
/// interpreter or compiler is on `PATH`, and an I/O or spawn error if the
/// scratch files or process cannot be created.
pub fn run_code(code: &str, language: Language, policy: ExecPolicy) -> Result<String> {
    if policy != ExecPolicy::Allowed {
        return Err(ExecError::Disabled.into());
    }

    let runtime = Runtime::for_language(language);
    let command = runtime.locate().ok_or_else(|| ExecError::RuntimeNotFound {
        command: runtime.name.to_string(),
        hint: install_hint(runtime.name, std::env::consts::OS),
    })?;
    info!(language = %language, command = %command.display(), "executing generated code");

    if runtime.compiled {
        return compile_and_run(code, language, &command);
    }

    let mut source = tempfile::Builder::new()
        .prefix("devtools-")
        .suffix(&format!(".{}", language.extension()))
        .tempfile()?;
    source.write_all(code.as_bytes())?;
    source.flush()?;

    let output = spawn(Command::new(&command).arg(source.path()), &command)?;
    Ok(program_output(&output))
}

fn compile_and_run(code: &str, language: Language, compiler: &Path) -> Result<String> {
    let dir = tempfile::Builder::new().prefix("devtools-build-").tempdir()?;
    let source = dir.path().join(format!("main.{}", language.extension()));
    let binary = dir
        .path()
        .join(format!("main{}", std::env::consts::EXE_SUFFIX));
    std::fs::write(&source, code)?;

    let compiled = spawn(
        Command::new(compiler).arg(&source).arg("-o").arg(&binary),
        compiler,
    )?;
    if !compiled.status.success() {
        debug!(status = ?compiled.status, "compilation failed");
        return Ok(format!(
            "Compilation Error:\n{}",
            String::from_utf8_lossy(&compiled.stderr)
        ));
    }

    let output = spawn(&mut Command::new(&binary), &binary)?;
    Ok(program_output(&output))
}

fn spawn(command: &mut Command, program: &Path) -> Result<Output> {
    command.output().map_err(|e| {
        ExecError::Spawn {
            command: program.display().to_string(),
            reason: e.to_string(),
        }
        .into()
    })
}

fn program_output(output: &Output) -> String {
    debug!(status = ?output.status, "program exited");
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        return stderr.into_owned();
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.is_empty() {
        return stdout.into_owned();
    }
    NO_OUTPUT_MESSAGE.to_string()
}
