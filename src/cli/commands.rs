//! CLI command implementations.
//!
//! Contains the business logic for each CLI command.

use crate::cli::output::{
    OutputFormat, format_aggregation, format_diagram, format_diagram_fallback, format_digest,
    format_extracted, format_generated, format_language, format_rfp_answers, format_tool_output,
    format_tools,
};
use crate::cli::parser::{Cli, Commands};
use crate::core::RequestContext;
use crate::error::{CommandError, Error, ExecError, IoError, ProviderError, Result};
use crate::io::{read_file, read_input, write_file};
use crate::postprocess::{DEFAULT_LANGUAGE, Language, detect_language, extract_code};
use crate::provider::{ChatProvider, ReplayProvider, create_provider};
use crate::stream::{LineSource, NullRenderer, PartialResponse, TerminalRenderer, aggregate};
use crate::tools::{
    ExecPolicy, RepoDigest, RepoSource, Tool, ToolOptions, ToolOutput, answer_questions,
    parse_questions, run_code, run_tool,
};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Executes the CLI command, streaming incremental output to stdout.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    execute_with(cli, &mut out)
}

/// Executes the CLI command.
///
/// Streaming tools write their text to `out` as it arrives; the returned
/// string is whatever remains to be printed once the command finishes.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute_with(cli: &Cli, out: &mut dyn Write) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);
    debug!(command = ?cli.command, ?format, "executing command");

    match &cli.command {
        Commands::Tools => Ok(format_tools(format)),
        Commands::Run {
            tool,
            input,
            file,
            target,
        } => cmd_run(
            cli,
            out,
            tool,
            input.as_deref(),
            file.as_deref(),
            target.as_deref(),
            format,
        ),
        Commands::Generate {
            input,
            file,
            run,
            allow_exec,
            language,
        } => {
            let policy = if *allow_exec {
                ExecPolicy::Allowed
            } else {
                ExecPolicy::Denied
            };
            cmd_generate(
                cli,
                input.as_deref(),
                file.as_deref(),
                *run,
                policy,
                language.as_deref(),
                format,
            )
        }
        Commands::Diagram {
            input,
            file,
            out: out_path,
            fallback_image,
        } => cmd_diagram(
            cli,
            input.as_deref(),
            file.as_deref(),
            out_path.as_deref(),
            fallback_image.as_deref(),
            format,
        ),
        Commands::AnalyzeRepo {
            source,
            digest_only,
        } => cmd_analyze_repo(cli, out, source, *digest_only, format),
        Commands::Rfp {
            document,
            questions,
        } => cmd_rfp(cli, document, questions, format),
        Commands::Replay {
            transcript,
            extract,
        } => cmd_replay(out, transcript, *extract, format),
        Commands::Extract { file } => {
            let text = read_input(file.as_deref())?;
            Ok(format_extracted(&extract_code(&text), format))
        }
        Commands::Detect { file } => {
            let text = read_input(file.as_deref())?;
            Ok(format_language(detect_language(&text), format))
        }
    }
}

/// Returns the provider selected by the global flags: a transcript replay
/// with `--replay`, otherwise the configured endpoint.
fn make_provider(cli: &Cli) -> Result<Box<dyn ChatProvider>> {
    match &cli.replay {
        Some(path) => {
            debug!(transcript = %path.display(), "replaying recorded responses");
            Ok(Box::new(ReplayProvider::from_path(path)?))
        }
        None => create_provider(&cli.provider_config()),
    }
}

/// Resolves tool input from the positional argument, `--file`, or stdin.
fn tool_input(input: Option<&str>, file: Option<&Path>) -> Result<String> {
    match input {
        Some(text) => Ok(text.to_string()),
        None => read_input(file),
    }
}

fn cmd_run(
    cli: &Cli,
    out: &mut dyn Write,
    tool: &str,
    input: Option<&str>,
    file: Option<&Path>,
    target: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    let tool = Tool::from_key(tool)?;
    if target.is_some() && tool != Tool::Metamorph {
        return Err(CommandError::InvalidArgument(format!(
            "--target only applies to {}",
            Tool::Metamorph.key()
        ))
        .into());
    }

    let mut options = ToolOptions::default();
    if let Some(target) = target {
        options = options.with_target(target);
    }
    let text = tool_input(input, file)?;
    let mut ctx = RequestContext::new(tool, text).with_options(options);

    let provider = make_provider(cli)?;
    run_rendered(&mut ctx, provider.as_ref(), out, format)
}

fn cmd_generate(
    cli: &Cli,
    input: Option<&str>,
    file: Option<&Path>,
    run: bool,
    policy: ExecPolicy,
    language: Option<&str>,
    format: OutputFormat,
) -> Result<String> {
    // Checked before the request so a refused run costs nothing.
    if run && policy != ExecPolicy::Allowed {
        return Err(ExecError::Disabled.into());
    }
    let language_override = language
        .map(|name| {
            Language::from_name(name).ok_or_else(|| -> Error {
                ExecError::UnsupportedLanguage(name.to_string()).into()
            })
        })
        .transpose()?;

    let text = tool_input(input, file)?;
    let mut ctx = RequestContext::new(Tool::CodeForge, text)
        .with_options(ToolOptions::default().with_exec(policy));

    let provider = make_provider(cli)?;
    let output = run_tool(&mut ctx, provider.as_ref(), &mut NullRenderer)?;
    let language = language_override
        .or(output.language)
        .unwrap_or(DEFAULT_LANGUAGE);

    let execution = if run {
        Some(run_code(&output.text, language, ctx.options.exec)?)
    } else {
        None
    };

    Ok(format_generated(
        &output,
        language,
        execution.as_deref(),
        format,
    ))
}

fn cmd_diagram(
    cli: &Cli,
    input: Option<&str>,
    file: Option<&Path>,
    out_path: Option<&Path>,
    fallback_image: Option<&Path>,
    format: OutputFormat,
) -> Result<String> {
    let text = tool_input(input, file)?;
    let mut ctx = RequestContext::new(Tool::DiagramGpt, text);

    let generated = make_provider(cli)
        .and_then(|provider| run_tool(&mut ctx, provider.as_ref(), &mut NullRenderer))
        .and_then(|output| {
            if output.text.is_empty() {
                Err(ProviderError::EmptyResponse.into())
            } else {
                Ok(output)
            }
        });

    match generated {
        Ok(output) => {
            if let Some(path) = out_path {
                write_file(path, &output.text)?;
            }
            Ok(format_diagram(&output, out_path, format))
        }
        Err(e @ Error::Tool(_)) => Err(e),
        Err(e) => match fallback_image.filter(|image| image.is_file()) {
            Some(image) => {
                warn!(error = %e, image = %image.display(), "diagram generation failed, using fallback image");
                Ok(format_diagram_fallback(image, &e.to_string(), format))
            }
            None => Err(e),
        },
    }
}

fn cmd_analyze_repo(
    cli: &Cli,
    out: &mut dyn Write,
    source: &str,
    digest_only: bool,
    format: OutputFormat,
) -> Result<String> {
    let source = RepoSource::parse(source)?;
    let digest = RepoDigest::collect(&source)?;
    if digest_only {
        return Ok(format_digest(&digest, format));
    }

    let mut ctx = RequestContext::new(Tool::LogicLens, digest.render());
    let provider = make_provider(cli)?;
    run_rendered(&mut ctx, provider.as_ref(), out, format)
}

fn cmd_rfp(cli: &Cli, document: &Path, questions: &Path, format: OutputFormat) -> Result<String> {
    let document = read_file(document)?;
    let questions = parse_questions(&read_file(questions)?);
    if questions.is_empty() {
        return Ok(format_rfp_answers(&[], format));
    }

    let provider = make_provider(cli)?;
    let answers = answer_questions(provider.as_ref(), &document, &questions)?;
    Ok(format_rfp_answers(&answers, format))
}

fn cmd_replay(
    out: &mut dyn Write,
    transcript: &Path,
    extract: bool,
    format: OutputFormat,
) -> Result<String> {
    let text = read_input(Some(transcript))?;
    let source = LineSource::new(text.as_bytes());

    let aggregation = match format {
        OutputFormat::Json => aggregate(source, &mut NullRenderer),
        OutputFormat::Text => {
            let mut renderer = TerminalRenderer::new(out);
            let aggregation = aggregate(source, &mut renderer);
            check_renderer(&mut renderer)?;
            aggregation
        }
    };

    if let Some(error) = aggregation.error.clone() {
        return Err(PartialResponse {
            text: aggregation.text().to_string(),
            error,
        }
        .into());
    }
    let extracted = extract.then(|| extract_code(aggregation.text()));
    Ok(format_aggregation(&aggregation, extracted.as_ref(), format))
}

/// Runs the context's tool, streaming to `out` in text mode.
fn run_rendered(
    ctx: &mut RequestContext,
    provider: &dyn ChatProvider,
    out: &mut dyn Write,
    format: OutputFormat,
) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let output: ToolOutput = run_tool(ctx, provider, &mut NullRenderer)?;
            Ok(format_tool_output(&output, false, format))
        }
        OutputFormat::Text => {
            let mut renderer = TerminalRenderer::new(out);
            let result = run_tool(ctx, provider, &mut renderer);
            check_renderer(&mut renderer)?;
            Ok(format_tool_output(&result?, true, format))
        }
    }
}

/// Surfaces a terminal write error; a closed pipe is not an error.
fn check_renderer<W: Write>(renderer: &mut TerminalRenderer<W>) -> Result<()> {
    match renderer.take_error() {
        Some(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(IoError::Generic(e.to_string()).into()),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::output::format_error;
    use clap::Parser;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn sse(parts: &[&str]) -> String {
        parts
            .iter()
            .map(|p| {
                let encoded = serde_json::to_string(p).unwrap();
                format!("data: {{\"choices\":[{{\"delta\":{{\"content\":{encoded}}}}}]}}\n\n")
            })
            .collect::<String>()
            + "data: [DONE]\n"
    }

    fn setup(transcript: &str) -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("transcript.sse");
        fs::write(&path, transcript).unwrap();
        (temp_dir, path)
    }

    fn run(args: &[&str]) -> (Result<String>, String) {
        let mut argv = vec!["devtools-rs"];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let mut out = Vec::new();
        let result = execute_with(&cli, &mut out);
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_cmd_tools() {
        let (result, streamed) = run(&["tools"]);
        let output = result.unwrap();
        assert!(output.contains("metamorph"));
        assert!(streamed.is_empty());
    }

    #[test]
    fn test_cmd_run_streams_to_writer() {
        let (_dir, transcript) = setup(&sse(&["Use ", "a queue."]));
        let path = transcript.to_str().unwrap();
        let (result, streamed) = run(&["--replay", path, "run", "arch-master", "orders"]);
        assert_eq!(result.unwrap(), "");
        assert_eq!(streamed, "Use a queue.\n");
    }

    #[test]
    fn test_cmd_run_json() {
        let (_dir, transcript) = setup(&sse(&["Looks fine."]));
        let path = transcript.to_str().unwrap();
        let (result, streamed) = run(&["--replay", path, "--format", "json", "run", "syntax-sage", "x = 1"]);
        let value: serde_json::Value = serde_json::from_str(&result.unwrap()).unwrap();
        assert_eq!(value["tool"], "syntax-sage");
        assert_eq!(value["text"], "Looks fine.");
        assert!(streamed.is_empty());
    }

    #[test]
    fn test_cmd_run_unknown_tool() {
        let (result, _) = run(&["run", "nope", "x"]);
        assert!(matches!(result, Err(Error::Tool(_))));
    }

    #[test]
    fn test_cmd_run_target_only_for_metamorph() {
        let (result, _) = run(&["run", "arch-master", "x", "--target", "Go"]);
        assert!(matches!(result, Err(Error::Command(CommandError::InvalidArgument(_)))));
    }

    #[test]
    fn test_cmd_run_failed_stream_keeps_partial_output() {
        let (_dir, transcript) = setup(
            "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\ndata: {not json\n",
        );
        let path = transcript.to_str().unwrap();
        let (result, streamed) = run(&["--replay", path, "run", "logic-lens", "repo"]);
        let err = result.unwrap_err();
        assert_eq!(err.partial_text(), Some("partial"));
        assert_eq!(streamed, "partial\n");
    }

    #[test]
    fn test_cmd_run_json_failed_stream_carries_partial_text() {
        let (_dir, transcript) = setup(
            "data: {\"choices\":[{\"delta\":{\"content\":\"partial answer\"}}]}\n\ndata: {not json\n",
        );
        let path = transcript.to_str().unwrap();
        let (result, streamed) = run(&["--replay", path, "--format", "json", "run", "logic-lens", "repo"]);
        let err = result.unwrap_err();
        assert_eq!(err.partial_text(), Some("partial answer"));
        assert!(streamed.is_empty());

        let json: serde_json::Value =
            serde_json::from_str(&format_error(&err, OutputFormat::Json)).unwrap();
        assert_eq!(json["partial"], "partial answer");
        assert!(json["error"].as_str().unwrap().contains("malformed chunk at line 3"));
    }

    #[test]
    fn test_cmd_replay_json_failed_stream_carries_partial_text() {
        let (_dir, transcript) = setup(
            "data: {\"choices\":[{\"delta\":{\"content\":\"partial answer\"}}]}\n\ndata: {not json\n",
        );
        let (result, streamed) = run(&["--format", "json", "replay", transcript.to_str().unwrap()]);
        let err = result.unwrap_err();
        assert_eq!(err.partial_text(), Some("partial answer"));
        assert!(matches!(err.stream_error(), Some(crate::error::StreamError::Decode { line: 3, .. })));
        assert!(streamed.is_empty());
    }

    #[test]
    fn test_cmd_generate_requires_allow_exec() {
        let (result, _) = run(&["generate", "primes", "--run"]);
        assert!(matches!(result, Err(Error::Exec(ExecError::Disabled))));
    }

    #[test]
    fn test_cmd_generate_detects_language() {
        let (_dir, transcript) = setup(&sse(&["```\nfunction f() { return 1; }\n```"]));
        let path = transcript.to_str().unwrap();
        let (result, _) = run(&["--replay", path, "generate", "a function"]);
        let output = result.unwrap();
        assert!(output.starts_with("Language: javascript\n"));
        assert!(output.contains("function f() { return 1; }"));
    }

    #[test]
    fn test_cmd_generate_language_override() {
        let (_dir, transcript) = setup(&sse(&["```\nputs 1\n```"]));
        let path = transcript.to_str().unwrap();
        let (result, _) = run(&["--replay", path, "generate", "x", "--language", "rb"]);
        assert!(result.unwrap().starts_with("Language: ruby\n"));

        let (result, _) = run(&["--replay", path, "generate", "x", "--language", "cobol"]);
        assert!(matches!(result, Err(Error::Exec(ExecError::UnsupportedLanguage(_)))));
    }

    #[test]
    fn test_cmd_diagram_writes_file() {
        let (dir, transcript) = setup(&sse(&["```python\nwith Diagram(\"x\", show=True):\n    pass\n```"]));
        let out = dir.path().join("out/diagram.py");
        let (result, _) = run(&[
            "--replay",
            transcript.to_str().unwrap(),
            "diagram",
            "two tiers",
            "--out",
            out.to_str().unwrap(),
        ]);
        assert!(result.unwrap().starts_with("Diagram code written to"));
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            "with Diagram(\"x\", show=False):\n    pass\n"
        );
    }

    #[test]
    fn test_cmd_diagram_fallback_image() {
        let (dir, transcript) = setup("data: {\"choices\":[{\"delta\":{}}]}\n");
        let image = dir.path().join("reference.png");
        fs::write(&image, b"png").unwrap();
        let (result, _) = run(&[
            "--replay",
            transcript.to_str().unwrap(),
            "diagram",
            "anything",
            "--fallback-image",
            image.to_str().unwrap(),
        ]);
        let output = result.unwrap();
        assert!(output.starts_with("Diagram generation failed"));
        assert!(output.contains("reference.png"));
    }

    #[test]
    fn test_cmd_diagram_without_fallback_fails() {
        let (_dir, transcript) = setup("data: {\"choices\":[{\"delta\":{}}]}\n");
        let (result, _) = run(&["--replay", transcript.to_str().unwrap(), "diagram", "anything"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cmd_analyze_repo_digest_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.py"), "def main():\n    pass\n").unwrap();
        let (result, _) = run(&["analyze-repo", dir.path().to_str().unwrap(), "--digest-only"]);
        let output = result.unwrap();
        assert!(output.contains("- Total Files: 1"));
        assert!(output.contains("### main.py ###"));
    }

    #[test]
    fn test_cmd_rfp() {
        let (dir, transcript) = setup(&sse(&["Yes, via SAML."]));
        let document = dir.path().join("doc.txt");
        let questions = dir.path().join("questions.txt");
        fs::write(&document, "We support SAML single sign-on.").unwrap();
        fs::write(&questions, "Question\nDo you support SSO?\n").unwrap();
        let (result, _) = run(&[
            "--replay",
            transcript.to_str().unwrap(),
            "rfp",
            "--document",
            document.to_str().unwrap(),
            "--questions",
            questions.to_str().unwrap(),
        ]);
        let output = result.unwrap();
        assert!(output.contains("Q1: Do you support SSO?\nA1: Yes, via SAML.\n"));
    }

    #[test]
    fn test_cmd_replay_extract() {
        let (_dir, transcript) = setup(&sse(&["Here:\n```rust\n", "fn main() {}\n```\n"]));
        let (result, streamed) = run(&["replay", transcript.to_str().unwrap(), "--extract"]);
        assert_eq!(streamed, "Here:\n```rust\nfn main() {}\n```\n");
        assert_eq!(result.unwrap(), "\nExtracted code:\nfn main() {}\n");
    }

    #[test]
    fn test_cmd_replay_json() {
        let (_dir, transcript) = setup(&sse(&["a", "", "b"]));
        let (result, streamed) = run(&["--format", "json", "replay", transcript.to_str().unwrap()]);
        let value: serde_json::Value = serde_json::from_str(&result.unwrap()).unwrap();
        assert_eq!(value["text"], "ab");
        assert_eq!(value["publishes"], 2);
        assert!(streamed.is_empty());
    }

    #[test]
    fn test_cmd_extract_and_detect() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reply.md");
        fs::write(&path, "```\n#include <iostream>\nint main() {}\n```").unwrap();
        let (result, _) = run(&["extract", path.to_str().unwrap()]);
        assert_eq!(result.unwrap(), "#include <iostream>\nint main() {}\n");

        let (result, _) = run(&["detect", path.to_str().unwrap()]);
        assert_eq!(result.unwrap(), "c++\n");
    }
}
