//! Tool execution against a provider.

use crate::core::RequestContext;
use crate::error::Result;
use crate::postprocess::{Language, detect_language, extract_code, sanitize_diagram_code};
use crate::provider::ChatProvider;
use crate::stream::{AggregationState, Renderer, aggregate};
use crate::tools::PostProcess;
use serde::Serialize;
use tracing::{debug, info};

/// Final result of a tool run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolOutput {
    /// Tool key.
    pub tool: &'static str,

    /// Post-processed text.
    pub text: String,

    /// Response text before post-processing.
    pub raw: String,

    /// Whether fenced code was found (extracting tools only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fenced: Option<bool>,

    /// Detected language (code generator only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<Language>,

    /// True if the result came from the context cache.
    pub cached: bool,
}

/// Runs the context's tool and caches the response in the context.
///
/// Streaming tools publish each growing snapshot to `renderer`;
/// non-streaming tools publish the complete text once. When the context
/// already holds a result for its input no request is sent and the
/// renderer is not touched.
///
/// # Errors
///
/// Returns input validation errors from
/// [`Tool::build_request`](crate::tools::Tool::build_request), provider
/// errors, and [`Error::PartialStream`](crate::error::Error::PartialStream)
/// carrying the text received before a failed stream ended (that text is
/// not cached).
///
/// # Examples
///
/// ```
/// use devtools_rs::core::RequestContext;
/// use devtools_rs::provider::ReplayProvider;
/// use devtools_rs::stream::CollectingRenderer;
/// use devtools_rs::tools::{Tool, run_tool};
///
/// let provider = ReplayProvider::new(
///     "data: {\"choices\":[{\"delta\":{\"content\":\"Use a queue.\"}}]}\n",
/// );
/// let mut ctx = RequestContext::new(Tool::ArchMaster, "an order service");
/// let mut renderer = CollectingRenderer::new();
///
/// let output = run_tool(&mut ctx, &provider, &mut renderer).unwrap();
/// assert_eq!(output.text, "Use a queue.");
/// assert!(!output.cached);
///
/// let again = run_tool(&mut ctx, &provider, &mut renderer).unwrap();
/// assert!(again.cached);
/// assert_eq!(ctx.requests_sent, 1);
/// ```
pub fn run_tool(
    ctx: &mut RequestContext,
    provider: &dyn ChatProvider,
    renderer: &mut dyn Renderer,
) -> Result<ToolOutput> {
    let tool = ctx.tool;
    let spec = tool.spec();

    if let Some(cached) = ctx.result() {
        debug!(tool = spec.key, "using cached result");
        return Ok(post_process(spec.key, spec.post_process, cached.to_string(), true));
    }

    let request = tool.build_request(ctx.input(), &ctx.options)?;
    ctx.record_request();
    info!(tool = spec.key, provider = provider.name(), streaming = spec.streaming, "running tool");

    let raw = if spec.streaming {
        let source = provider.stream(&request)?;
        let outcome = aggregate(source, renderer);
        debug!(
            publishes = outcome.publishes,
            complete = outcome.state == AggregationState::Completed,
            "stream finished"
        );
        outcome.into_result()?
    } else {
        let text = provider.complete(&request)?;
        renderer.publish(&text);
        renderer.finalize(&text);
        text
    };

    ctx.store_result(raw.clone());
    Ok(post_process(spec.key, spec.post_process, raw, false))
}

fn post_process(tool: &'static str, mode: PostProcess, raw: String, cached: bool) -> ToolOutput {
    let (text, fenced, language) = match mode {
        PostProcess::None => (raw.clone(), None, None),
        PostProcess::ExtractCode => {
            let extracted = extract_code(&raw);
            (extracted.text, Some(extracted.fenced), None)
        }
        PostProcess::ExtractAndDetect => {
            let extracted = extract_code(&raw);
            let language = detect_language(&extracted.text);
            (extracted.text, Some(extracted.fenced), Some(language))
        }
        PostProcess::Diagram => (sanitize_diagram_code(&raw), None, None),
    };

    ToolOutput {
        tool,
        text,
        raw,
        fenced,
        language,
        cached,
    }
}
