//! Article summarization through the LLM.
//!
//! Each article body is split into token windows (see [`chunk`]), every
//! window is summarized in at most four sentences, and the window summaries
//! are joined with spaces. A hung model call is cut off by a timeout and the
//! article gets an empty summary rather than stalling the batch.
//!
//! Progress is checkpointed: after every record the output file is rewritten
//! with all records summarized so far, so a crashed run can be resumed with
//! `--start-index`.

pub mod chunk;

use crate::api::AskAsync;
use crate::models::{ArticleRecord, SummarizedArticle};
use crate::outputs::json::{read_records, write_pretty};
use crate::utils::truncate_for_log;
use chunk::{TextTokenizer, chunk_text_by_tokens};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, info, instrument};

const SUMMARY_MARKER: &str = "Summary:";

/// Tuning knobs for one summarization run.
#[derive(Debug, Clone, Copy)]
pub struct SummarizeOptions {
    /// Maximum tokens per chunk sent to the model.
    pub max_tokens: usize,
    /// Wall-clock budget for summarizing one article.
    pub timeout: Duration,
}

impl Default for SummarizeOptions {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Prompt for one chunk.
pub fn build_prompt(chunk: &str) -> String {
    format!(
        "Summarize the following text in 4 sentences maximum. \
         ONLY output the summary, do not repeat the original text or include any additional commentary:\n\n\
         {chunk}\n\n{SUMMARY_MARKER}"
    )
}

/// Pull the summary out of the model output.
///
/// Models that echo the prompt put the answer after the last `Summary:`
/// marker; otherwise the whole output is the summary.
pub fn extract_summary(generated: &str) -> String {
    match generated.rfind(SUMMARY_MARKER) {
        Some(pos) => generated[pos + SUMMARY_MARKER.len()..].trim().to_string(),
        None => generated.trim().to_string(),
    }
}

/// Summarize `text` chunk by chunk. Blank text yields an empty summary.
pub async fn summarize_text<A>(
    llm: &A,
    text: &str,
    tokenizer: &TextTokenizer,
    max_tokens: usize,
) -> Result<String, Box<dyn Error>>
where
    A: AskAsync<Response = String>,
{
    if text.trim().is_empty() {
        return Ok(String::new());
    }
    let chunks = chunk_text_by_tokens(text, tokenizer, max_tokens)?;
    let mut summaries = Vec::with_capacity(chunks.len());
    for (i, chunk) in chunks.iter().enumerate() {
        debug!(chunk = i + 1, total = chunks.len(), "Summarizing chunk");
        let generated = llm.ask(&build_prompt(chunk)).await?;
        summaries.push(extract_summary(&generated));
    }
    Ok(summaries.join(" "))
}

/// [`summarize_text`] bounded by `options.timeout`.
///
/// Timeouts and model errors are logged and produce an empty summary.
pub async fn safe_summarize_with_timeout<A>(
    llm: &A,
    text: &str,
    tokenizer: &TextTokenizer,
    options: SummarizeOptions,
) -> String
where
    A: AskAsync<Response = String>,
{
    match timeout(
        options.timeout,
        summarize_text(llm, text, tokenizer, options.max_tokens),
    )
    .await
    {
        Ok(Ok(summary)) => summary,
        Ok(Err(e)) => {
            error!(error = %e, "Summarization failed");
            String::new()
        }
        Err(_) => {
            error!(
                timeout_secs = options.timeout.as_secs_f64(),
                "Summarization timed out"
            );
            String::new()
        }
    }
}

/// Summarize `records[start_index..]` from `input_json` into `output_json`.
///
/// The output holds only the records summarized in this run and is rewritten
/// after each one. Returns `Ok(None)` when the input cannot be read.
#[instrument(level = "info", skip(llm, tokenizer, options))]
pub async fn process_json_file<A>(
    llm: &A,
    tokenizer: &TextTokenizer,
    options: SummarizeOptions,
    input_json: &str,
    output_json: &str,
    start_index: usize,
) -> Result<Option<PathBuf>, Box<dyn Error>>
where
    A: AskAsync<Response = String>,
{
    let data: Vec<ArticleRecord> = match read_records(input_json).await {
        Ok(data) => data,
        Err(e) => {
            error!(error = %e, "Failed to read JSON file");
            return Ok(None);
        }
    };
    info!(count = data.len(), "Loaded records");

    let subset = data.into_iter().skip(start_index).collect::<Vec<_>>();
    let total = subset.len();
    info!(total, start_index, "Processing records");

    let mut summarized: Vec<SummarizedArticle> = Vec::with_capacity(total);
    for (offset, record) in subset.into_iter().enumerate() {
        let idx = start_index + offset;
        info!(idx, n = offset + 1, total, url = %record.url, "Summarizing record");

        let summary = safe_summarize_with_timeout(llm, &record.content, tokenizer, options).await;
        debug!(idx, preview = %truncate_for_log(&summary, 200), "Summary preview");
        summarized.push(SummarizedArticle {
            article: record,
            summary,
        });

        match write_pretty(output_json, &summarized).await {
            Ok(()) => debug!(idx, path = output_json, "Saved progress"),
            Err(e) => error!(idx, error = %e, "Failed to save progress"),
        }
    }

    info!(path = output_json, summarized = summarized.len(), "All done");
    Ok(Some(Path::new(output_json).to_path_buf()))
}
