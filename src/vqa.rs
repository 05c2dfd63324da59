//! Visual question answering over PDF pages.
//!
//! Rasterises the selected pages and asks the configured vision LLM each
//! question about each page. Pages are independent and processed
//! concurrently; the questions within a page are asked in order so answers
//! print in the order the caller supplied them.
//!
//! A single bad page does not abort the run: its failure is recorded in
//! [`PageAnswers::error`] and every other page still produces answers. Only
//! when every page fails does the run return [`DocIntelError::AllPagesFailed`].

use crate::config::QueryConfig;
use crate::error::{DocIntelError, PageError};
use crate::output::{DocumentMetadata, PageAnswers, QuestionAnswer, VqaOutput, VqaStats};
use crate::pipeline::{encode, input, render};
use crate::prompts::{DEFAULT_SIGNATORY_QUESTIONS, VQA_SYSTEM_PROMPT};
use crate::provider::{self, ChatRequest, ImageData, LlmProvider};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Ask questions about each selected page of a PDF.
///
/// This is the primary VQA entry point.
///
/// # Arguments
/// * `input_str` — Local file path or HTTP/HTTPS URL to a PDF
/// * `questions` — Questions to ask of every page; empty slice uses
///   [`DEFAULT_SIGNATORY_QUESTIONS`]
/// * `config`    — Query configuration
///
/// # Returns
/// `Ok(VqaOutput)` on success, even if some pages failed
/// (check `output.stats.failed_pages`).
///
/// # Errors
/// Returns `Err(DocIntelError)` only for fatal errors:
/// - File not found / permission denied / not a valid PDF
/// - Provider not configured
/// - All pages failed and no answers were produced
pub async fn ask(
    input_str: impl AsRef<str>,
    questions: &[String],
    config: &QueryConfig,
) -> Result<VqaOutput, DocIntelError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting VQA run: {}", input_str);

    let questions: Vec<String> = if questions.is_empty() {
        DEFAULT_SIGNATORY_QUESTIONS
            .iter()
            .map(|q| q.to_string())
            .collect()
    } else {
        questions.to_vec()
    };

    // ── Step 1: Resolve input ────────────────────────────────────────────
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    // ── Step 2: Build provider ───────────────────────────────────────────
    let provider = provider::build_provider(config)?;

    // ── Step 3: Extract metadata ─────────────────────────────────────────
    let metadata = render::extract_metadata(&pdf_path, config.password.as_deref()).await?;
    let total_pages = metadata.page_count;
    info!("PDF has {} pages", total_pages);

    // ── Step 4: Compute page indices ─────────────────────────────────────
    let page_indices = config.pages.to_indices(total_pages);
    if page_indices.is_empty() {
        return Err(DocIntelError::PageOutOfRange {
            page: 0,
            total: total_pages,
        });
    }
    debug!("Selected {} pages", page_indices.len());

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_start(page_indices.len());
    }

    // ── Step 5: Rasterise pages ──────────────────────────────────────────
    let render_start = Instant::now();
    let rendered = render::render_pages(&pdf_path, config, &page_indices).await?;
    let render_duration_ms = render_start.elapsed().as_millis() as u64;
    info!(
        "Rendered {} pages in {}ms",
        rendered.len(),
        render_duration_ms
    );

    // ── Step 6: Encode images to base64 ──────────────────────────────────
    let encoded: Vec<(usize, ImageData)> = rendered
        .iter()
        .filter_map(|(idx, img)| match encode::encode_page(img) {
            Ok(data) => Some((*idx, data)),
            Err(e) => {
                warn!("Failed to encode page {}: {}", idx + 1, e);
                None
            }
        })
        .collect();

    // ── Step 7: Question each page ───────────────────────────────────────
    let llm_start = Instant::now();
    let total_selected = encoded.len();
    let mut pages: Vec<PageAnswers> = stream::iter(encoded.into_iter().map(|(idx, img_data)| {
        let provider = Arc::clone(&provider);
        let page_num = idx + 1;
        let questions = questions.clone();
        let config_clone = config.clone();
        async move {
            if let Some(ref cb) = config_clone.progress_callback {
                cb.on_page_start(page_num, total_selected);
            }
            let result =
                question_page(&provider, page_num, img_data, &questions, &config_clone).await;
            if let Some(ref cb) = config_clone.progress_callback {
                match &result.error {
                    None => cb.on_page_complete(page_num, total_selected, result.answers.len()),
                    Some(e) => cb.on_page_error(page_num, total_selected, &e.to_string()),
                }
            }
            result
        }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;
    let llm_duration_ms = llm_start.elapsed().as_millis() as u64;

    // Sort by page number for consistent output
    pages.sort_by_key(|p| p.page_num);

    // ── Step 8: Compute stats ────────────────────────────────────────────
    let processed = pages.iter().filter(|p| p.error.is_none()).count();
    let failed = pages.iter().filter(|p| p.error.is_some()).count();

    if processed == 0 {
        let first_error = pages
            .iter()
            .find_map(|p| p.error.as_ref())
            .map(|e| format!("{}", e))
            .unwrap_or_else(|| "Unknown error".to_string());

        return Err(DocIntelError::AllPagesFailed {
            total: pages.len(),
            retries: config.max_retries,
            first_error,
        });
    }

    let stats = VqaStats {
        total_pages,
        processed_pages: processed,
        failed_pages: failed,
        total_questions: questions.len() * pages.len(),
        total_input_tokens: pages
            .iter()
            .flat_map(|p| p.answers.iter())
            .map(|a| a.input_tokens as u64)
            .sum(),
        total_output_tokens: pages
            .iter()
            .flat_map(|p| p.answers.iter())
            .map(|a| a.output_tokens as u64)
            .sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        render_duration_ms,
        llm_duration_ms,
    };

    info!(
        "VQA run complete: {}/{} pages, {}ms total",
        processed, total_pages, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_run_complete(total_selected, processed);
    }

    Ok(VqaOutput {
        pages,
        metadata,
        stats,
    })
}

/// Synchronous wrapper around [`ask`].
///
/// Creates a temporary tokio runtime internally.
pub fn ask_sync(
    input_str: impl AsRef<str>,
    questions: &[String],
    config: &QueryConfig,
) -> Result<VqaOutput, DocIntelError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| DocIntelError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(ask(input_str, questions, config))
}

/// Extract PDF metadata without asking anything.
///
/// Does not require an LLM provider or API key.
pub async fn inspect(input_str: impl AsRef<str>) -> Result<DocumentMetadata, DocIntelError> {
    let resolved = input::resolve_input(input_str.as_ref(), 120).await?;
    let pdf_path = resolved.path().to_path_buf();
    render::extract_metadata(&pdf_path, None).await
}

/// Ask every question of a single page image.
///
/// ## Message Layout
///
/// Each question is its own request: system prompt, then a user message
/// carrying the page PNG plus the question text. One question per request
/// keeps answers crisp — bundling questions tempts the model into prose.
///
/// ## Return Value
///
/// Always returns a `PageAnswers` — never propagates the error upward so a
/// single bad page doesn't abort the run. The first question to exhaust its
/// retries fails the whole page; answers already collected are discarded
/// because a partial answer set is indistinguishable from "NOT FOUND" rows
/// to downstream consumers.
async fn question_page(
    provider: &Arc<dyn LlmProvider>,
    page_num: usize,
    image_data: ImageData,
    questions: &[String],
    config: &QueryConfig,
) -> PageAnswers {
    let start = Instant::now();
    let mut answers = Vec::with_capacity(questions.len());

    for question in questions {
        let request = ChatRequest {
            system: Some(VQA_SYSTEM_PROMPT.to_string()),
            text: question.clone(),
            images: vec![image_data.clone()],
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        };

        match provider::chat_with_retry(
            provider,
            &request,
            config.max_retries,
            config.retry_backoff_ms,
        )
        .await
        {
            Ok(response) => {
                debug!(
                    "Page {}: {:?} → {} ({} in / {} out)",
                    page_num,
                    question,
                    response.content.trim(),
                    response.input_tokens,
                    response.output_tokens
                );
                answers.push(QuestionAnswer {
                    question: question.clone(),
                    answer: response.content.trim().to_string(),
                    input_tokens: response.input_tokens,
                    output_tokens: response.output_tokens,
                });
            }
            Err(e) => {
                warn!("Page {}: question failed — {}", page_num, e);
                return PageAnswers {
                    page_num,
                    answers: Vec::new(),
                    duration_ms: start.elapsed().as_millis() as u64,
                    retries: config.max_retries as u8,
                    error: Some(PageError::LlmFailed {
                        page: page_num,
                        retries: config.max_retries as u8,
                        detail: e.to_string(),
                    }),
                };
            }
        }
    }

    PageAnswers {
        page_num,
        answers,
        duration_ms: start.elapsed().as_millis() as u64,
        retries: 0,
        error: None,
    }
}
