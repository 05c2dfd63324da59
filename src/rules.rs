//! Signing-rule extraction: document text → LLM → structured checkbox report.
//!
//! The extractor sends the document's text layer to the configured LLM with a
//! prompt that asks for a single JSON object describing every signing rule
//! and its checkbox state, then parses the reply into
//! [`ExtractionResult`].
//!
//! ## The error-shaped fallback
//!
//! [`parse_extraction`] never fails. Models occasionally wrap the object in
//! code fences, truncate it, or reply with prose; all of those collapse into
//! `ExtractionResult::failure` — status "error", zero counts, empty lists —
//! so the UI and CLI always render a well-formed object. The same applies to
//! LLM-call failures in [`extract_from_text`]. Only input-side problems
//! (missing file, no text layer) are real `Err`s.
//!
//! ## Consistency checking
//!
//! The model's arithmetic is not trusted: [`consistency_issues`] cross-checks
//! `approved_count` against list lengths and membership. Violations are
//! reported as warnings, never silently repaired — the caller should see what
//! the model actually said.

use crate::config::QueryConfig;
use crate::error::DocIntelError;
use crate::output::{ExtractionResult, RulesReport};
use crate::pipeline::{input, text};
use crate::prompts;
use crate::provider::{self, ChatRequest, LlmProvider};
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Extract signing rules from a PDF file or URL.
///
/// # Errors
/// Returns `Err(DocIntelError)` only for input-side failures:
/// - File not found / not a valid PDF / wrong password
/// - No extractable text (scanned documents have no text layer)
/// - Provider not configured
///
/// LLM and parse failures are reported inside the returned
/// [`RulesReport`] as the error-shaped result.
pub async fn extract_signing_rules(
    input_str: impl AsRef<str>,
    config: &QueryConfig,
) -> Result<RulesReport, DocIntelError> {
    let input_str = input_str.as_ref();
    info!("Starting rule extraction: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let pdf_path = resolved.path().to_path_buf();

    let pages = text::extract_pages(&pdf_path, config.password.as_deref()).await?;
    if text::is_effectively_empty(&pages) {
        return Err(DocIntelError::NoExtractableText { path: pdf_path });
    }

    let provider = provider::build_provider(config)?;
    let document_text = text::join_pages(&pages);

    Ok(extract_from_text(&document_text, &provider, config).await)
}

/// Run the extraction tail on already-extracted document text.
///
/// Split out from [`extract_signing_rules`] so callers holding text from
/// another source (the web UI keeps per-page text in its session) and tests
/// with scripted providers can reuse the exact production path.
pub async fn extract_from_text(
    document_text: &str,
    provider: &Arc<dyn LlmProvider>,
    config: &QueryConfig,
) -> RulesReport {
    let start = Instant::now();

    let request = ChatRequest {
        system: None,
        text: prompts::rules_prompt(document_text),
        images: Vec::new(),
        temperature: config.temperature,
        max_tokens: config.max_tokens,
    };

    let (result, input_tokens, output_tokens) = match provider::chat_with_retry(
        provider,
        &request,
        config.max_retries,
        config.retry_backoff_ms,
    )
    .await
    {
        Ok(response) => (
            parse_extraction(&response.content),
            response.input_tokens,
            response.output_tokens,
        ),
        Err(e) => {
            warn!("Rule extraction LLM call failed: {}", e);
            (
                ExtractionResult::failure(format!("Error processing document: {}", e)),
                0,
                0,
            )
        }
    };

    let warnings = consistency_issues(&result);
    for w in &warnings {
        warn!("Extraction inconsistency: {}", w);
    }

    RulesReport {
        result,
        warnings,
        input_tokens,
        output_tokens,
        duration_ms: start.elapsed().as_millis() as u64,
    }
}

// ── Reply parsing ────────────────────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*\n?(.*?)\n?```\s*$").unwrap());

/// Strip a single pair of outer ``` / ```json fences, if present.
///
/// Models wrap replies in fences despite the prompt saying "only JSON";
/// anything else is left untouched.
fn strip_json_fences(input: &str) -> &str {
    match RE_OUTER_FENCES.captures(input.trim()) {
        Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
        None => input.trim(),
    }
}

/// Parse an LLM reply into an [`ExtractionResult`].
///
/// Never fails: malformed or non-JSON input yields the error-shaped result
/// (status "error", zero counts, empty lists) with the parse problem in
/// `message`.
pub fn parse_extraction(reply: &str) -> ExtractionResult {
    let body = strip_json_fences(reply);

    match serde_json::from_str::<ExtractionResult>(body) {
        Ok(result) => result,
        Err(e) => {
            warn!("Could not parse extraction reply as JSON: {}", e);
            ExtractionResult::failure(format!("Error processing document: {}", e))
        }
    }
}

// ── Consistency checking ─────────────────────────────────────────────────

/// Cross-check the counts and lists inside a parsed result.
///
/// Returns one human-readable line per violation; empty means consistent.
/// Checks:
/// - `total_rules` equals `all_rules.len()`
/// - `approved_count` equals `approved_rules.len()`
/// - every approved rule appears in `all_rules` with `is_approved == true`
pub fn consistency_issues(result: &ExtractionResult) -> Vec<String> {
    let mut issues = Vec::new();

    if result.total_rules as usize != result.all_rules.len() {
        issues.push(format!(
            "total_rules is {} but all_rules lists {} entries",
            result.total_rules,
            result.all_rules.len()
        ));
    }

    if result.approved_count as usize != result.approved_rules.len() {
        issues.push(format!(
            "approved_count is {} but approved_rules lists {} entries",
            result.approved_count,
            result.approved_rules.len()
        ));
    }

    for rule in &result.approved_rules {
        match result
            .all_rules
            .iter()
            .find(|r| r.rule_number == rule.rule_number)
        {
            None => issues.push(format!(
                "approved rule {} is missing from all_rules",
                rule.rule_number
            )),
            Some(r) if !r.is_approved => issues.push(format!(
                "rule {} is approved but flagged is_approved=false in all_rules",
                rule.rule_number
            )),
            Some(_) => {}
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::RuleEntry;
    use crate::provider::ChatResponse;
    use async_trait::async_trait;

    const VALID_REPLY: &str = r#"{
        "status": "success",
        "message": "Found 2 rules in 1 section",
        "sections_found": [
            {"section_name": "Signing Authority", "section_number": "4", "location": "page 2"}
        ],
        "total_rules": 2,
        "approved_count": 1,
        "approved_rules": [
            {"rule_number": 1, "rule_text": "Any one director may sign", "checkbox_content": "✓", "section": "Signing Authority", "is_approved": true}
        ],
        "all_rules": [
            {"rule_number": 1, "rule_text": "Any one director may sign", "checkbox_content": "✓", "section": "Signing Authority", "is_approved": true},
            {"rule_number": 2, "rule_text": "Two officers must sign jointly", "checkbox_content": "☐", "section": "Signing Authority", "is_approved": false}
        ]
    }"#;

    #[test]
    fn parses_valid_reply() {
        let result = parse_extraction(VALID_REPLY);
        assert!(result.is_success());
        assert_eq!(result.total_rules, 2);
        assert_eq!(result.approved_count, 1);
        assert_eq!(result.approved_rules.len(), 1);
        assert!(consistency_issues(&result).is_empty());
    }

    #[test]
    fn parses_fenced_reply() {
        let fenced = format!("```json\n{}\n```", VALID_REPLY);
        let result = parse_extraction(&fenced);
        assert!(result.is_success());
        assert_eq!(result.total_rules, 2);

        let bare_fence = format!("```\n{}\n```", VALID_REPLY);
        assert!(parse_extraction(&bare_fence).is_success());
    }

    #[test]
    fn malformed_reply_yields_error_shape() {
        for garbage in [
            "",
            "Sorry, I cannot find any checkboxes in this document.",
            "{\"status\": \"success\", \"total_rules\": ",
            "```json\nnot json at all\n```",
        ] {
            let result = parse_extraction(garbage);
            assert_eq!(result.status, "error", "input: {garbage:?}");
            assert_eq!(result.total_rules, 0);
            assert_eq!(result.approved_count, 0);
            assert!(result.sections_found.is_empty());
            assert!(result.approved_rules.is_empty());
            assert!(result.all_rules.is_empty());
        }
    }

    #[test]
    fn detects_count_mismatches() {
        let mut result = parse_extraction(VALID_REPLY);
        result.approved_count = 5;
        let issues = consistency_issues(&result);
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("approved_count"));
    }

    #[test]
    fn detects_approved_rule_missing_from_all_rules() {
        let mut result = parse_extraction(VALID_REPLY);
        result.approved_rules.push(RuleEntry {
            rule_number: 9,
            rule_text: "phantom".into(),
            checkbox_content: "X".into(),
            section: String::new(),
            is_approved: true,
        });
        result.approved_count = 2;
        let issues = consistency_issues(&result);
        assert!(issues.iter().any(|i| i.contains("missing from all_rules")));
    }

    #[test]
    fn detects_approval_flag_disagreement() {
        let mut result = parse_extraction(VALID_REPLY);
        result.all_rules[0].is_approved = false;
        let issues = consistency_issues(&result);
        assert!(issues.iter().any(|i| i.contains("is_approved=false")));
    }

    struct ScriptedProvider {
        reply: String,
    }

    #[async_trait]
    impl LlmProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, DocIntelError> {
            // The extraction request is text-only; images would be a bug.
            assert!(request.images.is_empty());
            Ok(ChatResponse {
                content: self.reply.clone(),
                input_tokens: 100,
                output_tokens: 50,
            })
        }
    }

    #[tokio::test]
    async fn extract_from_text_end_to_end() {
        let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            reply: VALID_REPLY.to_string(),
        });
        let config = QueryConfig::default();

        let report = extract_from_text("Section 4: Signing Authority …", &provider, &config).await;
        assert!(report.result.is_success());
        assert_eq!(report.result.total_rules, 2);
        assert!(report.warnings.is_empty());
        assert_eq!(report.input_tokens, 100);
    }

    #[tokio::test]
    async fn extract_from_text_surfaces_warnings() {
        let provider: Arc<dyn LlmProvider> = Arc::new(ScriptedProvider {
            reply: r#"{"status":"success","message":"","sections_found":[],"total_rules":3,"approved_count":0,"approved_rules":[],"all_rules":[]}"#
                .to_string(),
        });
        let config = QueryConfig::default();

        let report = extract_from_text("…", &provider, &config).await;
        assert!(report.result.is_success());
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("total_rules"));
    }

    struct DeadProvider;

    #[async_trait]
    impl LlmProvider for DeadProvider {
        fn name(&self) -> &'static str {
            "dead"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, DocIntelError> {
            Err(DocIntelError::AuthError {
                provider: "dead".into(),
                detail: "invalid x-api-key".into(),
            })
        }
    }

    #[tokio::test]
    async fn llm_failure_becomes_error_shaped_result() {
        let provider: Arc<dyn LlmProvider> = Arc::new(DeadProvider);
        let config = QueryConfig::default();

        let report = extract_from_text("…", &provider, &config).await;
        assert_eq!(report.result.status, "error");
        assert!(report.result.message.contains("Error processing document"));
        assert_eq!(report.result.total_rules, 0);
        assert!(report.result.all_rules.is_empty());
    }

    #[test]
    fn fence_stripping_leaves_inner_fences_alone() {
        // Only the outer pair is stripped; fenced content inside a rule text
        // must survive.
        let reply = "```json\n{\"status\":\"success\",\"message\":\"has ``` inside\"}\n```";
        let result = parse_extraction(reply);
        assert!(result.is_success());
        assert!(result.message.contains("```"));
    }
}
