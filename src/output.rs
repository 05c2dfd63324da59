//! Output types returned by the docintel pipelines.
//!
//! Everything here is plain serialisable data: the CLI prints it, the web UI
//! ships it as JSON, and library callers can persist it. The extraction types
//! ([`ExtractionResult`], [`RuleEntry`], [`SectionRef`]) are the wire contract
//! shared with the LLM — their field names are part of the prompt and must not
//! drift from it.

use crate::error::PageError;
use serde::{Deserialize, Serialize};

// ── Document metadata ────────────────────────────────────────────────────

/// PDF document metadata, extracted without any LLM involvement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub title: Option<String>,
    pub author: Option<String>,
    pub subject: Option<String>,
    pub creator: Option<String>,
    pub producer: Option<String>,
    pub creation_date: Option<String>,
    pub modification_date: Option<String>,
    pub page_count: usize,
    pub pdf_version: String,
}

// ── VQA ──────────────────────────────────────────────────────────────────

/// One question asked of a page and the model's answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionAnswer {
    pub question: String,
    pub answer: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// All answers for a single page, or the error that sank it.
///
/// `error.is_some()` means the page produced no usable answers; partial
/// per-question failures do not occur because questions on a page are asked
/// sequentially and the first exhausted retry fails the page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageAnswers {
    /// 1-indexed page number.
    pub page_num: usize,
    pub answers: Vec<QuestionAnswer>,
    pub duration_ms: u64,
    pub retries: u8,
    pub error: Option<PageError>,
}

/// Aggregate statistics for a VQA run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VqaStats {
    pub total_pages: usize,
    pub processed_pages: usize,
    pub failed_pages: usize,
    pub total_questions: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
    pub render_duration_ms: u64,
    pub llm_duration_ms: u64,
}

/// The result of a full VQA run over a document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VqaOutput {
    pub pages: Vec<PageAnswers>,
    pub metadata: DocumentMetadata,
    pub stats: VqaStats,
}

// ── Signing-rule extraction ──────────────────────────────────────────────

/// A section of the document in which signing rules were found.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionRef {
    #[serde(default)]
    pub section_name: String,
    #[serde(default)]
    pub section_number: String,
    #[serde(default)]
    pub location: String,
}

/// One signing rule with its checkbox state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleEntry {
    #[serde(default)]
    pub rule_number: u32,
    #[serde(default)]
    pub rule_text: String,
    /// The raw checkbox marker as it appears in the document (✓, X, □, …).
    #[serde(default)]
    pub checkbox_content: String,
    #[serde(default)]
    pub section: String,
    #[serde(default)]
    pub is_approved: bool,
}

/// Parsed result of a signing-rule extraction.
///
/// This mirrors the JSON object the LLM is instructed to return. On any LLM
/// or parse failure the extractor returns [`ExtractionResult::failure`]
/// instead of an error — zero counts, empty lists, status `"error"` — so
/// renderers always have a well-formed object to work with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// "success" or "error".
    #[serde(default)]
    pub status: String,
    /// Human-readable description of findings (or of the failure).
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sections_found: Vec<SectionRef>,
    #[serde(default)]
    pub total_rules: u32,
    #[serde(default)]
    pub approved_count: u32,
    #[serde(default)]
    pub approved_rules: Vec<RuleEntry>,
    #[serde(default)]
    pub all_rules: Vec<RuleEntry>,
}

impl ExtractionResult {
    /// The error-shaped result: status "error", zero counts, empty lists.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
            sections_found: Vec::new(),
            total_rules: 0,
            approved_count: 0,
            approved_rules: Vec::new(),
            all_rules: Vec::new(),
        }
    }

    /// Whether the extraction succeeded (`status == "success"`).
    pub fn is_success(&self) -> bool {
        self.status == "success"
    }
}

/// A signing-rule extraction plus run-level context the UI displays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RulesReport {
    pub result: ExtractionResult,
    /// Internal-consistency problems detected in the LLM's reply
    /// (count/list mismatches). Empty for a clean result.
    pub warnings: Vec<String>,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub duration_ms: u64,
}

// ── Image similarity ─────────────────────────────────────────────────────

/// Result of a two-image descriptor-matching comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchReport {
    /// Keypoints detected in the first image.
    pub keypoints_a: usize,
    /// Keypoints detected in the second image.
    pub keypoints_b: usize,
    /// Cross-checked descriptor matches between the two images.
    pub matches: usize,
    /// The threshold the verdict was computed against.
    pub threshold: usize,
    /// `matches > threshold`. Always false when either image yielded no
    /// descriptors.
    pub is_similar: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_result_is_zeroed() {
        let r = ExtractionResult::failure("Error processing document: timeout");
        assert_eq!(r.status, "error");
        assert_eq!(r.total_rules, 0);
        assert_eq!(r.approved_count, 0);
        assert!(r.sections_found.is_empty());
        assert!(r.approved_rules.is_empty());
        assert!(r.all_rules.is_empty());
        assert!(!r.is_success());
    }

    #[test]
    fn extraction_result_tolerates_missing_fields() {
        // The LLM sometimes omits optional context fields; serde defaults
        // must absorb that rather than failing the whole parse.
        let r: ExtractionResult =
            serde_json::from_str(r#"{"status":"success","total_rules":2}"#).unwrap();
        assert!(r.is_success());
        assert_eq!(r.total_rules, 2);
        assert!(r.all_rules.is_empty());
    }

    #[test]
    fn rule_entry_round_trips() {
        let rule = RuleEntry {
            rule_number: 4,
            rule_text: "Two directors must sign jointly".into(),
            checkbox_content: "✓".into(),
            section: "Signing Authority".into(),
            is_approved: true,
        };
        let json = serde_json::to_string(&rule).unwrap();
        let back: RuleEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(rule, back);
    }
}
