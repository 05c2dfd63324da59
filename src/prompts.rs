//! Prompts for the LLM-backed pipelines.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the default behaviour (e.g. adding
//!    a checkbox convention or tightening the answer format) requires editing
//!    exactly one place.
//!
//! 2. **Testability** — unit tests can import and inspect prompts directly
//!    without spinning up a real LLM, making prompt regressions easy to catch.
//!
//! The extraction prompt and [`crate::output::ExtractionResult`] describe the
//! same JSON object; if a field is renamed in one place it must be renamed in
//! the other.

/// System prompt for answering questions about a rendered document page.
pub const VQA_SYSTEM_PROMPT: &str = r#"You are an expert document reader. You are shown a single page of a document as an image and asked a question about it.

Follow these rules precisely:

1. Answer using ONLY what is visible on the page
2. Quote names, titles, and values exactly as printed, including capitalisation
3. If the page does not contain the answer, reply exactly: NOT FOUND
4. Reply with the answer only — no preamble, no explanation, no punctuation around the value"#;

/// The question set the original signatory-extraction workflow asked of
/// every page. Used when the caller provides no questions of their own.
pub const DEFAULT_SIGNATORY_QUESTIONS: &[&str] = &[
    "What is the print full name?",
    "What is the print surname?",
    "What is the official position?",
];

/// Template for the signing-rule extraction prompt.
///
/// `{document}` is replaced with the document's extracted text. The JSON
/// skeleton below is the contract [`crate::rules::parse_extraction`] parses
/// into [`crate::output::ExtractionResult`].
const RULES_PROMPT_TEMPLATE: &str = r#"Analyze this document and automatically detect all sections containing signing rules or approval checkboxes.

Task:
1. Scan the entire document for sections with signing rules/approval checkboxes
2. Identify checkbox elements: □, ☐, ■, ☑, ✓, X, numbers in brackets, parentheses
3. Determine approval status: filled = approved, empty = not approved
4. Extract the complete rule text

Document:
{document}

Return a JSON object:
{
    "status": "success" or "error",
    "message": "description of findings",
    "sections_found": [
        {
            "section_name": "section name",
            "section_number": "section number",
            "location": "location in document"
        }
    ],
    "total_rules": number,
    "approved_count": number,
    "approved_rules": [
        {
            "rule_number": number,
            "rule_text": "rule text without checkbox",
            "checkbox_content": "checkbox content",
            "section": "section name",
            "is_approved": true
        }
    ],
    "all_rules": [
        {
            "rule_number": number,
            "rule_text": "rule text without checkbox",
            "checkbox_content": "checkbox content",
            "section": "section name",
            "is_approved": true/false
        }
    ]
}

Checkbox detection rules:
- Approved: ✓, X, ☑, ■, numbers, letters, symbols
- Not approved: □, ☐, ( ), [ ], empty spaces

Return only JSON, no other text."#;

/// Build the signing-rule extraction prompt for a document's text.
pub fn rules_prompt(document_text: &str) -> String {
    RULES_PROMPT_TEMPLATE.replace("{document}", document_text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rules_prompt_embeds_document() {
        let p = rules_prompt("THE QUICK BROWN FOX");
        assert!(p.contains("THE QUICK BROWN FOX"));
        assert!(!p.contains("{document}"));
    }

    #[test]
    fn rules_prompt_names_every_contract_field() {
        // The serde struct and the prompt must agree on field names.
        let p = rules_prompt("");
        for field in [
            "status",
            "message",
            "sections_found",
            "total_rules",
            "approved_count",
            "approved_rules",
            "all_rules",
            "rule_number",
            "rule_text",
            "checkbox_content",
            "is_approved",
        ] {
            assert!(p.contains(field), "prompt is missing field '{field}'");
        }
    }

    #[test]
    fn default_questions_cover_signatory_fields() {
        assert_eq!(DEFAULT_SIGNATORY_QUESTIONS.len(), 3);
        assert!(DEFAULT_SIGNATORY_QUESTIONS
            .iter()
            .any(|q| q.contains("full name")));
    }
}
