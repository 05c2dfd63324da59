//! # docintel
//!
//! Document intelligence over PDFs and images, built on hosted LLMs plus a
//! classic feature-matching pipeline.
//!
//! ## What it does
//!
//! Three independent capabilities share one library:
//!
//! ```text
//! VQA         PDF ─▶ rasterise (pdfium) ─▶ PNG/base64 ─▶ vision LLM ─▶ per-page answers
//! Rules       PDF ─▶ text layer (pdfium) ─▶ prompt ─▶ LLM ─▶ JSON ─▶ checkbox report
//! Similarity  two images ─▶ FAST keypoints ─▶ binary descriptors ─▶ Hamming matches ─▶ verdict
//! ```
//!
//! * **VQA** ([`ask`]) — ask free-form questions about every page of a
//!   document and get the answers the model reads off the page image.
//! * **Signing rules** ([`extract_signing_rules`]) — classify the approval
//!   checkboxes in a document's signing-rule sections into a structured
//!   [`ExtractionResult`]. LLM and parse failures collapse into an
//!   error-shaped result rather than an `Err`, so renderers always have a
//!   well-formed object.
//! * **Similarity** ([`compare_files`]) — cross-checked descriptor matching
//!   between two images with a match-count threshold.
//!
//! A CLI (`docintel`, feature `cli`) and an embedded web UI
//! ([`server::serve`]) wrap the same library calls.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docintel::{ask, QueryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // API key read from ANTHROPIC_API_KEY unless set explicitly
//!     let config = QueryConfig::default();
//!     let questions = vec!["Who signed this document?".to_string()];
//!     let output = ask("contract.pdf", &questions, &config).await?;
//!     for page in &output.pages {
//!         for qa in &page.answers {
//!             println!("p{} {} → {}", page.page_num, qa.question, qa.answer);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Providers
//!
//! | Provider | Default model | Key |
//! |----------|---------------|-----|
//! | `claude` | claude-sonnet-4-20250514 | `ANTHROPIC_API_KEY` or per-request |
//! | `gemini` | gemini-2.0-flash | `GEMINI_API_KEY` or per-request |
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `docintel` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! docintel = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod provider;
pub mod rules;
pub mod server;
pub mod similarity;
pub mod vqa;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{MatchConfig, PageSelection, QueryConfig, QueryConfigBuilder};
pub use error::{DocIntelError, PageError};
pub use output::{
    DocumentMetadata, ExtractionResult, MatchReport, PageAnswers, QuestionAnswer, RuleEntry,
    RulesReport, SectionRef, VqaOutput, VqaStats,
};
pub use progress::{NoopProgressCallback, ProgressCallback, RunProgressCallback};
pub use provider::{ChatRequest, ChatResponse, ImageData, LlmProvider, ProviderKind};
pub use rules::{consistency_issues, extract_signing_rules, parse_extraction};
pub use similarity::{compare, compare_files};
pub use vqa::{ask, ask_sync, inspect};
