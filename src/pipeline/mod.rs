//! Pipeline stages shared by the document operations.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. switch rendering backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! VQA:    input ──▶ render ──▶ encode ──▶ vision LLM
//! Rules:  input ──▶ text   ──▶ prompt ──▶ LLM ──▶ JSON parse
//! (URL/path)  (pdfium)
//! ```
//!
//! 1. [`input`]  — canonicalise the user-supplied path or URL to a local file
//! 2. [`render`] — rasterise selected pages; runs in `spawn_blocking` because
//!    pdfium is not async-safe
//! 3. [`text`]   — extract each page's text layer, also via pdfium
//! 4. [`encode`] — PNG-encode and base64-wrap each `DynamicImage` for the
//!    multimodal API request body
pub mod encode;
pub mod input;
pub mod render;
pub mod text;
