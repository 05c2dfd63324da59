//! Error types for the docintel library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocIntelError`] — **Fatal**: the operation cannot proceed at all
//!   (bad input file, wrong password, provider not configured). Returned as
//!   `Err(DocIntelError)` from the top-level entry points.
//!
//! * [`PageError`] — **Non-fatal**: a single page failed (render glitch,
//!   transient API error) but all other pages are fine. Stored inside
//!   [`crate::output::PageAnswers`] so callers can inspect partial
//!   success rather than losing the whole document to one bad page.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! page failure, log and continue, or collect all errors for a post-run report.
//!
//! Note that the signing-rule extractor deliberately does NOT surface LLM or
//! JSON failures through this module: per its contract, those collapse into
//! the error-shaped [`crate::output::ExtractionResult`] instead. Only
//! input-side problems (missing file, empty text layer) are fatal there.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docintel library.
///
/// Page-level VQA failures use [`PageError`] and are stored in
/// [`crate::output::PageAnswers`] rather than propagated here.
#[derive(Debug, Error)]
pub enum DocIntelError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// An image for the similarity check could not be opened or decoded.
    #[error("Failed to read image '{path}': {detail}")]
    ImageReadFailed { path: PathBuf, detail: String },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// Selected page numbers exceed the actual page count.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    /// pdfium-render returned an error for a specific page.
    #[error("Rasterisation failed for page {page}: {detail}")]
    RasterisationFailed { page: usize, detail: String },

    /// Text extraction failed for a specific page.
    #[error("Text extraction failed for page {page}: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// The document parsed but yielded no text at all (e.g. pure scans).
    #[error("No extractable text in '{path}'\nThe document may be a scanned image; the rule extractor needs a text layer.")]
    NoExtractableText { path: PathBuf },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The requested provider is not configured (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The LLM API returned a non-retryable error.
    #[error("LLM API error: {message}")]
    ApiError { message: String },

    /// Every page failed after all retries; output would be empty.
    #[error("All {total} pages failed after {retries} retries each.\nFirst error: {first_error}")]
    AllPagesFailed {
        total: usize,
        retries: u32,
        first_error: String,
    },

    /// LLM API returned HTTP 429 — caller should back off.
    ///
    /// Check `retry_after_secs` for a server-specified delay, or use
    /// exponential backoff if `None`.
    #[error("Rate limit exceeded for provider '{provider}'")]
    RateLimitExceeded {
        provider: String,
        retry_after_secs: Option<u64>,
    },

    /// LLM API call timed out — the caller may retry.
    #[error("API call timed out after {elapsed_ms}ms")]
    ApiTimeout { elapsed_ms: u64 },

    /// LLM API returned an authentication error (401/403) — retry unlikely to help.
    #[error("Authentication error from provider '{provider}': {detail}")]
    AuthError { provider: String, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write an output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Install libpdfium and either place it on the system library path or set\n\
PDFIUM_LIB_PATH=/path/to/libpdfium."
    )]
    PdfiumBindingFailed(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl DocIntelError {
    /// Whether retrying the same call has a realistic chance of succeeding.
    ///
    /// Rate limits, timeouts and 5xx-style API errors are transient; auth
    /// failures and malformed requests are not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DocIntelError::RateLimitExceeded { .. }
                | DocIntelError::ApiTimeout { .. }
                | DocIntelError::ApiError { .. }
        )
    }
}

/// A non-fatal error for a single page of a VQA run.
///
/// Stored alongside [`crate::output::PageAnswers`] when a page fails.
/// The overall run continues unless ALL pages fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum PageError {
    /// Page rasterisation failed.
    #[error("Page {page}: rasterisation failed: {detail}")]
    RenderFailed { page: usize, detail: String },

    /// LLM call failed after retries.
    #[error("Page {page}: LLM call failed after {retries} retries: {detail}")]
    LlmFailed {
        page: usize,
        retries: u8,
        detail: String,
    },

    /// LLM call timed out.
    #[error("Page {page}: LLM call timed out after {secs}s")]
    Timeout { page: usize, secs: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_pages_failed_display() {
        let e = DocIntelError::AllPagesFailed {
            total: 10,
            retries: 3,
            first_error: "boom".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("10"), "got: {msg}");
        assert!(msg.contains("boom"), "got: {msg}");
    }

    #[test]
    fn rate_limit_display_with_retry() {
        let e = DocIntelError::RateLimitExceeded {
            provider: "claude".into(),
            retry_after_secs: Some(60),
        };
        assert!(e.to_string().contains("claude"));
    }

    #[test]
    fn rate_limit_display_without_retry() {
        let e = DocIntelError::RateLimitExceeded {
            provider: "gemini".into(),
            retry_after_secs: None,
        };
        assert!(e.to_string().contains("gemini"));
    }

    #[test]
    fn auth_error_display() {
        let e = DocIntelError::AuthError {
            provider: "gemini".into(),
            detail: "invalid key".into(),
        };
        assert!(e.to_string().contains("gemini"));
        assert!(e.to_string().contains("invalid key"));
    }

    #[test]
    fn retryable_classification() {
        assert!(DocIntelError::ApiTimeout { elapsed_ms: 500 }.is_retryable());
        assert!(DocIntelError::RateLimitExceeded {
            provider: "claude".into(),
            retry_after_secs: None,
        }
        .is_retryable());
        assert!(!DocIntelError::AuthError {
            provider: "claude".into(),
            detail: "bad key".into(),
        }
        .is_retryable());
        assert!(!DocIntelError::InvalidConfig("x".into()).is_retryable());
    }

    #[test]
    fn page_error_display() {
        let e = PageError::LlmFailed {
            page: 3,
            retries: 3,
            detail: "429".into(),
        };
        assert!(e.to_string().contains("Page 3"));
    }
}
