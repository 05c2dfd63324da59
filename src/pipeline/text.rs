//! PDF text extraction: pull each page's text layer via pdfium.
//!
//! The rule extractor and the web UI's page viewer both consume this. Like
//! rendering, it runs inside `spawn_blocking` — pdfium text APIs walk the
//! same non-async-safe document structures.
//!
//! Pages with no text layer (scans, pure-graphics pages) yield empty
//! strings; deciding whether an all-empty document is an error is left to
//! the caller, because the page viewer legitimately shows empty pages while
//! the rule extractor cannot work with them.

use crate::error::DocIntelError;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::debug;

/// Extract the text of every page, in page order.
pub async fn extract_pages(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<Vec<String>, DocIntelError> {
    let path = pdf_path.to_path_buf();
    let pwd = password.map(|s| s.to_string());

    tokio::task::spawn_blocking(move || extract_pages_blocking(&path, pwd.as_deref()))
        .await
        .map_err(|e| DocIntelError::Internal(format!("Text task panicked: {}", e)))?
}

/// Blocking implementation of per-page text extraction.
fn extract_pages_blocking(
    pdf_path: &Path,
    password: Option<&str>,
) -> Result<Vec<String>, DocIntelError> {
    let pdfium = super::render::bind_pdfium()?;

    let document = pdfium
        .load_pdf_from_file(pdf_path, password)
        .map_err(|e| super::render::map_open_error(e, pdf_path, password))?;

    let pages = document.pages();
    let mut texts = Vec::with_capacity(pages.len() as usize);

    for (idx, page) in pages.iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| DocIntelError::TextExtractionFailed {
                page: idx + 1,
                detail: format!("{:?}", e),
            })?
            .all();
        debug!("Page {}: {} chars of text", idx + 1, text.len());
        texts.push(text);
    }

    Ok(texts)
}

/// Join per-page texts into a single document string.
///
/// Pages are separated by a single newline, matching how downstream prompts
/// expect continuous document text.
pub fn join_pages(pages: &[String]) -> String {
    let mut out = String::with_capacity(pages.iter().map(|p| p.len() + 1).sum());
    for page in pages {
        out.push_str(page);
        out.push('\n');
    }
    out
}

/// True when no page contributed any non-whitespace text.
pub fn is_effectively_empty(pages: &[String]) -> bool {
    pages.iter().all(|p| p.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_appends_newline_per_page() {
        let pages = vec!["page one".to_string(), "page two".to_string()];
        assert_eq!(join_pages(&pages), "page one\npage two\n");
    }

    #[test]
    fn join_of_nothing_is_empty() {
        assert_eq!(join_pages(&[]), "");
    }

    #[test]
    fn emptiness_ignores_whitespace() {
        assert!(is_effectively_empty(&[]));
        assert!(is_effectively_empty(&["  \n\t".to_string(), String::new()]));
        assert!(!is_effectively_empty(&[String::new(), "x".to_string()]));
    }
}
