//! Application state for the docintel web UI.
//!
//! The UI is a single-operator tool: exactly one document is loaded at a
//! time, mirroring the session-variable model it replaces. Uploading a new
//! document replaces the previous session wholesale. The `RwLock` exists
//! because axum handlers run concurrently, not because multiple sessions do.

use tokio::sync::RwLock;

/// Shared state behind every handler.
#[derive(Default)]
pub struct AppState {
    pub session: RwLock<Option<DocumentSession>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// The currently loaded document.
#[derive(Debug, Clone)]
pub struct DocumentSession {
    pub filename: String,
    pub size_bytes: usize,
    /// Extracted text of each page, in page order.
    pub pages: Vec<String>,
    /// 0-indexed page currently shown by the viewer.
    pub current_page: usize,
}

impl DocumentSession {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Advance the viewer one page, saturating at the last page.
    pub fn next_page(&mut self) {
        if self.current_page + 1 < self.pages.len() {
            self.current_page += 1;
        }
    }

    /// Move the viewer back one page, saturating at the first page.
    pub fn prev_page(&mut self) {
        self.current_page = self.current_page.saturating_sub(1);
    }

    /// Text of the page the viewer is on.
    pub fn current_text(&self) -> &str {
        self.pages
            .get(self.current_page)
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(pages: usize) -> DocumentSession {
        DocumentSession {
            filename: "doc.pdf".into(),
            size_bytes: 1024,
            pages: (0..pages).map(|i| format!("page {}", i + 1)).collect(),
            current_page: 0,
        }
    }

    #[test]
    fn pagination_saturates_at_both_ends() {
        let mut s = session(3);
        s.prev_page();
        assert_eq!(s.current_page, 0);

        s.next_page();
        s.next_page();
        assert_eq!(s.current_page, 2);
        s.next_page();
        assert_eq!(s.current_page, 2);

        s.prev_page();
        assert_eq!(s.current_page, 1);
        assert_eq!(s.current_text(), "page 2");
    }

    #[test]
    fn empty_session_has_empty_text() {
        let s = session(0);
        assert_eq!(s.current_text(), "");
        assert_eq!(s.page_count(), 0);
    }
}
