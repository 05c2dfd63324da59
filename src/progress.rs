//! Progress-callback trait for per-page VQA events.
//!
//! Inject an [`Arc<dyn RunProgressCallback>`] via
//! [`crate::config::QueryConfigBuilder::progress_callback`] to receive
//! real-time events as the pipeline works through each page.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a Tokio broadcast channel, a WebSocket, a database record,
//! or a terminal progress bar — without the library knowing anything about how
//! the host application communicates. The trait is `Send + Sync` so it works
//! correctly when pages are processed concurrently.

use std::sync::Arc;

/// Called by the VQA pipeline as it processes each page.
///
/// Implementations must be `Send + Sync` (pages can be processed
/// concurrently). All methods have default no-op implementations so callers
/// only override what they care about.
///
/// # Thread safety
///
/// `on_page_start`, `on_page_complete`, and `on_page_error` may be called
/// concurrently from different threads. Implementations must protect shared
/// mutable state with appropriate synchronisation primitives
/// (e.g. `Mutex`, `AtomicUsize`).
pub trait RunProgressCallback: Send + Sync {
    /// Called once before any page is rendered.
    ///
    /// # Arguments
    /// * `total_pages` — number of pages that will be processed
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before the first question is sent for a page.
    fn on_page_start(&self, page_num: usize, total_pages: usize) {
        let _ = (page_num, total_pages);
    }

    /// Called when all of a page's questions were answered.
    ///
    /// # Arguments
    /// * `page_num`     — 1-indexed page number
    /// * `total_pages`  — total pages
    /// * `answer_count` — number of question/answer pairs produced
    fn on_page_complete(&self, page_num: usize, total_pages: usize, answer_count: usize) {
        let _ = (page_num, total_pages, answer_count);
    }

    /// Called when a page fails after all retries are exhausted.
    fn on_page_error(&self, page_num: usize, total_pages: usize, error: &str) {
        let _ = (page_num, total_pages, error);
    }

    /// Called once after all pages have been attempted.
    ///
    /// # Arguments
    /// * `total_pages`   — total pages in the run
    /// * `success_count` — pages that completed without error
    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl RunProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::QueryConfig`].
pub type ProgressCallback = Arc<dyn RunProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: Arc<AtomicUsize>,
        completes: Arc<AtomicUsize>,
        errors: Arc<AtomicUsize>,
        completed_total: Arc<AtomicUsize>,
    }

    impl RunProgressCallback for TrackingCallback {
        fn on_page_start(&self, _page_num: usize, _total_pages: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _page_num: usize, _total_pages: usize, _answers: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, _page_num: usize, _total_pages: usize, _error: &str) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_run_complete(&self, _total_pages: usize, success_count: usize) {
            self.completed_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(5);
        cb.on_page_start(1, 5);
        cb.on_page_complete(1, 5, 3);
        cb.on_page_error(2, 5, "some error");
        cb.on_run_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            starts: Arc::new(AtomicUsize::new(0)),
            completes: Arc::new(AtomicUsize::new(0)),
            errors: Arc::new(AtomicUsize::new(0)),
            completed_total: Arc::new(AtomicUsize::new(0)),
        };

        tracker.on_page_start(1, 3);
        tracker.on_page_complete(1, 3, 3);
        tracker.on_page_start(2, 3);
        tracker.on_page_complete(2, 3, 3);
        tracker.on_page_start(3, 3);
        tracker.on_page_error(3, 3, "LLM timeout");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.errors.load(Ordering::SeqCst), 1);

        tracker.on_run_complete(3, 2);
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn RunProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
        cb.on_page_start(1, 10);
        cb.on_page_complete(1, 10, 2);
    }
}
