//! Configuration types for docintel pipelines.
//!
//! LLM-backed operations (VQA, signing-rule extraction) are controlled through
//! [`QueryConfig`], built via its [`QueryConfigBuilder`]. Keeping every knob in
//! one struct makes it trivial to share configs across threads, serialise them
//! for logging, and diff two runs to understand why their outputs differ.
//! The similarity pipeline has its own small [`MatchConfig`].
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest.

use crate::error::DocIntelError;
use crate::progress::ProgressCallback;
use crate::provider::ProviderKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for LLM-backed document operations.
///
/// Built via [`QueryConfig::builder()`] or using [`QueryConfig::default()`].
///
/// # Example
/// ```rust
/// use docintel::QueryConfig;
///
/// let config = QueryConfig::builder()
///     .dpi(150)
///     .concurrency(4)
///     .model("claude-sonnet-4-20250514")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct QueryConfig {
    /// Rendering DPI used when rasterising each PDF page. Range: 72–400. Default: 150.
    ///
    /// 150 DPI is the sweet spot: text is sharp enough for a vision model to
    /// read reliably, while image file sizes stay well below typical API
    /// upload limits. Increase to 200–300 for small-font documents.
    pub dpi: u32,

    /// Maximum rendered image dimension (width or height) in pixels. Default: 2000.
    ///
    /// A safety cap independent of DPI. A 200-DPI render of an A0 poster could
    /// produce a 13 000 × 18 000 px image and exhaust memory. This field caps
    /// either dimension, scaling the other proportionally.
    pub max_rendered_pixels: u32,

    /// Number of concurrent LLM API calls during a VQA run. Default: 4.
    ///
    /// Vision APIs are network-bound, not CPU-bound, so a handful of calls in
    /// flight cuts wall-clock time substantially. If you hit rate-limit errors
    /// (`429`), lower this.
    pub concurrency: usize,

    /// Which hosted LLM service to use. Default: [`ProviderKind::Claude`].
    pub provider: ProviderKind,

    /// LLM model identifier, e.g. "claude-sonnet-4-20250514", "gemini-2.0-flash".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// API key for the selected provider.
    ///
    /// If None, the provider's conventional environment variable is consulted
    /// (`ANTHROPIC_API_KEY` / `GEMINI_API_KEY`). The web UI and CLI always
    /// pass the key explicitly.
    pub api_key: Option<String>,

    /// Sampling temperature for the LLM completion. Default: 0.0.
    ///
    /// Zero makes the model deterministic and faithful to what it sees on the
    /// page — exactly what you want for reading answers and checkbox states.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate per call. Default: 4096.
    ///
    /// Rule extraction returns a full JSON document; setting this too low
    /// silently truncates the reply mid-object and the parse falls back to
    /// the error-shaped result.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient LLM API failure. Default: 3.
    ///
    /// Most 5xx and timeout errors are transient (overloaded backend, network
    /// blip). Permanent errors (bad API key, 400) are not retried.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s. Exponential backoff
    /// avoids the thundering-herd problem where N concurrent workers retry
    /// simultaneously and immediately overwhelm a recovering API endpoint.
    pub retry_backoff_ms: u64,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Page selection. Default: All pages.
    pub pages: PageSelection,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-LLM-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Optional progress callback for per-page VQA events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            max_rendered_pixels: 2000,
            concurrency: 4,
            provider: ProviderKind::Claude,
            model: None,
            api_key: None,
            temperature: 0.0,
            max_tokens: 4096,
            max_retries: 3,
            retry_backoff_ms: 500,
            password: None,
            pages: PageSelection::default(),
            download_timeout_secs: 120,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for QueryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryConfig")
            .field("dpi", &self.dpi)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("concurrency", &self.concurrency)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("pages", &self.pages)
            .finish()
    }
}

impl QueryConfig {
    /// Create a new builder for `QueryConfig`.
    pub fn builder() -> QueryConfigBuilder {
        QueryConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`QueryConfig`].
#[derive(Debug)]
pub struct QueryConfigBuilder {
    config: QueryConfig,
}

impl QueryConfigBuilder {
    pub fn dpi(mut self, dpi: u32) -> Self {
        self.config.dpi = dpi.clamp(72, 400);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px.max(100);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn provider(mut self, kind: ProviderKind) -> Self {
        self.config.provider = kind;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<QueryConfig, DocIntelError> {
        let c = &self.config;
        if c.dpi < 72 || c.dpi > 400 {
            return Err(DocIntelError::InvalidConfig(format!(
                "DPI must be 72–400, got {}",
                c.dpi
            )));
        }
        if c.concurrency == 0 {
            return Err(DocIntelError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.max_tokens == 0 {
            return Err(DocIntelError::InvalidConfig(
                "max_tokens must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

/// Specifies which pages of the PDF to process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum PageSelection {
    /// Process all pages (default).
    #[default]
    All,
    /// Process a single page (1-indexed).
    Single(usize),
    /// Process a contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Process specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// Configuration for the two-image similarity check.
///
/// Defaults reproduce the behaviour of a stock ORB + brute-force pipeline:
/// up to 500 keypoints per image and "similar" meaning more than 30
/// cross-checked descriptor matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchConfig {
    /// FAST-9 corner threshold (difference from centre pixel). Default: 32.
    ///
    /// Lower values admit weaker corners, producing more keypoints on flat
    /// or low-contrast images at the cost of noisier matching.
    pub fast_threshold: u8,

    /// Keep at most this many keypoints per image (strongest first). Default: 500.
    pub max_keypoints: usize,

    /// Match count strictly above this value ⇒ images are similar. Default: 30.
    pub match_threshold: usize,

    /// Gaussian pre-blur sigma applied before descriptor sampling. Default: 1.2.
    ///
    /// Binary descriptors compare single pixel pairs; without smoothing a
    /// one-pixel shift between renders flips bits and destroys match counts.
    pub blur_sigma: f32,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fast_threshold: 32,
            max_keypoints: 500,
            match_threshold: 30,
            blur_sigma: 1.2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_clamps_dpi() {
        let config = QueryConfig::builder().dpi(10_000).build().unwrap();
        assert_eq!(config.dpi, 400);
        let config = QueryConfig::builder().dpi(1).build().unwrap();
        assert_eq!(config.dpi, 72);
    }

    #[test]
    fn builder_clamps_concurrency() {
        let config = QueryConfig::builder().concurrency(0).build().unwrap();
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn debug_redacts_api_key() {
        let config = QueryConfig::builder().api_key("sk-secret").build().unwrap();
        let repr = format!("{:?}", config);
        assert!(!repr.contains("sk-secret"));
        assert!(repr.contains("redacted"));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(
            PageSelection::Set(vec![1, 3, 5]).to_indices(5),
            vec![0, 2, 4]
        );
        assert_eq!(
            PageSelection::Set(vec![3, 1, 3]).to_indices(5),
            vec![0, 2] // deduplicated and sorted
        );
    }

    #[test]
    fn match_config_defaults() {
        let c = MatchConfig::default();
        assert_eq!(c.match_threshold, 30);
        assert_eq!(c.max_keypoints, 500);
    }
}
