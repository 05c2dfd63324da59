//! Hosted-LLM providers: a common chat trait plus Anthropic and Gemini clients.
//!
//! Both pipelines that talk to an LLM (VQA and rule extraction) go through the
//! object-safe [`LlmProvider`] trait, so tests can substitute a scripted fake
//! and the pipelines never know which HTTP API is on the other side. The two
//! concrete clients are thin typed wrappers over the providers' REST
//! endpoints — request/response structs with serde, no SDK.
//!
//! Keys are supplied per request: the web UI and CLI pass the caller's key
//! explicitly, and only when none is given does [`build_provider`] fall back
//! to the provider's conventional environment variable.

pub mod anthropic;
pub mod gemini;

use crate::config::QueryConfig;
use crate::error::DocIntelError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::warn;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;

/// A base64-encoded image attachment for a vision request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageData {
    /// Base64 payload (no data-URI prefix).
    pub data: String,
    /// MIME type, e.g. "image/png".
    pub media_type: String,
}

impl ImageData {
    pub fn new(data: impl Into<String>, media_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            media_type: media_type.into(),
        }
    }
}

/// A single-turn chat request, optionally with image attachments.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Optional system prompt.
    pub system: Option<String>,
    /// The user message text.
    pub text: String,
    /// Image attachments, sent before the text part.
    pub images: Vec<ImageData>,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl ChatRequest {
    /// A plain text request with no attachments.
    pub fn text_only(system: Option<&str>, text: impl Into<String>) -> Self {
        Self {
            system: system.map(str::to_string),
            text: text.into(),
            images: Vec::new(),
            temperature: 0.0,
            max_tokens: 4096,
        }
    }
}

/// The provider's reply.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

/// A hosted LLM service that can answer single-turn (optionally visual)
/// chat requests.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs and error messages ("claude", "gemini").
    fn name(&self) -> &'static str;

    /// Send one chat request and return the reply.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, DocIntelError>;
}

impl fmt::Debug for dyn LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmProvider")
            .field("name", &self.name())
            .finish()
    }
}

/// Which hosted LLM service to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Claude,
    Gemini,
}

impl ProviderKind {
    /// Model used when the caller does not override it.
    pub fn default_model(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude-sonnet-4-20250514",
            ProviderKind::Gemini => "gemini-2.0-flash",
        }
    }

    /// Conventional environment variable holding this provider's API key.
    pub fn env_key(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "ANTHROPIC_API_KEY",
            ProviderKind::Gemini => "GEMINI_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Claude => write!(f, "claude"),
            ProviderKind::Gemini => write!(f, "gemini"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "claude" | "anthropic" => Ok(ProviderKind::Claude),
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            other => Err(format!(
                "unknown provider '{other}'. Valid options: claude, gemini"
            )),
        }
    }
}

/// Construct the provider selected by `config`.
///
/// Key resolution: `config.api_key` first, then the provider's environment
/// variable. No key at all is a configuration error, reported with a hint
/// naming the variable to set.
pub fn build_provider(config: &QueryConfig) -> Result<Arc<dyn LlmProvider>, DocIntelError> {
    let kind = config.provider;

    let api_key = match &config.api_key {
        Some(k) if !k.trim().is_empty() => k.trim().to_string(),
        _ => std::env::var(kind.env_key())
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| DocIntelError::ProviderNotConfigured {
                provider: kind.to_string(),
                hint: format!(
                    "Pass an API key explicitly or set {}.",
                    kind.env_key()
                ),
            })?,
    };

    let model = config
        .model
        .clone()
        .unwrap_or_else(|| kind.default_model().to_string());

    let provider: Arc<dyn LlmProvider> = match kind {
        ProviderKind::Claude => Arc::new(AnthropicProvider::new(
            api_key,
            model,
            config.api_timeout_secs,
        )?),
        ProviderKind::Gemini => Arc::new(GeminiProvider::new(
            api_key,
            model,
            config.api_timeout_secs,
        )?),
    };

    Ok(provider)
}

/// Send a chat request, retrying transient failures with exponential backoff.
///
/// The wait sequence with the default 500 ms base and 3 retries is
/// 500 ms → 1 s → 2 s, under 4 s of total back-off per call. Non-retryable
/// errors (auth, malformed request) surface immediately.
pub async fn chat_with_retry(
    provider: &Arc<dyn LlmProvider>,
    request: &ChatRequest,
    max_retries: u32,
    backoff_ms: u64,
) -> Result<ChatResponse, DocIntelError> {
    let mut last_err: Option<DocIntelError> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            let backoff = backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "{}: retry {}/{} after {}ms",
                provider.name(),
                attempt,
                max_retries,
                backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match provider.chat(request).await {
            Ok(response) => return Ok(response),
            Err(e) if e.is_retryable() => {
                warn!("{}: attempt {} failed — {}", provider.name(), attempt + 1, e);
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| DocIntelError::Internal("retry loop exhausted".into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_kind_from_str() {
        assert_eq!("claude".parse::<ProviderKind>(), Ok(ProviderKind::Claude));
        assert_eq!("Anthropic".parse::<ProviderKind>(), Ok(ProviderKind::Claude));
        assert_eq!("gemini".parse::<ProviderKind>(), Ok(ProviderKind::Gemini));
        assert!("llamacpp".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn provider_kind_serde_matches_ui_values() {
        // The web UI posts these exact strings in the extract request.
        assert_eq!(
            serde_json::to_string(&ProviderKind::Claude).unwrap(),
            "\"claude\""
        );
        let kind: ProviderKind = serde_json::from_str("\"gemini\"").unwrap();
        assert_eq!(kind, ProviderKind::Gemini);
    }

    #[test]
    fn missing_key_is_a_config_error() {
        let config = crate::config::QueryConfig::builder()
            .provider(ProviderKind::Claude)
            .build()
            .unwrap();
        // Only meaningful when the environment does not carry a key.
        if std::env::var("ANTHROPIC_API_KEY").is_err() {
            let err = build_provider(&config).unwrap_err();
            assert!(matches!(
                err,
                DocIntelError::ProviderNotConfigured { .. }
            ));
            assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
        }
    }

    struct FailingProvider {
        retryable: bool,
    }

    #[async_trait]
    impl LlmProvider for FailingProvider {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, DocIntelError> {
            if self.retryable {
                Err(DocIntelError::ApiTimeout { elapsed_ms: 1 })
            } else {
                Err(DocIntelError::AuthError {
                    provider: "failing".into(),
                    detail: "bad key".into(),
                })
            }
        }
    }

    #[tokio::test]
    async fn retry_exhausts_on_transient_errors() {
        let provider: Arc<dyn LlmProvider> = Arc::new(FailingProvider { retryable: true });
        let req = ChatRequest::text_only(None, "hi");
        let err = chat_with_retry(&provider, &req, 2, 1).await.unwrap_err();
        assert!(matches!(err, DocIntelError::ApiTimeout { .. }));
    }

    #[tokio::test]
    async fn auth_errors_are_not_retried() {
        let provider: Arc<dyn LlmProvider> = Arc::new(FailingProvider { retryable: false });
        let req = ChatRequest::text_only(None, "hi");
        let err = chat_with_retry(&provider, &req, 5, 1).await.unwrap_err();
        assert!(matches!(err, DocIntelError::AuthError { .. }));
    }
}
