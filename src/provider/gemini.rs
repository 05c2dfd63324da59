//! Google Gemini generateContent API client.
//!
//! Thin typed wrapper over
//! `POST /v1beta/models/{model}:generateContent`. Vision requests attach page
//! images as `inlineData` parts ahead of the text part. The key travels as a
//! query parameter, which is the generativelanguage.googleapis.com
//! convention.

use crate::error::DocIntelError;
use crate::provider::{ChatRequest, ChatResponse, LlmProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

// ── Request types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
enum Part {
    #[serde(rename = "inlineData", rename_all = "camelCase")]
    InlineData { mime_type: String, data: String },
    #[serde(rename = "text")]
    Text(String),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: usize,
}

// ── Response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: usize,
    #[serde(default)]
    candidates_token_count: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

/// Client for the Gemini generateContent API.
pub struct GeminiProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(
        api_key: String,
        model: String,
        timeout_secs: u64,
    ) -> Result<Self, DocIntelError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| DocIntelError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, DocIntelError> {
        let start = Instant::now();

        let mut parts: Vec<Part> = request
            .images
            .iter()
            .map(|img| Part::InlineData {
                mime_type: img.media_type.clone(),
                data: img.data.clone(),
            })
            .collect();
        parts.push(Part::Text(request.text.clone()));

        let body = GenerateRequest {
            system_instruction: request.system.as_ref().map(|s| Content {
                role: None,
                parts: vec![Part::Text(s.clone())],
            }),
            contents: vec![Content {
                role: Some("user".to_string()),
                parts,
            }],
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let url = format!(
            "{API_BASE}/{}:generateContent?key={}",
            self.model, self.api_key
        );

        let response = self.client.post(&url).json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                DocIntelError::ApiTimeout {
                    elapsed_ms: start.elapsed().as_millis() as u64,
                }
            } else {
                DocIntelError::ApiError {
                    message: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_error_status(status, response).await);
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            DocIntelError::ApiError {
                message: format!("malformed generateContent response: {e}"),
            }
        })?;

        let content: String = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .map(|p| p.text.as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if content.is_empty() {
            return Err(DocIntelError::ApiError {
                message: "gemini: empty candidate list in response".to_string(),
            });
        }

        let usage = parsed.usage_metadata.unwrap_or_default();

        debug!(
            "gemini: {} input tokens, {} output tokens, {:?}",
            usage.prompt_token_count,
            usage.candidates_token_count,
            start.elapsed()
        );

        Ok(ChatResponse {
            content,
            input_tokens: usage.prompt_token_count,
            output_tokens: usage.candidates_token_count,
        })
    }
}

/// Map a non-2xx generateContent status to the error taxonomy.
async fn map_error_status(status: StatusCode, response: reqwest::Response) -> DocIntelError {
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let detail = match response.json::<ErrorEnvelope>().await {
        Ok(env) => env.error.message,
        Err(_) => format!("HTTP {status}"),
    };

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DocIntelError::AuthError {
            provider: "gemini".to_string(),
            detail,
        },
        StatusCode::TOO_MANY_REQUESTS => DocIntelError::RateLimitExceeded {
            provider: "gemini".to_string(),
            retry_after_secs: retry_after,
        },
        _ => DocIntelError::ApiError {
            message: format!("gemini: HTTP {status}: {detail}"),
        },
    }
}
