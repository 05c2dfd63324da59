//! Anthropic Messages API client.
//!
//! Thin typed wrapper over `POST /v1/messages`. Vision requests attach page
//! images as base64 `image` source blocks ahead of the text part, the layout
//! the Messages API documents for multimodal prompts.

use crate::error::DocIntelError;
use crate::provider::{ChatRequest, ChatResponse, LlmProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

// ── Request types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
struct Message {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentBlock {
    Image { source: ImageSource },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    r#type: String,
    media_type: String,
    data: String,
}

// ── Response types ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    input_tokens: usize,
    output_tokens: usize,
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

/// Client for the Anthropic Messages API.
pub struct AnthropicProvider {
    client: Client,
    api_key: String,
    model: String,
}

impl AnthropicProvider {
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
impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &'static str {
        "claude"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, DocIntelError> {
        let start = Instant::now();

        let mut content: Vec<ContentBlock> = request
            .images
            .iter()
            .map(|img| ContentBlock::Image {
                source: ImageSource {
                    r#type: "base64".to_string(),
                    media_type: img.media_type.clone(),
                    data: img.data.clone(),
                },
            })
            .collect();
        content.push(ContentBlock::Text {
            text: request.text.clone(),
        });

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            system: request.system.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content,
            }],
        };

        let response = self
            .client
            .post(API_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
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

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            DocIntelError::ApiError {
                message: format!("malformed Messages API response: {e}"),
            }
        })?;

        let content: String = parsed
            .content
            .iter()
            .map(|b| b.text.as_str())
            .collect::<Vec<_>>()
            .join("");

        debug!(
            "claude: {} input tokens, {} output tokens, {:?}",
            parsed.usage.input_tokens,
            parsed.usage.output_tokens,
            start.elapsed()
        );

        Ok(ChatResponse {
            content,
            input_tokens: parsed.usage.input_tokens,
            output_tokens: parsed.usage.output_tokens,
        })
    }
}

/// Map a non-2xx Messages API status to the error taxonomy.
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
            provider: "claude".to_string(),
            detail,
        },
        StatusCode::TOO_MANY_REQUESTS => DocIntelError::RateLimitExceeded {
            provider: "claude".to_string(),
            retry_after_secs: retry_after,
        },
        _ => DocIntelError::ApiError {
            message: format!("claude: HTTP {status}: {detail}"),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ImageData;

    #[test]
    fn request_serialises_image_before_text() {
        let req = MessagesRequest {
            model: "claude-sonnet-4-20250514".into(),
            max_tokens: 512,
            temperature: 0.0,
            system: Some("read the page".into()),
            messages: vec![Message {
                role: "user".into(),
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            r#type: "base64".into(),
                            media_type: "image/png".into(),
                            data: "QUJD".into(),
                        },
                    },
                    ContentBlock::Text {
                        text: "What is the title?".into(),
                    },
                ],
            }],
        };
        let json = serde_json::to_string(&req).unwrap();
        let image_at = json.find("\"image\"").unwrap();
        let text_at = json.find("\"text\"").unwrap();
        assert!(image_at < text_at);
        assert!(json.contains("\"media_type\":\"image/png\""));
        assert!(json.contains("\"system\":\"read the page\""));
    }

    #[test]
    fn system_is_omitted_when_none() {
        let req = MessagesRequest {
            model: "m".into(),
            max_tokens: 1,
            temperature: 0.0,
            system: None,
            messages: vec![],
        };
        assert!(!serde_json::to_string(&req).unwrap().contains("system"));
    }

    #[test]
    fn response_concatenates_text_blocks() {
        let raw = r#"{
            "content": [{"type":"text","text":"Hello "},{"type":"text","text":"world"}],
            "usage": {"input_tokens": 10, "output_tokens": 2}
        }"#;
        let parsed: MessagesResponse = serde_json::from_str(raw).unwrap();
        let joined: String = parsed.content.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(joined, "Hello world");
        assert_eq!(parsed.usage.input_tokens, 10);
    }

    #[test]
    fn image_data_is_plain_base64() {
        let img = ImageData::new("QUJD", "image/png");
        assert!(!img.data.starts_with("data:"));
    }
}
