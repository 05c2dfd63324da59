//! HTTP handlers for the docintel web UI.

use axum::{
    extract::{Multipart, State},
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::config::QueryConfig;
use crate::output::RulesReport;
use crate::pipeline::{input, text};
use crate::provider::{self, ProviderKind};
use crate::rules;
use crate::server::error::ApiError;
use crate::server::state::{AppState, DocumentSession};
use crate::server::ui;

// ── Request / response bodies ────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DocumentInfo {
    pub filename: String,
    pub size_bytes: usize,
    pub page_count: usize,
}

#[derive(Debug, Serialize)]
pub struct PageView {
    /// 1-indexed page number shown by the viewer.
    pub page: usize,
    pub total_pages: usize,
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ExtractRequest {
    pub provider: ProviderKind,
    pub api_key: String,
    #[serde(default)]
    pub model: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────────────────

/// The embedded single-page UI.
pub async fn index() -> Html<&'static str> {
    Html(ui::INDEX_HTML)
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// Upload a PDF and make it the current session document.
///
/// Accepts a multipart form with a single `file` field. The text of every
/// page is extracted up front so pagination and extraction never re-parse
/// the document.
pub async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<DocumentInfo>, ApiError> {
    let mut filename = String::from("uploaded.pdf");
    let mut bytes: Option<Vec<u8>> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            if let Some(name) = field.file_name() {
                filename = name.to_string();
            }
            let data = field
                .bytes()
                .await
                .map_err(|e| ApiError::InvalidRequest(format!("Failed to read upload: {e}")))?;
            bytes = Some(data.to_vec());
        }
    }

    let bytes = bytes.ok_or_else(|| ApiError::InvalidRequest("Missing 'file' field".into()))?;
    if bytes.is_empty() {
        return Err(ApiError::InvalidRequest("Uploaded file is empty".into()));
    }

    // Stage in a temp dir (validates the %PDF magic) and pull every page's
    // text while the temp file is still alive.
    let resolved = input::resolve_bytes(&filename, &bytes)?;
    let pages = text::extract_pages(resolved.path(), None).await?;

    info!("Loaded '{}': {} pages", filename, pages.len());

    let session = DocumentSession {
        filename: filename.clone(),
        size_bytes: bytes.len(),
        pages,
        current_page: 0,
    };

    let info = DocumentInfo {
        filename,
        size_bytes: session.size_bytes,
        page_count: session.page_count(),
    };

    *state.session.write().await = Some(session);
    Ok(Json(info))
}

/// Info about the loaded document.
pub async fn document_info(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DocumentInfo>, ApiError> {
    let guard = state.session.read().await;
    let session = guard.as_ref().ok_or(ApiError::NoDocument)?;
    Ok(Json(DocumentInfo {
        filename: session.filename.clone(),
        size_bytes: session.size_bytes,
        page_count: session.page_count(),
    }))
}

/// The page the viewer is currently on.
pub async fn current_page(
    State(state): State<Arc<AppState>>,
) -> Result<Json<PageView>, ApiError> {
    let guard = state.session.read().await;
    let session = guard.as_ref().ok_or(ApiError::NoDocument)?;
    Ok(Json(page_view(session)))
}

/// Advance the viewer one page.
pub async fn next_page(State(state): State<Arc<AppState>>) -> Result<Json<PageView>, ApiError> {
    let mut guard = state.session.write().await;
    let session = guard.as_mut().ok_or(ApiError::NoDocument)?;
    session.next_page();
    Ok(Json(page_view(session)))
}

/// Move the viewer back one page.
pub async fn prev_page(State(state): State<Arc<AppState>>) -> Result<Json<PageView>, ApiError> {
    let mut guard = state.session.write().await;
    let session = guard.as_mut().ok_or(ApiError::NoDocument)?;
    session.prev_page();
    Ok(Json(page_view(session)))
}

/// Run signing-rule extraction over the loaded document.
///
/// LLM and parse failures come back as HTTP 200 with the error-shaped
/// result inside `RulesReport` — the UI renders those as a normal outcome.
/// Only missing documents, missing keys and empty text layers are HTTP
/// errors.
pub async fn extract(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExtractRequest>,
) -> Result<Json<RulesReport>, ApiError> {
    if req.api_key.trim().is_empty() {
        return Err(ApiError::MissingApiKey(format!(
            "Enter an API key for provider '{}'",
            req.provider
        )));
    }

    let document_text = {
        let guard = state.session.read().await;
        let session = guard.as_ref().ok_or(ApiError::NoDocument)?;
        if text::is_effectively_empty(&session.pages) {
            return Err(ApiError::NoTextLayer);
        }
        text::join_pages(&session.pages)
    };

    let mut builder = QueryConfig::builder()
        .provider(req.provider)
        .api_key(req.api_key.clone());
    if let Some(model) = &req.model {
        builder = builder.model(model.clone());
    }
    let config = builder
        .build()
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    let provider = provider::build_provider(&config)?;

    info!(
        "Extracting signing rules via {} ({} chars of text)",
        provider.name(),
        document_text.len()
    );

    let report = rules::extract_from_text(&document_text, &provider, &config).await;
    Ok(Json(report))
}

fn page_view(session: &DocumentSession) -> PageView {
    PageView {
        page: session.current_page + 1,
        total_pages: session.page_count(),
        text: session.current_text().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded_state(pages: usize) -> Arc<AppState> {
        let state = Arc::new(AppState::new());
        let session = DocumentSession {
            filename: "doc.pdf".into(),
            size_bytes: 2048,
            pages: (0..pages).map(|i| format!("text of page {}", i + 1)).collect(),
            current_page: 0,
        };
        *state.session.try_write().unwrap() = Some(session);
        state
    }

    #[tokio::test]
    async fn page_endpoints_require_a_document() {
        let state = Arc::new(AppState::new());
        assert!(matches!(
            current_page(State(state.clone())).await.unwrap_err(),
            ApiError::NoDocument
        ));
        assert!(matches!(
            next_page(State(state)).await.unwrap_err(),
            ApiError::NoDocument
        ));
    }

    #[tokio::test]
    async fn pagination_walks_and_saturates() {
        let state = loaded_state(2);

        let view = current_page(State(state.clone())).await.unwrap();
        assert_eq!(view.page, 1);
        assert_eq!(view.total_pages, 2);
        assert_eq!(view.text, "text of page 1");

        let view = next_page(State(state.clone())).await.unwrap();
        assert_eq!(view.page, 2);
        let view = next_page(State(state.clone())).await.unwrap();
        assert_eq!(view.page, 2, "must saturate at the last page");

        let view = prev_page(State(state.clone())).await.unwrap();
        assert_eq!(view.page, 1);
        let view = prev_page(State(state)).await.unwrap();
        assert_eq!(view.page, 1, "must saturate at the first page");
    }

    #[tokio::test]
    async fn extract_rejects_blank_api_key() {
        let state = loaded_state(1);
        let err = extract(
            State(state),
            Json(ExtractRequest {
                provider: ProviderKind::Claude,
                api_key: "   ".into(),
                model: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::MissingApiKey(_)));
    }

    #[tokio::test]
    async fn extract_rejects_textless_documents() {
        let state = Arc::new(AppState::new());
        *state.session.try_write().unwrap() = Some(DocumentSession {
            filename: "scan.pdf".into(),
            size_bytes: 100,
            pages: vec!["  ".into(), String::new()],
            current_page: 0,
        });

        let err = extract(
            State(state),
            Json(ExtractRequest {
                provider: ProviderKind::Gemini,
                api_key: "key".into(),
                model: None,
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::NoTextLayer));
    }
}
