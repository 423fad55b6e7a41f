//! HTTP API server for integration with other systems.
//!
//! Provides REST endpoints for chat, search, and document management.

use crate::cli::output::content_preview;
use crate::cli::Output;
use crate::document::SourceFormat;
use crate::error::KontextError;
use crate::openai::{list_models, model_matches};
use crate::orchestrator::Orchestrator;
use crate::rag::{Citation, RagEngine, RetrieveOptions};
use crate::vector_store::{IndexedDocument, SearchMode, SearchOptions, StoreStats};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};

/// Shared application state.
pub(crate) struct AppState {
    orchestrator: Orchestrator,
    engine: RagEngine,
}

impl AppState {
    pub(crate) fn new(orchestrator: Orchestrator) -> Self {
        let engine = orchestrator.rag_engine();
        Self {
            orchestrator,
            engine,
        }
    }
}

/// Build the API router.
pub(crate) fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/check-llm", get(check_llm))
        .route("/api/chat", post(chat))
        .route("/api/search", get(search))
        .route("/api/vectordb", get(vectordb))
        .route("/api/documents", post(add_document).get(list_documents))
        .route("/api/documents/{name}", delete(delete_document))
        .route("/api/reset", post(reset))
        .layer(cors)
        .with_state(state)
}

/// Run the HTTP API server.
pub async fn run_serve(host: &str, port: u16, orchestrator: Orchestrator) -> anyhow::Result<()> {
    let state = Arc::new(AppState::new(orchestrator));
    let app = router(state.clone());

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Kontext API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET    /health");
    Output::kv("LLM check", "GET    /api/check-llm");
    Output::kv("Chat (RAG)", "POST   /api/chat");
    Output::kv("Search", "GET    /api/search?q=");
    Output::kv("Store stats", "GET    /api/vectordb");
    Output::kv("Add document", "POST   /api/documents");
    Output::kv("List documents", "GET    /api/documents");
    Output::kv("Delete document", "DELETE /api/documents/{name}");
    Output::kv("Reset", "POST   /api/reset");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped, closing vector store");
    state.orchestrator.close().await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Serialize, Deserialize)]
struct ChatResponse {
    reply: String,
    sources: Vec<Citation>,
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
    semantic: Option<bool>,
    limit: Option<usize>,
}

#[derive(Serialize, Deserialize)]
struct SearchResponse {
    query: String,
    semantic: bool,
    count: usize,
    documents: Vec<HitPreview>,
}

#[derive(Serialize, Deserialize)]
struct HitPreview {
    name: String,
    page: u32,
    score: f32,
    preview: String,
}

#[derive(Serialize)]
struct VectorDbResponse {
    status: &'static str,
    #[serde(flatten)]
    stats: StoreStats,
}

#[derive(Deserialize)]
struct AddDocumentRequest {
    name: String,
    text: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    format: Option<String>,
}

#[derive(Serialize)]
struct DocumentListResponse {
    documents: Vec<IndexedDocument>,
    total: usize,
}

#[derive(Serialize, Deserialize)]
struct DeleteResponse {
    document: String,
    deleted: usize,
}

#[derive(Serialize, Deserialize)]
struct LlmCheckResponse {
    status: String,
    api_base: String,
    model: String,
    #[serde(default)]
    model_available: bool,
    #[serde(default)]
    models: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn internal_error(e: KontextError) -> Response {
    error!("Request failed: {}", e);
    error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn check_llm(State(state): State<Arc<AppState>>) -> Response {
    let llm = &state.orchestrator.settings().llm;

    match list_models(&llm.api_base).await {
        Ok(models) => {
            let model_available = models.iter().any(|m| model_matches(m, &llm.model));
            Json(LlmCheckResponse {
                status: if model_available { "ok" } else { "model_missing" }.to_string(),
                api_base: llm.api_base.clone(),
                model: llm.model.clone(),
                model_available,
                models,
                error: None,
            })
            .into_response()
        }
        Err(e) => {
            error!("LLM check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(LlmCheckResponse {
                    status: "error".to_string(),
                    api_base: llm.api_base.clone(),
                    model: llm.model.clone(),
                    model_available: false,
                    models: Vec::new(),
                    error: Some(e.to_string()),
                }),
            )
                .into_response()
        }
    }
}

async fn chat(State(state): State<Arc<AppState>>, Json(req): Json<ChatRequest>) -> Response {
    if req.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message must not be empty");
    }

    match state.engine.ask(&req.message).await {
        Ok(answer) => Json(ChatResponse {
            reply: answer.answer,
            sources: answer.citations,
        })
        .into_response(),
        Err(e) => {
            error!("Chat request failed: {}", e);
            Json(ChatResponse {
                reply: format!(
                    "Sorry, there was a problem processing your request: {}. Please try again later.",
                    e
                ),
                sources: Vec::new(),
            })
            .into_response()
        }
    }
}

async fn search(State(state): State<Arc<AppState>>, Query(params): Query<SearchParams>) -> Response {
    let Some(query) = params.q.filter(|q| !q.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "query parameter 'q' is required");
    };

    let defaults = RetrieveOptions::from(&state.orchestrator.settings().retrieval);
    let semantic = params
        .semantic
        .unwrap_or(defaults.mode == SearchMode::Semantic);
    let options = SearchOptions {
        limit: params.limit.unwrap_or(5),
        min_score: defaults.min_score,
        mode: SearchMode::from_flag(semantic),
    };

    match state.orchestrator.vector_store().search(&query, &options).await {
        Ok(results) => Json(SearchResponse {
            query,
            semantic,
            count: results.count,
            documents: results
                .hits
                .into_iter()
                .map(|hit| HitPreview {
                    preview: content_preview(&hit.content, 200),
                    name: hit.document_name,
                    page: hit.page_number,
                    score: hit.score,
                })
                .collect(),
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

async fn vectordb(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.vector_store().stats().await {
        Ok(stats) => Json(VectorDbResponse {
            status: if stats.count > 0 { "ok" } else { "empty" },
            stats,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

async fn add_document(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AddDocumentRequest>,
) -> Response {
    let format = match req.format.as_deref() {
        Some(f) => match f.parse::<SourceFormat>() {
            Ok(format) => format,
            Err(e) => return error_response(StatusCode::BAD_REQUEST, e),
        },
        None => SourceFormat::from_extension(
            std::path::Path::new(&req.name)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or_default(),
        )
        .unwrap_or(SourceFormat::Txt),
    };

    match state
        .orchestrator
        .indexer()
        .index_document(&req.name, req.path.as_deref(), &req.text, format)
        .await
    {
        Ok(report) => Json(report).into_response(),
        Err(e) => internal_error(e),
    }
}

async fn list_documents(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.vector_store().list_documents().await {
        Ok(documents) => Json(DocumentListResponse {
            total: documents.len(),
            documents,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Response {
    match state.orchestrator.vector_store().delete_document(&name).await {
        Ok(0) => error_response(
            StatusCode::NOT_FOUND,
            format!("Document not found: {}", name),
        ),
        Ok(deleted) => Json(DeleteResponse {
            document: name,
            deleted,
        })
        .into_response(),
        Err(e) => internal_error(e),
    }
}

async fn reset(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.vector_store().reset().await {
        Ok(()) => Json(serde_json::json!({ "status": "ok" })).into_response(),
        Err(e) => internal_error(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use axum::body::to_bytes;

    async fn state() -> (tempfile::TempDir, Arc<AppState>) {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::default();
        settings.embedding.provider = "hashing".to_string();
        settings.embedding.dimensions = 64;
        settings.vector_store.sqlite_path =
            dir.path().join("vectors.db").to_string_lossy().to_string();
        // Nothing listens here, so chat requests fail fast.
        settings.llm.api_base = "http://127.0.0.1:9/v1".to_string();

        let orchestrator = Orchestrator::new(settings).unwrap();
        orchestrator.initialize().await.unwrap();
        (dir, Arc::new(AppState::new(orchestrator)))
    }

    async fn body_json<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn add(state: &Arc<AppState>, name: &str, text: &str) {
        let response = add_document(
            State(state.clone()),
            Json(AddDocumentRequest {
                name: name.to_string(),
                text: text.to_string(),
                path: None,
                format: None,
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_add_search_delete() {
        let (_dir, state) = state().await;
        add(&state, "policy.txt", "Employees receive thirty vacation days per year.").await;

        let response = search(
            State(state.clone()),
            Query(SearchParams {
                q: Some("vacation days".to_string()),
                semantic: Some(false),
                limit: None,
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: SearchResponse = body_json(response).await;
        assert!(!body.semantic);
        assert_eq!(body.count, 1);
        assert_eq!(body.documents[0].name, "policy.txt");

        let response = delete_document(State(state.clone()), Path("policy.txt".to_string())).await;
        let body: DeleteResponse = body_json(response).await;
        assert_eq!(body.deleted, 1);

        let response = delete_document(State(state), Path("policy.txt".to_string())).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_requires_query() {
        let (_dir, state) = state().await;
        let response = search(
            State(state),
            Query(SearchParams {
                q: None,
                semantic: None,
                limit: None,
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_vectordb_status_and_reset() {
        let (_dir, state) = state().await;
        let body: serde_json::Value = body_json(vectordb(State(state.clone())).await).await;
        assert_eq!(body["status"], "empty");

        add(&state, "a.md", "Some markdown content here.").await;
        let body: serde_json::Value = body_json(vectordb(State(state.clone())).await).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["count"], 1);

        let response = reset(State(state.clone())).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = body_json(vectordb(State(state)).await).await;
        assert_eq!(body["count"], 0);
    }

    #[tokio::test]
    async fn test_add_document_rejects_unknown_format() {
        let (_dir, state) = state().await;
        let response = add_document(
            State(state),
            Json(AddDocumentRequest {
                name: "sheet".to_string(),
                text: "cells".to_string(),
                path: None,
                format: Some("xlsx".to_string()),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_chat_failure_returns_fallback_reply() {
        let (_dir, state) = state().await;
        let response = chat(
            State(state),
            Json(ChatRequest {
                message: "What is the vacation policy?".to_string(),
            }),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: ChatResponse = body_json(response).await;
        assert!(body.reply.starts_with("Sorry"));
        assert!(body.sources.is_empty());
    }

    #[tokio::test]
    async fn test_check_llm_unreachable() {
        let (_dir, state) = state().await;
        let response = check_llm(State(state)).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body: LlmCheckResponse = body_json(response).await;
        assert_eq!(body.status, "error");
        assert_eq!(body.api_base, "http://127.0.0.1:9/v1");
        assert!(!body.model_available);
        assert!(body.error.is_some_and(|e| e.contains("127.0.0.1:9")));
    }

    #[tokio::test]
    async fn test_health() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_router_builds() {
        let (_dir, state) = state().await;
        let _router = router(state);
    }
}
