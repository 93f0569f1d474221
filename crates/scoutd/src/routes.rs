//! API routes for scoutd

use crate::diagnostics::DiagnosticsReport;
use crate::scrape::ScrapedPage;
use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use scout_common::{ChatRequest, ChatResponse, VERSION};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

type AppStateArc = Arc<AppState>;

// ============================================================================
// Chat Routes
// ============================================================================

/// Largest chat body read; anything bigger is answered as an empty message
pub const MAX_CHAT_BODY_BYTES: usize = 64 * 1024;

pub fn chat_routes() -> Router<AppStateArc> {
    Router::new()
        .route("/chat", post(chat))
        .layer(DefaultBodyLimit::max(MAX_CHAT_BODY_BYTES))
}

/// Malformed or oversized bodies are treated as an empty request and get
/// the clarifying prompt, never an error status.
async fn chat(
    State(state): State<AppStateArc>,
    body: Result<Bytes, BytesRejection>,
) -> Json<ChatResponse> {
    let body = match body {
        Ok(body) => body,
        Err(e) => {
            warn!("Unreadable chat body: {}", e);
            Bytes::new()
        }
    };
    let request = match serde_json::from_slice::<Value>(&body) {
        Ok(value) => ChatRequest::from_value(&value),
        Err(e) => {
            debug!("Unparsable chat body: {}", e);
            ChatRequest::default()
        }
    };

    Json(state.orchestrator.clone().respond(request).await)
}

// ============================================================================
// Health Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub corrections: usize,
    pub learned_responses: usize,
    pub improved_queries: usize,
}

pub fn health_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/health", get(health_check))
}

async fn health_check(State(state): State<AppStateArc>) -> Json<HealthResponse> {
    let stats = state.store.stats().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: VERSION.to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        corrections: stats.corrections,
        learned_responses: stats.learned_responses,
        improved_queries: stats.improved_queries,
    })
}

// ============================================================================
// Diagnostics Routes
// ============================================================================

pub fn diagnostics_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/diagnostics", get(diagnostics_report))
}

async fn diagnostics_report(State(state): State<AppStateArc>) -> Json<DiagnosticsReport> {
    Json(state.diagnostics.report().await)
}

// ============================================================================
// Scrape Routes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct ScrapeRequest {
    pub url: String,
}

pub fn scrape_routes() -> Router<AppStateArc> {
    Router::new().route("/v1/scrape", post(scrape_page))
}

async fn scrape_page(
    State(state): State<AppStateArc>,
    Json(req): Json<ScrapeRequest>,
) -> Result<Json<ScrapedPage>, (StatusCode, String)> {
    let scraper = state.scraper.as_ref().ok_or_else(|| {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            "Page scraper not initialized".to_string(),
        )
    })?;

    info!("Scraping {}", req.url);
    match scraper.scrape(&req.url).await {
        Some(page) => Ok(Json(page)),
        None => {
            warn!("Scrape of {} produced nothing", req.url);
            Err((
                StatusCode::BAD_GATEWAY,
                format!("Could not scrape {}", req.url),
            ))
        }
    }
}
