//! HTTP server for scoutd

use crate::diagnostics::SelfDiagnostics;
use crate::learning::LearningStore;
use crate::orchestrator::ChatOrchestrator;
use crate::routes;
use crate::scrape::PageScraper;
use crate::search::SearchProvider;
use anyhow::Result;
use axum::Router;
use scout_common::ScoutConfig;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Largest accepted request body outside `/chat`
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Upper bound on one request, above the search timeout plus fallbacks
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Application state shared across handlers
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
    pub store: Arc<LearningStore>,
    pub diagnostics: Arc<SelfDiagnostics>,
    pub scraper: Option<PageScraper>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: &ScoutConfig, store: LearningStore, search: Arc<dyn SearchProvider>) -> Self {
        let store = Arc::new(store);
        let diagnostics = Arc::new(SelfDiagnostics::new(config, search.clone()));
        let orchestrator = Arc::new(ChatOrchestrator::new(
            store.clone(),
            search,
            diagnostics.clone(),
        ));
        Self {
            orchestrator,
            store,
            diagnostics,
            scraper: None,
            start_time: Instant::now(),
        }
    }

    pub fn with_scraper(mut self, scraper: PageScraper) -> Self {
        self.scraper = Some(scraper);
        self
    }
}

/// Build the full router with middleware
pub fn build_router(state: AppState) -> Router {
    // Chat enforces its own limit so oversized messages still get a reply
    let api = Router::new()
        .merge(routes::health_routes())
        .merge(routes::diagnostics_routes())
        .merge(routes::scrape_routes())
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES));

    Router::new()
        .merge(routes::chat_routes())
        .merge(api)
        .with_state(Arc::new(state))
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECS)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until ctrl-c
pub async fn run(state: AppState, addr: &str) -> Result<()> {
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
