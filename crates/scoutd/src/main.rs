//! scoutd - search-backed chat assistant daemon

use anyhow::{Context, Result};
use scout_common::ScoutConfig;
use scoutd::learning::LearningStore;
use scoutd::scrape::PageScraper;
use scoutd::search::{GoogleSearchClient, SearchProvider};
use scoutd::server::{self, AppState};
use std::env;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
    }
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    info!("scoutd v{} starting", scout_common::VERSION);

    let config = ScoutConfig::load();
    if !config.search.has_api_key() {
        warn!("GOOGLE_API_KEY not set, web search will return no results");
    }

    let store = LearningStore::load(&config.learning.data_file);
    let search: Arc<dyn SearchProvider> = Arc::new(
        GoogleSearchClient::new(config.search.clone()).context("Failed to create search client")?,
    );
    let scraper = PageScraper::new().context("Failed to create page scraper")?;

    let state = AppState::new(&config, store, search).with_scraper(scraper);
    server::run(state, &config.server.addr()).await
}
