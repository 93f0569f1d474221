//! Search Adapter - web search through a keyed custom-search endpoint.
//!
//! `SearchProvider` is the seam the rest of the daemon talks to. Production
//! code uses `GoogleSearchClient`; tests use `FakeSearchProvider` with
//! scripted per-query results.
//!
//! Provider and network failures never escape: they are logged and surface
//! as an empty result list.

use crate::router::{is_image_flavored, is_video_flavored};
use async_trait::async_trait;
use scout_common::{Result, ScoutError, SearchConfig, SearchResult};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

/// Site restriction appended to video-flavored queries
pub const VIDEO_SITE_FILTER: &str = "site:youtube.com/watch";

// ============================================================================
// Search Provider Trait
// ============================================================================

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Ranked results for `query`, capped at the provider limit.
    ///
    /// Empty means "no results" whether the provider found nothing or failed.
    async fn search(&self, query: &str) -> Vec<SearchResult>;
}

// ============================================================================
// Google Custom Search (Production)
// ============================================================================

pub struct GoogleSearchClient {
    config: SearchConfig,
    http: reqwest::Client,
}

#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    items: Vec<ApiItem>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    link: String,
    #[serde(default)]
    pagemap: Option<PageMap>,
}

/// Auxiliary structured metadata attached to a hit
#[derive(Debug, Default, Deserialize)]
struct PageMap {
    #[serde(default)]
    cse_image: Vec<ImageSource>,
    #[serde(default)]
    cse_thumbnail: Vec<ImageSource>,
    #[serde(default)]
    metatags: Vec<HashMap<String, Value>>,
}

#[derive(Debug, Default, Deserialize)]
struct ImageSource {
    #[serde(default)]
    src: String,
}

impl GoogleSearchClient {
    pub fn new(config: SearchConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("scoutd/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ScoutError::Provider(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http })
    }

    async fn fetch(&self, query: &str) -> Result<Vec<SearchResult>> {
        let image_mode = is_image_flavored(query);
        let dispatched = if is_video_flavored(query) {
            format!("{} {}", query, VIDEO_SITE_FILTER)
        } else {
            query.to_string()
        };

        let mut params = vec![
            ("q", dispatched.as_str()),
            ("key", self.config.api_key.as_str()),
            ("cx", self.config.engine_id.as_str()),
        ];
        if image_mode {
            params.push(("searchType", "image"));
        }

        debug!("Searching provider: q={:?} image_mode={}", dispatched, image_mode);
        let response = self
            .http
            .get(&self.config.endpoint)
            .query(&params)
            .send()
            .await
            .map_err(|e| ScoutError::Provider(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScoutError::Status(response.status().as_u16()));
        }

        let body: ApiResponse = response
            .json()
            .await
            .map_err(|e| ScoutError::Provider(e.to_string()))?;

        Ok(convert_items(body.items, image_mode, self.config.max_results))
    }
}

#[async_trait]
impl SearchProvider for GoogleSearchClient {
    async fn search(&self, query: &str) -> Vec<SearchResult> {
        if query.trim().is_empty() {
            return Vec::new();
        }
        match self.fetch(query).await {
            Ok(results) => results,
            Err(e) => {
                warn!("Search failed for {:?}: {}", query, e);
                Vec::new()
            }
        }
    }
}

fn convert_items(items: Vec<ApiItem>, image_mode: bool, cap: usize) -> Vec<SearchResult> {
    items
        .into_iter()
        .take(cap)
        .map(|item| {
            let image = if image_mode {
                Some(item.link.clone())
            } else {
                item.pagemap.as_ref().and_then(thumbnail_from_pagemap)
            };
            SearchResult {
                title: item.title,
                snippet: item.snippet,
                link: item.link,
                image_url: image.filter(|s| !s.is_empty()),
            }
        })
        .collect()
}

/// Cover image: structured image, then thumbnail, then og:/twitter: meta tags
fn thumbnail_from_pagemap(pagemap: &PageMap) -> Option<String> {
    if let Some(image) = pagemap.cse_image.first() {
        return Some(image.src.clone());
    }
    if let Some(thumb) = pagemap.cse_thumbnail.first() {
        return Some(thumb.src.clone());
    }
    let tags = pagemap.metatags.first()?;
    ["og:image", "twitter:image"]
        .iter()
        .filter_map(|name| tags.get(*name).and_then(Value::as_str))
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

// ============================================================================
// Fake Search Provider (Testing)
// ============================================================================

/// Scripted provider: exact query -> results, everything else empty
#[derive(Default)]
pub struct FakeSearchProvider {
    responses: HashMap<String, Vec<SearchResult>>,
    calls: Mutex<Vec<String>>,
}

impl FakeSearchProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, query: &str, results: Vec<SearchResult>) -> Self {
        self.responses.insert(query.to_string(), results);
        self
    }

    /// Queries received so far, in order
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls().len()
    }
}

#[async_trait]
impl SearchProvider for FakeSearchProvider {
    async fn search(&self, query: &str) -> Vec<SearchResult> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(query.to_string());
        }
        self.responses.get(query).cloned().unwrap_or_default()
    }
}
