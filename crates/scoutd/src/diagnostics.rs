//! Self-Diagnostics - answers questions about the assistant itself.
//!
//! Capability and architecture questions echo static configuration.
//! "Why can't you ..." questions run a best-effort diagnosis: capability
//! flags are checked against keywords in the issue, and one remedy search is
//! attempted. A failed remedy search only means fewer listed solutions.

use crate::router::MetaQuestion;
use crate::search::SearchProvider;
use chrono::{DateTime, Utc};
use scout_common::{escape_html, Capabilities, ChatResponse, Limits, ScoutConfig};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Diagnoses kept in memory for the diagnostics endpoint
pub const MAX_RECORDED_DIAGNOSES: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    pub timestamp: DateTime<Utc>,
    pub issue: String,
    pub possible_causes: Vec<String>,
    pub solutions: Vec<String>,
}

/// Capabilities, limits and recorded diagnoses
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsReport {
    pub capabilities: Capabilities,
    pub limits: Limits,
    pub api_key_configured: bool,
    pub current_issues: Vec<Diagnosis>,
    pub last_diagnosis: Option<Diagnosis>,
}

pub struct SelfDiagnostics {
    capabilities: Capabilities,
    limits: Limits,
    api_key_configured: bool,
    search: Arc<dyn SearchProvider>,
    history: Mutex<Vec<Diagnosis>>,
}

impl SelfDiagnostics {
    pub fn new(config: &ScoutConfig, search: Arc<dyn SearchProvider>) -> Self {
        Self {
            capabilities: config.capabilities.clone(),
            limits: config.limits.clone(),
            api_key_configured: config.search.has_api_key(),
            search,
            history: Mutex::new(Vec::new()),
        }
    }

    pub async fn answer(&self, question: &MetaQuestion) -> ChatResponse {
        match question {
            MetaQuestion::Capabilities => ChatResponse::text(self.capabilities_markup()),
            MetaQuestion::Architecture => ChatResponse::text(architecture_markup()),
            MetaQuestion::Diagnose { issue } => {
                let diagnosis = self.diagnose(issue).await;
                ChatResponse::text(diagnosis_markup(&diagnosis))
            }
        }
    }

    pub async fn diagnose(&self, issue: &str) -> Diagnosis {
        let mut diagnosis = Diagnosis {
            timestamp: Utc::now(),
            issue: issue.to_string(),
            possible_causes: Vec::new(),
            solutions: Vec::new(),
        };
        let issue_lower = issue.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| issue_lower.contains(w));

        if mentions(&["api", "search"]) && !self.api_key_configured {
            diagnosis
                .possible_causes
                .push("Missing or invalid Google API key".to_string());
            diagnosis
                .solutions
                .push("Set a valid GOOGLE_API_KEY environment variable".to_string());
        }
        if mentions(&["embed", "video"]) && !self.capabilities.youtube_embedding {
            diagnosis
                .possible_causes
                .push("YouTube embedding capability is disabled".to_string());
            diagnosis
                .solutions
                .push("Enable youtubeEmbedding under [capabilities] in the config file".to_string());
        }
        if mentions(&["learn", "remember"]) && !self.capabilities.learning {
            diagnosis
                .possible_causes
                .push("Learning capability is disabled".to_string());
            diagnosis
                .solutions
                .push("Enable learning under [capabilities] in the config file".to_string());
        }

        if self.capabilities.web_search {
            let query = format!("how to fix {} in a rust web service", issue);
            match self.search.search(&query).await.first() {
                Some(top) => diagnosis
                    .solutions
                    .push(format!("Found potential solution: {}", top.snippet)),
                None => debug!("No remedy found online for {:?}", issue),
            }
        }

        info!(
            "Diagnosed {:?}: {} causes, {} solutions",
            issue,
            diagnosis.possible_causes.len(),
            diagnosis.solutions.len()
        );

        let mut history = self.history.lock().await;
        history.push(diagnosis.clone());
        if history.len() > MAX_RECORDED_DIAGNOSES {
            let excess = history.len() - MAX_RECORDED_DIAGNOSES;
            history.drain(..excess);
        }
        diagnosis
    }

    pub async fn report(&self) -> DiagnosticsReport {
        let history = self.history.lock().await;
        DiagnosticsReport {
            capabilities: self.capabilities.clone(),
            limits: self.limits.clone(),
            api_key_configured: self.api_key_configured,
            current_issues: history.clone(),
            last_diagnosis: history.last().cloned(),
        }
    }

    fn capabilities_markup(&self) -> String {
        format!(
            "<p>I can:</p>\n<ol>\n    <li>Search the web for information</li>\n    <li>Embed YouTube videos</li>\n    <li>Handle images and links</li>\n    <li>Learn from corrections</li>\n    <li>Diagnose my own issues</li>\n    <li>Answer questions about myself</li>\n</ol>\n\n<p>My limitations:</p>\n<ul>\n    <li>I need valid API keys for some features</li>\n    <li>I can show up to {} search results</li>\n    <li>I can display up to {} images</li>\n    <li>I can embed up to {} videos</li>\n</ul>",
            self.limits.max_results, self.limits.max_images, self.limits.max_videos
        )
    }
}

fn architecture_markup() -> String {
    "<p>I'm built in Rust on tokio and axum. My main components are:</p>\n<ol>\n    <li>Web search using the Google Custom Search API</li>\n    <li>YouTube video embedding</li>\n    <li>Image and link handling</li>\n    <li>Learning system that stores corrections</li>\n    <li>Self-diagnosis capabilities</li>\n</ol>\n\n<p>Ask about any of these parts and I'll explain how it behaves.</p>"
        .to_string()
}

fn diagnosis_markup(diagnosis: &Diagnosis) -> String {
    let list = |items: &[String]| {
        items
            .iter()
            .map(|item| format!("<li>{}</li>", escape_html(item)))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "<p>I've diagnosed the issue: {}</p>\n\n<h3>Possible causes:</h3>\n<ul>\n{}\n</ul>\n\n<h3>Potential solutions:</h3>\n<ul>\n{}\n</ul>",
        escape_html(&diagnosis.issue),
        list(&diagnosis.possible_causes),
        list(&diagnosis.solutions)
    )
}
