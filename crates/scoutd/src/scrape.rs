//! Page scraper - fetches a page and pulls out its title, text, images
//! and links.
//!
//! Decorative images (logos, icons, avatars) are skipped and relative URLs
//! are resolved against the page URL.

use reqwest::Url;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

const SCRAPE_TIMEOUT_SECS: u64 = 5;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Substrings marking an image as decoration rather than content
const DECORATIVE_IMAGE_MARKERS: &[&str] = &["logo", "icon", "avatar"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedImage {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedLink {
    pub href: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapedPage {
    pub title: String,
    pub text: String,
    pub images: Vec<ScrapedImage>,
    pub links: Vec<ScrapedLink>,
}

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

pub struct PageScraper {
    http: reqwest::Client,
}

impl PageScraper {
    pub fn new() -> Result<Self, ScrapeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(SCRAPE_TIMEOUT_SECS))
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| ScrapeError::Network(e.to_string()))?;
        Ok(Self { http })
    }

    /// Scrape a page, `None` on any failure
    pub async fn scrape(&self, url: &str) -> Option<ScrapedPage> {
        match self.fetch(url).await {
            Ok(page) => Some(page),
            Err(e) => {
                warn!("Error scraping {}: {}", url, e);
                None
            }
        }
    }

    async fn fetch(&self, url: &str) -> Result<ScrapedPage, ScrapeError> {
        let base = Url::parse(url).map_err(|e| ScrapeError::InvalidUrl(e.to_string()))?;

        debug!("Scraping {}", base);
        let response = self
            .http
            .get(base.clone())
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(ScrapeError::Network(format!("HTTP {}", response.status())));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        parse_page(&html, &base)
    }
}

/// Extract the scraped view of an HTML document
pub fn parse_page(html: &str, base: &Url) -> Result<ScrapedPage, ScrapeError> {
    let document = Html::parse_document(html);
    let selector = |css: &str| Selector::parse(css).map_err(|e| ScrapeError::Parse(e.to_string()));

    let title = document
        .select(&selector("title")?)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .unwrap_or_default();

    let text = document
        .select(&selector("body")?)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .unwrap_or_default();

    let images = document
        .select(&selector("img")?)
        .filter_map(|el| {
            let src = el.value().attr("src")?;
            if DECORATIVE_IMAGE_MARKERS.iter().any(|m| src.contains(m)) {
                return None;
            }
            let alt = el.value().attr("alt").filter(|a| !a.is_empty()).unwrap_or("Image");
            Some(ScrapedImage {
                src: resolve(base, src)?,
                alt: alt.to_string(),
            })
        })
        .collect();

    let links = document
        .select(&selector("a")?)
        .filter_map(|el| {
            let href = resolve(base, el.value().attr("href")?)?;
            let text = el.text().collect::<String>().trim().to_string();
            Some(ScrapedLink {
                text: if text.is_empty() { href.clone() } else { text },
                href,
            })
        })
        .collect();

    Ok(ScrapedPage {
        title,
        text,
        images,
        links,
    })
}

fn resolve(base: &Url, reference: &str) -> Option<String> {
    if reference.starts_with("http") {
        return Some(reference.to_string());
    }
    base.join(reference).ok().map(String::from)
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
