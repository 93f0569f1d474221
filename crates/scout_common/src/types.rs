//! Wire types shared between the daemon and its callers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Maximum number of results kept from a single provider call
pub const MAX_SEARCH_RESULTS: usize = 5;

/// Maximum number of images attached to one response
pub const MAX_RESPONSE_IMAGES: usize = 5;

/// One ranked hit returned by the search provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub link: String,
    /// Best-effort image for the hit (the hit itself for image searches)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl SearchResult {
    pub fn new(title: impl Into<String>, snippet: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            snippet: snippet.into(),
            link: link.into(),
            image_url: None,
        }
    }

    pub fn with_image(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = Some(image_url.into());
        self
    }

    /// Image URL if present and non-empty
    pub fn image(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRef {
    pub url: String,
    pub title: String,
}

/// Video hosting platform for embeds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoPlatform {
    Youtube,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoEmbed {
    #[serde(rename = "type")]
    pub platform: VideoPlatform,
    pub id: String,
    pub title: String,
    pub description: String,
}

/// Synthesized multi-modal answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedResponse {
    /// HTML markup; every interpolated value is escaped
    pub text: String,
    pub images: Vec<ImageRef>,
    pub links: Vec<LinkRef>,
    pub videos: Vec<VideoEmbed>,
}

impl FormattedResponse {
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Inbound chat request.
///
/// Either a plain question (`message`) or a correction for an earlier query
/// (`isCorrection`, `originalQuery`, `message` carrying the correction text,
/// `context`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub is_correction: bool,
    #[serde(default)]
    pub original_query: Option<String>,
    #[serde(default)]
    pub context: Option<String>,
}

impl ChatRequest {
    pub fn question(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn correction(
        original_query: impl Into<String>,
        correction: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            message: Some(correction.into()),
            is_correction: true,
            original_query: Some(original_query.into()),
            context: Some(context.into()),
        }
    }

    /// Build a request from an arbitrary JSON body without failing.
    ///
    /// Fields of the wrong type are treated as absent, so a numeric
    /// `message` becomes `None` rather than a rejected request.
    pub fn from_value(value: &Value) -> Self {
        let string_field = |name: &str| value.get(name).and_then(Value::as_str).map(str::to_string);
        Self {
            message: string_field("message"),
            is_correction: value
                .get("isCorrection")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            original_query: string_field("originalQuery"),
            context: string_field("context"),
        }
    }

    /// Original query when this is a usable correction submission
    pub fn correction_target(&self) -> Option<&str> {
        if !self.is_correction {
            return None;
        }
        self.original_query.as_deref().filter(|q| !q.is_empty())
    }
}

/// Outbound chat response
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    pub images: Vec<ImageRef>,
    pub links: Vec<LinkRef>,
    pub videos: Vec<VideoEmbed>,
}

impl ChatResponse {
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            ..Default::default()
        }
    }

    pub fn with_source(response: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            response: response.into(),
            links: vec![LinkRef {
                url: url.into(),
                title: "Source".to_string(),
            }],
            ..Default::default()
        }
    }
}

impl From<FormattedResponse> for ChatResponse {
    fn from(formatted: FormattedResponse) -> Self {
        Self {
            response: formatted.text,
            images: formatted.images,
            links: formatted.links,
            videos: formatted.videos,
        }
    }
}
