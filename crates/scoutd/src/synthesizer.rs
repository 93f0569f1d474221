//! Response Synthesizer - turns ranked search results into a chat answer.
//!
//! The branch is picked from the query's flavor alone:
//! - image: every derived image, deduplicated by `src`, capped at five
//! - video: embeds for links carrying an 11-character video id
//! - text: the top hit's snippet with its link as the only citation
//!
//! Image and video branches get exactly one fallback search each when the
//! first pass finds nothing to show.

use crate::router::QueryFlavor;
use crate::search::SearchProvider;
use regex::Regex;
use scout_common::{
    escape_html, FormattedResponse, ImageRef, LinkRef, SearchResult, VideoEmbed, VideoPlatform,
    MAX_RESPONSE_IMAGES,
};
use std::collections::HashSet;
use std::sync::{Arc, LazyLock};
use tracing::debug;

pub const NO_RESULTS_MESSAGE: &str =
    "<p>I couldn't find specific information about that. Could you try rephrasing your question?</p>";
pub const NO_IMAGES_MESSAGE: &str =
    "<p>I couldn't find any images. Please try a different search term.</p>";
pub const NO_VIDEOS_MESSAGE: &str =
    "<p>I couldn't find any videos. Please try a different search term.</p>";

const IMAGES_HEADER: &str = "<h3>Here are some images:</h3>";
const VIDEOS_HEADER: &str = "<h3>Here are some videos:</h3>";

/// Suffix for the single image fallback search
const IMAGE_FALLBACK_SUFFIX: &str = "images";

/// Site restriction for the single video fallback search
const VIDEO_FALLBACK_SUFFIX: &str = "site:youtube.com/watch";

const VIDEO_ID_LEN: usize = 11;

static VIDEO_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^.*(youtu.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*")
        .expect("video id pattern is valid")
});

/// Video id from a YouTube-style link; only exactly 11-character ids count
pub fn youtube_video_id(url: &str) -> Option<String> {
    let captures = VIDEO_ID_PATTERN.captures(url)?;
    let id = captures.get(2)?.as_str();
    (id.chars().count() == VIDEO_ID_LEN).then(|| id.to_string())
}

pub struct ResponseSynthesizer {
    search: Arc<dyn SearchProvider>,
}

impl ResponseSynthesizer {
    pub fn new(search: Arc<dyn SearchProvider>) -> Self {
        Self { search }
    }

    pub async fn synthesize(&self, results: &[SearchResult], query: &str) -> FormattedResponse {
        if results.is_empty() {
            return FormattedResponse::text_only(NO_RESULTS_MESSAGE);
        }

        match QueryFlavor::detect(query) {
            QueryFlavor::Image => self.image_response(results, query).await,
            QueryFlavor::Video => self.video_response(results, query).await,
            QueryFlavor::Text => text_response(results),
        }
    }

    async fn image_response(&self, results: &[SearchResult], query: &str) -> FormattedResponse {
        let mut images = collect_images(results);
        if images.is_empty() {
            let fallback_query = format!("{} {}", query, IMAGE_FALLBACK_SUFFIX);
            debug!("No images in results, retrying once with {:?}", fallback_query);
            let fallback = self.search.search(&fallback_query).await;
            images = collect_images(&fallback);
        }

        if images.is_empty() {
            return FormattedResponse::text_only(NO_IMAGES_MESSAGE);
        }

        let mut text = String::from(IMAGES_HEADER);
        for image in &images {
            text.push_str(&render_image(image));
        }
        FormattedResponse {
            text,
            images,
            ..Default::default()
        }
    }

    async fn video_response(&self, results: &[SearchResult], query: &str) -> FormattedResponse {
        let mut videos = collect_videos(results);
        if videos.is_empty() {
            let fallback_query = format!("{} {}", query, VIDEO_FALLBACK_SUFFIX);
            debug!("No videos in results, retrying once with {:?}", fallback_query);
            let fallback = self.search.search(&fallback_query).await;
            videos = collect_videos(&fallback);
        }

        if videos.is_empty() {
            return FormattedResponse::text_only(NO_VIDEOS_MESSAGE);
        }

        let mut text = String::from(VIDEOS_HEADER);
        for video in &videos {
            text.push_str(&render_video(video));
        }
        FormattedResponse {
            text,
            videos,
            ..Default::default()
        }
    }
}

/// Only the top-ranked hit is used for text answers
fn text_response(results: &[SearchResult]) -> FormattedResponse {
    let Some(top) = results.first() else {
        return FormattedResponse::text_only(NO_RESULTS_MESSAGE);
    };

    let mut links = Vec::new();
    if !top.link.is_empty() {
        links.push(LinkRef {
            url: top.link.clone(),
            title: non_empty_or(&top.title, "Source"),
        });
    }
    FormattedResponse {
        text: format!("<p>{}</p>", escape_html(&top.snippet)),
        links,
        ..Default::default()
    }
}

fn collect_images(results: &[SearchResult]) -> Vec<ImageRef> {
    let mut seen = HashSet::new();
    results
        .iter()
        .filter_map(|result| {
            result.image().map(|src| ImageRef {
                src: src.to_string(),
                alt: non_empty_or(&result.title, "Image"),
            })
        })
        .filter(|image| seen.insert(image.src.clone()))
        .take(MAX_RESPONSE_IMAGES)
        .collect()
}

fn collect_videos(results: &[SearchResult]) -> Vec<VideoEmbed> {
    results
        .iter()
        .filter_map(|result| {
            youtube_video_id(&result.link).map(|id| VideoEmbed {
                platform: VideoPlatform::Youtube,
                id,
                title: non_empty_or(&result.title, "YouTube Video"),
                description: result.snippet.clone(),
            })
        })
        .collect()
}

fn render_image(image: &ImageRef) -> String {
    format!(
        r#"<img src="{}" alt="{}" style="max-width:300px;margin:8px 0;"><br>"#,
        escape_html(&image.src),
        escape_html(&image.alt)
    )
}

fn render_video(video: &VideoEmbed) -> String {
    let mut html = String::from(r#"<div class="video-container">"#);
    html.push_str(&format!(
        r#"<iframe width="560" height="315" src="https://www.youtube.com/embed/{}" frameborder="0" allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture" allowfullscreen></iframe>"#,
        escape_html(&video.id)
    ));
    html.push_str(&format!("<p>{}</p>", escape_html(&video.title)));
    if !video.description.is_empty() {
        html.push_str(&format!("<p>{}</p>", escape_html(&video.description)));
    }
    html.push_str("</div>");
    html
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}
