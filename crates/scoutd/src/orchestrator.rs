//! Chat Orchestrator - one request in, one chat response out.
//!
//! Corrections and empty messages are handled up front. Everything else is
//! classified into an ordered list of candidate routes which are tried in
//! turn; the first route that produces an answer wins. Image and video
//! routes yield nothing when their search comes back empty, letting the
//! next candidate answer instead.

use crate::arith::format_number;
use crate::diagnostics::SelfDiagnostics;
use crate::learning::{LearnedResponse, LearningStore};
use crate::router::{
    normalize_query, strip_phrases, Classifier, Route, IMAGE_REQUEST_PHRASES, VIDEO_REQUEST_WORDS,
};
use crate::search::SearchProvider;
use crate::synthesizer::ResponseSynthesizer;
use scout_common::{ChatRequest, ChatResponse};
use std::sync::Arc;
use tracing::{debug, error, info};

pub const CORRECTION_ACK: &str = "Thank you for the correction. I've learned from it.";
pub const CLARIFYING_PROMPT: &str = "What would you like to know?";
pub const FALLBACK_MESSAGE: &str =
    "I couldn't find that information. Could you try asking differently?";
pub const TROUBLE_MESSAGE: &str = "I'm having trouble with the web search. Please try again.";

const IMAGE_SEARCH_SUFFIX: &str = "images";
const VIDEO_SEARCH_SUFFIX: &str = "site:youtube.com";

pub struct ChatOrchestrator {
    store: Arc<LearningStore>,
    search: Arc<dyn SearchProvider>,
    synthesizer: ResponseSynthesizer,
    diagnostics: Arc<SelfDiagnostics>,
    classifier: Classifier,
}

impl ChatOrchestrator {
    pub fn new(
        store: Arc<LearningStore>,
        search: Arc<dyn SearchProvider>,
        diagnostics: Arc<SelfDiagnostics>,
    ) -> Self {
        Self {
            store,
            synthesizer: ResponseSynthesizer::new(search.clone()),
            search,
            diagnostics,
            classifier: Classifier::standard(),
        }
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Handle a request on its own task; a panic becomes the generic
    /// "trouble" reply instead of a dropped connection.
    pub async fn respond(self: Arc<Self>, request: ChatRequest) -> ChatResponse {
        match tokio::spawn(async move { self.handle(request).await }).await {
            Ok(response) => response,
            Err(e) => {
                error!("Chat handler failed: {}", e);
                ChatResponse::text(TROUBLE_MESSAGE)
            }
        }
    }

    pub async fn handle(&self, request: ChatRequest) -> ChatResponse {
        if let Some(original) = request.correction_target() {
            let correction = request.message.as_deref().unwrap_or_default();
            let context = request.context.as_deref().unwrap_or_default();
            self.store
                .record_correction(self.search.as_ref(), original, correction, context)
                .await;
            return ChatResponse::text(CORRECTION_ACK);
        }

        let Some(message) = request.message.as_deref().filter(|m| !m.trim().is_empty()) else {
            debug!("Empty or missing message, asking for a question");
            return ChatResponse::text(CLARIFYING_PROMPT);
        };

        let query = normalize_query(message);
        let learned = self.store.lookup_learned_response(&query).await;
        let routes = self.classifier.routes(&query, learned.is_some());

        // Rewritten once, after the routes that never search have had their turn
        let mut improved: Option<String> = None;

        for route in routes {
            let class = route.class();
            if improved.is_none() && !matches!(route, Route::SelfAwareness(_) | Route::LearnedResponse) {
                improved = Some(self.store.rewrite_query(&query).await);
            }

            let answer = match route {
                Route::SelfAwareness(question) => Some(self.diagnostics.answer(&question).await),
                Route::LearnedResponse => learned.as_ref().map(learned_answer),
                Route::ImageRequest => {
                    self.media_search(&query, IMAGE_REQUEST_PHRASES, IMAGE_SEARCH_SUFFIX)
                        .await
                }
                Route::VideoRequest => {
                    self.media_search(&query, VIDEO_REQUEST_WORDS, VIDEO_SEARCH_SUFFIX)
                        .await
                }
                Route::Arithmetic(value) => Some(ChatResponse::text(format!(
                    "The answer is {}.",
                    format_number(value)
                ))),
                Route::Canned { answer, .. } => Some(ChatResponse::text(answer)),
                Route::WebSearch => {
                    let improved_query = improved.as_deref().unwrap_or(&query);
                    self.web_search(&query, improved_query).await
                }
            };

            match answer {
                Some(response) => {
                    info!("Answered {:?} via {}", query, class);
                    return response;
                }
                None => debug!("Route {} had no answer for {:?}", class, query),
            }
        }

        info!("No route answered {:?}", query);
        ChatResponse::text(FALLBACK_MESSAGE)
    }

    /// Search for the message minus its trigger words; `None` when the
    /// search finds nothing.
    async fn media_search(&self, query: &str, triggers: &[&str], suffix: &str) -> Option<ChatResponse> {
        let subject = strip_phrases(query, triggers);
        let search_query = format!("{} {}", subject, suffix);
        let results = self.search.search(search_query.trim()).await;
        if results.is_empty() {
            return None;
        }

        // The full message keeps its flavor keywords for the synthesizer
        Some(self.synthesizer.synthesize(&results, query).await.into())
    }

    async fn web_search(&self, query: &str, improved_query: &str) -> Option<ChatResponse> {
        let results = self.search.search(improved_query).await;
        let top = results.first()?;

        let formatted = self.synthesizer.synthesize(&results, improved_query).await;
        if !top.snippet.is_empty() {
            self.store.learn_response(query, &top.snippet, &top.link).await;
        }
        Some(formatted.into())
    }
}

fn learned_answer(hit: &LearnedResponse) -> ChatResponse {
    ChatResponse::with_source(&hit.response, &hit.source)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::router::BASIC_FACTS;
    use crate::search::FakeSearchProvider;
    use scout_common::{ScoutConfig, SearchResult};

    struct Harness {
        orchestrator: Arc<ChatOrchestrator>,
        store: Arc<LearningStore>,
        fake: Arc<FakeSearchProvider>,
    }

    fn harness(fake: FakeSearchProvider) -> Harness {
        let fake = Arc::new(fake);
        let search: Arc<dyn SearchProvider> = fake.clone();
        let store = Arc::new(LearningStore::in_memory());
        let diagnostics = Arc::new(SelfDiagnostics::new(&ScoutConfig::default(), search.clone()));
        let orchestrator = Arc::new(ChatOrchestrator::new(store.clone(), search, diagnostics));
        Harness {
            orchestrator,
            store,
            fake,
        }
    }

    async fn ask(h: &Harness, message: &str) -> ChatResponse {
        h.orchestrator
            .clone()
            .respond(ChatRequest::question(message))
            .await
    }

    #[tokio::test]
    async fn test_arithmetic_answers_without_search() {
        let h = harness(FakeSearchProvider::new());
        let response = ask(&h, "2 plus 2").await;
        assert_eq!(response.response, "The answer is 4.");
        assert_eq!(h.fake.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_message_gets_clarifying_prompt() {
        let h = harness(FakeSearchProvider::new());
        assert_eq!(ask(&h, "").await.response, CLARIFYING_PROMPT);
        assert_eq!(ask(&h, "   ").await.response, CLARIFYING_PROMPT);

        let missing = h.orchestrator.handle(ChatRequest::default()).await;
        assert_eq!(missing.response, CLARIFYING_PROMPT);
        assert_eq!(h.fake.call_count(), 0);
    }

    #[tokio::test]
    async fn test_correction_then_learned_short_circuit() {
        let h = harness(FakeSearchProvider::new().with_response(
            "paris capital of france",
            vec![SearchResult::new(
                "Paris",
                "Paris is the capital of France.",
                "https://paris.example",
            )],
        ));

        let ack = h
            .orchestrator
            .handle(ChatRequest::correction(
                "the capitol of france is berlin",
                "paris",
                "capital of france",
            ))
            .await;
        assert_eq!(ack.response, CORRECTION_ACK);
        assert_eq!(h.fake.call_count(), 1);

        let response = ask(&h, "The capitol of France is Berlin").await;
        assert_eq!(response.response, "Paris is the capital of France.");
        assert_eq!(response.links.len(), 1);
        assert_eq!(response.links[0].url, "https://paris.example");
        assert_eq!(response.links[0].title, "Source");
        // Answered from the store, no new search
        assert_eq!(h.fake.call_count(), 1);
    }

    #[tokio::test]
    async fn test_correction_without_original_is_a_question() {
        let h = harness(FakeSearchProvider::new());
        let request = ChatRequest {
            message: Some("hello".to_string()),
            is_correction: true,
            original_query: None,
            context: None,
        };
        let response = h.orchestrator.handle(request).await;
        assert_ne!(response.response, CORRECTION_ACK);
        assert_eq!(h.store.stats().await.corrections, 0);
    }

    #[tokio::test]
    async fn test_web_search_learns_top_hit() {
        let h = harness(FakeSearchProvider::new().with_response(
            "capital of peru",
            vec![
                SearchResult::new("Lima", "Lima is the capital of Peru.", "https://peru.example"),
                SearchResult::new("Other", "Something else", "https://other.example"),
            ],
        ));

        let first = ask(&h, "Capital of Peru").await;
        assert_eq!(first.response, "<p>Lima is the capital of Peru.</p>");
        assert_eq!(first.links[0].title, "Lima");

        let learned = h.store.lookup_learned_response("capital of peru").await.unwrap();
        assert_eq!(learned.source, "https://peru.example");

        let second = ask(&h, "capital of peru").await;
        assert_eq!(second.response, "Lima is the capital of Peru.");
        assert_eq!(h.fake.call_count(), 1);
    }

    #[tokio::test]
    async fn test_web_search_uses_rewritten_query() {
        let h = harness(FakeSearchProvider::new());
        h.orchestrator
            .handle(ChatRequest::correction("berlin", "paris", "capital"))
            .await;

        let response = ask(&h, "is Berlin nice in spring").await;
        assert_eq!(response.response, FALLBACK_MESSAGE);
        assert_eq!(
            h.fake.calls(),
            vec!["paris capital".to_string(), "is paris nice in spring".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_image_search_falls_through() {
        let h = harness(FakeSearchProvider::new());
        let response = ask(&h, "show me a picture of a cat").await;

        assert_eq!(response.response, BASIC_FACTS[0].1);
        assert_eq!(h.fake.calls(), vec!["a  a cat images".to_string()]);
    }

    #[tokio::test]
    async fn test_image_request_renders_images() {
        let h = harness(FakeSearchProvider::new().with_response(
            "a  a cat images",
            vec![SearchResult::new("Cat", "", "https://cats.example")
                .with_image("https://cats.example/cat.jpg")],
        ));
        let response = ask(&h, "show me a picture of a cat").await;

        assert!(response.response.starts_with("<h3>Here are some images:</h3>"));
        assert_eq!(response.images.len(), 1);
        assert_eq!(response.images[0].src, "https://cats.example/cat.jpg");
    }

    #[tokio::test]
    async fn test_video_request_embeds() {
        let h = harness(FakeSearchProvider::new().with_response(
            "lofi site:youtube.com",
            vec![SearchResult::new(
                "Lofi beats",
                "Relaxing",
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            )],
        ));
        let response = ask(&h, "lofi video").await;

        assert_eq!(response.videos.len(), 1);
        assert_eq!(response.videos[0].id, "dQw4w9WgXcQ");
        assert!(response.response.contains("youtube.com/embed/dQw4w9WgXcQ"));
    }

    #[tokio::test]
    async fn test_self_awareness_before_search() {
        let h = harness(FakeSearchProvider::new());
        let response = ask(&h, "What can you do?").await;
        assert!(response.response.starts_with("<p>I can:</p>"));
        assert_eq!(h.fake.call_count(), 0);
    }

    #[tokio::test]
    async fn test_small_talk() {
        let h = harness(FakeSearchProvider::new());
        assert_eq!(ask(&h, "bye").await.response, "Goodbye.");
    }

    #[tokio::test]
    async fn test_custom_classifier_order() {
        use crate::router::{Predicate, QueryClass, Rule, SMALL_TALK};

        let h = harness(FakeSearchProvider::new());
        assert_eq!(ask(&h, "hi cat").await.response, BASIC_FACTS[0].1);

        let search: Arc<dyn SearchProvider> = h.fake.clone();
        let diagnostics = Arc::new(SelfDiagnostics::new(&ScoutConfig::default(), search.clone()));
        let reordered = ChatOrchestrator::new(h.store.clone(), search, diagnostics).with_classifier(
            Classifier::new(vec![
                Rule::new(QueryClass::SmallTalk, Predicate::TableLookup(SMALL_TALK)),
                Rule::new(QueryClass::StaticFact, Predicate::TableLookup(BASIC_FACTS)),
            ]),
        );
        let response = reordered.handle(ChatRequest::question("hi cat")).await;
        assert_eq!(response.response, "Hi. What information can I help you with?");
    }

    #[tokio::test]
    async fn test_nothing_found_is_fallback() {
        let h = harness(FakeSearchProvider::new());
        let response = ask(&h, "capital of nowhere").await;
        assert_eq!(response.response, FALLBACK_MESSAGE);
        assert_eq!(h.fake.calls(), vec!["capital of nowhere".to_string()]);
        assert_eq!(h.store.stats().await.learned_responses, 0);
    }
}
