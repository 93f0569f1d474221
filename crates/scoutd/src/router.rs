//! Deterministic query router.
//!
//! Classification is an ordered rule list evaluated first-match-wins over a
//! lowercased, trimmed query. Each rule pairs a query class with a keyword
//! predicate; the orchestrator walks the matching routes in the same order
//! and stops at the first one that produces an answer.

use crate::arith;
use serde::{Deserialize, Serialize};

/// Keywords that give a query image flavor
pub const IMAGE_FLAVOR_KEYWORDS: &[&str] = &["picture", "image", "show me", "photo"];

/// Keywords that give a query video flavor
pub const VIDEO_FLAVOR_KEYWORDS: &[&str] = &["video", "youtube"];

/// Phrases that make a message an explicit image request
pub const IMAGE_REQUEST_PHRASES: &[&str] = &[
    "show me",
    "picture of",
    "image of",
    "photo of",
    "show picture",
    "show image",
    "show photo",
];

/// Words that make a message an explicit video request
pub const VIDEO_REQUEST_WORDS: &[&str] = &["youtube", "video"];

const CAPABILITY_PHRASES: &[&str] = &["what can you do", "your capabilities"];
const DIAGNOSE_PHRASES: &[&str] = &["what's wrong", "why can't you", "why won't you"];
const ARCHITECTURE_PHRASES: &[&str] = &["your code", "how do you work"];

pub const BASIC_FACTS: &[(&str, &str)] = &[
    (
        "cat",
        "A cat is a small, domesticated carnivorous mammal. They are known for their agility, hunting skills, and as popular pets.",
    ),
    (
        "dog",
        "A dog is a domesticated carnivorous mammal that is commonly kept as a pet. They are known for their loyalty and companionship.",
    ),
    (
        "weather",
        "Weather refers to the state of the atmosphere at a particular place and time, including temperature, precipitation, and wind conditions.",
    ),
];

pub const BEHAVIORAL_RESPONSES: &[(&str, &str)] = &[
    (
        "who are you",
        "I'm an assistant designed to help you find clear, honest information. I don't have feelings or personal experiences, but I'm here to assist you thoughtfully and accurately.",
    ),
    (
        "what are you",
        "I'm a non-human assistant built to help you get reliable, grounded answers. I don't think or feel. I analyze language and respond logically.",
    ),
    (
        "what can you do",
        "I can help answer questions, explain things simply, or find useful information. I'm not perfect, but I try to be clear, direct, and helpful.",
    ),
    (
        "how do you work",
        "I process your input, try to understand your intent, and search for relevant information online. I don't browse in real-time, but I use current tools to help answer as best I can.",
    ),
    (
        "do you have feelings",
        "No. I don't have emotions, consciousness, or personal opinions. I just try to be helpful, clear, and respectful.",
    ),
    (
        "what are your limitations",
        "I'm limited to the data I can access, and I don't think or feel. I can't give personal advice or original opinions, but I aim to give fact-based, respectful help.",
    ),
];

pub const SMALL_TALK: &[(&str, &str)] = &[
    ("hello", "Hello. I can help you find information. What would you like to know?"),
    ("hi", "Hi. What information can I help you with?"),
    ("hey", "Hello. How can I assist you today?"),
    (
        "how are you",
        "I'm an assistant, so I don't have feelings or personal experiences. How can I help you?",
    ),
    (
        "what is your name",
        "I'm an assistant that helps find information. What would you like to know?",
    ),
    ("bye", "Goodbye."),
    ("thanks", "You're welcome."),
    ("thank you", "You're welcome."),
];

/// Query classes in orchestrator priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryClass {
    SelfAwareness,
    LearnedResponse,
    ImageRequest,
    VideoRequest,
    Arithmetic,
    StaticFact,
    Behavioral,
    SmallTalk,
    WebSearch,
}

impl std::fmt::Display for QueryClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SelfAwareness => "self_awareness",
            Self::LearnedResponse => "learned_response",
            Self::ImageRequest => "image_request",
            Self::VideoRequest => "video_request",
            Self::Arithmetic => "arithmetic",
            Self::StaticFact => "static_fact",
            Self::Behavioral => "behavioral",
            Self::SmallTalk => "small_talk",
            Self::WebSearch => "web_search",
        };
        write!(f, "{}", s)
    }
}

/// Introspective questions about the assistant itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaQuestion {
    Capabilities,
    /// "why can't you ..." with the trigger phrases removed
    Diagnose { issue: String },
    Architecture,
}

impl MetaQuestion {
    pub fn detect(query: &str) -> Option<Self> {
        if contains_any(query, CAPABILITY_PHRASES) {
            return Some(Self::Capabilities);
        }
        if contains_any(query, DIAGNOSE_PHRASES) {
            return Some(Self::Diagnose {
                issue: strip_phrases(query, DIAGNOSE_PHRASES),
            });
        }
        if contains_any(query, ARCHITECTURE_PHRASES) {
            return Some(Self::Architecture);
        }
        None
    }
}

/// Output modality the synthesizer renders for a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFlavor {
    Image,
    Video,
    Text,
}

impl QueryFlavor {
    /// Image wins over video when both keyword sets match
    pub fn detect(query: &str) -> Self {
        if is_image_flavored(query) {
            Self::Image
        } else if is_video_flavored(query) {
            Self::Video
        } else {
            Self::Text
        }
    }
}

pub fn is_image_flavored(query: &str) -> bool {
    contains_any(&query.to_lowercase(), IMAGE_FLAVOR_KEYWORDS)
}

pub fn is_video_flavored(query: &str) -> bool {
    contains_any(&query.to_lowercase(), VIDEO_FLAVOR_KEYWORDS)
}

/// Predicate half of a classification rule
#[derive(Debug, Clone, Copy)]
pub enum Predicate {
    MetaQuestion,
    /// Supplied by the caller, since it depends on the learning store
    LearnedHit,
    AnyKeyword(&'static [&'static str]),
    ArithmeticExpression,
    TableLookup(&'static [(&'static str, &'static str)]),
    Always,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub class: QueryClass,
    pub predicate: Predicate,
}

/// A matched rule with whatever the predicate extracted
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    SelfAwareness(MetaQuestion),
    LearnedResponse,
    ImageRequest,
    VideoRequest,
    Arithmetic(f64),
    Canned { class: QueryClass, answer: &'static str },
    WebSearch,
}

impl Route {
    pub fn class(&self) -> QueryClass {
        match self {
            Self::SelfAwareness(_) => QueryClass::SelfAwareness,
            Self::LearnedResponse => QueryClass::LearnedResponse,
            Self::ImageRequest => QueryClass::ImageRequest,
            Self::VideoRequest => QueryClass::VideoRequest,
            Self::Arithmetic(_) => QueryClass::Arithmetic,
            Self::Canned { class, .. } => *class,
            Self::WebSearch => QueryClass::WebSearch,
        }
    }
}

impl Rule {
    pub const fn new(class: QueryClass, predicate: Predicate) -> Self {
        Self { class, predicate }
    }

    fn evaluate(&self, query: &str, learned_hit: bool) -> Option<Route> {
        match self.predicate {
            Predicate::MetaQuestion => MetaQuestion::detect(query).map(Route::SelfAwareness),
            Predicate::LearnedHit => learned_hit.then_some(Route::LearnedResponse),
            Predicate::AnyKeyword(keywords) => {
                contains_any(query, keywords).then(|| self.plain_route())
            }
            Predicate::ArithmeticExpression => {
                if !arith::looks_like_arithmetic(query) {
                    return None;
                }
                arith::evaluate(query).map(Route::Arithmetic)
            }
            Predicate::TableLookup(table) => table
                .iter()
                .find(|(key, _)| query.contains(key))
                .map(|(_, answer)| Route::Canned {
                    class: self.class,
                    answer: *answer,
                }),
            Predicate::Always => Some(self.plain_route()),
        }
    }

    fn plain_route(&self) -> Route {
        match self.class {
            QueryClass::ImageRequest => Route::ImageRequest,
            QueryClass::VideoRequest => Route::VideoRequest,
            QueryClass::LearnedResponse => Route::LearnedResponse,
            _ => Route::WebSearch,
        }
    }
}

/// Ordered rule list
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Default for Classifier {
    fn default() -> Self {
        Self::standard()
    }
}

impl Classifier {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn standard() -> Self {
        Self::new(vec![
            Rule::new(QueryClass::SelfAwareness, Predicate::MetaQuestion),
            Rule::new(QueryClass::LearnedResponse, Predicate::LearnedHit),
            Rule::new(QueryClass::ImageRequest, Predicate::AnyKeyword(IMAGE_REQUEST_PHRASES)),
            Rule::new(QueryClass::VideoRequest, Predicate::AnyKeyword(VIDEO_REQUEST_WORDS)),
            Rule::new(QueryClass::Arithmetic, Predicate::ArithmeticExpression),
            Rule::new(QueryClass::StaticFact, Predicate::TableLookup(BASIC_FACTS)),
            Rule::new(QueryClass::Behavioral, Predicate::TableLookup(BEHAVIORAL_RESPONSES)),
            Rule::new(QueryClass::SmallTalk, Predicate::TableLookup(SMALL_TALK)),
            Rule::new(QueryClass::WebSearch, Predicate::Always),
        ])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// First matching route
    pub fn classify(&self, query: &str, learned_hit: bool) -> Route {
        self.rules
            .iter()
            .find_map(|rule| rule.evaluate(query, learned_hit))
            .unwrap_or(Route::WebSearch)
    }

    /// Every matching route, in rule order
    pub fn routes(&self, query: &str, learned_hit: bool) -> Vec<Route> {
        self.rules
            .iter()
            .filter_map(|rule| rule.evaluate(query, learned_hit))
            .collect()
    }
}

/// Lowercase and trim a raw message
pub fn normalize_query(message: &str) -> String {
    message.to_lowercase().trim().to_string()
}

/// Remove every occurrence of each phrase, then trim
pub fn strip_phrases(query: &str, phrases: &[&str]) -> String {
    let mut out = query.to_string();
    for phrase in phrases {
        out = out.replace(phrase, "");
    }
    out.trim().to_string()
}

fn contains_any(query: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| query.contains(k))
}
