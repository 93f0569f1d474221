//! scoutd - search-backed chat assistant daemon.
//!
//! Answers free-form questions by routing them through canned answers,
//! learned responses and web search, and learns from user corrections.

pub mod arith;
pub mod diagnostics;
pub mod learning;
pub mod orchestrator;
pub mod router;
pub mod routes;
pub mod scrape;
pub mod search;
pub mod server;
pub mod synthesizer;

pub use orchestrator::ChatOrchestrator;
pub use search::{FakeSearchProvider, GoogleSearchClient, SearchProvider};
pub use server::{build_router, AppState};
