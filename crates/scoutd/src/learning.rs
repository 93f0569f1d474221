//! Learning Store - corrections, learned responses and rewritten queries.
//!
//! All three maps are insertion-ordered and live behind one async mutex.
//! Every mutation is written through to the JSON file before the lock is
//! released, so concurrent requests serialize their read-modify-persist
//! sequences instead of overwriting each other's keys.

use crate::search::SearchProvider;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use regex::{NoExpand, RegexBuilder};
use scout_common::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Correction submitted for a query, keyed by the query as submitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionRecord {
    pub correction: String,
    #[serde(default)]
    pub context: String,
    pub timestamp: DateTime<Utc>,
}

/// Authoritative answer for a query, keyed by the query text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearnedResponse {
    pub response: String,
    /// Origin URL of the answer
    pub source: String,
    pub timestamp: DateTime<Utc>,
}

/// On-disk layout of the learning file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningData {
    #[serde(default)]
    pub corrections: IndexMap<String, CorrectionRecord>,
    #[serde(default)]
    pub learned_responses: IndexMap<String, LearnedResponse>,
    /// Cached rewrites; never invalidated when corrections change
    #[serde(default)]
    pub improved_queries: IndexMap<String, String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LearningStats {
    pub corrections: usize,
    pub learned_responses: usize,
    pub improved_queries: usize,
}

pub struct LearningStore {
    /// `None` keeps the store in memory only
    path: Option<PathBuf>,
    data: Mutex<LearningData>,
}

impl LearningStore {
    /// Load the learning file once at startup.
    ///
    /// A missing file starts empty; an unreadable one is logged and also
    /// starts empty.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = match read_data(&path) {
            Ok(Some(data)) => {
                info!(
                    "Loaded learning data from {} ({} corrections, {} learned responses)",
                    path.display(),
                    data.corrections.len(),
                    data.learned_responses.len()
                );
                data
            }
            Ok(None) => {
                info!("No learning data at {}, starting empty", path.display());
                LearningData::default()
            }
            Err(e) => {
                warn!("Error loading learning data from {}: {}", path.display(), e);
                LearningData::default()
            }
        };

        Self {
            path: Some(path),
            data: Mutex::new(data),
        }
    }

    pub fn in_memory() -> Self {
        Self::with_data(LearningData::default())
    }

    pub fn with_data(data: LearningData) -> Self {
        Self {
            path: None,
            data: Mutex::new(data),
        }
    }

    /// Store a correction, then try to derive a learned response for it.
    ///
    /// The derivation searches `"<correction> <context>"` and keeps the top
    /// hit. An empty search leaves only the correction stored.
    pub async fn record_correction(
        &self,
        search: &dyn SearchProvider,
        original: &str,
        correction: &str,
        context: &str,
    ) {
        {
            let mut data = self.data.lock().await;
            data.corrections.insert(
                original.to_string(),
                CorrectionRecord {
                    correction: correction.to_string(),
                    context: context.to_string(),
                    timestamp: Utc::now(),
                },
            );
            self.persist(&data).await;
        }
        info!("Recorded correction for {:?}", original);

        let derivation_query = format!("{} {}", correction, context);
        let results = search.search(&derivation_query).await;
        match results.first() {
            Some(top) => {
                self.learn_response(original, &top.snippet, &top.link).await;
            }
            None => debug!("No derivation results for correction of {:?}", original),
        }
    }

    /// Exact key first, otherwise the first stored key (insertion order)
    /// that contains or is contained in the query, ignoring case.
    pub async fn lookup_learned_response(&self, query: &str) -> Option<LearnedResponse> {
        let data = self.data.lock().await;
        if let Some(hit) = data.learned_responses.get(query) {
            return Some(hit.clone());
        }

        let query_lower = query.to_lowercase();
        data.learned_responses
            .iter()
            .find(|(key, _)| {
                let key_lower = key.to_lowercase();
                query_lower.contains(&key_lower) || key_lower.contains(&query_lower)
            })
            .map(|(_, response)| response.clone())
    }

    /// Rewrite a query with every stored correction.
    ///
    /// A cached rewrite is returned as is. Otherwise corrections are applied
    /// in insertion order, each replacing the first case-insensitive literal
    /// occurrence of its original query in the running result. Rewrites that
    /// change the query are cached.
    pub async fn rewrite_query(&self, query: &str) -> String {
        let mut data = self.data.lock().await;
        if let Some(cached) = data.improved_queries.get(query) {
            return cached.clone();
        }

        let improved = data
            .corrections
            .iter()
            .fold(query.to_string(), |acc, (original, record)| {
                replace_first_ignore_case(&acc, original, &record.correction)
            });

        if improved != query {
            debug!("Rewrote query {:?} -> {:?}", query, improved);
            data.improved_queries
                .insert(query.to_string(), improved.clone());
            self.persist(&data).await;
        }
        improved
    }

    /// Upsert a learned response (last write wins)
    pub async fn learn_response(&self, key: &str, response: &str, source: &str) {
        let mut data = self.data.lock().await;
        data.learned_responses.insert(
            key.to_string(),
            LearnedResponse {
                response: response.to_string(),
                source: source.to_string(),
                timestamp: Utc::now(),
            },
        );
        self.persist(&data).await;
        debug!("Learned response for {:?}", key);
    }

    pub async fn stats(&self) -> LearningStats {
        let data = self.data.lock().await;
        LearningStats {
            corrections: data.corrections.len(),
            learned_responses: data.learned_responses.len(),
            improved_queries: data.improved_queries.len(),
        }
    }

    pub async fn snapshot(&self) -> LearningData {
        self.data.lock().await.clone()
    }

    /// Rewrite the whole file; failures are logged and memory stays valid
    async fn persist(&self, data: &LearningData) {
        let Some(path) = &self.path else {
            return;
        };
        if let Err(e) = write_data(path, data).await {
            warn!("Error saving learning data to {}: {}", path.display(), e);
        }
    }
}

fn read_data(path: &Path) -> Result<Option<LearningData>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

async fn write_data(path: &Path, data: &LearningData) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(data)?;

    // Atomic write: a crash mid-write leaves the previous file intact
    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, content).await?;
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

/// Replace the first case-insensitive occurrence of `needle` as literal text
fn replace_first_ignore_case(haystack: &str, needle: &str, replacement: &str) -> String {
    if needle.is_empty() {
        return haystack.to_string();
    }
    match RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
    {
        Ok(re) => re.replacen(haystack, 1, NoExpand(replacement)).into_owned(),
        Err(e) => {
            warn!("Skipping correction key {:?}: {}", needle, e);
            haystack.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::FakeSearchProvider;
    use scout_common::SearchResult;

    #[test]
    fn test_replace_first_ignore_case() {
        assert_eq!(
            replace_first_ignore_case("Berlin and berlin", "BERLIN", "Paris"),
            "Paris and berlin"
        );
        assert_eq!(replace_first_ignore_case("a+b", "a+b", "$1"), "$1");
        assert_eq!(replace_first_ignore_case("abc", "", "x"), "abc");
    }

    #[tokio::test]
    async fn test_correction_rewrites_future_queries() {
        let store = LearningStore::in_memory();
        let search = FakeSearchProvider::new();
        store
            .record_correction(
                &search,
                "the capitol of france is berlin",
                "paris",
                "capital of france",
            )
            .await;

        assert_eq!(search.calls(), vec!["paris capital of france".to_string()]);
        assert_eq!(
            store
                .rewrite_query("what is the capitol of france is berlin")
                .await,
            "what is paris"
        );
        // Empty derivation search stores only the correction
        let stats = store.stats().await;
        assert_eq!(stats.corrections, 1);
        assert_eq!(stats.learned_responses, 0);
        assert_eq!(stats.improved_queries, 1);
    }

    #[tokio::test]
    async fn test_correction_derives_learned_response() {
        let store = LearningStore::in_memory();
        let search = FakeSearchProvider::new().with_response(
            "paris capital of france",
            vec![
                SearchResult::new("Paris", "Paris is the capital of France.", "https://en.wikipedia.org/wiki/Paris"),
                SearchResult::new("Other", "ignored", "https://example.com"),
            ],
        );
        store
            .record_correction(&search, "capital of france?", "paris", "capital of france")
            .await;

        let learned = store.lookup_learned_response("capital of france?").await.unwrap();
        assert_eq!(learned.response, "Paris is the capital of France.");
        assert_eq!(learned.source, "https://en.wikipedia.org/wiki/Paris");
    }

    #[tokio::test]
    async fn test_rewrite_applies_corrections_in_order() {
        let store = LearningStore::in_memory();
        let search = FakeSearchProvider::new();
        store.record_correction(&search, "colour", "color", "").await;
        store.record_correction(&search, "color tv", "television", "").await;

        // Second correction sees the output of the first
        assert_eq!(store.rewrite_query("best COLOUR tv").await, "best television");
    }

    #[tokio::test]
    async fn test_rewrite_is_idempotent_on_output() {
        let store = LearningStore::in_memory();
        let search = FakeSearchProvider::new();
        store.record_correction(&search, "teh", "the", "").await;

        let once = store.rewrite_query("teh cat").await;
        assert_eq!(once, "the cat");
        assert_eq!(store.rewrite_query(&once).await, once);
        // Unchanged rewrites are not cached
        assert_eq!(store.stats().await.improved_queries, 1);
    }

    #[tokio::test]
    async fn test_rewrite_cache_is_sticky() {
        let store = LearningStore::in_memory();
        let search = FakeSearchProvider::new();
        store.record_correction(&search, "teh", "the", "").await;
        assert_eq!(store.rewrite_query("teh big dgo").await, "the big dgo");

        store.record_correction(&search, "dgo", "dog", "").await;
        // Cached rewrite wins even though a newer correction applies
        assert_eq!(store.rewrite_query("teh big dgo").await, "the big dgo");
    }

    #[tokio::test]
    async fn test_lookup_exact_beats_substring() {
        let store = LearningStore::in_memory();
        store.learn_response("cat", "substring answer", "https://a").await;
        store.learn_response("what is a cat", "exact answer", "https://b").await;

        let hit = store.lookup_learned_response("what is a cat").await.unwrap();
        assert_eq!(hit.response, "exact answer");
    }

    #[tokio::test]
    async fn test_lookup_substring_first_in_insertion_order() {
        let store = LearningStore::in_memory();
        store.learn_response("rust", "first", "https://a").await;
        store.learn_response("rust language", "second", "https://b").await;

        // Both keys relate to the query; the earlier one wins
        let hit = store.lookup_learned_response("the rust language book").await.unwrap();
        assert_eq!(hit.response, "first");

        // Query contained in a key also matches
        let hit = store.lookup_learned_response("LANGUAGE").await.unwrap();
        assert_eq!(hit.response, "second");

        assert!(store.lookup_learned_response("python").await.is_none());
    }

    #[tokio::test]
    async fn test_learn_response_last_write_wins() {
        let store = LearningStore::in_memory();
        store.learn_response("q", "old", "https://a").await;
        store.learn_response("q", "new", "https://b").await;

        assert_eq!(store.stats().await.learned_responses, 1);
        assert_eq!(store.lookup_learned_response("q").await.unwrap().response, "new");
    }

    #[tokio::test]
    async fn test_write_through_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("learning_data.json");

        let store = LearningStore::load(&path);
        assert_eq!(store.stats().await, LearningStats::default());

        let search = FakeSearchProvider::new();
        store.record_correction(&search, "b", "B", "ctx").await;
        store.record_correction(&search, "a", "A", "ctx").await;
        store.learn_response("q", "answer", "https://src").await;
        assert!(path.exists());

        let reloaded = LearningStore::load(&path);
        let data = reloaded.snapshot().await;
        assert_eq!(data, store.snapshot().await);
        let keys: Vec<&String> = data.corrections.keys().collect();
        assert_eq!(keys, vec!["b", "a"]);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(raw.get("learnedResponses").is_some());
        assert!(raw.get("improvedQueries").is_some());
        assert_eq!(raw["corrections"]["a"]["correction"], "A");
    }

    #[tokio::test]
    async fn test_persist_replaces_file_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learning_data.json");
        let temp_path = path.with_extension("json.tmp");

        let store = LearningStore::load(&path);
        store.learn_response("q", "answer", "https://src").await;
        assert!(path.exists());
        assert!(!temp_path.exists());

        // A torn temp file from an interrupted write does not affect the data
        std::fs::write(&temp_path, "{\"learnedRes").unwrap();
        let reloaded = LearningStore::load(&path);
        assert_eq!(reloaded.stats().await.learned_responses, 1);

        reloaded.learn_response("r", "second", "https://src").await;
        assert!(!temp_path.exists());
        assert_eq!(LearningStore::load(&path).stats().await.learned_responses, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writers_all_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learning_data.json");
        let store = std::sync::Arc::new(LearningStore::load(&path));

        let tasks: Vec<_> = (0..40)
            .map(|i| {
                let store = store.clone();
                tokio::spawn(async move {
                    store
                        .learn_response(&format!("query {}", i), "answer", "https://src")
                        .await;
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(store.stats().await.learned_responses, 40);
        let reloaded = LearningStore::load(&path);
        assert_eq!(reloaded.stats().await.learned_responses, 40);
    }

    #[tokio::test]
    async fn test_corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("learning_data.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = LearningStore::load(&path);
        assert_eq!(store.stats().await, LearningStats::default());
    }

    #[tokio::test]
    async fn test_persist_failure_keeps_memory_state() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the file should be makes every write fail
        let path = dir.path().join("learning_data.json");
        std::fs::create_dir(&path).unwrap();

        let store = LearningStore::load(&path);
        store.learn_response("q", "answer", "https://src").await;
        assert_eq!(store.lookup_learned_response("q").await.unwrap().response, "answer");
    }
}
