//! Triage service: sanitizes posts, consults the response cache, and falls
//! back to the configured classifier on a miss.
//!
//! Only valid scores are cached. A provider failure leaves the cache
//! untouched so the same post is classified again on the next run.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, warn};

use crate::cache::ResponseCache;
use crate::llm::{Classifier, Criteria, Score};

/// Posts longer than this (in characters) are truncated before classification.
pub const MAX_PROMPT_LENGTH: usize = 10_000;

/// Appended to truncated posts.
pub const TRUNCATION_MARKER: &str = "...";

/// Cap `prompt` at `MAX_PROMPT_LENGTH` characters.
pub fn truncate_prompt(prompt: &str) -> String {
    match prompt.char_indices().nth(MAX_PROMPT_LENGTH) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &prompt[..cut]),
        None => prompt.to_string(),
    }
}

/// Cache key for `text` under `criteria`. Changing either yields a new key.
pub fn cache_key(text: &str, criteria: &Criteria) -> String {
    format!("{}\u{1f}{}", criteria.fingerprint(), text)
}

/// Scores posts for interest, memoizing results per (text, criteria).
pub struct TriageService {
    classifier: Arc<dyn Classifier>,
    criteria: RwLock<Arc<Criteria>>,
    cache: Mutex<ResponseCache<Score>>,
}

impl TriageService {
    pub fn new(classifier: Arc<dyn Classifier>, criteria: Criteria, cache_ttl: Duration) -> Self {
        Self {
            classifier,
            criteria: RwLock::new(Arc::new(criteria)),
            cache: Mutex::new(ResponseCache::new(cache_ttl)),
        }
    }

    pub async fn criteria(&self) -> Arc<Criteria> {
        Arc::clone(&*self.criteria.read().await)
    }

    /// Swap in new criteria. Entries cached under the old criteria are no
    /// longer reachable and age out with their TTL.
    pub async fn replace_criteria(&self, criteria: Criteria) {
        *self.criteria.write().await = Arc::new(criteria);
    }

    /// Interest score for `prompt`, or `None` if the post is blank or the
    /// classifier could not produce a valid score.
    pub async fn get_is_post_interesting(&self, prompt: &str) -> Option<Score> {
        if prompt.trim().is_empty() {
            warn!("Empty or blank post passed to triage");
            return None;
        }

        let text = truncate_prompt(prompt);
        let criteria = self.criteria().await;
        let key = cache_key(&text, &criteria);

        if let Some(score) = self.cache.lock().await.get(&key) {
            debug!(%score, "Triage cache hit");
            return Some(score);
        }

        debug!(provider = self.classifier.name(), "Triage cache miss");
        let score = self.classifier.classify(&text, &criteria).await?;
        self.cache.lock().await.set(&key, score, None);
        Some(score)
    }

    /// Number of live cached scores.
    pub async fn cache_size(&self) -> usize {
        self.cache.lock().await.size()
    }

    pub async fn clear_cache(&self) {
        self.cache.lock().await.clear();
    }
}
