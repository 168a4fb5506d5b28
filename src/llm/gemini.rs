//! Gemini-backed classifier.
//!
//! Calls go through a `GenerativeModel` (rig-core completion model in production),
//! throttled by a `RateLimiter` and retried with exponential backoff. The
//! model is asked for a bare number; anything that does not parse to a score
//! in `[0, 1]` is discarded.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rig::completion::CompletionModel;
use rig::completion::message::AssistantContent;
use tracing::{debug, error};

use crate::error::LlmError;
use crate::llm::criteria::Criteria;
use crate::llm::prompts;
use crate::llm::provider::{Classifier, Score};
use crate::llm::rate_limit::RateLimiter;
use crate::llm::retry::{self, RetryPolicy};

pub const PROVIDER: &str = "gemini";

/// Default Gemini model.
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// A remote text-generation endpoint: prompt in, raw text out.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Adapts a rig completion model to `GenerativeModel`.
///
/// Requests go straight through `completion_request`, so construction needs
/// no runtime and spawns nothing.
pub struct RigGenerativeModel<M: CompletionModel> {
    model: M,
    model_name: String,
}

impl<M: CompletionModel> RigGenerativeModel<M> {
    pub fn new(model: M, model_name: impl Into<String>) -> Self {
        Self {
            model,
            model_name: model_name.into(),
        }
    }
}

#[async_trait]
impl<M> GenerativeModel for RigGenerativeModel<M>
where
    M: CompletionModel + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let response = self
            .model
            .completion_request(prompt.to_owned())
            .temperature(0.0)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let text: String = response
            .choice
            .iter()
            .filter_map(|content| match content {
                AssistantContent::Text(text) => Some(text.text.as_str()),
                _ => None,
            })
            .collect();

        if text.trim().is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: PROVIDER.to_string(),
                reason: "no text in completion".into(),
            });
        }
        Ok(text)
    }
}

/// Build a rig Gemini completion model. Sampling is pinned to temperature 0
/// per request.
pub fn create_model(
    api_key: &str,
    model: &str,
) -> Result<Arc<dyn GenerativeModel>, LlmError> {
    use rig::client::CompletionClient;
    use rig::providers::gemini;

    if api_key.trim().is_empty() {
        return Err(LlmError::MissingCredential {
            provider: PROVIDER.to_string(),
        });
    }

    let client: gemini::Client =
        gemini::Client::new(api_key).map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: format!("Failed to create Gemini client: {}", e),
        })?;

    let completion_model = client.completion_model(model);
    Ok(Arc::new(RigGenerativeModel::new(completion_model, model)))
}

/// Classifier backed by a remote generative model.
pub struct GeminiClassifier {
    model: Arc<dyn GenerativeModel>,
    limiter: RateLimiter,
    retry: RetryPolicy,
}

impl GeminiClassifier {
    pub fn new(model: Arc<dyn GenerativeModel>, min_request_interval: Duration) -> Self {
        Self {
            model,
            limiter: RateLimiter::new(min_request_interval),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Send `prompt`, throttled and retried. `None` once every attempt failed.
    async fn ask(&self, prompt: &str) -> Option<String> {
        retry::with_backoff(self.retry, PROVIDER, |attempt| async move {
            self.limiter.acquire().await;
            debug!(model = self.model.model_name(), attempt, "Sending classification request");
            self.model.generate(prompt).await
        })
        .await
    }
}

/// Render the post and criteria as a single prompt.
fn build_prompt(post: &str, criteria: &Criteria) -> String {
    [
        prompts::is_post_interesting(post),
        prompts::interesting_line(criteria),
        prompts::uninteresting_line(criteria),
    ]
    .join("\n\n")
}

#[async_trait]
impl Classifier for GeminiClassifier {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn classify(&self, text: &str, criteria: &Criteria) -> Option<Score> {
        let prompt = build_prompt(text, criteria);
        let response = self.ask(&prompt).await?;

        match Score::parse(&response) {
            Some(score) => Some(score),
            None => {
                let err = LlmError::ScoreOutOfRange {
                    provider: PROVIDER.to_string(),
                    raw: response.trim().to_string(),
                };
                error!(error = %err, "Discarding Gemini response");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    /// Replays scripted responses; records call times.
    struct ScriptedModel {
        responses: Mutex<VecDeque<Result<String, LlmError>>>,
        calls: AtomicUsize,
        call_times: Mutex<Vec<Instant>>,
        last_prompt: Mutex<Option<String>>,
    }

    impl ScriptedModel {
        fn new(responses: Vec<Result<String, LlmError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into()),
                calls: AtomicUsize::new(0),
                call_times: Mutex::new(Vec::new()),
                last_prompt: Mutex::new(None),
            })
        }

        fn ok(text: &str) -> Result<String, LlmError> {
            Ok(text.to_string())
        }

        fn fail() -> Result<String, LlmError> {
            Err(LlmError::RequestFailed {
                provider: PROVIDER.into(),
                reason: "503".into(),
            })
        }
    }

    #[async_trait]
    impl GenerativeModel for ScriptedModel {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.call_times.lock().unwrap().push(Instant::now());
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(Self::fail)
        }
    }

    fn criteria() -> Criteria {
        Criteria::new(vec!["rust".into()], vec!["celebrity gossip".into()])
    }

    #[tokio::test(start_paused = true)]
    async fn parses_numeric_response() {
        let model = ScriptedModel::new(vec![ScriptedModel::ok("0.82\n")]);
        let classifier = GeminiClassifier::new(model.clone(), Duration::from_millis(100));

        let score = classifier.classify("Rust 2024 edition", &criteria()).await;
        assert_eq!(score.map(Score::value), Some(0.82));

        let prompt = model.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("Post to analyze: \"Rust 2024 edition\""));
        assert!(prompt.contains("Interesting topics: rust."));
        assert!(prompt.contains("Uninteresting topics: celebrity gossip."));
    }

    #[tokio::test(start_paused = true)]
    async fn out_of_range_response_is_absent() {
        let model = ScriptedModel::new(vec![ScriptedModel::ok("1.5")]);
        let classifier = GeminiClassifier::new(model.clone(), Duration::from_millis(100));
        assert!(classifier.classify("post", &criteria()).await.is_none());
        // A parse failure is not retried.
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn non_numeric_response_is_absent() {
        let model = ScriptedModel::new(vec![ScriptedModel::ok("Quite interesting!")]);
        let classifier = GeminiClassifier::new(model, Duration::from_millis(100));
        assert!(classifier.classify("post", &criteria()).await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_then_succeeds_on_third_attempt() {
        let model = ScriptedModel::new(vec![
            ScriptedModel::fail(),
            ScriptedModel::fail(),
            ScriptedModel::ok("0.4"),
        ]);
        let classifier = GeminiClassifier::new(model.clone(), Duration::from_millis(100));

        let score = classifier.classify("post", &criteria()).await;
        assert_eq!(score.map(Score::value), Some(0.4));
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);

        let times = model.call_times.lock().unwrap().clone();
        let first_gap = times[1] - times[0];
        let second_gap = times[2] - times[1];
        assert!(first_gap >= Duration::from_secs(2) && first_gap < Duration::from_secs(3));
        assert!(second_gap >= Duration::from_secs(4) && second_gap < Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn all_attempts_failing_yields_absent() {
        let model = ScriptedModel::new(vec![]);
        let classifier = GeminiClassifier::new(model.clone(), Duration::from_millis(100));

        assert!(classifier.classify("post", &criteria()).await.is_none());
        assert_eq!(model.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_calls_are_throttled() {
        let model = ScriptedModel::new(vec![ScriptedModel::ok("0.1"), ScriptedModel::ok("0.2")]);
        let classifier = GeminiClassifier::new(model.clone(), Duration::from_secs(1));

        classifier.classify("first", &criteria()).await;
        tokio::time::advance(Duration::from_millis(250)).await;
        classifier.classify("second", &criteria()).await;

        let times = model.call_times.lock().unwrap().clone();
        assert!(times[1] - times[0] >= Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn custom_retry_policy_limits_attempts() {
        let model = ScriptedModel::new(vec![]);
        let classifier = GeminiClassifier::new(model.clone(), Duration::from_millis(100))
            .with_retry_policy(RetryPolicy {
                max_attempts: 1,
                base: Duration::from_secs(1),
            });

        assert!(classifier.classify("post", &criteria()).await.is_none());
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn create_model_works_without_a_runtime() {
        let model = create_model("test-key", DEFAULT_MODEL).unwrap();
        assert_eq!(model.model_name(), DEFAULT_MODEL);

        let classifier = GeminiClassifier::new(model, Duration::from_millis(100));
        assert_eq!(classifier.name(), PROVIDER);
    }

    #[test]
    fn create_model_rejects_blank_key() {
        assert!(matches!(
            create_model("  ", DEFAULT_MODEL),
            Err(LlmError::MissingCredential { .. })
        ));
    }
}
