//! Ollama chat-endpoint classifier.
//!
//! One POST per classification, no retry. The request pins the output to a
//! JSON object with a numeric `score` field and sets temperature 0.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::error::LlmError;
use crate::llm::criteria::Criteria;
use crate::llm::prompts;
use crate::llm::provider::{Classifier, Score};

pub const PROVIDER: &str = "ollama";

pub const DEFAULT_URL: &str = "http://localhost:11434/api/chat";
pub const DEFAULT_MODEL: &str = "llama3.1";

/// Default request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ── Wire types ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub format: serde_json::Value,
    pub options: ChatOptions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatOptions {
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: Option<ChatMessage>,
}

/// JSON schema constraining the model to `{ "score": <number> }`.
fn score_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "score": { "type": "number" }
        },
        "required": ["score"]
    })
}

impl ChatRequest {
    pub fn classification(model: &str, post: &str, criteria: &Criteria) -> Self {
        Self {
            model: model.to_string(),
            messages: vec![
                ChatMessage::system(prompts::JSON_ONLY),
                ChatMessage::user(prompts::is_post_interesting(post)),
                ChatMessage::user(prompts::interesting_line(criteria)),
                ChatMessage::user(prompts::uninteresting_line(criteria)),
            ],
            stream: false,
            format: score_schema(),
            options: ChatOptions { temperature: 0.0 },
        }
    }
}

/// Extract and validate the score from a raw `/api/chat` response body.
pub fn parse_score_response(body: &str) -> Result<Score, LlmError> {
    let response: ChatResponse = serde_json::from_str(body)?;
    let content = response
        .message
        .map(|m| m.content)
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: "response has no message".into(),
        })?;

    let payload: serde_json::Value = serde_json::from_str(&content)?;
    let raw = payload
        .get("score")
        .ok_or_else(|| LlmError::InvalidResponse {
            provider: PROVIDER.to_string(),
            reason: format!("no score field in {content}"),
        })?;

    // Models sometimes quote the number despite the schema.
    raw.as_f64()
        .or_else(|| raw.as_str().and_then(|s| s.trim().parse::<f64>().ok()))
        .and_then(Score::new)
        .ok_or_else(|| LlmError::ScoreOutOfRange {
            provider: PROVIDER.to_string(),
            raw: raw.to_string(),
        })
}

// ── Classifier ──────────────────────────────────────────────────────

pub struct OllamaClassifier {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaClassifier {
    /// Fails when the endpoint or model is blank.
    pub fn new(url: &str, model: &str, timeout: Duration) -> Result<Self, LlmError> {
        if url.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                provider: PROVIDER.to_string(),
                reason: "endpoint URL is empty".into(),
            });
        }
        if model.trim().is_empty() {
            return Err(LlmError::InvalidConfig {
                provider: PROVIDER.to_string(),
                reason: "model name is empty".into(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("Failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            url: url.trim().to_string(),
            model: model.trim().to_string(),
        })
    }

    async fn ask(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let resp = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: e.to_string(),
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(LlmError::RequestFailed {
                provider: PROVIDER.to_string(),
                reason: format!("{} returned {status}: {body}", self.model),
            });
        }

        resp.text().await.map_err(|e| LlmError::RequestFailed {
            provider: PROVIDER.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl Classifier for OllamaClassifier {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn classify(&self, text: &str, criteria: &Criteria) -> Option<Score> {
        let request = ChatRequest::classification(&self.model, text, criteria);
        debug!(model = %self.model, url = %self.url, "Sending classification request");

        match self
            .ask(&request)
            .await
            .and_then(|body| parse_score_response(&body))
        {
            Ok(score) => Some(score),
            Err(e) => {
                error!(model = %self.model, error = %e, "Ollama classification failed");
                None
            }
        }
    }
}
