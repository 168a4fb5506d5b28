//! Interest classification providers.
//!
//! Supports:
//! - **Gemini**: remote generative model via rig-core, rate limited and
//!   retried with exponential backoff
//! - **Ollama**: local `/api/chat` endpoint via reqwest, single attempt
//!
//! Both implement the `Classifier` trait; the backend is picked once from
//! configuration by `create_classifier`.

pub mod criteria;
pub mod gemini;
pub mod ollama;
pub mod prompts;
pub mod provider;
pub mod rate_limit;
pub(crate) mod retry;

pub use criteria::Criteria;
pub use gemini::{GeminiClassifier, GenerativeModel};
pub use ollama::OllamaClassifier;
pub use provider::{Classifier, Score};
pub use retry::RetryPolicy;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::LlmError;

/// Supported classifier backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierBackend {
    Gemini,
    Ollama,
}

impl ClassifierBackend {
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => gemini::DEFAULT_MODEL,
            Self::Ollama => ollama::DEFAULT_MODEL,
        }
    }
}

impl FromStr for ClassifierBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(Self::Gemini),
            "ollama" => Ok(Self::Ollama),
            other => Err(format!("unknown provider '{other}' (expected gemini or ollama)")),
        }
    }
}

/// Configuration for creating a classifier.
#[derive(Debug, Clone)]
pub struct ClassifierConfig {
    pub backend: ClassifierBackend,
    /// Required for Gemini.
    pub api_key: Option<SecretString>,
    pub model: String,
    /// Chat endpoint, used by Ollama.
    pub url: String,
    /// Minimum spacing between requests (Gemini).
    pub request_interval: Duration,
    /// Per-request HTTP timeout (Ollama).
    pub request_timeout: Duration,
}

/// Create a classifier from configuration. Missing credentials fail here,
/// not on the first call.
pub fn create_classifier(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>, LlmError> {
    match config.backend {
        ClassifierBackend::Gemini => create_gemini_classifier(config),
        ClassifierBackend::Ollama => create_ollama_classifier(config),
    }
}

fn create_gemini_classifier(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>, LlmError> {
    let api_key = config
        .api_key
        .as_ref()
        .map(|k| k.expose_secret())
        .ok_or_else(|| LlmError::MissingCredential {
            provider: gemini::PROVIDER.to_string(),
        })?;

    let model = gemini::create_model(api_key, &config.model)?;
    tracing::info!(
        "Using Gemini (model: {}, min interval: {:?})",
        config.model,
        config.request_interval
    );
    Ok(Arc::new(GeminiClassifier::new(model, config.request_interval)))
}

fn create_ollama_classifier(config: &ClassifierConfig) -> Result<Arc<dyn Classifier>, LlmError> {
    let classifier = OllamaClassifier::new(&config.url, &config.model, config.request_timeout)?;
    tracing::info!("Using Ollama (model: {}, url: {})", config.model, config.url);
    Ok(Arc::new(classifier))
}
