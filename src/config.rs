//! Configuration types, read from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{ClassifierBackend, ClassifierConfig, ollama};
use crate::pipeline::ForwarderConfig;

/// Lower bound for `AI_REQUEST_INTERVAL`.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(100);

/// Scoring and pacing knobs.
#[derive(Debug, Clone)]
pub struct ProcessingConfig {
    /// Posts scoring at or above this are forwarded.
    pub interest_threshold: f64,
    /// Pause between dialogs.
    pub dialog_pause: Duration,
    /// How long a cached score stays valid.
    pub cache_ttl: Duration,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            interest_threshold: 0.5,
            dialog_pause: Duration::from_millis(1000),
            cache_ttl: Duration::from_secs(3600), // 1 hour
        }
    }
}

/// Which dialogs to read and where to send interesting posts.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub chat_folder: Option<String>,
    pub target_channel: Option<String>,
    /// Dialog snapshot served by the file-backed transport.
    pub snapshot_path: PathBuf,
}

/// Everything the binary needs for one run.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub classifier: ClassifierConfig,
    pub processing: ProcessingConfig,
    pub telegram: TelegramConfig,
    /// JSON file with interesting/uninteresting topic lists.
    pub prompts_path: PathBuf,
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Unset and blank values are
    /// treated alike.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let backend: ClassifierBackend = match get("AI_PROVIDER") {
            Some(raw) => raw.parse().map_err(|message| ConfigError::InvalidValue {
                key: "AI_PROVIDER".into(),
                message,
            })?,
            None => ClassifierBackend::Gemini,
        };

        let api_key = get("AI_KEY").map(SecretString::from);
        if backend == ClassifierBackend::Gemini && api_key.is_none() {
            return Err(ConfigError::MissingEnvVar("AI_KEY".into()));
        }

        let model = get("AI_MODEL").unwrap_or_else(|| backend.default_model().to_string());
        let url = get("AI_URL").unwrap_or_else(|| ollama::DEFAULT_URL.to_string());

        let interval_ms: u64 = parse_or(get("AI_REQUEST_INTERVAL"), "AI_REQUEST_INTERVAL", 1000)?;
        let request_interval = Duration::from_millis(interval_ms);
        if request_interval < MIN_REQUEST_INTERVAL {
            return Err(ConfigError::InvalidValue {
                key: "AI_REQUEST_INTERVAL".into(),
                message: format!(
                    "{interval_ms}ms is below the {}ms minimum",
                    MIN_REQUEST_INTERVAL.as_millis()
                ),
            });
        }

        let defaults = ProcessingConfig::default();

        let pause_ms: u64 = parse_or(
            get("TIMEOUT"),
            "TIMEOUT",
            defaults.dialog_pause.as_millis() as u64,
        )?;

        let interest_threshold: f64 = parse_or(
            get("POST_INTEREST_THRESHOLD"),
            "POST_INTEREST_THRESHOLD",
            defaults.interest_threshold,
        )?;
        if !(0.0..=1.0).contains(&interest_threshold) {
            return Err(ConfigError::InvalidValue {
                key: "POST_INTEREST_THRESHOLD".into(),
                message: format!("{interest_threshold} is outside [0, 1]"),
            });
        }

        let ttl_secs: u64 = parse_or(
            get("CACHE_TTL_SECS"),
            "CACHE_TTL_SECS",
            defaults.cache_ttl.as_secs(),
        )?;
        if ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "CACHE_TTL_SECS".into(),
                message: "must be at least 1".into(),
            });
        }

        Ok(Self {
            classifier: ClassifierConfig {
                backend,
                api_key,
                model,
                url,
                request_interval,
                request_timeout: ollama::DEFAULT_TIMEOUT,
            },
            processing: ProcessingConfig {
                interest_threshold,
                dialog_pause: Duration::from_millis(pause_ms),
                cache_ttl: Duration::from_secs(ttl_secs),
            },
            telegram: TelegramConfig {
                chat_folder: get("TG_CHAT_FOLDER"),
                target_channel: get("TG_TARGET_CHANNEL"),
                snapshot_path: get("TG_SNAPSHOT_PATH")
                    .unwrap_or_else(|| "./dialogs.json".into())
                    .into(),
            },
            prompts_path: get("PROMPTS_FILE_PATH")
                .unwrap_or_else(|| "./prompts.json".into())
                .into(),
        })
    }

    pub fn forwarder_config(&self) -> ForwarderConfig {
        ForwarderConfig {
            folder_name: self.telegram.chat_folder.clone(),
            target_channel: self.telegram.target_channel.clone(),
            threshold: self.processing.interest_threshold,
            pause: self.processing.dialog_pause,
        }
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("'{raw}': {e}"),
        }),
        None => Ok(default),
    }
}
