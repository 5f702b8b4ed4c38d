//! Configuration for the generation service, retry policy and store

use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use log::debug;

pub const GEMINI_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-flash-latest";

/// Text-generation service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeminiConfig
{   /// API key; only required once a prompt is sent
    pub api_key: Option<String>
  , /// Model name, with or without the `models/` prefix
    pub model: String
  , /// API base URL
    pub api_base: String
  , /// Request timeout in seconds (none by default)
    pub timeout_secs: Option<u64>
  , /// Sampling temperature
    pub temperature: Option<f32>
  , /// Max tokens to generate
    pub max_output_tokens: Option<u32>
}

impl Default for GeminiConfig
{   fn default() -> Self
    {   GeminiConfig
        {   api_key: None
          , model: DEFAULT_MODEL.to_string()
          , api_base: GEMINI_API_BASE.to_string()
          , timeout_secs: None
          , temperature: Some(0.7)
          , max_output_tokens: None
        }
    }
}

/// Attempt budget and fixed wait for one request kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindRetry
{   /// Total calls, including the first
    pub max_attempts: usize
  , /// Wait between throttled calls, in milliseconds
    pub backoff_ms: u64
}

/// Retry configuration per request kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig
{   pub workout_plan: KindRetry
  , pub meal_plan: KindRetry
  , pub exercise_explanation: KindRetry
  , pub chat: KindRetry
}

impl Default for RetryConfig
{   fn default() -> Self
    {   RetryConfig
        {   workout_plan: KindRetry
            {   max_attempts: 3
              , backoff_ms: 5_000
            }
          , meal_plan: KindRetry
            {   max_attempts: 3
              , backoff_ms: 5_000
            }
          , exercise_explanation: KindRetry
            {   max_attempts: 2
              , backoff_ms: 15_000
            }
          , chat: KindRetry
            {   max_attempts: 3
              , backoff_ms: 10_000
            }
        }
    }
}

/// Durable store configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig
{   /// JSON file backing the store; in-memory when absent
    pub path: Option<PathBuf>
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig
{   pub gemini: GeminiConfig
  , pub retry: RetryConfig
  , pub store: StoreConfig
  , /// Check plan shapes after parsing
    pub validate_schema: bool
}

impl AppConfig
{   /// Build configuration from the process environment
    pub fn from_env() -> Self
    {   Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
      F: Fn(&str) -> Option<String>
    {   let mut config = AppConfig::default();

        config.gemini.api_key = lookup("GEMINI_API_KEY")
          .filter(|k| !k.trim().is_empty());
        if let Some(model) = lookup("GEMINI_MODEL")
        {   config.gemini.model = model;
        }
        if let Some(base) = lookup("GEMINI_API_BASE")
        {   config.gemini.api_base = base;
        }
        config.gemini.timeout_secs = lookup("GEMINI_TIMEOUT_SECS")
          .and_then(|v| v.parse().ok());
        config.store.path = lookup("TRAINER_AI_STORE")
          .map(PathBuf::from);
        config.validate_schema = lookup("TRAINER_AI_VALIDATE_SCHEMA")
          .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
          .unwrap_or(false);

        debug!(
          "Loaded config from environment (model: {}, store: {:?})"
        , config.gemini.model
        , config.store.path
        );
        config
    }

    /// Load configuration from a JSON file
    pub fn from_json_file(path: &Path)
      -> Result<Self, crate::error::Error>
    {   debug!("Loading config from {}", path.display());
        let raw = std::fs::read_to_string(path).map_err(|e| {
          crate::error::Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })?;
        serde_json::from_str(&raw).map_err(|e| {
          crate::error::Error::InvalidConfiguration(
            format!("{}: {}", path.display(), e)
          )
        })
    }
}
