//! Text-generation service clients

use async_trait::async_trait;

use crate::error::GenerateError;

pub mod gemini;
pub mod scripted;

// Re-export for convenience
pub use gemini::GeminiClient;
pub use scripted::ScriptedGenerator;

/// One-shot text generation. Implementations report throttling as
/// `GenerateError::RateLimited` so callers can tell it apart.
#[async_trait]
pub trait TextGenerator: Send + Sync
{   async fn generate(&self, prompt: &str)
      -> Result<String, GenerateError>;
}
