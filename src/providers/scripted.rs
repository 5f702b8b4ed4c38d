//! Offline generator that replays a fixed script of outcomes.
//! Used by tests and the CLI's `--offline` mode.

use std::collections::VecDeque;
use std::sync::Mutex;
use async_trait::async_trait;
use log::debug;

use crate::error::GenerateError;
use super::TextGenerator;

#[derive(Debug, Default)]
struct Script
{   outcomes: VecDeque<Result<String, GenerateError>>
  , prompts: Vec<String>
}

/// Replays queued outcomes in order; once empty, every call
/// fails hard with `Disconnected`.
#[derive(Debug, Default)]
pub struct ScriptedGenerator
{   script: Mutex<Script>
}

impl ScriptedGenerator
{   pub fn new() -> Self
    {   ScriptedGenerator::default()
    }

    /// Queue a successful response
    pub fn then_text(self, text: impl Into<String>) -> Self
    {   self.push(Ok(text.into()));
        self
    }

    /// Queue a failure
    pub fn then_error(self, error: GenerateError) -> Self
    {   self.push(Err(error));
        self
    }

    /// Queue `n` rate-limit failures
    pub fn then_throttled(self, n: usize) -> Self
    {   for _ in 0..n
        {   self.push(Err(GenerateError::RateLimited));
        }
        self
    }

    /// The first `n` calls are throttled; later calls disconnect
    pub fn throttled_times(n: usize) -> Self
    {   ScriptedGenerator::new().then_throttled(n)
    }

    pub fn push(&self, outcome: Result<String, GenerateError>)
    {   self.lock().outcomes.push_back(outcome);
    }

    /// Number of generate calls made so far
    pub fn calls(&self) -> usize
    {   self.lock().prompts.len()
    }

    /// Prompts received, in call order
    pub fn prompts(&self) -> Vec<String>
    {   self.lock().prompts.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script>
    {   self.script.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl TextGenerator for ScriptedGenerator
{   async fn generate(&self, prompt: &str)
      -> Result<String, GenerateError>
    {   let mut script = self.lock();
        script.prompts.push(prompt.to_string());
        let outcome = script.outcomes.pop_front()
          .unwrap_or(Err(GenerateError::Disconnected));
        debug!(
          "Scripted call {} -> {}"
        , script.prompts.len()
        , if outcome.is_ok() { "ok" } else { "error" }
        );
        outcome
    }
}

#[cfg(test)]
mod tests
{   use super::*;

    #[test]
    fn replays_in_order_then_disconnects()
    {   let generator = ScriptedGenerator::new()
          .then_throttled(1)
          .then_text("{}");
        tokio_test::block_on(async {
          assert_eq!(
            generator.generate("a").await
          , Err(GenerateError::RateLimited)
          );
          assert_eq!(generator.generate("b").await, Ok("{}".to_string()));
          assert_eq!(
            generator.generate("c").await
          , Err(GenerateError::Disconnected)
          );
        });
        assert_eq!(generator.calls(), 3);
        assert_eq!(generator.prompts(), vec!["a", "b", "c"]);
    }

    #[test]
    fn throttled_times_then_disconnects()
    {   let generator = ScriptedGenerator::throttled_times(2);
        tokio_test::block_on(async {
          for _ in 0..2
          {   assert_eq!(
                generator.generate("p").await
              , Err(GenerateError::RateLimited)
              );
          }
          assert_eq!(
            generator.generate("p").await
          , Err(GenerateError::Disconnected)
          );
        });
    }
}
