//! Retry policy for throttled generation calls

use std::time::Duration;
use log::{debug, warn};

use crate::config::{KindRetry, RetryConfig};
use crate::error::GenerateError;
use crate::providers::TextGenerator;
use crate::request::RequestKind;

/// Attempt budget and fixed wait for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy
{   pub max_attempts: usize
  , pub backoff: Duration
}

/// What to do after a failed call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision
{   /// Wait, then call again
    Retry(Duration)
  , /// Surface the error
    GiveUp
}

impl RetryPolicy
{   /// Create a new retry policy; at least one attempt is made
    pub fn new(max_attempts: usize, backoff_ms: u64) -> Self
    {   RetryPolicy
        {   max_attempts: max_attempts.max(1)
          , backoff: Duration::from_millis(backoff_ms)
        }
    }

    /// Policy configured for a request kind
    pub fn for_kind(kind: RequestKind, config: &RetryConfig) -> Self
    {   let KindRetry { max_attempts, backoff_ms } = match kind
        {   RequestKind::WorkoutPlan => config.workout_plan
          , RequestKind::MealPlan => config.meal_plan
          , RequestKind::ExerciseExplanation => {
              config.exercise_explanation
            }
          , RequestKind::FreeFormChat => config.chat
        };
        RetryPolicy::new(max_attempts, backoff_ms)
    }

    /// Decide the next step after `attempt` (1-based) failed
    pub fn decide(&self, attempt: usize, error: &GenerateError)
      -> RetryDecision
    {   if error.is_throttled() && attempt < self.max_attempts
        {   RetryDecision::Retry(self.backoff)
        } else
        {   RetryDecision::GiveUp
        }
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(3, 5_000)
    }
}

/// Call the generator, waiting out throttling per `policy`.
/// Calls are strictly sequential.
pub async fn generate_with_retry(
  generator: &dyn TextGenerator
, prompt: &str
, policy: &RetryPolicy
) -> Result<String, GenerateError>
{   let mut attempt = 1;
    loop
    {   debug!("Generation attempt {}/{}", attempt, policy.max_attempts);
        let error = match generator.generate(prompt).await
        {   Ok(text) => return Ok(text)
          , Err(e) => e
        };
        match policy.decide(attempt, &error)
        {   RetryDecision::Retry(wait) => {
              warn!(
                "Throttled on attempt {}, waiting {:?}"
              , attempt
              , wait
              );
              tokio::time::sleep(wait).await;
              attempt += 1;
            }
          , RetryDecision::GiveUp => {
              warn!(
                "Giving up after attempt {}: {}"
              , attempt
              , error
              );
              return Err(error);
            }
        }
    }
}
