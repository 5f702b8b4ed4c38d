//! Generation pipeline: cache lookup, throttle-aware call,
//! cleanup, parse, persist, and catalog fallback for explanations.

use std::sync::Arc;
use chrono::Utc;
use log::{debug, info, warn, error};
use serde_json::Value;

use crate::catalog::FallbackCatalog;
use crate::cleanup::clean_response;
use crate::config::RetryConfig;
use crate::error::Error;
use crate::prompt::synthesize;
use crate::providers::TextGenerator;
use crate::request::{GenerationRequest, GenerationResult, RequestKind};
use crate::retry::{generate_with_retry, RetryPolicy};
use crate::schema;
use crate::store::{
  get_record, put_record, CacheEntry, Collection, DocumentStore, PlanRecord,
};

/// Executes one generation request end to end.
/// Holds no per-request state; safe to share between tasks.
pub struct GenerationPipeline
{   generator: Arc<dyn TextGenerator>
  , store: Arc<dyn DocumentStore>
  , catalog: FallbackCatalog
  , retry: RetryConfig
  , validate_schema: bool
}

impl GenerationPipeline
{   pub fn new(
      generator: Arc<dyn TextGenerator>
    , store: Arc<dyn DocumentStore>
    , retry: RetryConfig
    ) -> Self
    {   GenerationPipeline
        {   generator
          , store
          , catalog: FallbackCatalog::new()
          , retry
          , validate_schema: false
        }
    }

    /// Check plan shapes after parsing
    pub fn with_schema_validation(mut self, enabled: bool) -> Self
    {   self.validate_schema = enabled;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore>
    {   &self.store
    }

    /// Run one request
    pub async fn run(&self, request: &GenerationRequest)
      -> Result<GenerationResult, Error>
    {   let kind = request.kind();
        let prompt = synthesize(request)?;

        if kind == RequestKind::ExerciseExplanation
        {   let key = explanation_key(request)?;
            if let Some(entry) = self.cached(&key).await
            {   info!("Exercise cache hit for '{}'", key);
                return Ok(GenerationResult::Structured(entry.data));
            }
            debug!("Exercise cache miss for '{}'", key);
        }

        match self.call(kind, &prompt).await
        {   Ok(GenerationResult::Structured(value)) => {
              self.persist(request, &value).await?;
              Ok(GenerationResult::Structured(value))
            }
          , Ok(text) => Ok(text)
          , Err(err) => self.recover(request, err).await
        }
    }

    /// CALL, CLEAN and PARSE states
    async fn call(&self, kind: RequestKind, prompt: &str)
      -> Result<GenerationResult, Error>
    {   let policy = RetryPolicy::for_kind(kind, &self.retry);
        let raw = generate_with_retry(
            self.generator.as_ref()
          , prompt
          , &policy
          )
          .await
          .map_err(|e| Error::ServiceUnavailable(e.to_string()))?;

        let cleaned = clean_response(&raw, kind);
        if !kind.is_structured()
        {   return Ok(GenerationResult::Text(cleaned));
        }

        let value: Value = serde_json::from_str(&cleaned)
          .map_err(|e| {
            error!("{} response is not valid JSON: {}", kind, e);
            debug!("Raw text was: {}", raw);
            Error::MalformedResponse(e.to_string())
          })?;

        if self.validate_schema
        {   schema::validate(kind, &value)?;
        }
        Ok(GenerationResult::Structured(value))
    }

    /// Failure states: only explanations have a local recovery
    async fn recover(&self, request: &GenerationRequest, err: Error)
      -> Result<GenerationResult, Error>
    {   if request.kind() != RequestKind::ExerciseExplanation
        {   return Err(err);
        }
        let key = explanation_key(request)?;
        match self.catalog.lookup(&key)
        {   Some(fallback) => {
              warn!("Serving fallback explanation for '{}' after: {}", key, err);
              if let Err(e) = self.persist(request, &fallback).await
              {   warn!("Fallback for '{}' not cached: {}", key, e);
              }
              Ok(GenerationResult::Structured(fallback))
            }
          , None => {
              warn!("No fallback for '{}': {}", key, err);
              Err(err)
            }
        }
    }

    /// Cache lookup is best effort; a store failure reads as a miss
    async fn cached(&self, key: &str) -> Option<CacheEntry>
    {   match get_record::<CacheEntry>(
            self.store.as_ref()
          , Collection::ExerciseCache
          , key
          ).await
        {   Ok(entry) => entry
          , Err(e) => {
              warn!("Exercise cache read failed for '{}': {}", key, e);
              None
            }
        }
    }

    /// Upsert a structured result under its owner or cache key
    async fn persist(&self, request: &GenerationRequest, value: &Value)
      -> Result<(), Error>
    {   let now = Utc::now();
        match request.kind()
        {   RequestKind::WorkoutPlan | RequestKind::MealPlan => {
              let Some(owner) = request.owner() else {
                debug!("{} has no owner; not persisted", request.kind());
                return Ok(());
              };
              let collection = if request.kind() == RequestKind::WorkoutPlan
              {   Collection::WorkoutPlans
              } else
              {   Collection::MealPlans
              };
              let record = PlanRecord
              {   owner: owner.to_string()
                , plan: value.clone()
                , generated_at: now
              };
              put_record(self.store.as_ref(), collection, owner, &record)
                .await?;
              info!("Saved {} for {}", request.kind(), owner);
            }
          , RequestKind::ExerciseExplanation => {
              let key = explanation_key(request)?;
              let entry = CacheEntry
              {   name: key.clone()
                , data: value.clone()
                , updated_at: now
              };
              put_record(
                self.store.as_ref()
              , Collection::ExerciseCache
              , &key
              , &entry
              ).await?;
              info!("Cached explanation for '{}'", key);
            }
          , RequestKind::FreeFormChat => {}
        }
        Ok(())
    }
}

fn explanation_key(request: &GenerationRequest) -> Result<String, Error>
{   request.cache_key()
      .ok_or_else(|| {
        Error::Validation("Please provide an exercise name".to_string())
      })
}
