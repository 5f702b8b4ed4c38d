//! Caller-facing coaching operations

use std::sync::Arc;
use log::{debug, info};

use crate::config::AppConfig;
use crate::error::Error;
use crate::pipeline::GenerationPipeline;
use crate::profile::{Profile, UserAccount};
use crate::providers::TextGenerator;
use crate::request::{ChatContext, GenerationRequest, GenerationResult};
use crate::store::{get_record, Collection, DocumentStore, PlanRecord, ProfileStore};

const PROFILE_REQUIRED: &str = "Please complete your profile first";

/// Workout, meal, explanation and chat operations for
/// authenticated users
pub struct Coach
{   profiles: Arc<dyn ProfileStore>
  , pipeline: GenerationPipeline
}

impl Coach
{   pub fn new(
      generator: Arc<dyn TextGenerator>
    , store: Arc<dyn DocumentStore>
    , profiles: Arc<dyn ProfileStore>
    , config: &AppConfig
    ) -> Self
    {   debug!(
          "Assembling coach (schema validation: {})"
        , config.validate_schema
        );
        let pipeline = GenerationPipeline::new(
            generator
          , store
          , config.retry.clone()
          )
          .with_schema_validation(config.validate_schema);
        Coach
        {   profiles
          , pipeline
        }
    }

    /// Generate and save a 7-day workout plan
    pub async fn generate_workout_plan(&self, user_id: &str)
      -> Result<GenerationResult, Error>
    {   info!("Generating workout plan for {}", user_id);
        let profile = self.require_profile(user_id).await?;
        let request = GenerationRequest::workout_plan(&profile);
        self.pipeline.run(&request).await
    }

    /// Generate and save a 7-day meal plan honouring health tags
    pub async fn generate_meal_plan(
      &self
    , user_id: &str
    , health_tags: &[String]
    ) -> Result<GenerationResult, Error>
    {   info!(
          "Generating meal plan for {} ({} health tags)"
        , user_id
        , health_tags.len()
        );
        let profile = self.require_profile(user_id).await?;
        let request = GenerationRequest::meal_plan(&profile, health_tags);
        self.pipeline.run(&request).await
    }

    /// Explain an exercise, from cache when possible
    pub async fn explain_exercise(&self, name: &str)
      -> Result<GenerationResult, Error>
    {   info!("Explaining exercise '{}'", name.trim());
        let request = GenerationRequest::exercise_explanation(name);
        self.pipeline.run(&request).await
    }

    /// Short prose answer grounded in the user's context
    pub async fn chat(&self, user_id: &str, message: &str)
      -> Result<GenerationResult, Error>
    {   debug!("Chat from {}", user_id);
        let account = self.profiles.find_account(user_id).await?
          .ok_or_else(|| Error::Validation(
            format!("Unknown user: {}", user_id)
          ))?;
        let profile = self.profiles.find_profile(user_id).await?;
        let has_active_plan = self.find_plan(
            Collection::WorkoutPlans
          , user_id
          ).await?
          .is_some();

        let context = chat_context(&account, profile.as_ref(), has_active_plan);
        let request = GenerationRequest::chat(&context, message);
        self.pipeline.run(&request).await
    }

    /// Last saved workout plan
    pub async fn get_workout_plan(&self, user_id: &str)
      -> Result<PlanRecord, Error>
    {   self.find_plan(Collection::WorkoutPlans, user_id).await?
          .ok_or_else(|| Error::NotFound("No workout found".to_string()))
    }

    /// Last saved meal plan
    pub async fn get_meal_plan(&self, user_id: &str)
      -> Result<PlanRecord, Error>
    {   self.find_plan(Collection::MealPlans, user_id).await?
          .ok_or_else(|| Error::NotFound("No meal plan found".to_string()))
    }

    async fn require_profile(&self, user_id: &str)
      -> Result<Profile, Error>
    {   self.profiles.find_profile(user_id).await?
          .ok_or_else(|| {
            info!("No profile for {}", user_id);
            Error::Validation(PROFILE_REQUIRED.to_string())
          })
    }

    async fn find_plan(&self, collection: Collection, user_id: &str)
      -> Result<Option<PlanRecord>, Error>
    {   Ok(get_record(
            self.pipeline.store().as_ref()
          , collection
          , user_id
          ).await?)
    }
}

fn chat_context(
  account: &UserAccount
, profile: Option<&Profile>
, has_active_plan: bool
) -> ChatContext
{   ChatContext
    {   name: account.name.clone()
      , goal: profile.map(|p| p.goal)
      , injuries: profile
          .map(|p| p.injuries.clone())
          .unwrap_or_default()
      , has_active_plan
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::profile::*;

    #[test]
    fn chat_context_without_profile_uses_defaults()
    {   let account = UserAccount::new("u1", "Asha");
        let context = chat_context(&account, None, false);
        assert_eq!(context.name, "Asha");
        assert!(context.goal.is_none());
        assert!(context.injuries.is_empty());
    }

    #[test]
    fn chat_context_takes_goal_and_injuries()
    {   let account = UserAccount::new("u1", "Asha");
        let profile = Profile
        {   user: "u1".into()
          , age: 40
          , gender: Gender::Female
          , height: 160.0
          , weight: 58.0
          , body_type: BodyType::Ectomorph
          , goal: Goal::Recomposition
          , activity_level: ActivityLevel::LightlyActive
          , workout_location: WorkoutLocation::Home
          , equipment: vec![]
          , time_per_session: 30
          , dietary_preference: DietaryPreference::Jain
          , allergies: vec![]
          , budget: Some(Budget::Low)
          , injuries: vec!["Left knee".into()]
          , medical_conditions: vec![]
        };
        let context = chat_context(&account, Some(&profile), true);
        assert_eq!(context.goal, Some(Goal::Recomposition));
        assert_eq!(context.injuries, vec!["Left knee"]);
        assert!(context.has_active_plan);
    }
}
