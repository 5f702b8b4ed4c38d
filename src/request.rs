//! Generation request and result types

use std::collections::BTreeMap;
use std::fmt;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::profile::{Goal, Profile, UserId};

/// What the caller wants generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RequestKind
{   WorkoutPlan
  , MealPlan
  , ExerciseExplanation
  , FreeFormChat
}

impl RequestKind
{   /// Kinds whose response must decode to a JSON object
    pub fn is_structured(&self) -> bool
    {   !matches!(self, RequestKind::FreeFormChat)
    }

    pub fn as_str(&self) -> &'static str
    {   match self
        {   RequestKind::WorkoutPlan => "workout-plan"
          , RequestKind::MealPlan => "meal-plan"
          , RequestKind::ExerciseExplanation => "exercise-explanation"
          , RequestKind::FreeFormChat => "free-form-chat"
        }
    }
}

impl fmt::Display for RequestKind
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

/// A named template variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateValue
{   Number(f64)
  , Text(String)
  , List(Vec<String>)
}

impl From<&str> for TemplateValue
{   fn from(s: &str) -> Self
    {   TemplateValue::Text(s.to_string())
    }
}

impl From<String> for TemplateValue
{   fn from(s: String) -> Self
    {   TemplateValue::Text(s)
    }
}

impl From<f64> for TemplateValue
{   fn from(n: f64) -> Self
    {   TemplateValue::Number(n)
    }
}

impl From<u32> for TemplateValue
{   fn from(n: u32) -> Self
    {   TemplateValue::Number(f64::from(n))
    }
}

impl From<Vec<String>> for TemplateValue
{   fn from(items: Vec<String>) -> Self
    {   TemplateValue::List(items)
    }
}

/// Lower-cased, trimmed exercise identifier used as cache
/// and fallback key
pub fn normalize_exercise_name(name: &str) -> String
{   name.trim().to_lowercase()
}

/// User context summarised into a chat prompt
#[derive(Debug, Clone, PartialEq)]
pub struct ChatContext
{   pub name: String
  , pub goal: Option<Goal>
  , pub injuries: Vec<String>
  , pub has_active_plan: bool
}

/// The caller's intent for one pipeline run. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest
{   kind: RequestKind
  , variables: BTreeMap<String, TemplateValue>
  , owner: Option<UserId>
}

impl GenerationRequest
{   pub fn new(kind: RequestKind) -> Self
    {   GenerationRequest
        {   kind
          , variables: BTreeMap::new()
          , owner: None
        }
    }

    /// Set a template variable
    pub fn with(
      mut self
    , name: &str
    , value: impl Into<TemplateValue>
    ) -> Self
    {   self.variables.insert(name.to_string(), value.into());
        self
    }

    /// Identity the generated plan is persisted under
    pub fn for_owner(mut self, owner: impl Into<String>) -> Self
    {   self.owner = Some(owner.into());
        self
    }

    /// Workout plan request rendered from a stored profile
    pub fn workout_plan(profile: &Profile) -> Self
    {   let equipment = if profile.equipment.is_empty()
        {   vec!["Bodyweight".to_string()]
        } else
        {   profile.equipment.clone()
        };
        GenerationRequest::new(RequestKind::WorkoutPlan)
          .for_owner(profile.user.clone())
          .with("age", profile.age)
          .with("gender", profile.gender.to_string())
          .with("weight", profile.weight)
          .with("goal", profile.goal.to_string())
          .with("equipment", equipment)
          .with("experience", profile.activity_level.to_string())
          .with("injuries", profile.injuries.clone())
    }

    /// Meal plan request; health tags are free strings
    pub fn meal_plan(
      profile: &Profile
    , health_conditions: &[String]
    ) -> Self
    {   GenerationRequest::new(RequestKind::MealPlan)
          .for_owner(profile.user.clone())
          .with("weight", profile.weight)
          .with("goal", profile.goal.to_string())
          .with("diet", profile.dietary_preference.to_string())
          .with("health_conditions", health_conditions.to_vec())
          .with("allergies", profile.allergies.clone())
    }

    pub fn exercise_explanation(name: &str) -> Self
    {   let normalized = normalize_exercise_name(name);
        GenerationRequest::new(RequestKind::ExerciseExplanation)
          .with("exercise", normalized)
    }

    pub fn chat(context: &ChatContext, message: &str) -> Self
    {   let mut request = GenerationRequest::new(
            RequestKind::FreeFormChat
          )
          .with("message", message)
          .with("name", context.name.clone())
          .with("injuries", context.injuries.clone());
        if let Some(goal) = context.goal
        {   request = request.with("goal", goal.to_string());
        }
        if context.has_active_plan
        {   request = request.with("active_plan", "yes");
        }
        request
    }

    pub fn kind(&self) -> RequestKind
    {   self.kind
    }

    /// Normalized exercise name for explanations, however the
    /// request was built; `None` for other kinds or a blank name
    pub fn cache_key(&self) -> Option<String>
    {   if self.kind != RequestKind::ExerciseExplanation
        {   return None;
        }
        self.text("exercise")
          .map(normalize_exercise_name)
          .filter(|key| !key.is_empty())
    }

    pub fn owner(&self) -> Option<&str>
    {   self.owner.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&TemplateValue>
    {   self.variables.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str>
    {   match self.variables.get(name)
        {   Some(TemplateValue::Text(s)) => Some(s.as_str())
          , _ => None
        }
    }

    pub fn number(&self, name: &str) -> Option<f64>
    {   match self.variables.get(name)
        {   Some(TemplateValue::Number(n)) => Some(*n)
          , _ => None
        }
    }

    /// List variable; absent means empty
    pub fn list(&self, name: &str) -> &[String]
    {   match self.variables.get(name)
        {   Some(TemplateValue::List(items)) => items.as_slice()
          , _ => &[]
        }
    }
}

/// Pipeline output, owned by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "body", rename_all = "lowercase")]
pub enum GenerationResult
{   Structured(Value)
  , Text(String)
}

impl GenerationResult
{   pub fn as_structured(&self) -> Option<&Value>
    {   match self
        {   GenerationResult::Structured(v) => Some(v)
          , GenerationResult::Text(_) => None
        }
    }

    pub fn as_text(&self) -> Option<&str>
    {   match self
        {   GenerationResult::Text(t) => Some(t.as_str())
          , GenerationResult::Structured(_) => None
        }
    }
}
