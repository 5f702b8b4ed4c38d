//! User account and biometric profile records

use std::fmt;
use serde::{Deserialize, Serialize};

/// Opaque authenticated user identifier
pub type UserId = String;

/// Account record supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount
{   pub id: UserId
  , pub name: String
  , #[serde(default)]
    pub total_workouts: u32
  , #[serde(default)]
    pub streak: u32
}

impl UserAccount
{   pub fn new(id: impl Into<String>, name: impl Into<String>)
      -> Self
    {   UserAccount
        {   id: id.into()
          , name: name.into()
          , total_workouts: 0
          , streak: 0
        }
    }
}

/// Writes the serde name of a unit variant
macro_rules! display_as_serde
{   ($($ty:ty),*) => {
      $(impl fmt::Display for $ty
        {   fn fmt(&self, f: &mut fmt::Formatter<'_>)
              -> fmt::Result
            {   let value = serde_json::to_value(self)
                  .map_err(|_| fmt::Error)?;
                match value.as_str()
                {   Some(s) => f.write_str(s)
                  , None => Err(fmt::Error)
                }
            }
        })*
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender
{   Male
  , Female
  , Other
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyType
{   Ectomorph
  , #[default]
    Mesomorph
  , Endomorph
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal
{   #[serde(rename = "Fat Loss")]
    FatLoss
  , #[serde(rename = "Muscle Gain")]
    MuscleGain
  , Recomposition
  , Strength
  , #[serde(rename = "General Fitness")]
    GeneralFitness
  , Maintenance
}

/// Activity level, doubling as training experience
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityLevel
{   Sedentary
  , #[serde(rename = "Lightly Active")]
    LightlyActive
  , #[serde(rename = "Moderately Active")]
    ModeratelyActive
  , #[serde(rename = "Very Active")]
    VeryActive
  , Beginner
  , Intermediate
  , Advanced
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkoutLocation
{   #[default]
    Gym
  , Home
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DietaryPreference
{   Vegetarian
  , #[serde(rename = "Non-Vegetarian")]
    NonVegetarian
  , Vegan
  , Eggetarian
  , Jain
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Budget
{   Low
  , Medium
  , High
}

display_as_serde!(
  Gender, BodyType, Goal, ActivityLevel,
  WorkoutLocation, DietaryPreference, Budget
);

fn default_session_minutes() -> u32
{   45
}

/// Biometric and lifestyle profile, keyed by user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile
{   pub user: UserId
  , pub age: u32
  , pub gender: Gender
  , /// Centimetres
    pub height: f64
  , /// Kilograms
    pub weight: f64
  , #[serde(default)]
    pub body_type: BodyType
  , pub goal: Goal
  , pub activity_level: ActivityLevel
  , #[serde(default)]
    pub workout_location: WorkoutLocation
  , #[serde(default)]
    pub equipment: Vec<String>
  , /// Minutes
    #[serde(default = "default_session_minutes")]
    pub time_per_session: u32
  , pub dietary_preference: DietaryPreference
  , #[serde(default)]
    pub allergies: Vec<String>
  , #[serde(default)]
    pub budget: Option<Budget>
  , #[serde(default)]
    pub injuries: Vec<String>
  , #[serde(default)]
    pub medical_conditions: Vec<String>
}
