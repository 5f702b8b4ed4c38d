//! Pre-authored exercise explanations served when live
//! generation is unavailable

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Structured explanation of one exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseExplanation
{   pub name: String
  , pub target_muscles: Vec<String>
  , pub instructions: Vec<String>
  , pub common_mistakes: Vec<String>
  , pub difficulty: String
}

struct CatalogEntry
{   key: &'static str
  , name: &'static str
  , target_muscles: &'static [&'static str]
  , instructions: &'static [&'static str]
  , common_mistakes: &'static [&'static str]
  , difficulty: &'static str
}

const ENTRIES: &[CatalogEntry] = &[
  CatalogEntry
  {   key: "squat"
    , name: "Squat"
    , target_muscles: &["Quads", "Glutes", "Hamstrings"]
    , instructions: &[
        "Stand feet shoulder-width."
      , "Lower hips like sitting in a chair."
      , "Keep chest up."
      , "Drive back up."
      ]
    , common_mistakes: &[
        "Knees caving in"
      , "Heels lifting"
      , "Not deep enough"
      ]
    , difficulty: "Intermediate"
  }
, CatalogEntry
  {   key: "bench press"
    , name: "Bench Press"
    , target_muscles: &["Chest", "Triceps", "Front Delts"]
    , instructions: &[
        "Lie on bench."
      , "Grip bar wider than shoulders."
      , "Lower to mid-chest."
      , "Press up."
      ]
    , common_mistakes: &[
        "Flaring elbows"
      , "Bouncing off chest"
      , "Arching back"
      ]
    , difficulty: "Intermediate"
  }
, CatalogEntry
  {   key: "deadlift"
    , name: "Deadlift"
    , target_muscles: &["Hamstrings", "Glutes", "Lower Back", "Traps"]
    , instructions: &[
        "Stand with mid-foot under the bar."
      , "Hinge and grip the bar just outside the legs."
      , "Brace, flatten the back, push the floor away."
      , "Lock out hips and knees together."
      ]
    , common_mistakes: &[
        "Rounding the lower back"
      , "Bar drifting away from the legs"
      , "Jerking the bar off the floor"
      ]
    , difficulty: "Advanced"
  }
, CatalogEntry
  {   key: "push up"
    , name: "Push Up"
    , target_muscles: &["Chest", "Triceps", "Core"]
    , instructions: &[
        "Hands slightly wider than shoulders."
      , "Body in a straight line."
      , "Lower chest to just above the floor."
      , "Press back up."
      ]
    , common_mistakes: &[
        "Sagging hips"
      , "Flaring elbows"
      , "Partial range of motion"
      ]
    , difficulty: "Beginner"
  }
, CatalogEntry
  {   key: "plank"
    , name: "Plank"
    , target_muscles: &["Core", "Shoulders"]
    , instructions: &[
        "Forearms under shoulders."
      , "Squeeze glutes and brace abs."
      , "Hold a straight line from head to heels."
      ]
    , common_mistakes: &[
        "Hips too high"
      , "Lower back sagging"
      , "Holding breath"
      ]
    , difficulty: "Beginner"
  }
];

fn owned(items: &[&str]) -> Vec<String>
{   items.iter().map(|s| s.to_string()).collect()
}

impl CatalogEntry
{   fn explanation(&self) -> ExerciseExplanation
    {   ExerciseExplanation
        {   name: self.name.to_string()
          , target_muscles: owned(self.target_muscles)
          , instructions: owned(self.instructions)
          , common_mistakes: owned(self.common_mistakes)
          , difficulty: self.difficulty.to_string()
        }
    }
}

/// Static, read-only catalog keyed by normalized exercise name
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackCatalog;

impl FallbackCatalog
{   pub fn new() -> Self
    {   FallbackCatalog
    }

    /// Explanation for a normalized name
    pub fn explanation(&self, normalized: &str)
      -> Option<ExerciseExplanation>
    {   ENTRIES.iter()
          .find(|e| e.key == normalized)
          .map(CatalogEntry::explanation)
    }

    /// Structured payload for a normalized name
    pub fn lookup(&self, normalized: &str) -> Option<Value>
    {   self.explanation(normalized)
          .and_then(|e| serde_json::to_value(e).ok())
    }

    pub fn keys(&self) -> impl Iterator<Item = &'static str>
    {   ENTRIES.iter().map(|e| e.key)
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use crate::request::normalize_exercise_name;

    #[test]
    fn keys_are_normalized_and_unique()
    {   let catalog = FallbackCatalog::new();
        let keys: Vec<&str> = catalog.keys().collect();
        for key in &keys
        {   assert_eq!(normalize_exercise_name(key), *key);
        }
        let mut deduped = keys.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), keys.len());
    }

    #[test]
    fn squat_payload_uses_wire_names()
    {   let value = FallbackCatalog::new().lookup("squat").unwrap();
        assert_eq!(value["name"], "Squat");
        assert_eq!(value["targetMuscles"][0], "Quads");
        assert_eq!(value["commonMistakes"].as_array().unwrap().len(), 3);
        assert_eq!(value["difficulty"], "Intermediate");
    }

    #[test]
    fn lookup_is_exact_on_normalized_key()
    {   let catalog = FallbackCatalog::new();
        assert!(catalog.lookup("bench press").is_some());
        assert!(catalog.lookup("Bench Press").is_none());
        assert!(catalog.lookup("zercher squat").is_none());
    }
}
