//! Post-parse shape checks per request kind

use serde_json::Value;

use crate::error::Error;
use crate::request::RequestKind;

/// Check that a parsed payload has the shape its kind promises.
/// Chat payloads are never structured and always pass.
pub fn validate(kind: RequestKind, payload: &Value)
  -> Result<(), Error>
{   match kind
    {   RequestKind::WorkoutPlan => {
          schedule(kind, payload, "exercises", Value::is_array)
        }
      , RequestKind::MealPlan => {
          if !payload.get("macros").is_some_and(Value::is_object)
          {   return Err(schema_error(kind, "missing 'macros' object"));
          }
          schedule(kind, payload, "meals", Value::is_object)
        }
      , RequestKind::ExerciseExplanation => {
          if !payload.get("name").is_some_and(Value::is_string)
          {   return Err(schema_error(kind, "missing 'name'"));
          }
          if !payload.get("instructions").is_some_and(Value::is_array)
          {   return Err(schema_error(kind, "missing 'instructions' array"));
          }
          Ok(())
        }
      , RequestKind::FreeFormChat => Ok(())
    }
}

fn schedule(
  kind: RequestKind
, payload: &Value
, field: &str
, field_ok: fn(&Value) -> bool
) -> Result<(), Error>
{   let days = payload.get("schedule")
      .and_then(Value::as_array)
      .filter(|days| !days.is_empty())
      .ok_or_else(|| {
        schema_error(kind, "missing or empty 'schedule' array")
      })?;

    for (i, day) in days.iter().enumerate()
    {   if !day.get("day").is_some_and(Value::is_string)
        {   return Err(schema_error(
              kind
            , &format!("schedule[{}] has no 'day'", i)
            ));
        }
        if !day.get(field).is_some_and(field_ok)
        {   return Err(schema_error(
              kind
            , &format!("schedule[{}] has no valid '{}'", i, field)
            ));
        }
    }
    Ok(())
}

fn schema_error(kind: RequestKind, msg: &str) -> Error
{   Error::Schema(format!("{}: {}", kind, msg))
}
