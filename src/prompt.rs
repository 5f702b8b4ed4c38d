//! Prompt synthesis: renders a request's variables into one
//! instruction string per request kind. Pure; no I/O.

use log::trace;

use crate::error::Error;
use crate::request::{GenerationRequest, RequestKind, TemplateValue};

pub const JSON_ONLY_INSTRUCTION: &str
  = "Return ONLY valid JSON. No markdown, no text before or after the JSON object.";

pub const DIABETES_GUIDANCE: &str
  = "Diabetes: focus on low glycemic index (GI) foods. Zero refined sugars. High fiber. Balance carbs with protein and fat.";
pub const PCOS_GUIDANCE: &str
  = "PCOD/PCOS: anti-inflammatory focus. Limit dairy and gluten where possible. Prefer whole foods.";
pub const HYPERTENSION_GUIDANCE: &str
  = "Hypertension (high BP): follow DASH diet principles. Low sodium.";
pub const HYPOTHYROIDISM_GUIDANCE: &str
  = "Hypothyroidism: high selenium and zinc (brazil nuts, eggs). Avoid raw goitrogenic vegetables (kale, broccoli) unless cooked.";

const WORKOUT_SHAPE: &str = r#"{ "schedule": [ { "day": "Monday", "focus": "Push", "exercises": [ { "name": "Bench Press", "sets": "3", "reps": "8-12", "notes": "Focus on form" } ] } ] }"#;
const MEAL_SHAPE: &str = r#"{ "macros": { "calories": 2000, "protein": "150g", "carbs": "180g", "fats": "70g" }, "schedule": [ { "day": "Monday", "meals": { "breakfast": "...", "lunch": "...", "snack": "...", "dinner": "..." } } ] }"#;

/// Clinical fragment for a free-form health tag, if recognised
pub fn clinical_guidance(tag: &str) -> Option<&'static str>
{   let tag = tag.to_lowercase();
    if tag.contains("diabetes")
    {   Some(DIABETES_GUIDANCE)
    } else if tag.contains("pcod") || tag.contains("pcos")
    {   Some(PCOS_GUIDANCE)
    } else if tag.contains("hypertension") || tag.contains("high bp")
    {   Some(HYPERTENSION_GUIDANCE)
    } else if tag.contains("thyroid") && !tag.contains("hyperthyroid")
    {   Some(HYPOTHYROIDISM_GUIDANCE)
    } else
    {   None
    }
}

/// Render the instruction string for a request
pub fn synthesize(request: &GenerationRequest)
  -> Result<String, Error>
{   let prompt = match request.kind()
    {   RequestKind::WorkoutPlan => workout_prompt(request)?
      , RequestKind::MealPlan => meal_prompt(request)?
      , RequestKind::ExerciseExplanation => explanation_prompt(request)?
      , RequestKind::FreeFormChat => chat_prompt(request)?
    };
    trace!("Synthesized {} prompt: {}", request.kind(), prompt);
    Ok(prompt)
}

fn workout_prompt(request: &GenerationRequest)
  -> Result<String, Error>
{   let age = required_number(request, "age")?;
    let weight = required_number(request, "weight")?;
    let goal = required_text(request, "goal")?;
    let equipment = required_text(request, "equipment")?;
    let experience = required_text(request, "experience")?;
    let gender = request.text("gender").unwrap_or("Unspecified");
    let injuries = joined_or_none(request.list("injuries"));

    Ok(format!(
"Act as an elite personal trainer. Create a 7-day workout plan for:
- Age: {age}, Gender: {gender}
- Weight: {weight}kg, Goal: {goal}
- Equipment: {equipment}, Experience: {experience}
- Injuries: {injuries}

Requirements:
- {JSON_ONLY_INSTRUCTION}
- Structure: {WORKOUT_SHAPE}"
    , age = number_text(age)
    , weight = number_text(weight)
    ))
}

fn meal_prompt(request: &GenerationRequest)
  -> Result<String, Error>
{   let weight = required_number(request, "weight")?;
    let goal = required_text(request, "goal")?;
    let diet = required_text(request, "diet")?;
    let conditions = request.list("health_conditions");
    let allergies = joined_or_none(request.list("allergies"));

    let mut guidance: Vec<&str> = Vec::new();
    for tag in conditions
    {   if let Some(fragment) = clinical_guidance(tag)
        {   if !guidance.contains(&fragment)
            {   guidance.push(fragment);
            }
        }
    }

    let mut prompt = format!(
"Act as an expert clinical nutritionist. Create a 7-day meal plan for:
- Weight: {weight}kg, Goal: {goal}
- DIETARY PREFERENCE: {diet}
- HEALTH CONDITIONS: {conditions}
- Allergies: {allergies}
"
    , weight = number_text(weight)
    , conditions = joined_or_none(conditions)
    );

    if !guidance.is_empty()
    {   prompt.push_str("\nCRITICAL MEDICAL GUIDELINES (MUST FOLLOW):\n");
        for (i, fragment) in guidance.iter().enumerate()
        {   prompt.push_str(&format!("{}. {}\n", i + 1, fragment));
        }
    }

    prompt.push_str(&format!(
"
OUTPUT FORMAT:
- {JSON_ONLY_INSTRUCTION}
- Structure: {MEAL_SHAPE}"
    ));
    Ok(prompt)
}

fn explanation_prompt(request: &GenerationRequest)
  -> Result<String, Error>
{   let name = required_text(request, "exercise")?;
    let name = crate::request::normalize_exercise_name(&name);
    if name.is_empty()
    {   return Err(Error::Validation(
          "Please provide an exercise name".to_string()
        ));
    }

    Ok(format!(
r#"Act as an expert biomechanics coach. Explain the exercise "{name}" briefly.
{JSON_ONLY_INSTRUCTION}
Use this format:
{{
  "name": "{name}",
  "targetMuscles": ["Muscle A", "Muscle B"],
  "instructions": ["Step 1...", "Step 2...", "Step 3..."],
  "commonMistakes": ["Mistake 1", "Mistake 2"],
  "difficulty": "Intermediate"
}}"#
    ))
}

fn chat_prompt(request: &GenerationRequest)
  -> Result<String, Error>
{   let message = required_text(request, "message")?;
    let name = required_text(request, "name")?;
    let goal = request.text("goal")
      .filter(|g| !g.trim().is_empty())
      .unwrap_or("General Fitness");
    let injuries = joined_or_none(request.list("injuries"));

    let mut prompt = format!(
"You are an elite personal trainer AI named \"TrainerAI\".
USER CONTEXT:
- Name: {name}
- Goal: {goal}
- Injuries: {injuries}
"
    );
    if request.get("active_plan").is_some()
    {   prompt.push_str("- Current plan available.\n");
    }
    prompt.push_str(&format!(
"USER QUESTION: \"{message}\"
Keep the answer concise (under 80 words)."
    ));
    Ok(prompt)
}

fn required_number(request: &GenerationRequest, name: &str)
  -> Result<f64, Error>
{   request.number(name)
      .filter(|n| n.is_finite())
      .ok_or_else(|| Error::Validation(format!(
        "{} requires numeric '{}'", request.kind(), name
      )))
}

/// Non-blank text; a non-empty list is joined
fn required_text<'a>(request: &'a GenerationRequest, name: &str)
  -> Result<std::borrow::Cow<'a, str>, Error>
{   let missing = || Error::Validation(format!(
      "{} requires non-empty '{}'", request.kind(), name
    ));
    match request.get(name)
    {   Some(TemplateValue::Text(s)) if !s.trim().is_empty() => {
          Ok(std::borrow::Cow::Borrowed(s.as_str()))
        }
      , Some(TemplateValue::List(items)) if !items.is_empty() => {
          Ok(std::borrow::Cow::Owned(items.join(", ")))
        }
      , _ => Err(missing())
    }
}

fn joined_or_none(items: &[String]) -> String
{   if items.is_empty()
    {   "None".to_string()
    } else
    {   items.join(", ")
    }
}

/// 82.0 renders as "82", 82.5 as "82.5"
fn number_text(n: f64) -> String
{   if n.fract() == 0.0
    {   format!("{}", n as i64)
    } else
    {   format!("{}", n)
    }
}
