use std::sync::Arc;
use std::time::Duration;
use serde_json::json;

use trainer_ai::catalog::FallbackCatalog;
use trainer_ai::config::AppConfig;
use trainer_ai::error::{Error, GenerateError};
use trainer_ai::profile::*;
use trainer_ai::prompt::DIABETES_GUIDANCE;
use trainer_ai::providers::ScriptedGenerator;
use trainer_ai::request::GenerationResult;
use trainer_ai::store::{
  put_record, save_account, save_profile, CacheEntry, Collection,
  DocumentStore, MemoryStore, PlanRecord,
};
use trainer_ai::Coach;

const WORKOUT_JSON: &str = r#"{"schedule": [{"day": "Monday", "focus": "Push", "exercises": [{"name": "Bench Press", "sets": "3", "reps": "8-12", "notes": ""}]}]}"#;
const MEAL_JSON: &str = r#"{"macros": {"calories": 1800}, "schedule": [{"day": "Monday", "meals": {"lunch": "Rajma"}}]}"#;

/// Coach wired to a scripted generator and an in-memory store
struct Harness
{   coach: Coach
  , generator: Arc<ScriptedGenerator>
  , store: Arc<MemoryStore>
}

fn harness(generator: ScriptedGenerator) -> Harness
{   let generator = Arc::new(generator);
    let store = Arc::new(MemoryStore::new());
    let coach = Coach::new(
      generator.clone()
    , store.clone()
    , store.clone()
    , &AppConfig::default()
    );
    Harness
    {   coach
      , generator
      , store
    }
}

fn sample_profile(user: &str) -> Profile
{   Profile
    {   user: user.to_string()
      , age: 34
      , gender: Gender::Female
      , height: 168.0
      , weight: 64.0
      , body_type: BodyType::Mesomorph
      , goal: Goal::FatLoss
      , activity_level: ActivityLevel::Beginner
      , workout_location: WorkoutLocation::Home
      , equipment: vec!["Dumbbells".into()]
      , time_per_session: 40
      , dietary_preference: DietaryPreference::Vegetarian
      , allergies: vec![]
      , budget: Some(Budget::Medium)
      , injuries: vec!["Lower back".into()]
      , medical_conditions: vec![]
    }
}

async fn register(store: &MemoryStore, user: &str, with_profile: bool)
{   save_account(store, &UserAccount::new(user, "Meera")).await.unwrap();
    if with_profile
    {   save_profile(store, &sample_profile(user)).await.unwrap();
    }
}

#[tokio::test]
async fn cached_explanation_makes_no_calls()
{   let h = harness(ScriptedGenerator::new().then_text("{}"));
    let cached = json!({"name": "squat", "instructions": ["Sit back."]});
    put_record(
      h.store.as_ref()
    , Collection::ExerciseCache
    , "squat"
    , &CacheEntry
      {   name: "squat".into()
        , data: cached.clone()
        , updated_at: chrono::Utc::now()
      }
    ).await.unwrap();

    let result = h.coach.explain_exercise("  Squat ").await.unwrap();
    assert_eq!(result, GenerationResult::Structured(cached));
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn throttled_catalog_exercises_fall_back_then_hit_cache()
{   for name in FallbackCatalog::new().keys()
    {   let h = harness(ScriptedGenerator::throttled_times(10));
        let expected = FallbackCatalog::new().lookup(name).unwrap();

        let first = h.coach.explain_exercise(name).await.unwrap();
        assert_eq!(first, GenerationResult::Structured(expected.clone()));
        assert_eq!(h.generator.calls(), 2, "{}", name);

        let second = h.coach.explain_exercise(&name.to_uppercase())
          .await.unwrap();
        assert_eq!(second, GenerationResult::Structured(expected));
        assert_eq!(h.generator.calls(), 2, "{} served from cache", name);
    }
}

#[tokio::test(start_paused = true)]
async fn attempt_budgets_per_kind()
{   let h = harness(ScriptedGenerator::throttled_times(20));
    register(&h.store, "u1", true).await;

    let err = h.coach.explain_exercise("cable crossover").await.unwrap_err();
    assert!(matches!(err, Error::ServiceUnavailable(_)));
    assert_eq!(h.generator.calls(), 2);

    let err = h.coach.generate_workout_plan("u1").await.unwrap_err();
    assert!(matches!(err, Error::ServiceUnavailable(_)));
    assert_eq!(h.generator.calls(), 5);

    let err = h.coach.generate_meal_plan("u1", &[]).await.unwrap_err();
    assert!(matches!(err, Error::ServiceUnavailable(_)));
    assert_eq!(h.generator.calls(), 8);

    let err = h.coach.chat("u1", "What now?").await.unwrap_err();
    assert!(matches!(err, Error::ServiceUnavailable(_)));
    assert_eq!(h.generator.calls(), 11);
}

#[tokio::test]
async fn malformed_workout_is_reported_and_not_saved()
{   let h = harness(
      ScriptedGenerator::new().then_text("Here is your plan: Monday push, Tuesday pull.")
    );
    register(&h.store, "u1", true).await;

    let err = h.coach.generate_workout_plan("u1").await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
    assert!(err.is_retryable_by_user());
    assert_eq!(
      h.store.find(Collection::WorkoutPlans, "u1").await.unwrap()
    , None
    );
}

#[tokio::test]
async fn truncated_json_is_malformed()
{   let h = harness(
      ScriptedGenerator::new().then_text("```json\n{\"schedule\": [ {\"day\": }\n```")
    );
    register(&h.store, "u1", true).await;

    let err = h.coach.generate_meal_plan("u1", &[]).await.unwrap_err();
    assert!(matches!(err, Error::MalformedResponse(_)));
    assert!(h.store.keys(Collection::MealPlans).await.unwrap().is_empty());
}

#[tokio::test]
async fn diabetes_tag_reaches_the_meal_prompt()
{   let h = harness(
      ScriptedGenerator::new()
        .then_text(MEAL_JSON)
        .then_text(MEAL_JSON)
    );
    register(&h.store, "u1", true).await;

    h.coach.generate_meal_plan("u1", &["Diabetes (Type 2)".to_string()])
      .await.unwrap();
    h.coach.generate_meal_plan("u1", &[]).await.unwrap();

    let prompts = h.generator.prompts();
    assert!(prompts[0].contains(DIABETES_GUIDANCE));
    assert!(!prompts[1].contains(DIABETES_GUIDANCE));
}

#[tokio::test]
async fn workout_without_profile_is_a_validation_error()
{   let h = harness(ScriptedGenerator::new().then_text(WORKOUT_JSON));
    register(&h.store, "u1", false).await;

    let err = h.coach.generate_workout_plan("u1").await.unwrap_err();
    assert_eq!(
      err
    , Error::Validation("Please complete your profile first".to_string())
    );
    assert!(!err.is_retryable_by_user());
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn workout_survives_two_throttles()
{   let h = harness(
      ScriptedGenerator::new()
        .then_throttled(2)
        .then_text(format!("```json\n{}\n```", WORKOUT_JSON))
    );
    register(&h.store, "u1", true).await;

    let start = tokio::time::Instant::now();
    let result = h.coach.generate_workout_plan("u1").await.unwrap();
    let waited = start.elapsed();

    assert_eq!(h.generator.calls(), 3);
    assert!(waited >= Duration::from_secs(10), "waited {:?}", waited);
    assert!(waited < Duration::from_secs(11), "waited {:?}", waited);

    let expected: serde_json::Value = serde_json::from_str(WORKOUT_JSON).unwrap();
    assert_eq!(result, GenerationResult::Structured(expected.clone()));

    let saved: PlanRecord = h.coach.get_workout_plan("u1").await.unwrap();
    assert_eq!(saved.owner, "u1");
    assert_eq!(saved.plan, expected);
}

#[tokio::test]
async fn regenerating_overwrites_saved_plan()
{   let h = harness(
      ScriptedGenerator::new()
        .then_text(WORKOUT_JSON)
        .then_text(r#"{"schedule": []}"#)
    );
    register(&h.store, "u1", true).await;

    h.coach.generate_workout_plan("u1").await.unwrap();
    let first = h.coach.get_workout_plan("u1").await.unwrap();
    h.coach.generate_workout_plan("u1").await.unwrap();
    let second = h.coach.get_workout_plan("u1").await.unwrap();

    assert_eq!(second.plan, json!({"schedule": []}));
    assert!(second.generated_at >= first.generated_at);
    assert_eq!(
      h.store.keys(Collection::WorkoutPlans).await.unwrap()
    , vec!["u1"]
    );
}

#[tokio::test]
async fn missing_saved_plans_are_not_found()
{   let h = harness(ScriptedGenerator::new());
    assert!(matches!(
      h.coach.get_workout_plan("u1").await
    , Err(Error::NotFound(_))
    ));
    assert!(matches!(
      h.coach.get_meal_plan("u1").await
    , Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn chat_uses_account_context_and_saves_nothing()
{   let h = harness(
      ScriptedGenerator::new()
        .then_text(WORKOUT_JSON)
        .then_text("Keep your back neutral and go light.")
    );
    register(&h.store, "u1", true).await;
    h.coach.generate_workout_plan("u1").await.unwrap();

    let reply = h.coach.chat("u1", "Can I deadlift?").await.unwrap();
    assert_eq!(reply.as_text(), Some("Keep your back neutral and go light."));

    let prompt = h.generator.prompts().pop().unwrap();
    assert!(prompt.contains("Name: Meera"));
    assert!(prompt.contains("Goal: Fat Loss"));
    assert!(prompt.contains("Injuries: Lower back"));
    assert!(prompt.contains("Current plan available"));
    assert!(prompt.contains("Can I deadlift?"));
}

#[tokio::test]
async fn chat_without_profile_uses_defaults()
{   let h = harness(ScriptedGenerator::new().then_text("Start with walks."));
    register(&h.store, "u2", false).await;

    h.coach.chat("u2", "Where do I start?").await.unwrap();
    let prompt = h.generator.prompts().pop().unwrap();
    assert!(prompt.contains("Goal: General Fitness"));
    assert!(prompt.contains("Injuries: None"));
    assert!(!prompt.contains("Current plan available"));
}

#[tokio::test]
async fn hard_failure_on_unknown_exercise_is_service_unavailable()
{   let h = harness(
      ScriptedGenerator::new().then_error(GenerateError::ApiError
      {   status: 500
        , message: "internal".into()
      })
    );
    let err = h.coach.explain_exercise("landmine press").await.unwrap_err();
    assert!(matches!(err, Error::ServiceUnavailable(_)));
    assert_eq!(h.generator.calls(), 1);
}

#[tokio::test]
async fn blank_exercise_name_is_rejected()
{   let h = harness(ScriptedGenerator::new());
    let err = h.coach.explain_exercise("   ").await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(h.generator.calls(), 0);
}

#[tokio::test]
async fn logged_workouts_feed_stats_and_leaderboard()
{   use chrono::{TimeZone, Utc};
    use trainer_ai::tracking::{Level, NewWorkoutLog};
    use trainer_ai::Tracker;

    let store = Arc::new(MemoryStore::new());
    register(&store, "u1", false).await;
    save_account(store.as_ref(), &UserAccount::new("u2", "Ravi")).await.unwrap();
    let tracker = Tracker::new(store.clone());

    for day in 1..=7
    {   let when = Utc.with_ymd_and_hms(2024, 5, day, 7, 0, 0).unwrap();
        let entry = NewWorkoutLog
        {   workout_day: Some("Legs".into())
          , duration: 40
          , ..NewWorkoutLog::default()
        };
        tracker.log_workout("u1", entry, when).await.unwrap();
    }
    let when = Utc.with_ymd_and_hms(2024, 5, 7, 9, 0, 0).unwrap();
    tracker.log_workout("u2", NewWorkoutLog
    {   duration: 25
      , ..NewWorkoutLog::default()
    }, when).await.unwrap();

    let now = Utc.with_ymd_and_hms(2024, 5, 7, 20, 0, 0).unwrap();
    let stats = tracker.stats("u1", now).await.unwrap();
    assert_eq!(stats.total_workouts, 7);
    assert_eq!(stats.streak, 7);
    assert_eq!(stats.level, Level::Bronze);

    let board = tracker.leaderboard().await.unwrap();
    let order: Vec<&str> = board.iter().map(|e| e.user_id.as_str()).collect();
    assert_eq!(order, vec!["u1", "u2"]);
    assert_eq!(board[0].name, "Meera");
}
