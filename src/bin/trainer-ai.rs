use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use chrono::Utc;
use clap::{Parser, Subcommand};
use log::{debug, error, LevelFilter};
use serde::Serialize;

use trainer_ai::profile::{Profile, UserAccount};
use trainer_ai::providers::{GeminiClient, ScriptedGenerator, TextGenerator};
use trainer_ai::store::{save_account, save_profile};
use trainer_ai::tracking::{Mood, NewWorkoutLog};
use trainer_ai::{
  AppConfig, Coach, DocumentStore, Error, JsonFileStore, MemoryStore,
  ProfileStore, Tracker,
};

#[derive(Parser)]
#[command(name = "trainer-ai", version, about = "AI fitness coach")]
struct Cli
{   /// JSON config file; environment variables are used otherwise
    #[arg(long, global = true)]
    config: Option<PathBuf>
  , /// Never call the generation service
    #[arg(long, global = true)]
    offline: bool
  , /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool
  , #[command(subcommand)]
    command: Command
}

#[derive(Subcommand)]
enum Command
{   /// Explain an exercise
    Explain
    {   name: String
    }
  , /// Generate a workout plan
    Workout
    {   #[arg(long)]
        user: String
    }
  , /// Generate a meal plan
    Meal
    {   #[arg(long)]
        user: String
      , /// Health condition tag, repeatable
        #[arg(long = "condition")]
        conditions: Vec<String>
    }
  , /// Ask the coach a question
    Chat
    {   #[arg(long)]
        user: String
      , message: String
    }
  , /// Show the saved workout (or meal) plan
    Plan
    {   #[arg(long)]
        user: String
      , #[arg(long)]
        meal: bool
    }
  , /// Register an account and its profile from a JSON file
    Profile
    {   #[arg(long)]
        user: String
      , #[arg(long)]
        name: String
      , file: PathBuf
    }
  , /// Log a completed workout
    Log
    {   #[arg(long)]
        user: String
      , #[arg(long)]
        minutes: u32
      , #[arg(long)]
        day: Option<String>
      , #[arg(long, value_parser = parse_mood)]
        mood: Option<Mood>
      , #[arg(long)]
        calories: Option<u32>
    }
  , /// Streak, level and weekly chart
    Stats
    {   #[arg(long)]
        user: String
    }
  , /// Top users by workouts logged
    Leaderboard
  , /// Models available to the configured API key
    Models
}

fn parse_mood(s: &str) -> Result<Mood, String>
{   serde_json::from_value(serde_json::Value::String(s.to_string()))
      .map_err(|_| format!("unknown mood '{}' (Great, Good, Hard, Tired)", s))
}

/// Concrete store, viewed through both store seams
enum Backend
{   Memory(Arc<MemoryStore>)
  , File(Arc<JsonFileStore>)
}

impl Backend
{   async fn open(config: &AppConfig) -> Result<Self, Error>
    {   match &config.store.path
        {   Some(path) => Ok(Backend::File(Arc::new(
              JsonFileStore::open(path).await?
            )))
          , None => Ok(Backend::Memory(Arc::new(MemoryStore::new())))
        }
    }

    fn documents(&self) -> Arc<dyn DocumentStore>
    {   match self
        {   Backend::Memory(s) => s.clone()
          , Backend::File(s) => s.clone()
        }
    }

    fn profiles(&self) -> Arc<dyn ProfileStore>
    {   match self
        {   Backend::Memory(s) => s.clone()
          , Backend::File(s) => s.clone()
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Error>
{   let text = serde_json::to_string_pretty(value)
      .map_err(|e| Error::Storage(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

async fn run(cli: Cli) -> Result<(), Error>
{   let config = match &cli.config
    {   Some(path) => AppConfig::from_json_file(path)?
      , None => AppConfig::from_env()
    };
    let backend = Backend::open(&config).await?;

    let gemini = if cli.offline
    {   None
    } else
    {   Some(Arc::new(GeminiClient::new(config.gemini.clone())?))
    };
    let generator: Arc<dyn TextGenerator> = match &gemini
    {   Some(client) => client.clone()
      , None => {
          debug!("Offline: generation always fails hard");
          Arc::new(ScriptedGenerator::new())
        }
    };

    let coach = Coach::new(
      generator
    , backend.documents()
    , backend.profiles()
    , &config
    );
    let tracker = Tracker::new(backend.documents());

    match cli.command
    {   Command::Explain { name } => {
          print_json(&coach.explain_exercise(&name).await?)
        }
      , Command::Workout { user } => {
          print_json(&coach.generate_workout_plan(&user).await?)
        }
      , Command::Meal { user, conditions } => {
          print_json(&coach.generate_meal_plan(&user, &conditions).await?)
        }
      , Command::Chat { user, message } => {
          let reply = coach.chat(&user, &message).await?;
          println!("{}", reply.as_text().unwrap_or_default());
          Ok(())
        }
      , Command::Plan { user, meal } => {
          let plan = if meal
          {   coach.get_meal_plan(&user).await?
          } else
          {   coach.get_workout_plan(&user).await?
          };
          print_json(&plan)
        }
      , Command::Profile { user, name, file } => {
          let raw = std::fs::read_to_string(&file)
            .map_err(|e| Error::Validation(
              format!("{}: {}", file.display(), e)
            ))?;
          let mut profile: Profile = serde_json::from_str(&raw)
            .map_err(|e| Error::Validation(
              format!("{}: {}", file.display(), e)
            ))?;
          profile.user = user.clone();
          let store = backend.documents();
          save_account(store.as_ref(), &UserAccount::new(user, name))
            .await?;
          save_profile(store.as_ref(), &profile).await?;
          print_json(&profile)
        }
      , Command::Log { user, minutes, day, mood, calories } => {
          let entry = NewWorkoutLog
          {   workout_day: day
            , duration: minutes
            , calories
            , mood
            , notes: None
          };
          print_json(&tracker.log_workout(&user, entry, Utc::now()).await?)
        }
      , Command::Stats { user } => {
          print_json(&tracker.stats(&user, Utc::now()).await?)
        }
      , Command::Leaderboard => {
          print_json(&tracker.leaderboard().await?)
        }
      , Command::Models => {
          let client = gemini.ok_or_else(|| Error::InvalidConfiguration(
            "model listing needs the live service".to_string()
          ))?;
          let models = client.list_models().await
            .map_err(|e| Error::ServiceUnavailable(e.to_string()))?;
          for model in models
          {   println!("{}", model);
          }
          Ok(())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode
{   let cli = Cli::parse();
    trainer_ai::logging::init(
      if cli.verbose { LevelFilter::Debug } else { LevelFilter::Warn }
    );

    match run(cli).await
    {   Ok(()) => ExitCode::SUCCESS
      , Err(e) if e.is_retryable_by_user() => {
          error!("{}", e);
          eprintln!("The coach is busy right now. Please try again in a minute.");
          ExitCode::from(2)
        }
      , Err(e) => {
          eprintln!("{}", e);
          ExitCode::FAILURE
        }
    }
}
