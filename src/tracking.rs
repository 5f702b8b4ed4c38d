//! Workout logging, streaks, levels and the leaderboard

use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::profile::UserAccount;
use crate::store::{get_record, put_record, Collection, DocumentStore};

pub const LEADERBOARD_SIZE: usize = 10;
const CHART_DAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood
{   Great
  , #[default]
    Good
  , Hard
  , Tired
}

/// A completed workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkoutLog
{   pub workout_day: String
  , /// Minutes
    pub duration: u32
  , pub calories: Option<u32>
  , pub mood: Mood
  , pub notes: Option<String>
  , pub date: DateTime<Utc>
}

/// Caller input for `Tracker::log_workout`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWorkoutLog
{   pub workout_day: Option<String>
  , pub duration: u32
  , pub calories: Option<u32>
  , pub mood: Option<Mood>
  , pub notes: Option<String>
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level
{   Rookie
  , Bronze
  , Silver
  , Gold
  , Elite
}

impl Level
{   pub fn for_total(total: usize) -> Self
    {   match total
        {   t if t > 100 => Level::Elite
          , t if t > 50 => Level::Gold
          , t if t > 20 => Level::Silver
          , t if t > 5 => Level::Bronze
          , _ => Level::Rookie
        }
    }
}

impl fmt::Display for Level
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartDay
{   pub name: String
  , pub workouts: u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats
{   pub total_workouts: usize
  , pub streak: u32
  , pub level: Level
  , pub chart_data: Vec<ChartDay>
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry
{   pub user_id: String
  , pub name: String
  , pub total_workouts: usize
  , pub last_workout: Option<DateTime<Utc>>
}

/// Streak after logging on `today`, given the previous log date
pub fn next_streak(
  previous: Option<NaiveDate>
, today: NaiveDate
, current: u32
) -> u32
{   match previous
    {   Some(last) if last == today => current.max(1)
      , Some(last) if today.pred_opt() == Some(last) => current + 1
      , _ => 1
    }
}

/// Workouts per weekday over the seven days up to `now`
pub fn weekly_chart(logs: &[WorkoutLog], now: DateTime<Utc>)
  -> Vec<ChartDay>
{   let since = now - Duration::days(7);
    let mut counts = [0u32; 7];
    for log in logs.iter().filter(|l| l.date >= since && l.date <= now)
    {   counts[log.date.weekday().num_days_from_sunday() as usize] += 1;
    }
    CHART_DAYS.iter()
      .zip(counts)
      .map(|(name, workouts)| ChartDay
      {   name: name.to_string()
        , workouts
      })
      .collect()
}

/// Workout history and gamification over the document store
pub struct Tracker
{   store: Arc<dyn DocumentStore>
}

impl Tracker
{   pub fn new(store: Arc<dyn DocumentStore>) -> Self
    {   Tracker { store }
    }

    /// Record a workout and update the account's streak and total
    pub async fn log_workout(
      &self
    , user_id: &str
    , entry: NewWorkoutLog
    , now: DateTime<Utc>
    ) -> Result<WorkoutLog, Error>
    {   if entry.duration == 0
        {   return Err(Error::Validation(
              "Workout duration is required".to_string()
            ));
        }
        let mut account = self.account(user_id).await?;
        let previous = self.logs(user_id).await?
          .iter()
          .map(|l| l.date)
          .max();

        let log = WorkoutLog
        {   workout_day: entry.workout_day
              .filter(|d| !d.trim().is_empty())
              .unwrap_or_else(|| "Custom".to_string())
          , duration: entry.duration
          , calories: entry.calories
          , mood: entry.mood.unwrap_or_default()
          , notes: entry.notes
          , date: now
        };
        let document = serde_json::to_value(&log)
          .map_err(|e| Error::Storage(e.to_string()))?;

        let before = account.clone();
        account.total_workouts += 1;
        account.streak = next_streak(
          previous.map(|d| d.date_naive())
        , now.date_naive()
        , account.streak
        );
        put_record(self.store.as_ref(), Collection::Users, user_id, &account)
          .await?;

        // the account only counts workouts that were actually logged
        if let Err(e) = self.store
          .append(Collection::WorkoutLogs, user_id, document)
          .await
        {   if let Err(restore) = put_record(
                self.store.as_ref()
              , Collection::Users
              , user_id
              , &before
              ).await
            {   warn!("Could not restore account {}: {}", user_id, restore);
            }
            return Err(e.into());
        }
        info!(
          "Logged workout for {} (total {}, streak {})"
        , user_id
        , account.total_workouts
        , account.streak
        );
        Ok(log)
    }

    /// All logs, newest first
    pub async fn history(&self, user_id: &str)
      -> Result<Vec<WorkoutLog>, Error>
    {   let mut logs = self.logs(user_id).await?;
        logs.sort_by_key(|l| Reverse(l.date));
        Ok(logs)
    }

    pub async fn stats(&self, user_id: &str, now: DateTime<Utc>)
      -> Result<Stats, Error>
    {   let logs = self.logs(user_id).await?;
        let streak = get_record::<UserAccount>(
            self.store.as_ref()
          , Collection::Users
          , user_id
          ).await?
          .map(|a| a.streak)
          .unwrap_or(0);
        Ok(Stats
        {   total_workouts: logs.len()
          , streak
          , level: Level::for_total(logs.len())
          , chart_data: weekly_chart(&logs, now)
        })
    }

    /// Top users by number of logged workouts
    pub async fn leaderboard(&self)
      -> Result<Vec<LeaderboardEntry>, Error>
    {   let mut entries = Vec::new();
        for user_id in self.store.keys(Collection::WorkoutLogs).await?
        {   let Some(account) = get_record::<UserAccount>(
                self.store.as_ref()
              , Collection::Users
              , &user_id
              ).await?
            else
            {   debug!("Leaderboard skips {}: no account", user_id);
                continue;
            };
            let logs = self.logs(&user_id).await?;
            entries.push(LeaderboardEntry
            {   total_workouts: logs.len()
              , last_workout: logs.iter().map(|l| l.date).max()
              , name: account.name
              , user_id
            });
        }
        entries.sort_by(|a, b| {
          b.total_workouts.cmp(&a.total_workouts)
            .then(b.last_workout.cmp(&a.last_workout))
            .then(a.user_id.cmp(&b.user_id))
        });
        entries.truncate(LEADERBOARD_SIZE);
        Ok(entries)
    }

    async fn account(&self, user_id: &str) -> Result<UserAccount, Error>
    {   get_record(self.store.as_ref(), Collection::Users, user_id).await?
          .ok_or_else(|| Error::Validation(
            format!("Unknown user: {}", user_id)
          ))
    }

    async fn logs(&self, user_id: &str) -> Result<Vec<WorkoutLog>, Error>
    {   Ok(get_record::<Vec<WorkoutLog>>(
            self.store.as_ref()
          , Collection::WorkoutLogs
          , user_id
          ).await?
          .unwrap_or_default())
    }
}
