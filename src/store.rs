//! Durable document store seams and the two bundled backends

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, trace};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{Mutex, RwLock};

use crate::error::StoreError;
use crate::profile::{Profile, UserAccount};

/// Named document collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Collection
{   Users
  , Profiles
  , WorkoutPlans
  , MealPlans
  , ExerciseCache
  , WorkoutLogs
}

impl Collection
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   Collection::Users => "users"
          , Collection::Profiles => "profiles"
          , Collection::WorkoutPlans => "workouts"
          , Collection::MealPlans => "meal_plans"
          , Collection::ExerciseCache => "exercise_cache"
          , Collection::WorkoutLogs => "workout_logs"
        }
    }
}

impl fmt::Display for Collection
{   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {   f.write_str(self.as_str())
    }
}

/// A generated plan persisted under its owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRecord
{   pub owner: String
  , pub plan: Value
  , pub generated_at: DateTime<Utc>
}

/// A cached exercise explanation keyed by normalized name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry
{   pub name: String
  , pub data: Value
  , pub updated_at: DateTime<Utc>
}

/// Key-value document store with per-key atomic writes
#[async_trait]
pub trait DocumentStore: Send + Sync
{   /// Create the document, or overwrite it in place
    async fn upsert(
      &self
    , collection: Collection
    , key: &str
    , document: Value
    ) -> Result<(), StoreError>;

    async fn find(&self, collection: Collection, key: &str)
      -> Result<Option<Value>, StoreError>;

    /// Append to the array document at `key`, creating it if absent
    async fn append(
      &self
    , collection: Collection
    , key: &str
    , item: Value
    ) -> Result<(), StoreError>;

    async fn keys(&self, collection: Collection)
      -> Result<Vec<String>, StoreError>;
}

/// Read-only profile lookups. Absence is a valid state.
#[async_trait]
pub trait ProfileStore: Send + Sync
{   async fn find_profile(&self, user_id: &str)
      -> Result<Option<Profile>, StoreError>;

    async fn find_account(&self, user_id: &str)
      -> Result<Option<UserAccount>, StoreError>;
}

/// Serialize and upsert a typed record
pub async fn put_record<T: Serialize + Sync>(
  store: &dyn DocumentStore
, collection: Collection
, key: &str
, record: &T
) -> Result<(), StoreError>
{   let document = serde_json::to_value(record)?;
    store.upsert(collection, key, document).await
}

/// Find and deserialize a typed record
pub async fn get_record<T: DeserializeOwned>(
  store: &dyn DocumentStore
, collection: Collection
, key: &str
) -> Result<Option<T>, StoreError>
{   match store.find(collection, key).await?
    {   Some(document) => Ok(Some(serde_json::from_value(document)?))
      , None => Ok(None)
    }
}

/// Profiles and accounts live in the same document store
#[async_trait]
impl<S: DocumentStore> ProfileStore for S
{   async fn find_profile(&self, user_id: &str)
      -> Result<Option<Profile>, StoreError>
    {   get_record(self, Collection::Profiles, user_id).await
    }

    async fn find_account(&self, user_id: &str)
      -> Result<Option<UserAccount>, StoreError>
    {   get_record(self, Collection::Users, user_id).await
    }
}

/// Store a profile under its owner
pub async fn save_profile(store: &dyn DocumentStore, profile: &Profile)
  -> Result<(), StoreError>
{   debug!("Saving profile for {}", profile.user);
    put_record(store, Collection::Profiles, &profile.user, profile).await
}

/// Store an account under its id
pub async fn save_account(
  store: &dyn DocumentStore
, account: &UserAccount
) -> Result<(), StoreError>
{   debug!("Saving account {}", account.id);
    put_record(store, Collection::Users, &account.id, account).await
}

fn append_to(slot: &mut Value, item: Value)
{   match slot
    {   Value::Array(items) => items.push(item)
      , other => *other = Value::Array(vec![item])
    }
}

// ===== In-memory backend =====

/// Process-local store; contents vanish with the process
#[derive(Debug, Default)]
pub struct MemoryStore
{   documents: RwLock<HashMap<(Collection, String), Value>>
}

impl MemoryStore
{   pub fn new() -> Self
    {   MemoryStore::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore
{   async fn upsert(
      &self
    , collection: Collection
    , key: &str
    , document: Value
    ) -> Result<(), StoreError>
    {   trace!("upsert {}/{}", collection, key);
        self.documents.write().await
          .insert((collection, key.to_string()), document);
        Ok(())
    }

    async fn find(&self, collection: Collection, key: &str)
      -> Result<Option<Value>, StoreError>
    {   Ok(self.documents.read().await
          .get(&(collection, key.to_string()))
          .cloned())
    }

    async fn append(
      &self
    , collection: Collection
    , key: &str
    , item: Value
    ) -> Result<(), StoreError>
    {   trace!("append {}/{}", collection, key);
        let mut documents = self.documents.write().await;
        let slot = documents
          .entry((collection, key.to_string()))
          .or_insert(Value::Null);
        append_to(slot, item);
        Ok(())
    }

    async fn keys(&self, collection: Collection)
      -> Result<Vec<String>, StoreError>
    {   let mut keys: Vec<String> = self.documents.read().await
          .keys()
          .filter(|(c, _)| *c == collection)
          .map(|(_, k)| k.clone())
          .collect();
        keys.sort();
        Ok(keys)
    }
}

// ===== JSON file backend =====

type FileContents = BTreeMap<String, BTreeMap<String, Value>>;

/// Store persisted as one JSON file, rewritten on every change.
/// Writes are serialised through a single lock, and a change is
/// visible to readers only once the file write has succeeded.
#[derive(Debug)]
pub struct JsonFileStore
{   path: PathBuf
  , documents: Mutex<FileContents>
}

impl JsonFileStore
{   /// Open the file, starting empty if it does not exist yet
    pub async fn open(path: impl AsRef<Path>)
      -> Result<Self, StoreError>
    {   let path = path.as_ref().to_path_buf();
        let documents = match tokio::fs::read(&path).await
        {   Ok(bytes) if bytes.is_empty() => FileContents::new()
          , Ok(bytes) => serde_json::from_slice(&bytes)?
          , Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
              FileContents::new()
            }
          , Err(e) => return Err(e.into())
        };
        debug!(
          "Opened JSON store {} ({} collections)"
        , path.display()
        , documents.len()
        );
        Ok(JsonFileStore
        {   path
          , documents: Mutex::new(documents)
        })
    }

    pub fn path(&self) -> &Path
    {   &self.path
    }

    async fn flush(&self, documents: &FileContents)
      -> Result<(), StoreError>
    {   let bytes = serde_json::to_vec_pretty(documents)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        trace!("Flushed {}", self.path.display());
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore
{   async fn upsert(
      &self
    , collection: Collection
    , key: &str
    , document: Value
    ) -> Result<(), StoreError>
    {   let mut documents = self.documents.lock().await;
        let mut next = documents.clone();
        next
          .entry(collection.as_str().to_string())
          .or_default()
          .insert(key.to_string(), document);
        self.flush(&next).await?;
        *documents = next;
        Ok(())
    }

    async fn find(&self, collection: Collection, key: &str)
      -> Result<Option<Value>, StoreError>
    {   Ok(self.documents.lock().await
          .get(collection.as_str())
          .and_then(|c| c.get(key))
          .cloned())
    }

    async fn append(
      &self
    , collection: Collection
    , key: &str
    , item: Value
    ) -> Result<(), StoreError>
    {   let mut documents = self.documents.lock().await;
        let mut next = documents.clone();
        let slot = next
          .entry(collection.as_str().to_string())
          .or_default()
          .entry(key.to_string())
          .or_insert(Value::Null);
        append_to(slot, item);
        self.flush(&next).await?;
        *documents = next;
        Ok(())
    }

    async fn keys(&self, collection: Collection)
      -> Result<Vec<String>, StoreError>
    {   Ok(self.documents.lock().await
          .get(collection.as_str())
          .map(|c| c.keys().cloned().collect())
          .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests
{   use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_upsert_overwrites()
    {   let store = MemoryStore::new();
        store.upsert(Collection::ExerciseCache, "squat", json!({"v": 1}))
          .await.unwrap();
        store.upsert(Collection::ExerciseCache, "squat", json!({"v": 2}))
          .await.unwrap();
        assert_eq!(
          store.find(Collection::ExerciseCache, "squat").await.unwrap()
        , Some(json!({"v": 2}))
        );
        assert_eq!(
          store.find(Collection::WorkoutPlans, "squat").await.unwrap()
        , None
        );
    }

    #[tokio::test]
    async fn memory_append_builds_array()
    {   let store = MemoryStore::new();
        store.append(Collection::WorkoutLogs, "u1", json!(1)).await.unwrap();
        store.append(Collection::WorkoutLogs, "u1", json!(2)).await.unwrap();
        store.append(Collection::WorkoutLogs, "u2", json!(3)).await.unwrap();
        assert_eq!(
          store.find(Collection::WorkoutLogs, "u1").await.unwrap()
        , Some(json!([1, 2]))
        );
        assert_eq!(
          store.keys(Collection::WorkoutLogs).await.unwrap()
        , vec!["u1", "u2"]
        );
    }

    #[tokio::test]
    async fn profile_store_reads_typed_records()
    {   let store = MemoryStore::new();
        assert!(store.find_account("u1").await.unwrap().is_none());
        save_account(&store, &UserAccount::new("u1", "Asha"))
          .await.unwrap();
        let account = store.find_account("u1").await.unwrap().unwrap();
        assert_eq!(account.name, "Asha");
    }

    #[tokio::test]
    async fn corrupt_record_is_a_serialization_error()
    {   let store = MemoryStore::new();
        store.upsert(Collection::Users, "u1", json!({"id": 5}))
          .await.unwrap();
        assert!(matches!(
          store.find_account("u1").await
        , Err(StoreError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn json_file_survives_reopen()
    {   let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        {   let store = JsonFileStore::open(&path).await.unwrap();
            store.upsert(Collection::MealPlans, "u1", json!({"plan": 1}))
              .await.unwrap();
            store.append(Collection::WorkoutLogs, "u1", json!({"d": 30}))
              .await.unwrap();
        }
        let store = JsonFileStore::open(&path).await.unwrap();
        assert_eq!(
          store.find(Collection::MealPlans, "u1").await.unwrap()
        , Some(json!({"plan": 1}))
        );
        assert_eq!(
          store.find(Collection::WorkoutLogs, "u1").await.unwrap()
        , Some(json!([{"d": 30}]))
        );
        assert_eq!(
          store.keys(Collection::MealPlans).await.unwrap()
        , vec!["u1"]
        );
    }

    #[tokio::test]
    async fn failed_flush_leaves_no_trace()
    {   let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("store.json");
        let store = JsonFileStore::open(&path).await.unwrap();

        let upsert = store.upsert(Collection::WorkoutPlans, "u1", json!({"p": 1}))
          .await;
        assert!(matches!(upsert, Err(StoreError::Io(_))));
        let append = store.append(Collection::WorkoutLogs, "u1", json!({"d": 1}))
          .await;
        assert!(matches!(append, Err(StoreError::Io(_))));

        assert_eq!(
          store.find(Collection::WorkoutPlans, "u1").await.unwrap()
        , None
        );
        assert_eq!(
          store.find(Collection::WorkoutLogs, "u1").await.unwrap()
        , None
        );
        assert!(store.keys(Collection::WorkoutPlans).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn json_file_missing_starts_empty()
    {   let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("absent.json"))
          .await.unwrap();
        assert!(store.keys(Collection::Users).await.unwrap().is_empty());
    }
}
