use crate::api::types::{NutritionSummary, UserProfile};
use crate::error::StorageError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Storage key for the user profile.
pub const PROFILE_KEY: &str = "userProfile";
/// Storage key for the meal journal.
pub const MEAL_HISTORY_KEY: &str = "mealHistory";

/// Small-value persistence as the surrounding platform provides it.
///
/// Values are opaque strings; callers layer their own encoding on top.
/// A missing key is not an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    async fn put(&self, key: &str, value: String) -> Result<(), StorageError>;
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// File-backed store keeping one JSON file per key under a base directory.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Keys become file names, so anything outside a conservative
    /// character set is replaced.
    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(format!("{}.json", safe))
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StorageError::Read {
                key: key.to_string(),
                source,
            }),
        }
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StorageError> {
        if let Err(source) = fs::create_dir_all(&self.root).await {
            return Err(StorageError::Write {
                key: key.to_string(),
                source,
            });
        }

        fs::write(self.path_for(key), value)
            .await
            .map_err(|source| StorageError::Write {
                key: key.to_string(),
                source,
            })
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StorageError::Write {
                key: key.to_string(),
                source,
            }),
        }
    }
}

/// In-memory store used by tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Typed access to the stored user profile.
#[derive(Clone)]
pub struct ProfileStore {
    store: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn load(&self) -> Result<Option<UserProfile>, StorageError> {
        let Some(raw) = self.store.get(PROFILE_KEY).await? else {
            return Ok(None);
        };

        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| StorageError::Corrupt {
                key: PROFILE_KEY.to_string(),
                details: e.to_string(),
            })
    }

    /// Load the profile, falling back to defaults when nothing is stored
    /// or the stored value cannot be decoded.
    pub async fn load_or_default(&self) -> UserProfile {
        match self.load().await {
            Ok(Some(profile)) => profile,
            Ok(None) => {
                debug!("No stored profile, using defaults");
                UserProfile::default()
            }
            Err(e) => {
                warn!("Stored profile unreadable, using defaults: {}", e);
                UserProfile::default()
            }
        }
    }

    pub async fn save(&self, profile: &UserProfile) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(profile).map_err(|e| StorageError::Encode {
            key: PROFILE_KEY.to_string(),
            details: e.to_string(),
        })?;
        self.store.put(PROFILE_KEY, encoded).await
    }
}

/// One confirmed meal in the local journal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealHistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub food: String,
    pub calories: f64,
    pub nutrition: NutritionSummary,
}

/// Local journal of confirmed meals, newest first.
#[derive(Clone)]
pub struct MealJournal {
    store: Arc<dyn KeyValueStore>,
}

impl MealJournal {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// All journal entries, newest first.
    pub async fn entries(&self) -> Result<Vec<MealHistoryEntry>, StorageError> {
        let Some(raw) = self.store.get(MEAL_HISTORY_KEY).await? else {
            return Ok(Vec::new());
        };

        serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
            key: MEAL_HISTORY_KEY.to_string(),
            details: e.to_string(),
        })
    }

    /// Prepend a confirmed meal to the journal.
    ///
    /// An unreadable existing journal is replaced rather than losing the
    /// new entry; the damage is logged.
    pub async fn append(&self, entry: MealHistoryEntry) -> Result<(), StorageError> {
        let mut entries = match self.entries().await {
            Ok(entries) => entries,
            Err(StorageError::Corrupt { key, details }) => {
                warn!("Discarding corrupt journal under '{}': {}", key, details);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        info!("Recording meal: {} ({:.0} kcal)", entry.food, entry.calories);
        entries.insert(0, entry);

        let encoded = serde_json::to_string(&entries).map_err(|e| StorageError::Encode {
            key: MEAL_HISTORY_KEY.to_string(),
            details: e.to_string(),
        })?;
        self.store.put(MEAL_HISTORY_KEY, encoded).await
    }
}
