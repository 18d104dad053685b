//! Persistent store adapter.
//!
//! [`KeyValueStore`] is the raw `get/set/remove` interface of the external
//! store. [`StateStore`] layers typed load/save of [`CoordinatorState`] and
//! the [`ExtractedActions`] cache on top of it and is the only path the
//! coordinator uses to reach durable storage.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use focus_core::models::{CoordinatorState, ExtractedActions, Meeting, ResourceId};
use focus_core::settings::Settings;
use focus_core::{FocusError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

// ── Keys ──────────────────────────────────────────────────────────────────────

pub const KEY_ACTIVE: &str = "focusModeActive";
pub const KEY_HIDDEN: &str = "hiddenResources";
pub const KEY_MEETINGS: &str = "scheduledMeetings";
pub const KEY_SETTINGS: &str = "settings";
pub const KEY_ACTIONS: &str = "extractedActions";

const STATE_KEYS: &[&str] = &[KEY_ACTIVE, KEY_HIDDEN, KEY_MEETINGS, KEY_SETTINGS];
const ALL_KEYS: &[&str] = &[KEY_ACTIVE, KEY_HIDDEN, KEY_MEETINGS, KEY_SETTINGS, KEY_ACTIONS];

// ── KeyValueStore ─────────────────────────────────────────────────────────────

/// Raw interface of the external key-value store.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Values for the requested keys. Missing keys are absent from the map.
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>>;

    async fn set(&self, entries: Map<String, Value>) -> Result<()>;

    async fn remove(&self, keys: &[&str]) -> Result<()>;
}

// ── MemoryStore ───────────────────────────────────────────────────────────────

/// Volatile store. Writes can be made to fail for testing error paths.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<Map<String, Value>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `set`/`remove` fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of the raw stored value for `key`.
    pub fn raw(&self, key: &str) -> Option<Value> {
        self.data.lock().ok().and_then(|d| d.get(key).cloned())
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(FocusError::StoreWrite {
                path: PathBuf::from("<memory>"),
                source: std::io::Error::other("writes disabled"),
            });
        }
        Ok(())
    }

    fn with_data<T>(&self, f: impl FnOnce(&mut Map<String, Value>) -> T) -> T {
        match self.data.lock() {
            Ok(mut data) => f(&mut data),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        Ok(self.with_data(|data| pick(data, keys)))
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<()> {
        self.check_writable()?;
        self.with_data(|data| data.extend(entries));
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        self.check_writable()?;
        self.with_data(|data| {
            for key in keys {
                data.remove(*key);
            }
        });
        Ok(())
    }
}

// ── JsonFileStore ─────────────────────────────────────────────────────────────

/// Store backed by a single JSON object on disk.
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so a crash never leaves a half-written store behind.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the whole document. A missing file is an empty store; a file
    /// that is not a JSON object is logged and treated as empty.
    async fn read_all(&self) -> Result<Map<String, Value>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(source) => {
                return Err(FocusError::StoreRead {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        match serde_json::from_str::<Value>(&content) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => {
                tracing::warn!(path = %self.path.display(), "store is not a JSON object; starting empty");
                Ok(Map::new())
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %self.path.display(),
                    "failed to parse store; starting empty"
                );
                Ok(Map::new())
            }
        }
    }

    async fn write_all(&self, data: &Map<String, Value>) -> Result<()> {
        let write_err = |source: std::io::Error| FocusError::StoreWrite {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await.map_err(write_err)?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(write_err)?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, keys: &[&str]) -> Result<Map<String, Value>> {
        let data = self.read_all().await?;
        Ok(pick(&data, keys))
    }

    async fn set(&self, entries: Map<String, Value>) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.read_all().await?;
        data.extend(entries);
        self.write_all(&data).await
    }

    async fn remove(&self, keys: &[&str]) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut data = self.read_all().await?;
        for key in keys {
            data.remove(*key);
        }
        self.write_all(&data).await
    }
}

fn pick(data: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|k| data.get(*k).map(|v| (k.to_string(), v.clone())))
        .collect()
}

// ── StateStore ────────────────────────────────────────────────────────────────

/// Typed adapter over a [`KeyValueStore`].
#[derive(Clone)]
pub struct StateStore {
    kv: Arc<dyn KeyValueStore>,
}

impl StateStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// Load the coordinator state. Absent keys take their defaults; a value
    /// with the wrong shape is logged and replaced by its default.
    pub async fn load(&self) -> Result<CoordinatorState> {
        let values = self.kv.get(STATE_KEYS).await?;

        let active: bool = decode_or_default(&values, KEY_ACTIVE);
        let hidden: BTreeSet<ResourceId> = decode_or_default(&values, KEY_HIDDEN);
        let meetings: Vec<Meeting> = decode_or_default(&values, KEY_MEETINGS);
        let settings: Settings = decode_or_default(&values, KEY_SETTINGS);

        tracing::debug!(
            active,
            hidden = hidden.len(),
            meetings = meetings.len(),
            "coordinator state loaded"
        );

        Ok(CoordinatorState {
            active,
            hidden_resources: hidden,
            scheduled_meetings: meetings,
            settings,
        })
    }

    /// Write every field of `state` in a single `set`.
    pub async fn save(&self, state: &CoordinatorState) -> Result<()> {
        let mut entries = Map::new();
        entries.insert(KEY_ACTIVE.to_string(), Value::Bool(state.active));
        entries.insert(
            KEY_HIDDEN.to_string(),
            serde_json::to_value(&state.hidden_resources)?,
        );
        entries.insert(
            KEY_MEETINGS.to_string(),
            serde_json::to_value(&state.scheduled_meetings)?,
        );
        entries.insert(
            KEY_SETTINGS.to_string(),
            serde_json::to_value(&state.settings)?,
        );
        self.kv.set(entries).await
    }

    pub async fn load_actions(&self) -> Result<Option<ExtractedActions>> {
        let values = self.kv.get(&[KEY_ACTIONS]).await?;
        Ok(values.get(KEY_ACTIONS).and_then(|v| {
            decode::<ExtractedActions>(KEY_ACTIONS, v)
                .map_err(|e| tracing::warn!(error = %e, "ignoring cached action items"))
                .ok()
        }))
    }

    pub async fn save_actions(&self, actions: &ExtractedActions) -> Result<()> {
        let mut entries = Map::new();
        entries.insert(KEY_ACTIONS.to_string(), serde_json::to_value(actions)?);
        self.kv.set(entries).await
    }

    pub async fn clear_actions(&self) -> Result<()> {
        self.kv.remove(&[KEY_ACTIONS]).await
    }

    /// Remove every coordinator key.
    pub async fn reset(&self) -> Result<()> {
        self.kv.remove(ALL_KEYS).await
    }
}

fn decode<T: DeserializeOwned>(key: &str, value: &Value) -> Result<T> {
    serde_json::from_value(value.clone()).map_err(|e| FocusError::CorruptValue {
        key: key.to_string(),
        reason: e.to_string(),
    })
}

fn decode_or_default<T: DeserializeOwned + Default>(values: &Map<String, Value>, key: &str) -> T {
    let Some(value) = values.get(key) else {
        return T::default();
    };
    decode(key, value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to default");
        T::default()
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
