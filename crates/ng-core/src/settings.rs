//! Key/value settings store.
//!
//! The canvas persists a single number (the grid size) but reads it through
//! the [`Settings`] trait so hosts can back it with whatever storage they
//! have. Two implementations ship here: [`MemorySettings`] and the
//! JSON-file backed [`JsonFileSettings`].

use crate::events::{Channel, Subscription};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("settings I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("settings file {path} is not valid JSON: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("settings file {0} must contain a JSON object")]
    NotAnObject(PathBuf),
    #[error("{0} is not a finite number")]
    NotFinite(f64),
}

pub trait Settings {
    /// The stored number for `key`, or `default` when absent or not a number.
    fn read_number(&self, key: &str, default: f64) -> f64;

    /// Store a number and notify `key` watchers if it changed.
    fn write_number(&mut self, key: &str, value: f64) -> Result<(), SettingsError>;

    /// Watch `key`; the callback receives the new value.
    fn on_change(&mut self, key: &str, callback: Box<dyn FnMut(&f64)>) -> Subscription;

    fn remove_watch(&mut self, key: &str, handle: Subscription) -> bool;
}

/// Values plus per-key watcher channels, shared by both stores.
#[derive(Debug, Default)]
struct Store {
    values: Map<String, Value>,
    watchers: HashMap<String, Channel<f64>>,
}

impl Store {
    fn read(&self, key: &str, default: f64) -> f64 {
        match self.values.get(key) {
            Some(v) => v.as_f64().unwrap_or_else(|| {
                log::warn!("setting {key:?} is not a number ({v}), using {default}");
                default
            }),
            None => default,
        }
    }

    /// The JSON number to store for `key`, or `None` when `value` is already stored.
    fn stage(&self, key: &str, value: f64) -> Result<Option<Value>, SettingsError> {
        let number = serde_json::Number::from_f64(value).ok_or(SettingsError::NotFinite(value))?;
        if self.values.get(key).and_then(Value::as_f64) == Some(value) {
            return Ok(None);
        }
        Ok(Some(Value::Number(number)))
    }

    fn commit(&mut self, key: &str, staged: Value, value: f64) {
        self.values.insert(key.to_string(), staged);
        if let Some(channel) = self.watchers.get_mut(key) {
            channel.notify(&value);
        }
    }

    fn watch(&mut self, key: &str, callback: Box<dyn FnMut(&f64)>) -> Subscription {
        self.watchers
            .entry(key.to_string())
            .or_default()
            .subscribe(callback)
    }

    fn unwatch(&mut self, key: &str, handle: Subscription) -> bool {
        self.watchers
            .get_mut(key)
            .is_some_and(|c| c.unsubscribe(handle))
    }
}

/// Volatile settings, lost when dropped.
#[derive(Debug, Default)]
pub struct MemorySettings {
    store: Store,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Settings for MemorySettings {
    fn read_number(&self, key: &str, default: f64) -> f64 {
        self.store.read(key, default)
    }

    fn write_number(&mut self, key: &str, value: f64) -> Result<(), SettingsError> {
        if let Some(staged) = self.store.stage(key, value)? {
            self.store.commit(key, staged, value);
        }
        Ok(())
    }

    fn on_change(&mut self, key: &str, callback: Box<dyn FnMut(&f64)>) -> Subscription {
        self.store.watch(key, callback)
    }

    fn remove_watch(&mut self, key: &str, handle: Subscription) -> bool {
        self.store.unwatch(key, handle)
    }
}

/// Settings persisted as a flat JSON object on disk.
#[derive(Debug)]
pub struct JsonFileSettings {
    path: PathBuf,
    store: Store,
}

impl JsonFileSettings {
    /// Open `path`. A missing file starts out empty and is created on first write.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Value>(&text) {
                Ok(Value::Object(map)) => map,
                Ok(_) => return Err(SettingsError::NotAnObject(path)),
                Err(source) => return Err(SettingsError::Json { path, source }),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(source) => return Err(SettingsError::Io { path, source }),
        };
        Ok(Self {
            path,
            store: Store {
                values,
                watchers: HashMap::new(),
            },
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &Map<String, Value>) -> Result<(), SettingsError> {
        let text = serde_json::to_string_pretty(values).map_err(|source| {
            SettingsError::Json {
                path: self.path.clone(),
                source,
            }
        })?;
        std::fs::write(&self.path, text).map_err(|source| SettingsError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl Settings for JsonFileSettings {
    fn read_number(&self, key: &str, default: f64) -> f64 {
        self.store.read(key, default)
    }

    /// Nothing is stored or announced unless the file write succeeds.
    fn write_number(&mut self, key: &str, value: f64) -> Result<(), SettingsError> {
        let Some(staged) = self.store.stage(key, value)? else {
            return Ok(());
        };
        let mut values = self.store.values.clone();
        values.insert(key.to_string(), staged.clone());
        self.persist(&values)?;
        self.store.commit(key, staged, value);
        Ok(())
    }

    fn on_change(&mut self, key: &str, callback: Box<dyn FnMut(&f64)>) -> Subscription {
        self.store.watch(key, callback)
    }

    fn remove_watch(&mut self, key: &str, handle: Subscription) -> bool {
        self.store.unwatch(key, handle)
    }
}
