//! Settings/credential store collaborator
//!
//! Values are namespaced per provider. The flow reads per-user inputs
//! (stored usernames, self-hosted base URLs) and writes the resulting tokens.

use parking_lot::{Mutex, RwLock};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{FlowError, Result};
use crate::Provider;

pub trait SettingsStore: Send + Sync {
    /// Stored value, or `default` when the key was never written
    fn get_setting(&self, provider: Provider, key: &str, default: Value) -> Value;

    fn set_setting(&self, provider: Provider, key: &str, value: Value) -> Result<()>;

    /// String view of a setting; non-string values are rendered as JSON
    fn get_string(&self, provider: Provider, key: &str, default: &str) -> String {
        match self.get_setting(provider, key, Value::String(default.to_string())) {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// Process-local store that also records every write, in order
#[derive(Default)]
pub struct MemorySettingsStore {
    values: RwLock<HashMap<(Provider, String), Value>>,
    writes: Mutex<Vec<(Provider, String)>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a value without recording it as a write
    pub fn with_setting(self, provider: Provider, key: &str, value: impl Into<Value>) -> Self {
        self.values
            .write()
            .insert((provider, key.to_string()), value.into());
        self
    }

    pub fn get(&self, provider: Provider, key: &str) -> Option<Value> {
        self.values.read().get(&(provider, key.to_string())).cloned()
    }

    pub fn writes(&self) -> Vec<(Provider, String)> {
        self.writes.lock().clone()
    }

    pub fn write_count(&self, provider: Provider, key: &str) -> usize {
        self.writes
            .lock()
            .iter()
            .filter(|(p, k)| *p == provider && k == key)
            .count()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get_setting(&self, provider: Provider, key: &str, default: Value) -> Value {
        self.get(provider, key).unwrap_or(default)
    }

    fn set_setting(&self, provider: Provider, key: &str, value: Value) -> Result<()> {
        self.values
            .write()
            .insert((provider, key.to_string()), value);
        self.writes.lock().push((provider, key.to_string()));
        Ok(())
    }
}

/// Settings persisted as one JSON document, `{ "<provider>": { "<key>": value } }`
pub struct JsonFileSettingsStore {
    path: PathBuf,
    sections: RwLock<BTreeMap<String, Map<String, Value>>>,
}

impl JsonFileSettingsStore {
    /// Open (or lazily create) the store at `path`
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let sections = if path.exists() {
            let raw = fs::read_to_string(&path).map_err(|e| {
                FlowError::Settings(format!("Failed to read {}: {}", path.display(), e))
            })?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| {
                    FlowError::Settings(format!("Failed to parse {}: {}", path.display(), e))
                })?
            }
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            sections: RwLock::new(sections),
        })
    }

    /// Store at `~/.oauth_flow/settings.json`
    pub fn open_default() -> Result<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| FlowError::Settings("Home directory not found".to_string()))?;
        Self::new(home.join(".oauth_flow").join("settings.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, sections: &BTreeMap<String, Map<String, Value>>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                FlowError::Settings(format!("Failed to create {}: {}", parent.display(), e))
            })?;
        }
        let json = serde_json::to_string_pretty(sections)
            .map_err(|e| FlowError::Settings(format!("Failed to serialize settings: {}", e)))?;
        fs::write(&self.path, json).map_err(|e| {
            FlowError::Settings(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        debug!("Settings written to {}", self.path.display());
        Ok(())
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn get_setting(&self, provider: Provider, key: &str, default: Value) -> Value {
        self.sections
            .read()
            .get(provider.key())
            .and_then(|section| section.get(key))
            .cloned()
            .unwrap_or(default)
    }

    fn set_setting(&self, provider: Provider, key: &str, value: Value) -> Result<()> {
        let mut sections = self.sections.write();
        sections
            .entry(provider.key().to_string())
            .or_default()
            .insert(key.to_string(), value);
        self.flush(&sections)
    }
}
