//! Settings storage backed by a JSON object file, e.g. an export of a page's
//! `localStorage`.

use chartsync_core::{SettingsError, SettingsStore};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// String values keyed by name, written back to disk on every `set`.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSettings {
    /// Opens `path`, treating a missing file as empty storage.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let text = std::fs::read_to_string(&path).map_err(|e| {
                SettingsError(format!("cannot read '{}': {}", path.display(), e))
            })?;
            parse(&text).map_err(|reason| {
                SettingsError(format!("cannot parse '{}': {}", path.display(), reason))
            })?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, values: &BTreeMap<String, String>) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SettingsError(format!("cannot create '{}': {}", parent.display(), e)))?;
        }
        let object: Map<String, Value> = values
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        let text = serde_json::to_string_pretty(&Value::Object(object))
            .map_err(|e| SettingsError(e.to_string()))?;
        std::fs::write(&self.path, text)
            .map_err(|e| SettingsError(format!("cannot write '{}': {}", self.path.display(), e)))
    }
}

/// Storage values are strings; anything else in the file is kept as its
/// JSON text.
fn parse(text: &str) -> Result<BTreeMap<String, String>, String> {
    match serde_json::from_str::<Value>(text).map_err(|e| e.to_string())? {
        Value::Object(members) => Ok(members
            .into_iter()
            .map(|(key, value)| match value {
                Value::String(s) => (key, s),
                other => (key, other.to_string()),
            })
            .collect()),
        _ => Err("expected a JSON object".to_string()),
    }
}

impl SettingsStore for FileSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), SettingsError> {
        let mut values = self
            .values
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        values.insert(key.to_string(), value);
        self.save(&values)
    }
}
