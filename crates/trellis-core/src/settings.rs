use std::path::PathBuf;
use std::sync::Mutex;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{CollectionId, ShortcutCollection};

/// Persisted navigator settings snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigatorSettings {
    /// Shortcut collections in user-controlled order.
    #[serde(default)]
    pub collections: Vec<ShortcutCollection>,
    /// Id of the active collection; the default collection when absent.
    #[serde(default)]
    pub active_collection: Option<CollectionId>,
    /// Hidden-tag patterns (`*suffix`, `prefix*`, or an exact path prefix).
    #[serde(default)]
    pub hidden_tag_patterns: Vec<String>,
    /// Folder prefixes whose files only feed the hidden-root registry.
    #[serde(default)]
    pub excluded_folders: Vec<String>,
    /// Master switch for excluded-folder handling.
    #[serde(default = "default_true")]
    pub apply_exclusions: bool,
}

fn default_true() -> bool {
    true
}

impl Default for NavigatorSettings {
    fn default() -> Self {
        Self {
            collections: Vec::new(),
            active_collection: None,
            hidden_tag_patterns: Vec::new(),
            excluded_folders: Vec::new(),
            apply_exclusions: true,
        }
    }
}

impl NavigatorSettings {
    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to encode settings: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence collaborator: read the current snapshot, or apply an atomic
/// read-modify-write.
pub trait SettingsHost: Send + Sync {
    fn read(&self) -> NavigatorSettings;
    fn update(&self, mutate: &dyn Fn(&mut NavigatorSettings)) -> Result<(), SettingsError>;
}

/// In-memory settings, for tests and hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemorySettings {
    inner: Mutex<NavigatorSettings>,
}

impl MemorySettings {
    pub fn new(settings: NavigatorSettings) -> Self {
        Self {
            inner: Mutex::new(settings),
        }
    }
}

impl SettingsHost for MemorySettings {
    fn read(&self) -> NavigatorSettings {
        self.inner.lock().expect("settings lock poisoned").clone()
    }

    fn update(&self, mutate: &dyn Fn(&mut NavigatorSettings)) -> Result<(), SettingsError> {
        let mut guard = self.inner.lock().expect("settings lock poisoned");
        mutate(&mut guard);
        Ok(())
    }
}

/// JSON-file-backed settings. Writes go to a sibling temp file first and are
/// moved into place, so a crash mid-write never leaves a torn snapshot.
#[derive(Debug)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn load(&self) -> NavigatorSettings {
        let Ok(content) = std::fs::read_to_string(&self.path) else {
            return NavigatorSettings::default();
        };
        match NavigatorSettings::from_json(&content) {
            Ok(settings) => settings,
            Err(err) => {
                warn!(
                    "unreadable settings at {}: {err}, starting from defaults",
                    self.path.display()
                );
                NavigatorSettings::default()
            }
        }
    }
}

impl SettingsHost for FileSettings {
    fn read(&self) -> NavigatorSettings {
        self.load()
    }

    fn update(&self, mutate: &dyn Fn(&mut NavigatorSettings)) -> Result<(), SettingsError> {
        let mut settings = self.load();
        mutate(&mut settings);
        let encoded = settings.to_json()?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, encoded)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn settings_round_trip_through_json() {
        let mut settings = NavigatorSettings::default();
        settings.hidden_tag_patterns.push("tmp*".into());
        settings.excluded_folders.push("archive".into());
        let mut collection = ShortcutCollection::new("Shortcuts", Some("star".into()));
        collection.is_default = true;
        settings.active_collection = Some(collection.id.clone());
        settings.collections.push(collection);

        let encoded = settings.to_json().unwrap();
        let restored = NavigatorSettings::from_json(&encoded).unwrap();
        assert_eq!(settings, restored);
    }

    #[test]
    fn file_settings_update_is_read_modify_write() {
        let dir = TempDir::new().unwrap();
        let host = FileSettings::new(dir.path().join("navigator.json"));

        assert_eq!(host.read(), NavigatorSettings::default());

        host.update(&|s| s.hidden_tag_patterns.push("a*".into()))
            .unwrap();
        host.update(&|s| s.hidden_tag_patterns.push("b*".into()))
            .unwrap();

        let settings = host.read();
        assert_eq!(settings.hidden_tag_patterns, vec!["a*", "b*"]);
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("navigator.json");
        std::fs::write(&path, "{ not valid json").unwrap();

        let host = FileSettings::new(path);
        assert_eq!(host.read(), NavigatorSettings::default());
    }
}
