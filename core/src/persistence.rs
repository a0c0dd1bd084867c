//! Key-value storage for settings, profiles, and app preferences.
//!
//! Values are JSON strings under fixed keys, the same layout a browser-style
//! local storage would hold. Reads never fail: missing or corrupt values come
//! back as `None` and are logged.

use crate::backup::atomic_write;
use crate::config::AppConfig;
use crate::profile::Profile;
use crate::settings::{SettingsDocument, TweaksSettings};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub mod keys {
    pub const APP_CONFIG: &str = "d2r-app-config";
    pub const SETTINGS: &str = "d2r-settings";
    pub const TWEAKS: &str = "d2r-tweaks";
    pub const PROFILES: &str = "d2r-profiles";
    pub const ACTIVE_PROFILE: &str = "d2r-active-profile";
    pub const FIRST_RUN: &str = "d2r-first-run";
    pub const IMMUTABLE_OVERRIDES: &str = "d2r-immutable-overrides";
}

pub const APP_DIR_NAME: &str = "d2r-ultra-utility";
const STORAGE_FILE_NAME: &str = "storage.json";

#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("failed to encode stored value: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("no data directory available on this system")]
    NoDataDir,
}

/// String storage addressed by key.
pub trait KeyValueStore: Send {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), PersistenceError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryKeyValueStore {
    entries: BTreeMap<String, String>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// All keys in one JSON object file, rewritten atomically on every change.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileKeyValueStore {
    /// Open (or start) the storage file at `path`. An unreadable file is
    /// treated as empty so a damaged file never blocks startup.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                warn!("ignoring corrupt storage file {}: {err}", path.display());
                BTreeMap::new()
            }),
            Err(err) if err.kind() == io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!("cannot read storage file {}: {err}", path.display());
                BTreeMap::new()
            }
        };
        Self { path, entries }
    }

    /// `<local data dir>/d2r-ultra-utility/storage.json`.
    pub fn open_default() -> Result<Self, PersistenceError> {
        let dir = default_data_dir().ok_or(PersistenceError::NoDataDir)?;
        Ok(Self::open(dir.join(STORAGE_FILE_NAME)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), PersistenceError> {
        let contents = serde_json::to_string_pretty(&self.entries)?;
        atomic_write(&self.path, contents.as_bytes())?;
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

pub fn default_data_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|dir| dir.join(APP_DIR_NAME))
}

/// Everything the store needs at startup.
///
/// `settings` is the working document and is only kept while no profile is
/// active. With a profile active the document comes from its snapshot, so
/// only the global app config and tweaks are carried.
#[derive(Debug, Clone, Default)]
pub struct PersistedState {
    pub settings: Option<SettingsDocument>,
    pub app: Option<AppConfig>,
    pub tweaks: Option<TweaksSettings>,
    pub profiles: Vec<Profile>,
    pub active_profile_id: Option<String>,
    pub immutable_overrides: BTreeMap<String, Profile>,
}

/// Typed access to the settings keys over any [`KeyValueStore`].
pub struct SettingsPersistence<S: KeyValueStore> {
    storage: S,
}

impl<S: KeyValueStore> SettingsPersistence<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.storage.get(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("discarding malformed stored value for {key}: {err}");
                None
            }
        }
    }

    fn write<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), PersistenceError> {
        let raw = serde_json::to_string(value)?;
        self.storage.set(key, raw)
    }

    /// The saved document, with the separately stored app config and tweaks
    /// laid over it when present.
    pub fn load_settings(&self) -> Option<SettingsDocument> {
        let mut doc: SettingsDocument = self.read(keys::SETTINGS)?;
        if let Some(app) = self.load_app_config() {
            doc.app = app;
        }
        if let Some(tweaks) = self.load_tweaks() {
            doc.tweaks = tweaks;
        }
        doc.normalize();
        Some(doc)
    }

    pub fn save_settings(&mut self, doc: &SettingsDocument) -> Result<(), PersistenceError> {
        self.write(keys::SETTINGS, doc)?;
        self.save_app_config(&doc.app)?;
        self.save_tweaks(&doc.tweaks)
    }

    pub fn load_app_config(&self) -> Option<AppConfig> {
        self.read::<AppConfig>(keys::APP_CONFIG)
            .map(AppConfig::normalized)
    }

    pub fn save_app_config(&mut self, config: &AppConfig) -> Result<(), PersistenceError> {
        self.write(keys::APP_CONFIG, config)
    }

    pub fn load_tweaks(&self) -> Option<TweaksSettings> {
        self.read(keys::TWEAKS)
    }

    pub fn save_tweaks(&mut self, tweaks: &TweaksSettings) -> Result<(), PersistenceError> {
        self.write(keys::TWEAKS, tweaks)
    }

    /// Stored profiles. A malformed entry is dropped on its own; the rest load.
    pub fn load_profiles(&self) -> Vec<Profile> {
        let entries: Vec<serde_json::Value> = self.read(keys::PROFILES).unwrap_or_default();
        entries
            .into_iter()
            .enumerate()
            .filter_map(|(index, entry)| match serde_json::from_value::<Profile>(entry) {
                Ok(mut profile) => {
                    profile.settings.normalize();
                    Some(profile)
                }
                Err(err) => {
                    warn!("dropping malformed stored profile #{index}: {err}");
                    None
                }
            })
            .collect()
    }

    pub fn save_profiles(&mut self, profiles: &[Profile]) -> Result<(), PersistenceError> {
        self.write(keys::PROFILES, profiles)
    }

    pub fn load_active_profile_id(&self) -> Option<String> {
        self.storage
            .get(keys::ACTIVE_PROFILE)
            .filter(|id| !id.is_empty())
    }

    pub fn save_active_profile_id(&mut self, id: Option<&str>) -> Result<(), PersistenceError> {
        match id {
            Some(id) => self.storage.set(keys::ACTIVE_PROFILE, id.to_string()),
            None => self.storage.remove(keys::ACTIVE_PROFILE),
        }
    }

    pub fn load_immutable_overrides(&self) -> BTreeMap<String, Profile> {
        let entries: BTreeMap<String, serde_json::Value> =
            self.read(keys::IMMUTABLE_OVERRIDES).unwrap_or_default();
        entries
            .into_iter()
            .filter_map(|(name, entry)| match serde_json::from_value::<Profile>(entry) {
                Ok(mut profile) => {
                    profile.settings.normalize();
                    Some((name, profile))
                }
                Err(err) => {
                    warn!("dropping malformed preset override {name}: {err}");
                    None
                }
            })
            .collect()
    }

    pub fn save_immutable_overrides(
        &mut self,
        overrides: &BTreeMap<String, Profile>,
    ) -> Result<(), PersistenceError> {
        self.write(keys::IMMUTABLE_OVERRIDES, overrides)
    }

    /// True until [`SettingsPersistence::mark_first_run_done`] is called.
    pub fn is_first_run(&self) -> bool {
        self.storage.get(keys::FIRST_RUN).as_deref() != Some("false")
    }

    pub fn mark_first_run_done(&mut self) -> Result<(), PersistenceError> {
        self.storage.set(keys::FIRST_RUN, "false".to_string())
    }

    pub fn load_state(&self) -> PersistedState {
        PersistedState {
            settings: self.load_settings(),
            app: self.load_app_config(),
            tweaks: self.load_tweaks(),
            profiles: self.load_profiles(),
            active_profile_id: self.load_active_profile_id(),
            immutable_overrides: self.load_immutable_overrides(),
        }
    }

    pub fn save_state(&mut self, state: &PersistedState) -> Result<(), PersistenceError> {
        match &state.settings {
            Some(settings) => self.write(keys::SETTINGS, settings)?,
            None => self.storage.remove(keys::SETTINGS)?,
        }
        if let Some(app) = &state.app {
            self.save_app_config(app)?;
        }
        if let Some(tweaks) = &state.tweaks {
            self.save_tweaks(tweaks)?;
        }
        self.save_profiles(&state.profiles)?;
        self.save_active_profile_id(state.active_profile_id.as_deref())?;
        self.save_immutable_overrides(&state.immutable_overrides)
    }
}
