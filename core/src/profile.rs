//! Named settings snapshots, export/import, and name de-duplication.

use crate::settings::SettingsDocument;
use crate::time::now_rfc3339;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_PROFILE_NAME: &str = "Default";
pub const IMPORTED_PROFILE_NAME: &str = "Imported Profile";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile not found: {0}")]
    NotFound(String),
    #[error("profile \"{0}\" is a read-only preset")]
    Immutable(String),
    #[error("no active profile")]
    NoActiveProfile,
    #[error("invalid profile file: {0}")]
    InvalidImport(String),
    #[error("profile name must not be empty")]
    EmptyName,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    pub name: String,
    pub settings: SettingsDocument,
    pub created_at: String,
    pub modified_at: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_immutable: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_default: bool,
    /// Preset revision as `major.minor`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl Profile {
    pub fn new(name: impl Into<String>, settings: SettingsDocument) -> Self {
        let now = now_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            settings,
            created_at: now.clone(),
            modified_at: now,
            is_immutable: false,
            is_default: false,
            version: None,
        }
    }

    /// A read-only preset.
    pub fn preset(name: impl Into<String>, settings: SettingsDocument, version: &str) -> Self {
        let mut profile = Self::new(name, settings);
        profile.is_immutable = true;
        profile.version = Some(version.to_string());
        profile
    }

    pub fn touch(&mut self) {
        self.modified_at = now_rfc3339();
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            is_immutable: self.is_immutable,
            is_default: self.is_default,
            version: self.version.clone(),
            modified_at: self.modified_at.clone(),
        }
    }
}

/// Lightweight listing entry for the profile picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileSummary {
    pub id: String,
    pub name: String,
    pub is_immutable: bool,
    pub is_default: bool,
    pub version: Option<String>,
    pub modified_at: String,
}

/// Parse `major.minor`. Anything else is rejected.
pub fn parse_version(version: &str) -> Option<(u32, u32)> {
    let (major, minor) = version.split_once('.')?;
    if major.is_empty() || minor.is_empty() {
        return None;
    }
    if !major.bytes().all(|b| b.is_ascii_digit()) || !minor.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// True when `candidate` is a strictly newer `major.minor` than `current`.
/// A missing or malformed current version counts as older than any valid one.
pub fn is_newer_version(candidate: Option<&str>, current: Option<&str>) -> bool {
    let Some(candidate) = candidate.and_then(parse_version) else {
        return false;
    };
    match current.and_then(parse_version) {
        Some(current) => candidate > current,
        None => true,
    }
}

fn name_taken<'a>(mut existing: impl Iterator<Item = &'a str>, name: &str) -> bool {
    let lowered = name.to_lowercase();
    existing.any(|other| other.to_lowercase() == lowered)
}

/// `base (Copy)`, then `base (Copy 2)`, `base (Copy 3)`, ...
pub fn copy_name<'a>(base: &str, existing: impl Iterator<Item = &'a str> + Clone) -> String {
    let first = format!("{base} (Copy)");
    if !name_taken(existing.clone(), &first) {
        return first;
    }
    (2..)
        .map(|n| format!("{base} (Copy {n})"))
        .find(|candidate| !name_taken(existing.clone(), candidate))
        .unwrap_or(first)
}

/// `base`, then `base (2)`, `base (3)`, ...
pub fn unique_name<'a>(base: &str, existing: impl Iterator<Item = &'a str> + Clone) -> String {
    if !name_taken(existing.clone(), base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base} ({n})"))
        .find(|candidate| !name_taken(existing.clone(), candidate))
        .unwrap_or_else(|| base.to_string())
}

/// A user profile may not shadow a preset name.
pub fn avoid_preset_name<'a>(name: &str, presets: impl Iterator<Item = &'a str>) -> String {
    if name_taken(presets, name) {
        format!("{name} (Custom)")
    } else {
        name.to_string()
    }
}

/// Suggested file name for an exported profile.
pub fn export_file_name(name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect();
    format!("d2r-profile-{}.json", safe.trim())
}

/// Exported JSON for `profile`. Only profile-scoped sections are written:
/// app config and tweaks are local to this machine, and UI tab positions are
/// not worth sharing.
pub fn export_profile_json(profile: &Profile) -> Result<String, serde_json::Error> {
    let mut settings = serde_json::to_value(&profile.settings)?;
    let app = serde_json::to_value(&profile.settings.app)?;
    if let (Value::Object(map), Value::Object(app)) = (&mut settings, &app) {
        for key in app.keys() {
            map.remove(key);
        }
        map.remove("tweaks");
    }
    strip_key(&mut settings, "activeTab");

    let mut exported = serde_json::json!({
        "name": profile.name,
        "settings": settings,
        "exportedAt": now_rfc3339(),
    });
    if let Some(version) = &profile.version {
        exported["version"] = Value::String(version.clone());
    }
    serde_json::to_string_pretty(&exported)
}

fn strip_key(value: &mut Value, key: &str) {
    match value {
        Value::Object(map) => {
            map.remove(key);
            for child in map.values_mut() {
                strip_key(child, key);
            }
        }
        Value::Array(items) => {
            for child in items {
                strip_key(child, key);
            }
        }
        _ => {}
    }
}

/// Parsed and normalized profile file, ready to be added to the store.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportedProfile {
    pub name: String,
    pub settings: SettingsDocument,
    pub version: Option<String>,
}

pub fn parse_profile_import(json: &str) -> Result<ImportedProfile, ProfileError> {
    let value: Value =
        serde_json::from_str(json).map_err(|e| ProfileError::InvalidImport(e.to_string()))?;
    let name = value
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ProfileError::InvalidImport("missing \"name\"".into()))?;
    let settings = value
        .get("settings")
        .filter(|settings| settings.is_object())
        .ok_or_else(|| ProfileError::InvalidImport("missing \"settings\"".into()))?;

    let mut settings: SettingsDocument = serde_json::from_value(settings.clone())
        .map_err(|e| ProfileError::InvalidImport(e.to_string()))?;
    settings.normalize();

    let name = name.trim();
    let name = if name.is_empty() {
        IMPORTED_PROFILE_NAME.to_string()
    } else {
        name.to_string()
    };
    let version = value
        .get("version")
        .and_then(Value::as_str)
        .filter(|version| parse_version(version).is_some())
        .map(str::to_string);

    Ok(ImportedProfile {
        name,
        settings,
        version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PotionGroup;
    use crate::config::AppConfig;

    #[test]
    fn copy_names_count_up_case_insensitively() {
        let existing = ["Farm", "farm (copy)", "Farm (Copy 2)"];
        assert_eq!(copy_name("Farm", existing.iter().copied()), "Farm (Copy 3)");
        assert_eq!(copy_name("Other", existing.iter().copied()), "Other (Copy)");
    }

    #[test]
    fn unique_names_get_numbered() {
        let existing = ["Loot", "Loot (2)"];
        assert_eq!(unique_name("Loot", existing.iter().copied()), "Loot (3)");
        assert_eq!(unique_name("Fresh", existing.iter().copied()), "Fresh");
    }

    #[test]
    fn preset_names_are_reserved() {
        let presets = ["Default"];
        assert_eq!(avoid_preset_name("default", presets.iter().copied()), "default (Custom)");
        assert_eq!(avoid_preset_name("Mine", presets.iter().copied()), "Mine");
    }

    #[test]
    fn versions_compare_numerically() {
        assert_eq!(parse_version("1.10"), Some((1, 10)));
        assert_eq!(parse_version("1.2.3"), None);
        assert_eq!(parse_version("v1.2"), None);
        assert!(is_newer_version(Some("1.10"), Some("1.9")));
        assert!(!is_newer_version(Some("1.0"), Some("1.0")));
        assert!(is_newer_version(Some("0.1"), None));
        assert!(!is_newer_version(None, Some("1.0")));
    }

    #[test]
    fn export_strips_tweaks_and_tabs() {
        let mut settings = SettingsDocument::default();
        settings
            .common
            .potions
            .get_mut(&PotionGroup::ManaPotions)
            .unwrap()
            .active_tab = 3;
        let profile = Profile::new("Mana", settings);
        let json = export_profile_json(&profile).unwrap();
        assert!(!json.contains("activeTab"));
        assert!(!json.contains("\"tweaks\""));

        let imported = parse_profile_import(&json).unwrap();
        assert_eq!(imported.name, "Mana");
        assert_eq!(
            imported.settings.common.potions[&PotionGroup::ManaPotions].active_tab,
            0
        );
    }

    #[test]
    fn export_leaves_out_machine_settings() {
        let mut settings = SettingsDocument::default();
        settings.app.game_path = "C:/Users/me/Games/D2R".into();
        settings.app.debug_mode = true;
        settings.stash_rename.set_tab(1, "Runes");
        let json = export_profile_json(&Profile::new("Shared", settings)).unwrap();

        let value: Value = serde_json::from_str(&json).unwrap();
        let exported = value["settings"].as_object().unwrap();
        for key in ["gamePath", "debugMode", "selectedLocales", "appLanguage", "theme", "appMode"] {
            assert!(!exported.contains_key(key), "{key} was exported");
        }
        assert!(!json.contains("C:/Users/me"));
        assert!(exported.contains_key("stashRename"));

        let imported = parse_profile_import(&json).unwrap();
        assert_eq!(imported.settings.app, AppConfig::default());
        assert_eq!(imported.settings.stash_rename.tab(1), Some("Runes"));
    }

    #[test]
    fn import_requires_name_and_settings() {
        assert!(matches!(
            parse_profile_import(r#"{"settings":{}}"#),
            Err(ProfileError::InvalidImport(_))
        ));
        assert!(matches!(
            parse_profile_import(r#"{"name":"x"}"#),
            Err(ProfileError::InvalidImport(_))
        ));
        let blank = parse_profile_import(r#"{"name":"  ","settings":{}}"#).unwrap();
        assert_eq!(blank.name, IMPORTED_PROFILE_NAME);
        assert_eq!(blank.settings.gems.len(), 7);
    }

    #[test]
    fn export_file_name_is_filesystem_safe() {
        assert_eq!(export_file_name("a/b"), "d2r-profile-a_b.json");
    }
}
