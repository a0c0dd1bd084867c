/// Application-wide configuration shared by every profile
use crate::locale::{default_selected_locales, normalize_selected_locales, LocaleCode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppMode {
    Basic,
    Advanced,
}

impl AppMode {
    pub fn toggled(self) -> Self {
        match self {
            AppMode::Basic => AppMode::Advanced,
            AppMode::Advanced => AppMode::Basic,
        }
    }
}

fn default_app_language() -> String {
    LocaleCode::EnUs.as_str().to_string()
}

fn default_theme() -> Theme {
    Theme::Dark
}

fn default_app_mode() -> AppMode {
    AppMode::Basic
}

fn default_asterisk_color() -> String {
    "#F59E0B".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_selected_locales")]
    pub selected_locales: Vec<LocaleCode>,

    /// Interface language, stored as a locale code (`ukUA` is accepted here even
    /// though the string tables do not carry it).
    #[serde(default = "default_app_language")]
    pub app_language: String,

    /// Path to the game folder or to `D2R.exe`.
    #[serde(default)]
    pub game_path: String,

    #[serde(default = "default_theme")]
    pub theme: Theme,

    #[serde(default)]
    pub debug_mode: bool,

    #[serde(default = "default_app_mode")]
    pub app_mode: AppMode,

    /// Color of the unsaved-changes marker.
    #[serde(default = "default_asterisk_color")]
    pub asterisk_color: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            selected_locales: default_selected_locales(),
            app_language: default_app_language(),
            game_path: String::new(),
            theme: default_theme(),
            debug_mode: false,
            app_mode: default_app_mode(),
            asterisk_color: default_asterisk_color(),
        }
    }
}

impl AppConfig {
    /// Load from JSON string (for UI integration)
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: AppConfig = serde_json::from_str(json)
            .map_err(|e| format!("Failed to parse app config: {}", e))?;
        Ok(config.normalized())
    }

    /// Convert to JSON string (for UI integration)
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize app config: {}", e))
    }

    /// Fix up a freshly loaded config. Advanced mode never survives a restart.
    pub fn normalized(mut self) -> Self {
        self.selected_locales = normalize_selected_locales(&self.selected_locales);
        self.app_mode = AppMode::Basic;
        self
    }

    pub fn is_dark_theme(&self) -> bool {
        self.theme == Theme::Dark
    }

    /// Short code of the bundled UI translation for [`AppConfig::app_language`].
    pub fn ui_language(&self) -> &'static str {
        match self.app_language.as_str() {
            "ruRU" => "ru",
            "deDE" => "de",
            "ukUA" => "uk",
            "plPL" => "pl",
            "esES" => "es",
            "frFR" => "fr",
            _ => "en",
        }
    }

    pub fn apply(&mut self, patch: &AppConfigPatch) {
        if let Some(locales) = &patch.selected_locales {
            self.selected_locales = normalize_selected_locales(locales);
        }
        if let Some(language) = &patch.app_language {
            self.app_language = language.clone();
        }
        if let Some(path) = &patch.game_path {
            self.game_path = path.clone();
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(debug) = patch.debug_mode {
            self.debug_mode = debug;
        }
        if let Some(mode) = patch.app_mode {
            self.app_mode = mode;
        }
        if let Some(color) = &patch.asterisk_color {
            self.asterisk_color = color.clone();
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfigPatch {
    pub selected_locales: Option<Vec<LocaleCode>>,
    pub app_language: Option<String>,
    pub game_path: Option<String>,
    pub theme: Option<Theme>,
    pub debug_mode: Option<bool>,
    pub app_mode: Option<AppMode>,
    pub asterisk_color: Option<String>,
}
