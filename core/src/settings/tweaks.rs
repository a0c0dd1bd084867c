use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncyclopediaLanguage {
    En,
    Ru,
}

impl EncyclopediaLanguage {
    pub fn as_str(self) -> &'static str {
        match self {
            EncyclopediaLanguage::En => "en",
            EncyclopediaLanguage::Ru => "ru",
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_encyclopedia_language() -> EncyclopediaLanguage {
    EncyclopediaLanguage::En
}

/// Independent toggles for HUD and startup tweaks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweaksSettings {
    #[serde(default = "default_true")]
    pub encyclopedia_enabled: bool,
    #[serde(default = "default_encyclopedia_language")]
    pub encyclopedia_language: EncyclopediaLanguage,
    #[serde(default)]
    pub skip_intro_videos: bool,
}

impl Default for TweaksSettings {
    fn default() -> Self {
        Self {
            encyclopedia_enabled: true,
            encyclopedia_language: default_encyclopedia_language(),
            skip_intro_videos: false,
        }
    }
}

impl TweaksSettings {
    pub fn apply(&mut self, patch: &TweaksPatch) {
        if let Some(enabled) = patch.encyclopedia_enabled {
            self.encyclopedia_enabled = enabled;
        }
        if let Some(language) = patch.encyclopedia_language {
            self.encyclopedia_language = language;
        }
        if let Some(skip) = patch.skip_intro_videos {
            self.skip_intro_videos = skip;
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TweaksPatch {
    pub encyclopedia_enabled: Option<bool>,
    pub encyclopedia_language: Option<EncyclopediaLanguage>,
    pub skip_intro_videos: Option<bool>,
}

pub const STASH_TAB_COUNT: usize = 7;
pub const DEFAULT_STASH_LABEL: &str = "@shared";

/// Labels of the shared stash tabs, left to right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StashRenameSettings {
    pub tabs: [String; STASH_TAB_COUNT],
}

impl Default for StashRenameSettings {
    fn default() -> Self {
        Self {
            tabs: std::array::from_fn(|_| DEFAULT_STASH_LABEL.to_string()),
        }
    }
}

impl StashRenameSettings {
    pub fn tab(&self, index: usize) -> Option<&str> {
        self.tabs.get(index).map(String::as_str)
    }

    /// Returns false when `index` is outside the stash.
    pub fn set_tab(&mut self, index: usize, label: impl Into<String>) -> bool {
        match self.tabs.get_mut(index) {
            Some(slot) => {
                *slot = label.into();
                true
            }
            None => false,
        }
    }

    pub fn apply(&mut self, patch: &StashPatch) {
        for (index, label) in &patch.tabs {
            if !self.set_tab(*index, label.clone()) {
                log::warn!("ignoring stash label for tab {index}, only {STASH_TAB_COUNT} tabs exist");
            }
        }
    }
}

/// Index-addressed label updates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StashPatch {
    #[serde(default)]
    pub tabs: BTreeMap<usize, String>,
}
