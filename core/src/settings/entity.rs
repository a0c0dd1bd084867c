//! Entity shapes: simple items, catalog items, and leveled (tabbed) groups.

use crate::catalog::{CommonItem, ItemGroup, LeveledKey};
use crate::locale::{LocalePatch, LocaleRecord};
use serde::{Deserialize, Deserializer, Serialize};

fn default_true() -> bool {
    true
}

/// Difficulty class markers appended to item names, normal/exceptional/elite.
pub const DIFFICULTY_MARKERS: [&str; 3] = ["[n]", "[x]", "[e]"];

/// A single-entry item such as arrows or gold.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_difficulty_class_marker: Option<bool>,
    #[serde(default)]
    pub locales: LocaleRecord,
}

impl EntitySettings {
    pub fn default_for(_item: CommonItem) -> Self {
        Self::default()
    }

    pub fn apply(&mut self, patch: &EntityPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(marker) = patch.show_difficulty_class_marker {
            self.show_difficulty_class_marker = Some(marker);
        }
        self.locales.apply(&patch.locales);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityPatch {
    pub enabled: Option<bool>,
    pub show_difficulty_class_marker: Option<bool>,
    #[serde(default)]
    pub locales: LocalePatch,
}

/// A weapon or armor base from the bundled item catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub show_difficulty_class_marker: bool,
    #[serde(default)]
    pub locales: LocaleRecord,
}

impl Default for ItemSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            show_difficulty_class_marker: false,
            locales: LocaleRecord::default(),
        }
    }
}

impl ItemSettings {
    pub fn apply(&mut self, patch: &ItemPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(marker) = patch.show_difficulty_class_marker {
            self.show_difficulty_class_marker = marker;
        }
        self.locales.apply(&patch.locales);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemPatch {
    pub enabled: Option<bool>,
    pub show_difficulty_class_marker: Option<bool>,
    #[serde(default)]
    pub locales: LocalePatch,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub highlight: Option<bool>,
    #[serde(default)]
    pub locales: LocaleRecord,
}

impl LevelSettings {
    pub fn apply(&mut self, patch: &LevelPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(highlight) = patch.highlight {
            self.highlight = Some(highlight);
        }
        self.locales.apply(&patch.locales);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelPatch {
    pub enabled: Option<bool>,
    pub highlight: Option<bool>,
    #[serde(default)]
    pub locales: LocalePatch,
}

/// Potion tiers, gem qualities, and other multi-level entries edited as tabs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeveledGroupSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, deserialize_with = "lenient_tab")]
    pub active_tab: usize,
    #[serde(default)]
    pub levels: Vec<LevelSettings>,
}

/// Negative, fractional, or non-numeric tabs load as the first tab.
fn lenient_tab<'de, D: Deserializer<'de>>(deserializer: D) -> Result<usize, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_u64()
        .and_then(|tab| usize::try_from(tab).ok())
        .unwrap_or(0))
}

impl LeveledGroupSettings {
    /// Synthesize the defaults for `key`. Every call returns a fresh value.
    pub fn default_for(key: LeveledKey) -> Self {
        match key {
            LeveledKey::Item(ItemGroup::DifficultyClassMarkers) => Self {
                enabled: true,
                active_tab: 0,
                levels: DIFFICULTY_MARKERS
                    .iter()
                    .map(|marker| LevelSettings {
                        enabled: true,
                        highlight: None,
                        locales: LocaleRecord::filled(marker),
                    })
                    .collect(),
            },
            _ => Self {
                enabled: false,
                active_tab: 0,
                levels: vec![LevelSettings::default(); key.level_count()],
            },
        }
    }

    /// The tab to show. Out-of-range stored values read as the first tab.
    pub fn effective_active_tab(&self) -> usize {
        if self.active_tab < self.levels.len() {
            self.active_tab
        } else {
            0
        }
    }

    pub fn active_level(&self) -> Option<&LevelSettings> {
        self.levels.get(self.effective_active_tab())
    }

    pub fn apply(&mut self, patch: &GroupPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(tab) = patch.active_tab {
            self.active_tab = tab;
        }
        if let Some(levels) = &patch.levels {
            self.levels = levels.clone();
        }
    }

    /// Pad missing levels with defaults. Extra stored levels are kept.
    pub(crate) fn ensure_levels(&mut self, key: LeveledKey) {
        let defaults = Self::default_for(key);
        if self.levels.len() < defaults.levels.len() {
            let missing = defaults.levels.len() - self.levels.len();
            self.levels
                .extend(defaults.levels.into_iter().rev().take(missing).rev());
        }
    }
}

/// Group-level patch. `levels` replaces the whole list; per-level edits go
/// through [`LevelPatch`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPatch {
    pub enabled: Option<bool>,
    pub active_tab: Option<usize>,
    pub levels: Option<Vec<LevelSettings>>,
}
