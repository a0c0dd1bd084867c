/// The settings document: every editable entity plus the global app config.
pub mod entity;
pub mod rune;
pub mod tweaks;

use crate::catalog::{CommonItem, GemGroup, ItemGroup, LeveledKey, PotionGroup, Rune};
use crate::config::AppConfig;
use crate::locale::normalize_selected_locales;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub use entity::{
    EntityPatch, EntitySettings, GroupPatch, ItemPatch, ItemSettings, LevelPatch, LevelSettings,
    LeveledGroupSettings, DIFFICULTY_MARKERS,
};
pub use rune::{
    extract_base_rune_name, AutoRuneSettings, DividerType, GeneralRunePatch, GeneralRuneSettings,
    ManualRuneSettings, NumberingSettings, RuneMode, RunePatch, RuneSettings,
};
pub use tweaks::{
    EncyclopediaLanguage, StashPatch, StashRenameSettings, TweaksPatch, TweaksSettings,
    DEFAULT_STASH_LABEL, STASH_TAB_COUNT,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonSettings {
    #[serde(default)]
    pub items: BTreeMap<CommonItem, EntitySettings>,
    #[serde(default)]
    pub potions: BTreeMap<PotionGroup, LeveledGroupSettings>,
}

impl Default for CommonSettings {
    fn default() -> Self {
        Self {
            items: CommonItem::ALL
                .iter()
                .map(|item| (*item, EntitySettings::default_for(*item)))
                .collect(),
            potions: PotionGroup::ALL
                .iter()
                .map(|group| (*group, LeveledGroupSettings::default_for((*group).into())))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemsSettings {
    #[serde(default)]
    pub groups: BTreeMap<ItemGroup, LeveledGroupSettings>,
    /// Catalog items keyed by their bundled identifier. Only edited items are stored.
    #[serde(default)]
    pub items: BTreeMap<String, ItemSettings>,
}

impl Default for ItemsSettings {
    fn default() -> Self {
        Self {
            groups: ItemGroup::ALL
                .iter()
                .map(|group| (*group, LeveledGroupSettings::default_for((*group).into())))
                .collect(),
            items: BTreeMap::new(),
        }
    }
}

fn default_gems() -> BTreeMap<GemGroup, LeveledGroupSettings> {
    GemGroup::ALL
        .iter()
        .map(|group| (*group, LeveledGroupSettings::default_for((*group).into())))
        .collect()
}

fn default_runes() -> BTreeMap<Rune, RuneSettings> {
    Rune::ALL
        .iter()
        .map(|rune| (*rune, RuneSettings::default()))
        .collect()
}

/// Top-level sections, used for change notification and section diffs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Section {
    App,
    Runes,
    GeneralRunes,
    Common,
    Gems,
    Items,
    Tweaks,
    StashRename,
}

impl Section {
    pub const ALL: [Section; 8] = [
        Section::App,
        Section::Runes,
        Section::GeneralRunes,
        Section::Common,
        Section::Gems,
        Section::Items,
        Section::Tweaks,
        Section::StashRename,
    ];

    /// Sections stored per profile. App config and tweaks are global.
    pub fn is_profile_scoped(self) -> bool {
        !matches!(self, Section::App | Section::Tweaks)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDocument {
    #[serde(flatten)]
    pub app: AppConfig,
    #[serde(default = "default_runes")]
    pub runes: BTreeMap<Rune, RuneSettings>,
    #[serde(default)]
    pub general_runes: GeneralRuneSettings,
    #[serde(default)]
    pub common: CommonSettings,
    #[serde(default = "default_gems")]
    pub gems: BTreeMap<GemGroup, LeveledGroupSettings>,
    #[serde(default)]
    pub items: ItemsSettings,
    #[serde(default)]
    pub tweaks: TweaksSettings,
    #[serde(default)]
    pub stash_rename: StashRenameSettings,
}

impl Default for SettingsDocument {
    fn default() -> Self {
        Self {
            app: AppConfig::default(),
            runes: default_runes(),
            general_runes: GeneralRuneSettings::default(),
            common: CommonSettings::default(),
            gems: default_gems(),
            items: ItemsSettings::default(),
            tweaks: TweaksSettings::default(),
            stash_rename: StashRenameSettings::default(),
        }
    }
}

impl SettingsDocument {
    pub fn leveled(&self, key: LeveledKey) -> Option<&LeveledGroupSettings> {
        match key {
            LeveledKey::Potion(group) => self.common.potions.get(&group),
            LeveledKey::Gem(group) => self.gems.get(&group),
            LeveledKey::Item(group) => self.items.groups.get(&group),
        }
    }

    /// Entry for `key`, synthesized from defaults first if it is missing.
    pub fn leveled_mut(&mut self, key: LeveledKey) -> &mut LeveledGroupSettings {
        let make = || LeveledGroupSettings::default_for(key);
        match key {
            LeveledKey::Potion(group) => self.common.potions.entry(group).or_insert_with(make),
            LeveledKey::Gem(group) => self.gems.entry(group).or_insert_with(make),
            LeveledKey::Item(group) => self.items.groups.entry(group).or_insert_with(make),
        }
    }

    /// Repair a document loaded from storage or imported from a file.
    ///
    /// Missing catalog keys get defaults, short level lists are padded, and
    /// difficulty markers left completely blank are restored.
    pub fn normalize(&mut self) {
        self.app.selected_locales = normalize_selected_locales(&self.app.selected_locales);

        for rune in Rune::ALL {
            self.runes.entry(*rune).or_default();
        }
        for item in CommonItem::ALL {
            self.common
                .items
                .entry(*item)
                .or_insert_with(|| EntitySettings::default_for(*item));
        }
        for key in LeveledKey::all() {
            self.leveled_mut(key).ensure_levels(key);
        }

        let marker_key = LeveledKey::Item(ItemGroup::DifficultyClassMarkers);
        let defaults = LeveledGroupSettings::default_for(marker_key);
        let markers = self.leveled_mut(marker_key);
        markers.enabled = true;
        for (level, default) in markers.levels.iter_mut().zip(defaults.levels) {
            level.enabled = true;
            if level.locales.is_blank() {
                level.locales = default.locales;
            }
        }
    }

    /// Copy the global (non profile-scoped) sections from `other`.
    pub fn keep_globals_from(&mut self, other: &SettingsDocument) {
        self.app = other.app.clone();
        self.tweaks = other.tweaks.clone();
    }

    /// Reset every profile-scoped section to its defaults.
    pub fn reset_profile_sections(&mut self) {
        let defaults = SettingsDocument::default();
        self.runes = defaults.runes;
        self.general_runes = defaults.general_runes;
        self.common = defaults.common;
        self.gems = defaults.gems;
        self.items = defaults.items;
        self.stash_rename = defaults.stash_rename;
    }

    pub fn section_eq(&self, other: &SettingsDocument, section: Section) -> bool {
        match section {
            Section::App => self.app == other.app,
            Section::Runes => self.runes == other.runes,
            Section::GeneralRunes => self.general_runes == other.general_runes,
            Section::Common => self.common == other.common,
            Section::Gems => self.gems == other.gems,
            Section::Items => self.items == other.items,
            Section::Tweaks => self.tweaks == other.tweaks,
            Section::StashRename => self.stash_rename == other.stash_rename,
        }
    }
}
