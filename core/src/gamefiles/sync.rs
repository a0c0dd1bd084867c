//! Moving settings between the store and the game's string tables.
//!
//! Read flows parse everything into a [`SettingsUpdate`] before touching the
//! store, so a failed read leaves it as it was. Apply flows load the tables,
//! rewrite the selected locales, and save each table once.

use super::strings::{StringEntry, StringTable};
use super::{GameFileError, GameFiles, GameFs};
use crate::catalog::{
    quality_prefix_refs, CommonItem, GemGroup, ItemGroup, LeveledKey, PotionGroup, Rune,
    StringFile, StringRef,
};
use crate::color::remove_color_codes;
use crate::locale::{locale_patch, LocaleCode, LocalePatch, LocaleRecord};
use crate::settings::{
    extract_base_rune_name, EntityPatch, ItemPatch, LevelPatch, LeveledGroupSettings, RunePatch,
    SettingsDocument, StashPatch, TweaksPatch,
};
use crate::store::SettingsStore;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which part of the string tables a flow touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StringCategory {
    Common,
    Gems,
    Runes,
    Items,
}

impl StringCategory {
    pub const ALL: [StringCategory; 4] = [
        StringCategory::Common,
        StringCategory::Gems,
        StringCategory::Runes,
        StringCategory::Items,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DifficultyTier {
    Normal,
    Exceptional,
    Elite,
}

impl DifficultyTier {
    /// Index into the difficulty-marker levels.
    pub fn marker_level(self) -> usize {
        match self {
            DifficultyTier::Normal => 0,
            DifficultyTier::Exceptional => 1,
            DifficultyTier::Elite => 2,
        }
    }
}

/// A weapon or armor base from the bundled catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
    pub key: String,
    pub id: u32,
    #[serde(rename = "difficultyClass")]
    pub tier: DifficultyTier,
}

impl CatalogItem {
    pub fn parse_list(json: &str) -> Result<Vec<CatalogItem>, String> {
        serde_json::from_str(json).map_err(|e| format!("Failed to parse item catalog: {}", e))
    }
}

/// The loaded string tables. Only `item-names.json` is required; a missing
/// optional table is skipped on read and never created on write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StringTables {
    tables: BTreeMap<StringFile, StringTable>,
}

impl StringTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, file: StringFile, table: StringTable) {
        self.tables.insert(file, table);
    }

    pub fn get(&self, file: StringFile) -> Option<&StringTable> {
        self.tables.get(&file)
    }

    pub fn files(&self) -> impl Iterator<Item = StringFile> + '_ {
        self.tables.keys().copied()
    }

    pub fn find(&self, reference: &StringRef) -> Option<&StringEntry> {
        self.tables.get(&reference.file)?.find(reference)
    }

    /// Returns false when the referenced table was not loaded.
    pub fn upsert<F>(&mut self, reference: &StringRef, selected: &[LocaleCode], value: F) -> bool
    where
        F: Fn(LocaleCode) -> String,
    {
        match self.tables.get_mut(&reference.file) {
            Some(table) => {
                table.upsert(reference, selected, value);
                true
            }
            None => {
                warn!(
                    "skipping {} ({}), table not loaded",
                    reference.key,
                    reference.file.file_name()
                );
                false
            }
        }
    }
}

/// Parsed file contents, ready to be applied to the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub common: Vec<(CommonItem, EntityPatch)>,
    pub levels: Vec<(LeveledKey, usize, LevelPatch)>,
    pub runes: Vec<(Rune, RunePatch)>,
    pub items: Vec<(String, ItemPatch)>,
    pub tweaks: Option<TweaksPatch>,
    pub stash: Option<StashPatch>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        self.common.is_empty()
            && self.levels.is_empty()
            && self.runes.is_empty()
            && self.items.is_empty()
            && self.tweaks.is_none()
            && self.stash.is_none()
    }

    pub fn merge(&mut self, other: SettingsUpdate) {
        self.common.extend(other.common);
        self.levels.extend(other.levels);
        self.runes.extend(other.runes);
        self.items.extend(other.items);
        if other.tweaks.is_some() {
            self.tweaks = other.tweaks;
        }
        if other.stash.is_some() {
            self.stash = other.stash;
        }
    }

    pub fn apply_to(&self, store: &mut SettingsStore) {
        for (item, patch) in &self.common {
            store.update_common_item(*item, patch);
        }
        for (key, level, patch) in &self.levels {
            store.update_leveled_level(*key, *level, patch);
        }
        for (rune, patch) in &self.runes {
            store.update_rune_settings(*rune, patch);
        }
        for (key, patch) in &self.items {
            store.update_item_settings(key, patch);
        }
        if let Some(patch) = &self.tweaks {
            store.update_tweaks(patch);
        }
        if let Some(patch) = &self.stash {
            store.update_stash_rename(patch);
        }
    }
}

fn full_patch(locales: &LocaleRecord, transform: impl Fn(&str) -> String) -> LocalePatch {
    locale_patch(locales.iter().map(|(code, value)| (code, transform(value))))
}

fn leveled_refs(key: LeveledKey) -> Vec<StringRef> {
    match key {
        LeveledKey::Potion(group) => group.string_refs(),
        LeveledKey::Gem(group) => group.string_refs(),
        // Item groups are handled by the item flows.
        LeveledKey::Item(_) => Vec::new(),
    }
}

fn read_leveled(tables: &StringTables, key: LeveledKey, update: &mut SettingsUpdate) {
    for (level, reference) in leveled_refs(key).iter().enumerate() {
        if let Some(entry) = tables.find(reference) {
            update.levels.push((
                key,
                level,
                LevelPatch {
                    enabled: Some(!entry.locales.get(LocaleCode::EnUs).is_empty()),
                    locales: full_patch(&entry.locales, str::to_string),
                    ..Default::default()
                },
            ));
        }
    }
}

/// Simple common items and potion groups.
pub fn read_common(tables: &StringTables) -> SettingsUpdate {
    let mut update = SettingsUpdate::default();
    for item in CommonItem::ALL {
        if let Some(entry) = tables.find(&item.string_ref()) {
            update.common.push((
                *item,
                EntityPatch {
                    enabled: Some(!entry.locales.get(LocaleCode::EnUs).is_empty()),
                    locales: full_patch(&entry.locales, str::to_string),
                    ..Default::default()
                },
            ));
        }
    }
    for group in PotionGroup::ALL {
        read_leveled(tables, (*group).into(), &mut update);
    }
    update
}

pub fn read_gems(tables: &StringTables) -> SettingsUpdate {
    let mut update = SettingsUpdate::default();
    for group in GemGroup::ALL {
        read_leveled(tables, (*group).into(), &mut update);
    }
    update
}

/// Rune names with their decoration removed, stored as manual locales.
pub fn read_runes(tables: &StringTables, doc: &SettingsDocument) -> SettingsUpdate {
    let mut update = SettingsUpdate::default();
    for rune in Rune::ALL {
        let Some(entry) = tables.find(&rune.string_ref()) else {
            continue;
        };
        let limiters = doc
            .runes
            .get(rune)
            .map_or(doc.general_runes.box_limiters.as_str(), |settings| {
                settings.auto_settings.box_limiters.as_str()
            });
        let locales = full_patch(&entry.locales, |value| {
            let upright = value.lines().rev().collect::<Vec<_>>().join("\n");
            extract_base_rune_name(&upright, limiters)
        });
        update.runes.push((
            *rune,
            RunePatch {
                locales,
                ..Default::default()
            },
        ));
    }
    update
}

fn marker_values(doc: &SettingsDocument, locale: LocaleCode) -> Vec<String> {
    doc.leveled(ItemGroup::DifficultyClassMarkers.into())
        .map(|group| {
            group
                .levels
                .iter()
                .map(|level| level.locales.get(locale).trim().to_string())
                .filter(|marker| !marker.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

fn strip_marker(value: &str, markers: &[String]) -> Option<String> {
    let trimmed = value.trim_end();
    markers
        .iter()
        .find(|marker| trimmed.ends_with(marker.as_str()))
        .map(|marker| trimmed[..trimmed.len() - marker.len()].trim().to_string())
}

fn read_quality_prefixes(tables: &StringTables, selected: &[LocaleCode], update: &mut SettingsUpdate) {
    let key: LeveledKey = ItemGroup::QualityPrefixes.into();
    for level in 0..key.level_count() {
        let entries: Vec<&StringEntry> = quality_prefix_refs(level)
            .iter()
            .filter_map(|reference| tables.find(reference))
            .collect();
        let Some(first) = entries.first() else {
            continue;
        };
        let mut locales = first.locales.clone();
        for code in LocaleCode::ALL {
            locales.set(code, remove_color_codes(first.locales.get(code)));
        }
        let disagree = entries.iter().skip(1).any(|other| {
            selected
                .iter()
                .any(|code| remove_color_codes(other.locales.get(*code)) != locales.get(*code))
        });
        if disagree {
            for code in selected {
                locales.set(*code, "");
            }
        }
        update.levels.push((
            key,
            level,
            LevelPatch {
                enabled: Some(true),
                locales: full_patch(&locales, str::to_string),
                ..Default::default()
            },
        ));
    }
}

/// Quality prefixes plus every catalog item found in `item-names.json`.
pub fn read_items(
    tables: &StringTables,
    doc: &SettingsDocument,
    catalog: &[CatalogItem],
) -> SettingsUpdate {
    let selected = &doc.app.selected_locales;
    let mut update = SettingsUpdate::default();
    read_quality_prefixes(tables, selected, &mut update);

    let Some(names) = tables.get(StringFile::ItemNames) else {
        return update;
    };
    let markers: BTreeMap<LocaleCode, Vec<String>> = selected
        .iter()
        .map(|code| (*code, marker_values(doc, *code)))
        .collect();

    for item in catalog {
        let Some(entry) = names.by_id(item.id) else {
            continue;
        };
        let mut locales = LocaleRecord::default();
        for (code, value) in entry.locales.iter() {
            locales.set(code, remove_color_codes(value));
        }
        let enabled = selected
            .iter()
            .any(|code| !locales.get(*code).trim().is_empty());

        let mut show_marker = false;
        for code in selected {
            let Some(locale_markers) = markers.get(code) else {
                continue;
            };
            if let Some(stripped) = strip_marker(locales.get(*code), locale_markers) {
                locales.set(*code, stripped);
                show_marker = true;
            }
        }

        update.items.push((
            item.key.clone(),
            ItemPatch {
                enabled: Some(enabled),
                show_difficulty_class_marker: Some(show_marker),
                locales: full_patch(&locales, str::to_string),
            },
        ));
    }
    update
}

fn leveled_or_default(doc: &SettingsDocument, key: LeveledKey) -> LeveledGroupSettings {
    doc.leveled(key)
        .cloned()
        .unwrap_or_else(|| LeveledGroupSettings::default_for(key))
}

fn apply_leveled(tables: &mut StringTables, doc: &SettingsDocument, key: LeveledKey) {
    let selected = &doc.app.selected_locales;
    let group = leveled_or_default(doc, key);
    for (level, reference) in leveled_refs(key).iter().enumerate() {
        let Some(settings) = group.levels.get(level) else {
            continue;
        };
        tables.upsert(reference, selected, |code| {
            if settings.enabled {
                remove_color_codes(settings.locales.get_or_english(code))
            } else {
                String::new()
            }
        });
    }
}

pub fn apply_common(tables: &mut StringTables, doc: &SettingsDocument) {
    let selected = &doc.app.selected_locales;
    for item in CommonItem::ALL {
        let settings = doc
            .common
            .items
            .get(item)
            .cloned()
            .unwrap_or_else(|| crate::settings::EntitySettings::default_for(*item));
        tables.upsert(&item.string_ref(), selected, |code| {
            if settings.enabled {
                remove_color_codes(settings.locales.get_or_english(code))
            } else {
                String::new()
            }
        });
    }
    for group in PotionGroup::ALL {
        apply_leveled(tables, doc, (*group).into());
    }
}

pub fn apply_gems(tables: &mut StringTables, doc: &SettingsDocument) {
    for group in GemGroup::ALL {
        apply_leveled(tables, doc, (*group).into());
    }
}

pub fn apply_runes(tables: &mut StringTables, doc: &SettingsDocument) {
    let selected = &doc.app.selected_locales;
    for rune in Rune::ALL {
        let settings = doc.runes.get(rune).cloned().unwrap_or_default();
        tables.upsert(&rune.string_ref(), selected, |code| {
            settings.render_name(*rune, code)
        });
    }
}

/// Catalog items keep the file's current name unless a custom one is set.
/// Quality prefixes are written to both records of each level.
pub fn apply_items(tables: &mut StringTables, doc: &SettingsDocument, catalog: &[CatalogItem]) {
    let selected = &doc.app.selected_locales;
    let markers = leveled_or_default(doc, ItemGroup::DifficultyClassMarkers.into());
    let prefixes = leveled_or_default(doc, ItemGroup::QualityPrefixes.into());

    for (level, settings) in prefixes.levels.iter().enumerate() {
        for reference in quality_prefix_refs(level) {
            let current = tables.find(&reference).map(|entry| entry.locales.clone());
            tables.upsert(&reference, selected, |code| {
                if !settings.enabled {
                    return String::new();
                }
                let custom = settings.locales.get(code);
                if custom.trim().is_empty() {
                    current
                        .as_ref()
                        .map(|locales| locales.get(code).to_string())
                        .unwrap_or_default()
                } else {
                    custom.to_string()
                }
            });
        }
    }

    for item in catalog {
        let Some(settings) = doc.items.items.get(&item.key) else {
            continue;
        };
        let reference = item_ref(item);
        let Some(current) = tables.find(&reference).map(|entry| entry.locales.clone()) else {
            warn!("catalog item {} (id {}) missing from item-names.json", item.key, item.id);
            continue;
        };
        let marker_level = markers.levels.get(item.tier.marker_level());
        tables.upsert(&reference, selected, |code| {
            if !settings.enabled {
                return String::new();
            }
            let custom = settings.locales.get(code);
            let base = if custom.trim().is_empty() {
                current.get(code)
            } else {
                custom
            };
            let known = marker_values(doc, code);
            let mut name = strip_marker(base, &known).unwrap_or_else(|| base.to_string());
            if settings.show_difficulty_class_marker {
                if let Some(marker) = marker_level
                    .map(|level| level.locales.get(code).trim())
                    .filter(|marker| !marker.is_empty())
                {
                    name = format!("{name} {marker}");
                }
            }
            name
        });
    }
}

fn item_ref(item: &CatalogItem) -> StringRef {
    // Catalog keys are owned data, so the record is addressed by id alone.
    StringRef {
        file: StringFile::ItemNames,
        key: "",
        id: Some(item.id),
    }
}

impl<F: GameFs> GameFiles<F> {
    /// `item-names.json` must exist; the other tables are optional.
    pub fn load_string_tables(&self) -> Result<StringTables, GameFileError> {
        let mut tables = StringTables::new();
        for file in StringFile::ALL {
            let path = self.layout().string_file(file);
            if file != StringFile::ItemNames && !self.fs().exists(&path) {
                warn!("{} not found, skipping", path.display());
                continue;
            }
            let contents = self.read(&path)?;
            let table = StringTable::parse(&contents)
                .map_err(|source| GameFileError::Parse { path, source })?;
            tables.insert(file, table);
        }
        Ok(tables)
    }

    pub fn save_string_tables(&self, tables: &StringTables) -> Result<(), GameFileError> {
        for file in tables.files() {
            if let Some(table) = tables.get(file) {
                let path = self.layout().string_file(file);
                self.write(&path, &table.to_json()?)?;
            }
        }
        Ok(())
    }

    /// Parse the requested categories without touching the store.
    pub fn read_strings(
        &self,
        doc: &SettingsDocument,
        categories: &[StringCategory],
        catalog: &[CatalogItem],
    ) -> Result<SettingsUpdate, GameFileError> {
        let tables = self.load_string_tables()?;
        let mut update = SettingsUpdate::default();
        for category in categories {
            update.merge(match category {
                StringCategory::Common => read_common(&tables),
                StringCategory::Gems => read_gems(&tables),
                StringCategory::Runes => read_runes(&tables, doc),
                StringCategory::Items => read_items(&tables, doc, catalog),
            });
        }
        Ok(update)
    }

    /// Write the requested categories into the string tables.
    pub fn apply_strings(
        &self,
        doc: &SettingsDocument,
        categories: &[StringCategory],
        catalog: &[CatalogItem],
    ) -> Result<(), GameFileError> {
        let mut tables = self.load_string_tables()?;
        for category in categories {
            match category {
                StringCategory::Common => apply_common(&mut tables, doc),
                StringCategory::Gems => apply_gems(&mut tables, doc),
                StringCategory::Runes => apply_runes(&mut tables, doc),
                StringCategory::Items => apply_items(&mut tables, doc, catalog),
            }
        }
        self.save_string_tables(&tables)?;
        info!(
            "applied {} string categories to {}",
            categories.len(),
            self.layout().strings_dir().display()
        );
        Ok(())
    }
}
