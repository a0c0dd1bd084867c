//! The settings store: owner of the live document and the profile list.
//!
//! The store never performs I/O. The composition root loads a
//! [`PersistedState`], hands it to [`SettingsStore::hydrate`], and writes
//! [`SettingsStore::persisted_state`] back whenever it decides to persist.

use crate::catalog::{CommonItem, LeveledKey, Rune};
use crate::config::{AppConfig, AppConfigPatch, AppMode, Theme};
use crate::diff::{BaselineDiff, BaselineState};
use crate::locale::{default_selected_locales, LocaleCode};
use crate::persistence::PersistedState;
use crate::profile::{
    avoid_preset_name, copy_name, export_file_name, export_profile_json, is_newer_version,
    parse_profile_import, unique_name, Profile, ProfileError, ProfileSummary,
    DEFAULT_PROFILE_NAME,
};
use crate::settings::{
    EntityPatch, EntitySettings, GeneralRunePatch, GeneralRuneSettings, GroupPatch, ItemPatch,
    ItemSettings, LevelPatch, LeveledGroupSettings, RunePatch, RuneSettings, Section,
    SettingsDocument, StashPatch, StashRenameSettings, TweaksPatch, TweaksSettings,
};
use log::{debug, info, warn};
use serde::Serialize;
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

/// What changed, delivered to subscribers after every mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum StoreEvent {
    /// A profile-scoped section or the global tweaks changed.
    Settings(Section),
    AppConfig,
    Profiles,
    ActiveProfile(Option<String>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type Listener = Box<dyn Fn(&StoreEvent) + Send + Sync>;

/// Exported profile ready to be written wherever the user chooses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileExport {
    pub file_name: String,
    pub json: String,
}

fn section_of(key: LeveledKey) -> Section {
    match key {
        LeveledKey::Potion(_) => Section::Common,
        LeveledKey::Gem(_) => Section::Gems,
        LeveledKey::Item(_) => Section::Items,
    }
}

pub struct SettingsStore {
    live: SettingsDocument,
    profiles: Vec<Profile>,
    presets: Vec<Profile>,
    immutable_overrides: BTreeMap<String, Profile>,
    active_profile_id: Option<String>,
    admin_mode: bool,
    revision: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_listener: u64,
}

impl fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsStore")
            .field("profiles", &self.profiles.len())
            .field("presets", &self.presets.len())
            .field("active_profile_id", &self.active_profile_id)
            .field("admin_mode", &self.admin_mode)
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for SettingsStore {
    fn default() -> Self {
        Self::new()
    }
}

/// The presets shipped with the application.
pub fn builtin_presets() -> Vec<Profile> {
    let mut default = Profile::preset(DEFAULT_PROFILE_NAME, SettingsDocument::default(), "1.0");
    default.is_default = true;
    vec![default]
}

impl SettingsStore {
    /// Defaults, no profiles, nothing active.
    pub fn new() -> Self {
        Self {
            live: SettingsDocument::default(),
            profiles: Vec::new(),
            presets: Vec::new(),
            immutable_overrides: BTreeMap::new(),
            active_profile_id: None,
            admin_mode: false,
            revision: 0,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Rebuild the store from persisted state.
    ///
    /// The stored active id wins if it still exists. Otherwise a profile named
    /// "default" is activated, then the first profile at all.
    pub fn hydrate(state: PersistedState, presets: Vec<Profile>) -> Self {
        let mut store = Self::new();
        store.immutable_overrides = state.immutable_overrides;
        store.presets = presets
            .into_iter()
            .map(|mut preset| {
                preset.is_immutable = true;
                if let Some(update) = store.immutable_overrides.get(&preset.name.to_lowercase()) {
                    if is_newer_version(update.version.as_deref(), preset.version.as_deref())
                        || update.version == preset.version
                    {
                        preset.settings = update.settings.clone();
                        preset.version = update.version.clone();
                        preset.modified_at = update.modified_at.clone();
                    }
                }
                preset
            })
            .collect();
        store.profiles = state
            .profiles
            .into_iter()
            .filter(|profile| !profile.is_immutable)
            .collect();

        if let Some(settings) = state.settings {
            store.live = settings;
        }
        if let Some(app) = state.app {
            store.live.app = app;
        }
        if let Some(tweaks) = state.tweaks {
            store.live.tweaks = tweaks;
        }

        let stored_active = state
            .active_profile_id
            .filter(|id| store.profile(id).is_some());
        match stored_active {
            Some(id) => {
                store.load_snapshot(&id);
                store.active_profile_id = Some(id);
            }
            None => {
                let fallback = store
                    .all_profiles()
                    .find(|profile| profile.name.eq_ignore_ascii_case("default"))
                    .or_else(|| store.all_profiles().next())
                    .map(|profile| profile.id.clone());
                if let Some(id) = fallback {
                    store.load_snapshot(&id);
                    store.active_profile_id = Some(id);
                }
            }
        }

        info!(
            "settings store ready: {} user profiles, {} presets, active {:?}",
            store.profiles.len(),
            store.presets.len(),
            store.active_profile_id
        );
        store
    }

    /// What should survive a restart. Unsaved edits to an active profile are
    /// not part of it; they are dropped in favor of the profile snapshot.
    pub fn persisted_state(&self) -> PersistedState {
        PersistedState {
            settings: self
                .active_profile_id
                .is_none()
                .then(|| self.live.clone()),
            app: Some(self.live.app.clone()),
            tweaks: Some(self.live.tweaks.clone()),
            profiles: self.profiles.clone(),
            active_profile_id: self.active_profile_id.clone(),
            immutable_overrides: self.immutable_overrides.clone(),
        }
    }

    // ---- change notification ----

    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&StoreEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        before != self.listeners.len()
    }

    /// Incremented on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn notify(&mut self, event: StoreEvent) {
        self.revision += 1;
        debug!("store revision {}: {:?}", self.revision, event);
        for (_, listener) in &self.listeners {
            listener(&event);
        }
    }

    // ---- whole document ----

    pub fn all_settings(&self) -> &SettingsDocument {
        &self.live
    }

    pub fn replace_all_settings(&mut self, mut doc: SettingsDocument) {
        doc.normalize();
        self.live = doc;
        self.notify(StoreEvent::AppConfig);
        for section in Section::ALL.into_iter().filter(|s| *s != Section::App) {
            self.notify(StoreEvent::Settings(section));
        }
    }

    /// Reset every profile-scoped section. App config and tweaks are kept.
    pub fn reset_all_settings(&mut self) {
        self.live.reset_profile_sections();
        for section in Section::ALL.into_iter().filter(|s| s.is_profile_scoped()) {
            self.notify(StoreEvent::Settings(section));
        }
    }

    // ---- app config ----

    pub fn app_config(&self) -> &AppConfig {
        &self.live.app
    }

    pub fn update_app_config(&mut self, patch: &AppConfigPatch) {
        self.live.app.apply(patch);
        self.notify(StoreEvent::AppConfig);
    }

    /// Back to defaults, keeping the configured game path.
    pub fn reset_app_config(&mut self) {
        let game_path = std::mem::take(&mut self.live.app.game_path);
        self.live.app = AppConfig {
            game_path,
            ..AppConfig::default()
        };
        self.notify(StoreEvent::AppConfig);
    }

    pub fn selected_locales(&self) -> &[LocaleCode] {
        &self.live.app.selected_locales
    }

    /// enUS is always kept, whatever the caller passes.
    pub fn update_selected_locales(&mut self, codes: &[LocaleCode]) {
        self.update_app_config(&AppConfigPatch {
            selected_locales: Some(codes.to_vec()),
            ..Default::default()
        });
    }

    pub fn reset_selected_locales(&mut self) {
        self.update_selected_locales(&default_selected_locales());
    }

    pub fn app_language(&self) -> &str {
        &self.live.app.app_language
    }

    pub fn update_app_language(&mut self, language: impl Into<String>) {
        self.update_app_config(&AppConfigPatch {
            app_language: Some(language.into()),
            ..Default::default()
        });
    }

    pub fn theme(&self) -> Theme {
        self.live.app.theme
    }

    pub fn is_dark_theme(&self) -> bool {
        self.live.app.is_dark_theme()
    }

    pub fn update_theme(&mut self, theme: Theme) {
        self.update_app_config(&AppConfigPatch {
            theme: Some(theme),
            ..Default::default()
        });
    }

    pub fn toggle_theme(&mut self) {
        self.update_theme(self.theme().toggled());
    }

    pub fn app_mode(&self) -> AppMode {
        self.live.app.app_mode
    }

    pub fn update_app_mode(&mut self, mode: AppMode) {
        self.update_app_config(&AppConfigPatch {
            app_mode: Some(mode),
            ..Default::default()
        });
    }

    pub fn toggle_app_mode(&mut self) {
        self.update_app_mode(self.app_mode().toggled());
    }

    pub fn debug_mode(&self) -> bool {
        self.live.app.debug_mode
    }

    pub fn update_debug_mode(&mut self, enabled: bool) {
        self.update_app_config(&AppConfigPatch {
            debug_mode: Some(enabled),
            ..Default::default()
        });
    }

    pub fn toggle_debug_mode(&mut self) {
        self.update_debug_mode(!self.debug_mode());
    }

    pub fn game_path(&self) -> &str {
        &self.live.app.game_path
    }

    pub fn update_game_path(&mut self, path: impl Into<String>) {
        self.update_app_config(&AppConfigPatch {
            game_path: Some(path.into()),
            ..Default::default()
        });
    }

    // ---- runes ----

    pub fn rune_settings(&self, rune: Rune) -> Cow<'_, RuneSettings> {
        match self.live.runes.get(&rune) {
            Some(settings) => Cow::Borrowed(settings),
            None => Cow::Owned(RuneSettings::default()),
        }
    }

    pub fn update_rune_settings(&mut self, rune: Rune, patch: &RunePatch) {
        self.live.runes.entry(rune).or_default().apply(patch);
        self.notify(StoreEvent::Settings(Section::Runes));
    }

    pub fn update_multiple_rune_settings(&mut self, runes: &[Rune], patch: &RunePatch) {
        for rune in runes {
            self.live.runes.entry(*rune).or_default().apply(patch);
        }
        self.notify(StoreEvent::Settings(Section::Runes));
    }

    pub fn reset_rune_settings(&mut self, rune: Rune) {
        self.reset_multiple_rune_settings(&[rune]);
    }

    pub fn reset_multiple_rune_settings(&mut self, runes: &[Rune]) {
        for rune in runes {
            self.live.runes.insert(*rune, RuneSettings::default());
        }
        self.notify(StoreEvent::Settings(Section::Runes));
    }

    pub fn general_rune_settings(&self) -> &GeneralRuneSettings {
        &self.live.general_runes
    }

    pub fn update_general_rune_settings(&mut self, patch: &GeneralRunePatch) {
        self.live.general_runes.apply(patch);
        self.notify(StoreEvent::Settings(Section::GeneralRunes));
    }

    pub fn reset_general_rune_settings(&mut self) {
        self.live.general_runes = GeneralRuneSettings::default();
        self.notify(StoreEvent::Settings(Section::GeneralRunes));
    }

    /// Push the shared numbering and box styling into every rune.
    pub fn apply_general_rune_settings_to_all(&mut self) {
        let general = self.live.general_runes.clone();
        for rune in Rune::ALL {
            general.stamp(self.live.runes.entry(*rune).or_default());
        }
        self.notify(StoreEvent::Settings(Section::Runes));
    }

    // ---- common items ----

    pub fn common_item(&self, item: CommonItem) -> Cow<'_, EntitySettings> {
        match self.live.common.items.get(&item) {
            Some(settings) => Cow::Borrowed(settings),
            None => Cow::Owned(EntitySettings::default_for(item)),
        }
    }

    pub fn update_common_item(&mut self, item: CommonItem, patch: &EntityPatch) {
        self.live
            .common
            .items
            .entry(item)
            .or_insert_with(|| EntitySettings::default_for(item))
            .apply(patch);
        self.notify(StoreEvent::Settings(Section::Common));
    }

    /// Reset simple common items and potion groups.
    pub fn reset_common_settings(&mut self) {
        self.live.common = Default::default();
        self.notify(StoreEvent::Settings(Section::Common));
    }

    // ---- leveled groups (potions, gems, item groups) ----

    pub fn leveled_group(&self, key: LeveledKey) -> Cow<'_, LeveledGroupSettings> {
        match self.live.leveled(key) {
            Some(group) => Cow::Borrowed(group),
            None => Cow::Owned(LeveledGroupSettings::default_for(key)),
        }
    }

    /// Effective tab index, clamped at read time.
    pub fn active_level(&self, key: LeveledKey) -> usize {
        self.leveled_group(key).effective_active_tab()
    }

    pub fn update_leveled_group(&mut self, key: LeveledKey, patch: &GroupPatch) {
        self.live.leveled_mut(key).apply(patch);
        self.notify(StoreEvent::Settings(section_of(key)));
    }

    /// `level` must come from the group's `levels`. Anything else is ignored
    /// with a warning and leaves the document untouched.
    pub fn update_leveled_level(&mut self, key: LeveledKey, level: usize, patch: &LevelPatch) {
        let len = self
            .live
            .leveled(key)
            .map_or(key.level_count(), |group| group.levels.len());
        if level >= len {
            warn!("ignoring update for level {level} of {key:?}, it has {len} levels");
            return;
        }
        self.live.leveled_mut(key).levels[level].apply(patch);
        self.notify(StoreEvent::Settings(section_of(key)));
    }

    pub fn reset_gem_settings(&mut self) {
        self.live.gems = SettingsDocument::default().gems;
        self.notify(StoreEvent::Settings(Section::Gems));
    }

    /// Reset item groups and every catalog item.
    pub fn reset_items_settings(&mut self) {
        self.live.items = Default::default();
        self.notify(StoreEvent::Settings(Section::Items));
    }

    // ---- catalog items ----

    pub fn item_settings(&self, key: &str) -> Cow<'_, ItemSettings> {
        match self.live.items.items.get(key) {
            Some(settings) => Cow::Borrowed(settings),
            None => Cow::Owned(ItemSettings::default()),
        }
    }

    pub fn update_item_settings(&mut self, key: &str, patch: &ItemPatch) {
        self.live
            .items
            .items
            .entry(key.to_string())
            .or_default()
            .apply(patch);
        self.notify(StoreEvent::Settings(Section::Items));
    }

    pub fn reset_item_settings(&mut self, key: &str) {
        if self.live.items.items.remove(key).is_some() {
            self.notify(StoreEvent::Settings(Section::Items));
        }
    }

    // ---- tweaks and stash ----

    pub fn tweaks(&self) -> &TweaksSettings {
        &self.live.tweaks
    }

    pub fn update_tweaks(&mut self, patch: &TweaksPatch) {
        self.live.tweaks.apply(patch);
        self.notify(StoreEvent::Settings(Section::Tweaks));
    }

    pub fn reset_tweaks(&mut self) {
        self.live.tweaks = TweaksSettings::default();
        self.notify(StoreEvent::Settings(Section::Tweaks));
    }

    pub fn stash_rename(&self) -> &StashRenameSettings {
        &self.live.stash_rename
    }

    pub fn set_stash_tab(&mut self, index: usize, label: impl Into<String>) {
        if self.live.stash_rename.set_tab(index, label) {
            self.notify(StoreEvent::Settings(Section::StashRename));
        } else {
            warn!("ignoring label for stash tab {index}");
        }
    }

    pub fn update_stash_rename(&mut self, patch: &StashPatch) {
        self.live.stash_rename.apply(patch);
        self.notify(StoreEvent::Settings(Section::StashRename));
    }

    pub fn reset_stash_rename(&mut self) {
        self.live.stash_rename = StashRenameSettings::default();
        self.notify(StoreEvent::Settings(Section::StashRename));
    }

    // ---- baseline diff ----

    pub fn baseline(&self) -> Option<&SettingsDocument> {
        self.active_profile().map(|profile| &profile.settings)
    }

    pub fn diff(&self) -> BaselineDiff<'_> {
        BaselineDiff::new(&self.live, self.baseline())
    }

    pub fn has_changed<T, F>(&self, select: F) -> bool
    where
        T: PartialEq + ?Sized,
        F: for<'d> Fn(&'d SettingsDocument) -> &'d T,
    {
        self.diff().has_changed(select)
    }

    pub fn has_changed_value<T, F>(&self, select: F) -> bool
    where
        T: PartialEq,
        F: Fn(&SettingsDocument) -> T,
    {
        self.diff().has_changed_value(select)
    }

    pub fn baseline_state(&self) -> BaselineState {
        self.diff().state()
    }

    pub fn changed_sections(&self) -> Vec<Section> {
        self.diff().changed_sections()
    }

    // ---- profiles ----

    fn all_profiles(&self) -> impl Iterator<Item = &Profile> + Clone + '_ {
        self.presets.iter().chain(self.profiles.iter())
    }

    fn all_names(&self) -> impl Iterator<Item = &str> + Clone + '_ {
        self.all_profiles().map(|profile| profile.name.as_str())
    }

    /// Presets first, then user profiles in their stored order.
    pub fn list_profiles(&self) -> Vec<ProfileSummary> {
        self.all_profiles().map(Profile::summary).collect()
    }

    pub fn user_profiles(&self) -> &[Profile] {
        &self.profiles
    }

    pub fn immutable_profiles(&self) -> &[Profile] {
        &self.presets
    }

    pub fn immutable_overrides(&self) -> &BTreeMap<String, Profile> {
        &self.immutable_overrides
    }

    pub fn profile(&self, id: &str) -> Option<&Profile> {
        self.all_profiles().find(|profile| profile.id == id)
    }

    fn profile_mut(&mut self, id: &str) -> Option<&mut Profile> {
        self.presets
            .iter_mut()
            .chain(self.profiles.iter_mut())
            .find(|profile| profile.id == id)
    }

    pub fn active_profile_id(&self) -> Option<&str> {
        self.active_profile_id.as_deref()
    }

    pub fn active_profile(&self) -> Option<&Profile> {
        self.active_profile_id
            .as_deref()
            .and_then(|id| self.profile(id))
    }

    pub fn admin_mode(&self) -> bool {
        self.admin_mode
    }

    /// Admin mode allows saving over presets.
    pub fn set_admin_mode(&mut self, enabled: bool) {
        self.admin_mode = enabled;
    }

    fn load_snapshot(&mut self, id: &str) {
        let Some(snapshot) = self.profile(id).map(|profile| profile.settings.clone()) else {
            return;
        };
        let mut next = snapshot;
        next.keep_globals_from(&self.live);
        self.live = next;
    }

    /// Make `id` active and load its snapshot. App config and tweaks stay as they are.
    pub fn set_active_profile(&mut self, id: &str) -> Result<(), ProfileError> {
        if self.profile(id).is_none() {
            return Err(ProfileError::NotFound(id.to_string()));
        }
        self.load_snapshot(id);
        self.active_profile_id = Some(id.to_string());
        for section in Section::ALL.into_iter().filter(|s| s.is_profile_scoped()) {
            self.notify(StoreEvent::Settings(section));
        }
        self.notify(StoreEvent::ActiveProfile(Some(id.to_string())));
        Ok(())
    }

    /// Forget the active profile. The live document is left as it is.
    pub fn clear_active_profile(&mut self) {
        if self.active_profile_id.take().is_some() {
            self.notify(StoreEvent::ActiveProfile(None));
        }
    }

    /// Snapshot the live document as a new user profile and activate it.
    pub fn create_profile(&mut self, name: &str) -> Result<String, ProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        let name = avoid_preset_name(name, self.presets.iter().map(|p| p.name.as_str()));
        let profile = Profile::new(name, self.live.clone());
        let id = profile.id.clone();
        info!("created profile {} ({})", profile.name, id);
        self.profiles.push(profile);
        self.active_profile_id = Some(id.clone());
        self.notify(StoreEvent::Profiles);
        self.notify(StoreEvent::ActiveProfile(Some(id.clone())));
        Ok(id)
    }

    /// Capture the live document as the active profile's new baseline.
    pub fn save_active_profile_from_current(&mut self) -> Result<(), ProfileError> {
        let id = self
            .active_profile_id
            .clone()
            .ok_or(ProfileError::NoActiveProfile)?;
        let admin = self.admin_mode;
        let snapshot = self.live.clone();
        let profile = self
            .profile_mut(&id)
            .ok_or_else(|| ProfileError::NotFound(id.clone()))?;
        if profile.is_immutable && !admin {
            warn!("refusing to save over preset \"{}\"", profile.name);
            return Err(ProfileError::Immutable(profile.name.clone()));
        }
        profile.settings = snapshot;
        profile.touch();
        if profile.is_immutable {
            let stored = profile.clone();
            self.immutable_overrides
                .insert(stored.name.to_lowercase(), stored);
        }
        self.notify(StoreEvent::Profiles);
        Ok(())
    }

    /// Reset the live profile-scoped sections to defaults. The saved baseline
    /// is kept, so the reset shows up as unsaved changes until saved.
    pub fn reset_active_profile_to_defaults(&mut self) {
        self.reset_all_settings();
    }

    pub fn rename_profile(&mut self, id: &str, name: &str) -> Result<(), ProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileError::EmptyName);
        }
        let name = avoid_preset_name(name, self.presets.iter().map(|p| p.name.as_str()));
        let profile = self
            .profiles
            .iter_mut()
            .find(|profile| profile.id == id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        profile.name = name;
        profile.touch();
        self.notify(StoreEvent::Profiles);
        Ok(())
    }

    /// Delete a user profile. Deleting the active one resets the live document.
    pub fn delete_profile(&mut self, id: &str) -> Result<(), ProfileError> {
        if let Some(preset) = self.presets.iter().find(|p| p.id == id) {
            return Err(ProfileError::Immutable(preset.name.clone()));
        }
        let before = self.profiles.len();
        self.profiles.retain(|profile| profile.id != id);
        if self.profiles.len() == before {
            return Err(ProfileError::NotFound(id.to_string()));
        }
        self.notify(StoreEvent::Profiles);
        if self.active_profile_id.as_deref() == Some(id) {
            self.active_profile_id = None;
            self.reset_all_settings();
            self.notify(StoreEvent::ActiveProfile(None));
        }
        Ok(())
    }

    /// Copy any profile (presets included) into a new active user profile.
    pub fn duplicate_profile(&mut self, id: &str) -> Result<String, ProfileError> {
        let source = self
            .profile(id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        let name = copy_name(&source.name, self.all_names());
        let copy = Profile::new(name, source.settings.clone());
        let new_id = copy.id.clone();
        self.profiles.push(copy);
        self.notify(StoreEvent::Profiles);
        self.set_active_profile(&new_id)?;
        Ok(new_id)
    }

    /// Listed ids first in the given order, the rest keep their relative order.
    pub fn reorder_user_profiles(&mut self, ids: &[String]) {
        let mut remaining = std::mem::take(&mut self.profiles);
        let mut ordered = Vec::with_capacity(remaining.len());
        for id in ids {
            if let Some(index) = remaining.iter().position(|profile| &profile.id == id) {
                ordered.push(remaining.remove(index));
            }
        }
        ordered.append(&mut remaining);
        self.profiles = ordered;
        self.notify(StoreEvent::Profiles);
    }

    pub fn export_profile(&self, id: &str) -> Result<ProfileExport, ProfileError> {
        let profile = self
            .profile(id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        let json = export_profile_json(profile)
            .map_err(|err| ProfileError::InvalidImport(err.to_string()))?;
        Ok(ProfileExport {
            file_name: export_file_name(&profile.name),
            json,
        })
    }

    /// Add a profile from exported JSON. Returns the new id; nothing is activated.
    pub fn import_profile(&mut self, json: &str) -> Result<String, ProfileError> {
        let mut imported = parse_profile_import(json)?;
        imported.settings.keep_globals_from(&self.live);
        let name = avoid_preset_name(&imported.name, self.presets.iter().map(|p| p.name.as_str()));
        let name = unique_name(&name, self.all_names());
        let mut profile = Profile::new(name, imported.settings);
        profile.version = imported.version;
        let id = profile.id.clone();
        info!("imported profile {} ({})", profile.name, id);
        self.profiles.push(profile);
        self.notify(StoreEvent::Profiles);
        Ok(id)
    }

    /// Adopt a newer revision of a preset. Returns whether anything changed.
    pub fn apply_immutable_override(&mut self, update: Profile) -> Result<bool, ProfileError> {
        let key = update.name.to_lowercase();
        let preset = self
            .presets
            .iter_mut()
            .find(|preset| preset.name.to_lowercase() == key)
            .ok_or_else(|| ProfileError::NotFound(update.name.clone()))?;
        if !is_newer_version(update.version.as_deref(), preset.version.as_deref()) {
            return Ok(false);
        }
        let mut settings = update.settings.clone();
        settings.normalize();
        preset.settings = settings;
        preset.version = update.version.clone();
        preset.touch();
        let stored = preset.clone();
        self.immutable_overrides.insert(key, stored);
        self.notify(StoreEvent::Profiles);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{GemGroup, ItemGroup, PotionGroup};
    use crate::locale::{locale_patch, LocaleCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[test]
    fn getters_synthesize_without_inserting() {
        let store = SettingsStore::new();
        let before = store.all_settings().clone();
        let first = store.item_settings("hdm");
        let second = store.item_settings("hdm");
        assert_eq!(first, second);
        assert!(matches!(first, Cow::Owned(_)));
        assert_eq!(store.all_settings(), &before);
    }

    #[test]
    fn subscribers_see_every_mutation() {
        let mut store = SettingsStore::new();
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        let id = store.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        store.toggle_theme();
        store.update_common_item(CommonItem::Keys, &EntityPatch::default());
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(store.revision(), 2);
        assert!(store.unsubscribe(id));
        store.toggle_theme();
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn app_config_changes_have_their_own_event() {
        let mut store = SettingsStore::new();
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&events);
        store.subscribe(move |event| {
            if let Ok(mut events) = sink.lock() {
                events.push(event.clone());
            }
        });
        store.update_game_path("D:/D2R");
        store.reset_app_config();
        store.update_tweaks(&TweaksPatch {
            skip_intro_videos: Some(true),
            ..Default::default()
        });
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                StoreEvent::AppConfig,
                StoreEvent::AppConfig,
                StoreEvent::Settings(Section::Tweaks),
            ]
        );
        assert_eq!(
            serde_json::to_value(StoreEvent::AppConfig).unwrap(),
            serde_json::json!({"kind": "appConfig"})
        );
    }

    #[test]
    fn out_of_range_level_is_ignored() {
        let mut store = SettingsStore::new();
        let before = store.all_settings().clone();
        store.update_leveled_level(
            PotionGroup::Portal.into(),
            5,
            &LevelPatch {
                enabled: Some(true),
                ..Default::default()
            },
        );
        assert_eq!(store.all_settings(), &before);
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn presets_refuse_saves_outside_admin_mode() {
        let mut store = SettingsStore::hydrate(PersistedState::default(), builtin_presets());
        let preset_id = store.active_profile_id().unwrap().to_string();
        assert!(store.profile(&preset_id).unwrap().is_immutable);

        store.update_gem_enabled_for_test();
        assert_eq!(
            store.save_active_profile_from_current(),
            Err(ProfileError::Immutable(DEFAULT_PROFILE_NAME.into()))
        );
        assert_eq!(store.baseline_state(), BaselineState::Dirty);

        store.set_admin_mode(true);
        store.save_active_profile_from_current().unwrap();
        assert_eq!(store.baseline_state(), BaselineState::Clean);
        assert!(store.immutable_overrides().contains_key("default"));
    }

    impl SettingsStore {
        fn update_gem_enabled_for_test(&mut self) {
            self.update_leveled_group(
                GemGroup::Skulls.into(),
                &GroupPatch {
                    enabled: Some(true),
                    ..Default::default()
                },
            );
        }
    }

    #[test]
    fn create_avoids_preset_names_and_activates() {
        let mut store = SettingsStore::hydrate(PersistedState::default(), builtin_presets());
        let id = store.create_profile("default").unwrap();
        assert_eq!(store.active_profile_id(), Some(id.as_str()));
        assert_eq!(store.profile(&id).unwrap().name, "default (Custom)");
        assert_eq!(store.create_profile("   "), Err(ProfileError::EmptyName));
    }

    #[test]
    fn duplicate_names_and_activates_copy() {
        let mut store = SettingsStore::new();
        let original = store.create_profile("Farm").unwrap();
        let copy = store.duplicate_profile(&original).unwrap();
        let copy2 = store.duplicate_profile(&original).unwrap();
        assert_eq!(store.profile(&copy).unwrap().name, "Farm (Copy)");
        assert_eq!(store.profile(&copy2).unwrap().name, "Farm (Copy 2)");
        assert_eq!(store.active_profile_id(), Some(copy2.as_str()));
    }

    #[test]
    fn deleting_active_profile_resets_document() {
        let mut store = SettingsStore::new();
        store.update_common_item(
            CommonItem::Gold,
            &EntityPatch {
                enabled: Some(true),
                ..Default::default()
            },
        );
        let id = store.create_profile("Gold").unwrap();
        store.delete_profile(&id).unwrap();
        assert_eq!(store.active_profile_id(), None);
        assert!(!store.common_item(CommonItem::Gold).enabled);
        assert_eq!(
            store.delete_profile(&id),
            Err(ProfileError::NotFound(id.clone()))
        );
    }

    #[test]
    fn reorder_puts_listed_first() {
        let mut store = SettingsStore::new();
        let a = store.create_profile("A").unwrap();
        let b = store.create_profile("B").unwrap();
        let c = store.create_profile("C").unwrap();
        store.reorder_user_profiles(&[c.clone(), "missing".into(), a.clone()]);
        let order: Vec<&str> = store.user_profiles().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, vec![c.as_str(), a.as_str(), b.as_str()]);
    }

    #[test]
    fn export_then_import_gets_unique_name() {
        let mut store = SettingsStore::new();
        store.update_leveled_level(
            ItemGroup::QualityPrefixes.into(),
            1,
            &LevelPatch {
                locales: locale_patch([(LocaleCode::EnUs, "Sup.")]),
                ..Default::default()
            },
        );
        let id = store.create_profile("Items").unwrap();
        let export = store.export_profile(&id).unwrap();
        assert_eq!(export.file_name, "d2r-profile-Items.json");

        let imported = store.import_profile(&export.json).unwrap();
        let profile = store.profile(&imported).unwrap();
        assert_eq!(profile.name, "Items (2)");
        assert_eq!(
            profile.settings.items.groups[&ItemGroup::QualityPrefixes].levels[1]
                .locales
                .get(LocaleCode::EnUs),
            "Sup."
        );
        assert_eq!(store.active_profile_id(), Some(id.as_str()));
    }

    #[test]
    fn hydrate_prefers_profile_named_default() {
        let mut other = Profile::new("Other", SettingsDocument::default());
        other.settings.stash_rename.set_tab(0, "Other");
        let mut default = Profile::new("DEFAULT", SettingsDocument::default());
        default.settings.stash_rename.set_tab(0, "Picked");
        let state = PersistedState {
            profiles: vec![other, default],
            ..Default::default()
        };
        let store = SettingsStore::hydrate(state, Vec::new());
        assert_eq!(store.active_profile().unwrap().name, "DEFAULT");
        assert_eq!(store.stash_rename().tab(0), Some("Picked"));
    }

    #[test]
    fn newer_preset_override_replaces_settings() {
        let mut store = SettingsStore::hydrate(PersistedState::default(), builtin_presets());
        let mut update = Profile::preset("default", SettingsDocument::default(), "1.1");
        update.settings.stash_rename.set_tab(2, "Updated");
        assert!(store.apply_immutable_override(update.clone()).unwrap());
        assert_eq!(store.immutable_profiles()[0].version.as_deref(), Some("1.1"));
        assert!(!store.apply_immutable_override(update).unwrap());

        let state = PersistedState {
            immutable_overrides: store.immutable_overrides().clone(),
            ..Default::default()
        };
        let rebuilt = SettingsStore::hydrate(state, builtin_presets());
        assert_eq!(
            rebuilt.immutable_profiles()[0].settings.stash_rename.tab(2),
            Some("Updated")
        );
    }
}
