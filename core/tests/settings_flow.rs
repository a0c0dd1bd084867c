use d2r_utility_core::locale::locale_patch;
use d2r_utility_core::persistence::APP_DIR_NAME;
use d2r_utility_core::settings::{EntityPatch, GroupPatch, LevelPatch, TweaksPatch};
use d2r_utility_core::{
    builtin_presets, AppConfigPatch, BaselineState, CommonItem, FileKeyValueStore, GemGroup,
    LeveledKey, LocaleCode, PotionGroup, Section, SettingsDocument, SettingsPersistence,
    SettingsStore,
};
use tempfile::tempdir;

#[test]
fn defaults_are_deterministic() {
    let first = serde_json::to_string(&SettingsDocument::default()).unwrap();
    let second = serde_json::to_string(&SettingsDocument::default()).unwrap();
    assert_eq!(first, second);

    let store = SettingsStore::new();
    assert_eq!(store.all_settings(), &SettingsDocument::default());
    assert_eq!(store.selected_locales(), &[LocaleCode::EnUs, LocaleCode::RuRu]);
}

#[test]
fn locale_patches_merge_into_existing_values() {
    let mut store = SettingsStore::new();
    store.update_common_item(
        CommonItem::Gold,
        &EntityPatch {
            enabled: Some(true),
            locales: locale_patch([(LocaleCode::EnUs, "Gold"), (LocaleCode::RuRu, "Золото")]),
            ..Default::default()
        },
    );
    store.update_common_item(
        CommonItem::Gold,
        &EntityPatch {
            locales: locale_patch([(LocaleCode::RuRu, "Зол.")]),
            ..Default::default()
        },
    );

    let gold = store.common_item(CommonItem::Gold);
    assert!(gold.enabled);
    assert_eq!(gold.locales.get(LocaleCode::EnUs), "Gold");
    assert_eq!(gold.locales.get(LocaleCode::RuRu), "Зол.");
}

#[test]
fn english_is_always_selected() {
    let mut store = SettingsStore::new();
    store.update_selected_locales(&[LocaleCode::RuRu, LocaleCode::DeDe, LocaleCode::RuRu]);
    assert_eq!(store.selected_locales()[0], LocaleCode::EnUs);
    assert_eq!(store.selected_locales().len(), 3);

    store.update_app_config(&AppConfigPatch {
        selected_locales: Some(Vec::new()),
        ..Default::default()
    });
    assert_eq!(store.selected_locales(), &[LocaleCode::EnUs]);
}

#[test]
fn out_of_range_active_tab_reads_as_first() {
    let key = LeveledKey::Potion(PotionGroup::RejuvenationPotions);
    let mut store = SettingsStore::new();
    store.update_leveled_group(
        key,
        &GroupPatch {
            active_tab: Some(7),
            ..Default::default()
        },
    );
    assert_eq!(store.leveled_group(key).active_tab, 7);
    assert_eq!(store.active_level(key), 0);

    store.update_leveled_group(
        key,
        &GroupPatch {
            active_tab: Some(1),
            ..Default::default()
        },
    );
    assert_eq!(store.active_level(key), 1);
}

#[test]
fn nothing_is_dirty_without_a_baseline() {
    let mut store = SettingsStore::new();
    store.update_common_item(
        CommonItem::Keys,
        &EntityPatch {
            enabled: Some(true),
            ..Default::default()
        },
    );
    assert_eq!(store.baseline_state(), BaselineState::NoBaseline);
    assert!(!store.has_changed(|doc| &doc.common));
    assert!(store.changed_sections().is_empty());
}

#[test]
fn leveled_edits_are_dirty_until_reverted() {
    let key = LeveledKey::Gem(GemGroup::Rubies);
    let mut store = SettingsStore::new();
    store.create_profile("Loot filter").unwrap();
    assert_eq!(store.baseline_state(), BaselineState::Clean);

    let enable = |enabled| LevelPatch {
        enabled: Some(enabled),
        ..Default::default()
    };
    store.update_leveled_level(key, 4, &enable(true));
    assert!(store.has_changed(|doc| &doc.gems));
    assert!(!store.has_changed(|doc| &doc.runes));
    assert_eq!(store.changed_sections(), vec![Section::Gems]);

    store.update_leveled_level(key, 4, &enable(false));
    assert!(!store.has_changed(|doc| &doc.gems));
    assert_eq!(store.baseline_state(), BaselineState::Clean);
}

#[test]
fn restart_restores_the_active_profile_snapshot() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(APP_DIR_NAME).join("storage.json");
    let health = LeveledKey::Potion(PotionGroup::HealthPotions);

    let (active_id, snapshot) = {
        let persistence = SettingsPersistence::new(FileKeyValueStore::open(&path));
        let mut store = SettingsStore::hydrate(persistence.load_state(), builtin_presets());
        let id = store.create_profile("Mine").unwrap();
        let snapshot = store.profile(&id).unwrap().settings.clone();
        store.update_leveled_level(
            health,
            2,
            &LevelPatch {
                enabled: Some(true),
                locales: locale_patch([(LocaleCode::EnUs, "HP3")]),
                ..Default::default()
            },
        );
        store.update_game_path("C:/Games/Diablo II Resurrected/D2R.exe");
        store.update_tweaks(&TweaksPatch {
            skip_intro_videos: Some(true),
            ..Default::default()
        });
        assert_eq!(store.baseline_state(), BaselineState::Dirty);

        let mut persistence = persistence;
        persistence.save_state(&store.persisted_state()).unwrap();
        (id, snapshot)
    };

    let persistence = SettingsPersistence::new(FileKeyValueStore::open(&path));
    let store = SettingsStore::hydrate(persistence.load_state(), builtin_presets());
    assert_eq!(store.active_profile_id(), Some(active_id.as_str()));
    assert_eq!(store.baseline_state(), BaselineState::Clean);
    assert!(!store.leveled_group(health).levels[2].enabled);
    assert_eq!(store.all_settings().common, snapshot.common);
    // Globals are kept across the restart.
    assert_eq!(store.game_path(), "C:/Games/Diablo II Resurrected/D2R.exe");
    assert!(store.tweaks().skip_intro_videos);
}

#[test]
fn working_document_survives_a_restart_without_profiles() {
    let dir = tempdir().unwrap();
    let path = dir.path().join(APP_DIR_NAME).join("storage.json");
    {
        let mut persistence = SettingsPersistence::new(FileKeyValueStore::open(&path));
        let mut store = SettingsStore::hydrate(persistence.load_state(), Vec::new());
        store.update_common_item(
            CommonItem::Gold,
            &EntityPatch {
                enabled: Some(true),
                ..Default::default()
            },
        );
        persistence.save_state(&store.persisted_state()).unwrap();
    }

    let persistence = SettingsPersistence::new(FileKeyValueStore::open(&path));
    let store = SettingsStore::hydrate(persistence.load_state(), Vec::new());
    assert_eq!(store.active_profile_id(), None);
    assert!(store.common_item(CommonItem::Gold).enabled);
}
