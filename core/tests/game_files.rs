use std::fs;
use std::path::Path;

use d2r_utility_core::gamefiles::{StringTable, BANK_LAYOUT_FILE};
use d2r_utility_core::settings::{EntityPatch, RunePatch};
use d2r_utility_core::{
    CommonItem, GameFiles, GameLayout, LocalGameFs, LocaleCode, Rune, SettingsStore,
    StringCategory, StringFile,
};
use tempfile::tempdir;

const ITEM_NAMES: &str = "\u{feff}[
  {\"id\": 4000, \"Key\": \"gld\", \"enUS\": \"Gold\", \"ruRU\": \"Золото\"},
  {\"id\": 4001, \"Key\": \"key\", \"enUS\": \"\", \"ruRU\": \"\"}
]";

const ITEM_RUNES: &str = "[
  {\"id\": 20030, \"Key\": \"r30\", \"enUS\": \"ÿc1Ber Rune\", \"ruRU\": \"Бер\"}
]";

const BANK: &str = r#"{
    // shared stash
    "children": [
        { "type": "TabBarWidget", "fields": { "textStrings": ["@personal", "a", "b", "c", "d", "e", "f", "g",] } },
    ]
}"#;

fn install(root: &Path) -> GameFiles<LocalGameFs> {
    let layout = GameLayout::from_game_path(root.to_str().unwrap()).unwrap();
    fs::create_dir_all(layout.strings_dir()).unwrap();
    fs::write(layout.string_file(StringFile::ItemNames), ITEM_NAMES).unwrap();
    fs::write(layout.string_file(StringFile::ItemRunes), ITEM_RUNES).unwrap();
    let [bank, _] = layout.layout_candidates(BANK_LAYOUT_FILE);
    fs::create_dir_all(bank.parent().unwrap()).unwrap();
    fs::write(bank, BANK).unwrap();
    GameFiles::new(LocalGameFs::new(), layout)
}

fn table(game: &GameFiles<LocalGameFs>, file: StringFile) -> StringTable {
    StringTable::parse(&fs::read_to_string(game.layout().string_file(file)).unwrap()).unwrap()
}

#[test]
fn strings_read_into_store_and_apply_back() {
    let dir = tempdir().unwrap();
    let game = install(dir.path());
    let mut store = SettingsStore::new();

    let categories = [StringCategory::Common, StringCategory::Runes];
    let update = game
        .read_strings(store.all_settings(), &categories, &[])
        .unwrap();
    update.apply_to(&mut store);

    let gold = store.common_item(CommonItem::Gold);
    assert!(gold.enabled);
    assert_eq!(gold.locales.get(LocaleCode::RuRu), "Золото");
    assert!(!store.common_item(CommonItem::Keys).enabled);
    let ber = store.rune_settings(Rune::Ber);
    assert_eq!(ber.manual_settings.locales.get(LocaleCode::EnUs), "Ber Rune");

    store.update_common_item(
        CommonItem::Gold,
        &EntityPatch {
            enabled: Some(false),
            ..Default::default()
        },
    );
    let mut auto = store.rune_settings(Rune::Ber).auto_settings.clone();
    auto.numbering.show = true;
    store.update_rune_settings(
        Rune::Ber,
        &RunePatch {
            auto_settings: Some(auto),
            ..Default::default()
        },
    );
    game.apply_strings(store.all_settings(), &categories, &[])
        .unwrap();

    let names = table(&game, StringFile::ItemNames);
    let gold = names.by_key("gld").unwrap();
    assert_eq!(gold.locales.get(LocaleCode::EnUs), "");
    assert_eq!(gold.locales.get(LocaleCode::RuRu), "");
    // Potions had no records yet and are appended.
    assert!(names.len() > 2);

    let runes = table(&game, StringFile::ItemRunes);
    let ber = runes.by_key("r30").unwrap();
    let written = ber.locales.get(LocaleCode::EnUs);
    assert!(written.contains("Ber Rune"));
    assert!(written.contains("30"));
    assert_eq!(
        written,
        store.rune_settings(Rune::Ber).render_name(Rune::Ber, LocaleCode::EnUs)
    );

    // Optional tables that were never there stay absent.
    assert!(!game.layout().string_file(StringFile::ItemModifiers).exists());
}

#[test]
fn failed_read_leaves_store_untouched() {
    let dir = tempdir().unwrap();
    let game = GameFiles::new(
        LocalGameFs::new(),
        GameLayout::from_game_path(dir.path().to_str().unwrap()).unwrap(),
    );
    let store = SettingsStore::new();
    let before = store.all_settings().clone();

    assert!(game
        .read_strings(store.all_settings(), &StringCategory::ALL, &[])
        .is_err());
    assert!(game.read_stash_tabs().is_err());
    assert_eq!(store.all_settings(), &before);
}

#[test]
fn stash_labels_flow_through_store() {
    let dir = tempdir().unwrap();
    let game = install(dir.path());
    let mut store = SettingsStore::new();

    game.read_stash_tabs().unwrap().apply_to(&mut store);
    assert_eq!(store.stash_rename().tabs[0], "a");
    assert_eq!(store.stash_rename().tabs[6], "g");

    store.set_stash_tab(3, "Runes");
    game.apply_stash_tabs(store.stash_rename()).unwrap();

    let mut reread = SettingsStore::new();
    game.read_stash_tabs().unwrap().apply_to(&mut reread);
    assert_eq!(reread.stash_rename(), store.stash_rename());
}
