mod search_runner;

use std::sync::{Arc, Mutex};

use d2r_utility_core::gamefiles::{self, EnsureResult, LocalGameFs};
use d2r_utility_core::settings::{
    EntityPatch, GeneralRunePatch, GroupPatch, ItemPatch, LevelPatch, RunePatch, StashPatch,
    TweaksPatch,
};
use d2r_utility_core::{
    builtin_presets, AppConfig, AppConfigPatch, CatalogItem, CommonItem, FileKeyValueStore,
    GameFiles, GameLocator, LeveledKey, ProfileExport, ProfileSummary, Rune, Section,
    SettingsDocument, SettingsPersistence, SettingsStore, SettingsUpdate, StringCategory,
};
use log::LevelFilter;
use search_runner::SearchRunner;
use tauri::{AppHandle, Emitter, Manager, State};
use tauri_plugin_dialog::DialogExt;

const SETTINGS_CHANGED_EVENT: &str = "settings_changed";

struct AppState {
    store: Mutex<SettingsStore>,
    persistence: Mutex<SettingsPersistence<FileKeyValueStore>>,
}

struct Search(Arc<SearchRunner>);

fn log_level(debug_mode: bool) -> LevelFilter {
    if debug_mode {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

fn read_store<T>(state: &AppState, f: impl FnOnce(&SettingsStore) -> T) -> Result<T, String> {
    let store = state.store.lock().map_err(|e| e.to_string())?;
    Ok(f(&store))
}

/// Run a store mutation and persist the result.
fn mutate<T>(state: &AppState, f: impl FnOnce(&mut SettingsStore) -> T) -> Result<T, String> {
    let (value, snapshot) = {
        let mut store = state.store.lock().map_err(|e| e.to_string())?;
        let value = f(&mut store);
        (value, store.persisted_state())
    };
    state
        .persistence
        .lock()
        .map_err(|e| e.to_string())?
        .save_state(&snapshot)
        .map_err(|e| e.to_string())?;
    Ok(value)
}

fn game_files(state: &AppState) -> Result<(GameFiles<LocalGameFs>, SettingsDocument), String> {
    let (game_path, doc) = read_store(state, |store| {
        (store.game_path().to_string(), store.all_settings().clone())
    })?;
    let files = GameFiles::local(&game_path).map_err(|e| e.to_string())?;
    Ok((files, doc))
}

/// Parsed game state is applied to the store only after every read succeeded.
fn apply_update(state: &AppState, update: SettingsUpdate) -> Result<SettingsDocument, String> {
    mutate(state, |store| {
        update.apply_to(store);
        store.all_settings().clone()
    })
}

// ---- settings ----

#[tauri::command]
fn get_settings(state: State<'_, AppState>) -> Result<SettingsDocument, String> {
    read_store(&state, |store| store.all_settings().clone())
}

#[tauri::command]
fn replace_settings(state: State<'_, AppState>, settings: SettingsDocument) -> Result<(), String> {
    mutate(&state, |store| store.replace_all_settings(settings))
}

#[tauri::command]
fn reset_settings(state: State<'_, AppState>) -> Result<(), String> {
    mutate(&state, SettingsStore::reset_all_settings)
}

#[tauri::command]
fn update_app_config(
    state: State<'_, AppState>,
    patch: AppConfigPatch,
) -> Result<AppConfig, String> {
    let config = mutate(&state, |store| {
        store.update_app_config(&patch);
        store.app_config().clone()
    })?;
    log::set_max_level(log_level(config.debug_mode));
    Ok(config)
}

#[tauri::command]
fn update_common_item(
    state: State<'_, AppState>,
    item: CommonItem,
    patch: EntityPatch,
) -> Result<(), String> {
    mutate(&state, |store| store.update_common_item(item, &patch))
}

#[tauri::command]
fn update_leveled_group(
    state: State<'_, AppState>,
    key: LeveledKey,
    patch: GroupPatch,
) -> Result<(), String> {
    mutate(&state, |store| store.update_leveled_group(key, &patch))
}

#[tauri::command]
fn update_leveled_level(
    state: State<'_, AppState>,
    key: LeveledKey,
    level: usize,
    patch: LevelPatch,
) -> Result<(), String> {
    mutate(&state, |store| store.update_leveled_level(key, level, &patch))
}

#[tauri::command]
fn update_rune_settings(
    state: State<'_, AppState>,
    runes: Vec<Rune>,
    patch: RunePatch,
) -> Result<(), String> {
    mutate(&state, |store| store.update_multiple_rune_settings(&runes, &patch))
}

#[tauri::command]
fn update_general_rune_settings(
    state: State<'_, AppState>,
    patch: GeneralRunePatch,
    apply_to_all: bool,
) -> Result<(), String> {
    mutate(&state, |store| {
        store.update_general_rune_settings(&patch);
        if apply_to_all {
            store.apply_general_rune_settings_to_all();
        }
    })
}

#[tauri::command]
fn update_item_settings(
    state: State<'_, AppState>,
    key: String,
    patch: ItemPatch,
) -> Result<(), String> {
    mutate(&state, |store| store.update_item_settings(&key, &patch))
}

#[tauri::command]
fn update_tweaks(state: State<'_, AppState>, patch: TweaksPatch) -> Result<(), String> {
    mutate(&state, |store| store.update_tweaks(&patch))
}

#[tauri::command]
fn update_stash_rename(state: State<'_, AppState>, patch: StashPatch) -> Result<(), String> {
    mutate(&state, |store| store.update_stash_rename(&patch))
}

#[tauri::command]
fn changed_sections(state: State<'_, AppState>) -> Result<Vec<Section>, String> {
    read_store(&state, SettingsStore::changed_sections)
}

// ---- profiles ----

#[tauri::command]
fn list_profiles(state: State<'_, AppState>) -> Result<Vec<ProfileSummary>, String> {
    read_store(&state, SettingsStore::list_profiles)
}

#[tauri::command]
fn set_active_profile(state: State<'_, AppState>, id: String) -> Result<(), String> {
    mutate(&state, |store| store.set_active_profile(&id))?.map_err(|e| e.to_string())
}

#[tauri::command]
fn create_profile(state: State<'_, AppState>, name: String) -> Result<String, String> {
    mutate(&state, |store| store.create_profile(&name))?.map_err(|e| e.to_string())
}

#[tauri::command]
fn save_active_profile(state: State<'_, AppState>) -> Result<(), String> {
    mutate(&state, SettingsStore::save_active_profile_from_current)?.map_err(|e| e.to_string())
}

#[tauri::command]
fn reset_active_profile_to_defaults(state: State<'_, AppState>) -> Result<(), String> {
    mutate(&state, SettingsStore::reset_active_profile_to_defaults)
}

#[tauri::command]
fn rename_profile(state: State<'_, AppState>, id: String, name: String) -> Result<(), String> {
    mutate(&state, |store| store.rename_profile(&id, &name))?.map_err(|e| e.to_string())
}

#[tauri::command]
fn delete_profile(state: State<'_, AppState>, id: String) -> Result<(), String> {
    mutate(&state, |store| store.delete_profile(&id))?.map_err(|e| e.to_string())
}

#[tauri::command]
fn duplicate_profile(state: State<'_, AppState>, id: String) -> Result<String, String> {
    mutate(&state, |store| store.duplicate_profile(&id))?.map_err(|e| e.to_string())
}

#[tauri::command]
fn reorder_profiles(state: State<'_, AppState>, ids: Vec<String>) -> Result<(), String> {
    mutate(&state, |store| store.reorder_user_profiles(&ids))
}

#[tauri::command]
fn export_profile(state: State<'_, AppState>, id: String) -> Result<ProfileExport, String> {
    read_store(&state, |store| store.export_profile(&id))?.map_err(|e| e.to_string())
}

#[tauri::command]
fn import_profile(state: State<'_, AppState>, json: String) -> Result<String, String> {
    mutate(&state, |store| store.import_profile(&json))?.map_err(|e| e.to_string())
}

#[tauri::command]
fn set_admin_mode(state: State<'_, AppState>, enabled: bool) -> Result<(), String> {
    mutate(&state, |store| store.set_admin_mode(enabled))
}

// ---- game files ----

#[tauri::command]
async fn read_game_strings(
    state: State<'_, AppState>,
    categories: Vec<StringCategory>,
    catalog: Option<Vec<CatalogItem>>,
) -> Result<SettingsDocument, String> {
    let (files, doc) = game_files(&state)?;
    let update = files
        .read_strings(&doc, &categories, catalog.as_deref().unwrap_or_default())
        .map_err(|e| e.to_string())?;
    apply_update(&state, update)
}

#[tauri::command]
async fn apply_game_strings(
    state: State<'_, AppState>,
    categories: Vec<StringCategory>,
    catalog: Option<Vec<CatalogItem>>,
) -> Result<(), String> {
    let (files, doc) = game_files(&state)?;
    files
        .apply_strings(&doc, &categories, catalog.as_deref().unwrap_or_default())
        .map_err(|e| e.to_string())
}

#[tauri::command]
async fn read_game_tweaks(state: State<'_, AppState>) -> Result<SettingsDocument, String> {
    let (files, _) = game_files(&state)?;
    let mut update = files.read_tweaks().map_err(|e| e.to_string())?;
    update.merge(files.read_stash_tabs().map_err(|e| e.to_string())?);
    apply_update(&state, update)
}

#[tauri::command]
async fn apply_game_tweaks(state: State<'_, AppState>) -> Result<(), String> {
    let (files, doc) = game_files(&state)?;
    files.apply_tweaks(&doc.tweaks).map_err(|e| e.to_string())?;
    files
        .apply_stash_tabs(&doc.stash_rename)
        .map_err(|e| e.to_string())
}

// ---- install discovery and permissions ----

#[tauri::command]
fn detect_game_path() -> Option<String> {
    GameLocator::new()
        .discover()
        .map(|path| path.to_string_lossy().to_string())
}

#[tauri::command]
async fn search_file(search: State<'_, Search>, filename: String) -> Result<(), String> {
    search.0.start(filename).await
}

#[tauri::command]
async fn cancel_search(search: State<'_, Search>) -> Result<(), String> {
    search.0.cancel().await
}

/// `None` when the user closes the picker.
#[tauri::command]
async fn open_file_dialog(app: AppHandle) -> Result<Option<String>, String> {
    let picked = app
        .dialog()
        .file()
        .add_filter("Executable", &["exe"])
        .blocking_pick_file();
    Ok(picked.map(|path| path.to_string()))
}

#[tauri::command]
fn ensure_writable(paths: Vec<String>) -> Vec<EnsureResult> {
    gamefiles::ensure_writable(&paths)
}

#[tauri::command]
fn ensure_dir(paths: Vec<String>) -> Result<Vec<String>, String> {
    gamefiles::ensure_dirs(&paths)
        .map(|created| {
            created
                .iter()
                .map(|path| path.to_string_lossy().to_string())
                .collect()
        })
        .map_err(|e| e.to_string())
}

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    tauri::Builder::<tauri::Wry>::default()
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_fs::init())
        .plugin(tauri_plugin_opener::init())
        .setup(|app| {
            app.handle().plugin(
                tauri_plugin_log::Builder::default()
                    .level(LevelFilter::Debug)
                    .build(),
            )?;

            let mut persistence = SettingsPersistence::new(FileKeyValueStore::open_default()?);
            if persistence.is_first_run() {
                log::info!("first run, starting from defaults");
                persistence.mark_first_run_done()?;
            }
            let mut store = SettingsStore::hydrate(persistence.load_state(), builtin_presets());
            log::set_max_level(log_level(store.debug_mode()));

            let handle = app.handle().clone();
            store.subscribe(move |event| {
                let _ = handle.emit(SETTINGS_CHANGED_EVENT, event);
            });

            app.manage(AppState {
                store: Mutex::new(store),
                persistence: Mutex::new(persistence),
            });
            app.manage(Search(SearchRunner::new(app.handle().clone())));
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            get_settings,
            replace_settings,
            reset_settings,
            update_app_config,
            update_common_item,
            update_leveled_group,
            update_leveled_level,
            update_rune_settings,
            update_general_rune_settings,
            update_item_settings,
            update_tweaks,
            update_stash_rename,
            changed_sections,
            list_profiles,
            set_active_profile,
            create_profile,
            save_active_profile,
            reset_active_profile_to_defaults,
            rename_profile,
            delete_profile,
            duplicate_profile,
            reorder_profiles,
            export_profile,
            import_profile,
            set_admin_mode,
            read_game_strings,
            apply_game_strings,
            read_game_tweaks,
            apply_game_tweaks,
            detect_game_path,
            search_file,
            cancel_search,
            open_file_dialog,
            ensure_writable,
            ensure_dir
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
