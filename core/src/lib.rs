pub mod backup;
pub mod catalog;
pub mod color;
pub mod config;
pub mod diff;
pub mod gamefiles;
pub mod locale;
pub mod locator;
pub mod persistence;
pub mod profile;
pub mod release;
pub mod settings;
pub mod store;
pub mod time;

pub use catalog::{CommonItem, GemGroup, ItemGroup, LeveledKey, PotionGroup, Rune, StringFile};
pub use color::{remove_color_codes, GameColor};
pub use config::{AppConfig, AppConfigPatch, AppMode, Theme};
pub use diff::{BaselineDiff, BaselineState};
pub use gamefiles::{
    ensure_dirs, ensure_writable, CatalogItem, EnsureResult, GameFileError, GameFiles, GameFs,
    GameLayout, LocalGameFs, SettingsUpdate, StringCategory, StringTables,
};
pub use locale::{LocaleCode, LocalePatch, LocaleRecord};
pub use locator::{GameLocator, OpenFileDialogRequest, SearchProgress, GAME_EXECUTABLE};
pub use persistence::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, PersistedState, PersistenceError,
    SettingsPersistence,
};
pub use profile::{Profile, ProfileError, ProfileSummary};
pub use settings::{Section, SettingsDocument};
pub use store::{builtin_presets, ProfileExport, SettingsStore, StoreEvent, SubscriptionId};
