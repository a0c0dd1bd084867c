//! Reading and writing the game's data files.
//!
//! Everything goes through [`GameFs`] so flows can be tested against a temp
//! directory, and through [`GameLayout`] so path rules live in one place.

pub mod access;
pub mod layouts;
pub mod strings;
pub mod sync;

use crate::backup::{atomic_write, backup_and_swap};
use crate::catalog::StringFile;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub use access::{ensure_dirs, ensure_writable, EnsureResult};
pub use layouts::{sanitize_json, BANK_LAYOUT_FILE, HUD_PANEL_FILE, INTRO_VIDEO_FILES};
pub use strings::{StringEntry, StringTable};
pub use sync::{CatalogItem, DifficultyTier, SettingsUpdate, StringCategory, StringTables};

const STRINGS_DIR: &str = "mods/D2RMOD/D2RMOD.mpq/data/local/lng/strings";
const MOD_LAYOUTS_DIR: &str = "mods/D2RBlizzless/D2RBlizzless.mpq/data/global/ui/layouts";
const BASE_LAYOUTS_DIR: &str = "data/global/ui/layouts";
const INTRO_VIDEO_DIR: &str = "mods/D2RBlizzless/D2RBlizzless.mpq/data/hd/global/video";

#[derive(Debug, thiserror::Error)]
pub enum GameFileError {
    #[error("game path is not set")]
    GamePathNotSet,
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode game file: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("unexpected layout in {}: {message}", .path.display())]
    Layout { path: PathBuf, message: String },
}

/// Minimal filesystem surface used by the read and apply flows.
pub trait GameFs {
    fn read_text(&self, path: &Path) -> io::Result<String>;
    fn write_text(&self, path: &Path, contents: &str) -> io::Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn remove_file(&self, path: &Path) -> io::Result<()>;
}

/// The real disk. Writes are atomic; with backups on, the previous file is
/// kept as `<name>.bak.<stamp>`. A failed write clears the read-only flag and
/// is retried once.
#[derive(Debug, Clone, Default)]
pub struct LocalGameFs {
    backups: bool,
}

impl LocalGameFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backups() -> Self {
        Self { backups: true }
    }

    fn write_once(&self, path: &Path, contents: &str) -> io::Result<()> {
        if self.backups {
            backup_and_swap(path, contents.as_bytes())
                .map(|outcome| {
                    if let Some(backup) = outcome.backup_path {
                        log::debug!("backed up {} to {}", path.display(), backup.display());
                    }
                })
                .map_err(|err| match err {
                    crate::backup::BackupError::Io(err) => err,
                    other => io::Error::other(other.to_string()),
                })
        } else {
            atomic_write(path, contents.as_bytes())
        }
    }
}

impl GameFs for LocalGameFs {
    fn read_text(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn write_text(&self, path: &Path, contents: &str) -> io::Result<()> {
        match self.write_once(path, contents) {
            Ok(()) => Ok(()),
            Err(err) => {
                log::warn!("write to {} failed ({err}), retrying", path.display());
                for result in ensure_writable(&[path]) {
                    if let Some(error) = result.error {
                        log::warn!("could not make {} writable: {error}", result.path);
                    }
                }
                self.write_once(path, contents)
            }
        }
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

/// Paths inside one game installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameLayout {
    root: PathBuf,
}

impl GameLayout {
    /// Accepts either the install directory or the path to `D2R.exe`.
    pub fn from_game_path(game_path: &str) -> Result<Self, GameFileError> {
        let trimmed = game_path.trim().trim_end_matches(['/', '\\']);
        if trimmed.is_empty() {
            return Err(GameFileError::GamePathNotSet);
        }

        let dir = if trimmed.to_ascii_lowercase().ends_with(".exe") {
            match trimmed.rfind(['/', '\\']) {
                Some(index) => &trimmed[..index],
                None => return Err(GameFileError::GamePathNotSet),
            }
        } else {
            trimmed
        };

        let root = PathBuf::from(dir);
        let root = if root.exists() {
            dunce::canonicalize(&root).unwrap_or(root)
        } else {
            root
        };
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn strings_dir(&self) -> PathBuf {
        self.root.join(STRINGS_DIR)
    }

    pub fn string_file(&self, file: StringFile) -> PathBuf {
        self.strings_dir().join(file.file_name())
    }

    /// Mod copy first, then the base game copy.
    pub fn layout_candidates(&self, file_name: &str) -> [PathBuf; 2] {
        [
            self.root.join(MOD_LAYOUTS_DIR).join(file_name),
            self.root.join(BASE_LAYOUTS_DIR).join(file_name),
        ]
    }

    pub fn intro_video_dir(&self) -> PathBuf {
        self.root.join(INTRO_VIDEO_DIR)
    }
}

/// A game installation plus the filesystem used to reach it.
#[derive(Debug, Clone)]
pub struct GameFiles<F: GameFs> {
    fs: F,
    layout: GameLayout,
}

impl GameFiles<LocalGameFs> {
    pub fn local(game_path: &str) -> Result<Self, GameFileError> {
        Ok(Self::new(
            LocalGameFs::with_backups(),
            GameLayout::from_game_path(game_path)?,
        ))
    }
}

impl<F: GameFs> GameFiles<F> {
    pub fn new(fs: F, layout: GameLayout) -> Self {
        Self { fs, layout }
    }

    pub fn layout(&self) -> &GameLayout {
        &self.layout
    }

    pub fn fs(&self) -> &F {
        &self.fs
    }

    pub(crate) fn read(&self, path: &Path) -> Result<String, GameFileError> {
        self.fs.read_text(path).map_err(|source| GameFileError::Read {
            path: path.to_path_buf(),
            source,
        })
    }

    pub(crate) fn write(&self, path: &Path, contents: &str) -> Result<(), GameFileError> {
        self.fs
            .write_text(path, contents)
            .map_err(|source| GameFileError::Write {
                path: path.to_path_buf(),
                source,
            })
    }

    /// First existing candidate for a layout file, read along with its path.
    pub(crate) fn read_layout(&self, file_name: &str) -> Result<(PathBuf, String), GameFileError> {
        let [primary, fallback] = self.layout.layout_candidates(file_name);
        match self.fs.read_text(&primary) {
            Ok(contents) => Ok((primary, contents)),
            Err(err) => {
                log::debug!("{} unavailable ({err}), trying base layout", primary.display());
                let contents = self.read(&fallback)?;
                Ok((fallback, contents))
            }
        }
    }
}
