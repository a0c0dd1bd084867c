//! Finding the game installation on disk.

use dirs::home_dir;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(target_os = "windows")]
use winreg::enums::HKEY_LOCAL_MACHINE;
#[cfg(target_os = "windows")]
use winreg::RegKey;

pub const GAME_EXECUTABLE: &str = "D2R.exe";
pub const GAME_DIR_NAME: &str = "Diablo II Resurrected";
pub const MAX_SEARCH_DEPTH: usize = 8;
const PATH_OVERRIDE_VAR: &str = "D2R_PATH";

static LIBRARY_PATH_CAPTURE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#""path"\s+"([^"]+)""#).expect("valid library path regex"));

/// Emitted on the `search_progress` topic. Field names are part of the event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchProgress {
    pub current: u32,
    pub total: u32,
    pub message: String,
    pub found_count: usize,
}

impl SearchProgress {
    fn new(current: u32, message: impl Into<String>, found_count: usize) -> Self {
        Self {
            current,
            total: 100,
            message: message.into(),
            found_count,
        }
    }
}

/// Emitted on the `open_file_dialog` topic when the search finds nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpenFileDialogRequest {
    pub filename: String,
    pub message: String,
}

impl OpenFileDialogRequest {
    pub fn not_found(filename: &str) -> Self {
        Self {
            filename: filename.to_string(),
            message: "File not found in predefined paths. Please select the file manually."
                .to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GameLocator {
    home: Option<PathBuf>,
}

impl Default for GameLocator {
    fn default() -> Self {
        Self { home: home_dir() }
    }
}

impl GameLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_home(home: impl Into<PathBuf>) -> Self {
        Self {
            home: Some(home.into()),
        }
    }

    /// Quick lookup without walking directories: env override, registry, then
    /// the executable directly inside each known install path.
    pub fn discover(&self) -> Option<PathBuf> {
        if let Some(path) = self.env_override() {
            return Some(path);
        }
        if let Some(path) = self.registry_install_path() {
            return Some(path);
        }
        self.predefined_paths()
            .into_iter()
            .map(|root| root.join(GAME_EXECUTABLE))
            .find(|exe| exe.is_file())
    }

    /// Walk every known install path for `filename` (case-insensitive),
    /// reporting progress as each root is searched. Stops early once
    /// `cancel` is set and returns what was found so far.
    pub fn search<F>(&self, filename: &str, cancel: &AtomicBool, mut on_progress: F) -> Vec<PathBuf>
    where
        F: FnMut(SearchProgress),
    {
        let mut found = Vec::new();
        on_progress(SearchProgress::new(0, "Starting search...", 0));

        let wanted = filename.to_lowercase();
        let quick_hits = self
            .env_override()
            .into_iter()
            .chain(self.registry_install_path());
        for hit in quick_hits {
            if file_name_matches(&hit, &wanted) && !found.contains(&hit) {
                found.push(hit);
            }
        }

        let roots = self.predefined_paths();
        let total = roots.len().max(1);
        for (index, root) in roots.iter().enumerate() {
            if cancel.load(Ordering::Relaxed) {
                log::info!("game search cancelled after {} roots", index);
                break;
            }
            let current = ((index + 1) * 80 / total) as u32;
            on_progress(SearchProgress::new(
                current,
                format!("Searching in: {}", root.display()),
                found.len(),
            ));
            if root.is_dir() {
                search_in_directory(root, &wanted, 0, cancel, &mut found);
            }
        }

        if found.is_empty() {
            on_progress(SearchProgress::new(
                90,
                "File not found in predefined paths. Please select file manually...",
                0,
            ));
        } else {
            on_progress(SearchProgress::new(
                100,
                format!("Search completed! Found {} files", found.len()),
                found.len(),
            ));
        }
        found
    }

    /// `D2R_PATH` may name the executable or its directory.
    fn env_override(&self) -> Option<PathBuf> {
        let path = PathBuf::from(std::env::var(PATH_OVERRIDE_VAR).ok()?);
        if path.is_file() {
            Some(path)
        } else {
            Some(path.join(GAME_EXECUTABLE)).filter(|exe| exe.is_file())
        }
    }

    #[cfg(target_os = "windows")]
    fn registry_install_path(&self) -> Option<PathBuf> {
        let hklm = RegKey::predef(HKEY_LOCAL_MACHINE);
        let uninstall = [
            "SOFTWARE\\WOW6432Node\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\Diablo II Resurrected",
            "SOFTWARE\\Microsoft\\Windows\\CurrentVersion\\Uninstall\\Diablo II Resurrected",
        ];
        uninstall.iter().find_map(|subkey| {
            let key = hklm.open_subkey(subkey).ok()?;
            let location: String = key.get_value("InstallLocation").ok()?;
            let exe = PathBuf::from(location).join(GAME_EXECUTABLE);
            exe.is_file().then_some(exe)
        })
    }

    #[cfg(not(target_os = "windows"))]
    fn registry_install_path(&self) -> Option<PathBuf> {
        None
    }

    /// Install directories worth checking, deduplicated, in priority order.
    pub fn predefined_paths(&self) -> Vec<PathBuf> {
        let mut seen = HashSet::new();
        let mut results = Vec::new();
        let mut push_unique = |path: PathBuf, results: &mut Vec<PathBuf>| {
            let key = path.to_string_lossy().to_lowercase();
            if seen.insert(key) {
                results.push(path);
            }
        };

        for path in self.launcher_paths() {
            push_unique(path, &mut results);
        }
        for steam_root in self.steam_roots() {
            for library in parse_library_folders(&steam_root) {
                push_unique(library.join("steamapps/common").join(GAME_DIR_NAME), &mut results);
            }
        }
        results
    }

    #[cfg(target_os = "windows")]
    fn launcher_paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = [
            "C:/Program Files (x86)/Diablo II Resurrected",
            "C:/Program Files/Diablo II Resurrected",
            "C:/Games/Diablo II Resurrected",
            "D:/Games/Diablo II Resurrected",
            "E:/Games/Diablo II Resurrected",
        ]
        .iter()
        .map(PathBuf::from)
        .collect();
        if let Some(home) = &self.home {
            paths.push(home.join("Games").join(GAME_DIR_NAME));
        }
        paths
    }

    #[cfg(not(target_os = "windows"))]
    fn launcher_paths(&self) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        if let Some(home) = &self.home {
            let relative = [
                "Diablo II Resurrected",
                "Games/Diablo II Resurrected",
                ".games/Diablo II Resurrected",
                // Lutris
                "Games/lutris/Diablo II Resurrected",
                ".local/share/lutris/games/diablo-ii-resurrected",
                // Heroic
                ".config/heroic/Diablo II Resurrected",
                ".local/share/heroic/Diablo II Resurrected",
                // Bottles
                ".local/share/bottles/bottles/Diablo II Resurrected/drive_c/Program Files (x86)/Diablo II Resurrected",
                ".local/share/bottles/bottles/Diablo II Resurrected/drive_c/Program Files/Diablo II Resurrected",
                // Wine
                ".wine/drive_c/Program Files (x86)/Diablo II Resurrected",
                ".wine/drive_c/Program Files/Diablo II Resurrected",
                ".wine/drive_c/Games/Diablo II Resurrected",
            ];
            paths.extend(relative.iter().map(|rel| home.join(rel)));
        }
        paths.extend(
            [
                "/opt/Diablo II Resurrected",
                "/usr/local/games/Diablo II Resurrected",
                "/usr/games/Diablo II Resurrected",
            ]
            .iter()
            .map(PathBuf::from),
        );
        paths
    }

    fn steam_roots(&self) -> Vec<PathBuf> {
        let mut roots = Vec::new();

        #[cfg(target_os = "windows")]
        {
            roots.push(PathBuf::from("C:/Program Files (x86)/Steam"));
            if let Some(home) = &self.home {
                roots.push(home.join("AppData/Local/Steam"));
            }
        }

        #[cfg(not(target_os = "windows"))]
        if let Some(home) = &self.home {
            roots.push(home.join(".steam/steam"));
            roots.push(home.join(".local/share/Steam"));
        }

        roots
    }
}

/// Library roots listed in `libraryfolders.vdf`, or the Steam root itself.
fn parse_library_folders(steam_root: &Path) -> Vec<PathBuf> {
    let library_vdf = steam_root.join("steamapps/libraryfolders.vdf");
    let contents = match fs::read_to_string(&library_vdf) {
        Ok(contents) => contents,
        Err(_) => return vec![steam_root.to_path_buf()],
    };

    let mut libraries: Vec<PathBuf> = LIBRARY_PATH_CAPTURE
        .captures_iter(&contents)
        .map(|capture| PathBuf::from(capture[1].replace("\\\\", "\\")))
        .collect();
    if libraries.is_empty() {
        libraries.push(steam_root.to_path_buf());
    }
    libraries
}

fn file_name_matches(path: &Path, wanted_lower: &str) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_lowercase() == wanted_lower)
        .unwrap_or(false)
}

fn is_system_directory(dir_name: &str) -> bool {
    matches!(
        dir_name,
        "windows"
            | "system32"
            | "syswow64"
            | "programdata"
            | "$recycle.bin"
            | "recovery"
            | "boot"
            | "msocache"
            | "system volume information"
            | "config.msi"
            | "temp"
            | "tmp"
            | "proc"
            | "sys"
            | "dev"
            | "run"
            | "node_modules"
            | ".git"
            | "target"
            | "dist"
            | "build"
    )
}

fn search_in_directory(
    dir: &Path,
    wanted_lower: &str,
    depth: usize,
    cancel: &AtomicBool,
    found: &mut Vec<PathBuf>,
) {
    if depth > MAX_SEARCH_DEPTH || cancel.load(Ordering::Relaxed) {
        return;
    }
    if let Some(name) = dir.file_name() {
        if is_system_directory(&name.to_string_lossy().to_lowercase()) {
            return;
        }
    }

    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_file() {
            if file_name_matches(&path, wanted_lower) && !found.contains(&path) {
                found.push(path);
            }
        } else if file_type.is_dir() {
            search_in_directory(&path, wanted_lower, depth + 1, cancel, found);
        }
    }
}
