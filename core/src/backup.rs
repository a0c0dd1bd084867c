use crate::time::backup_stamp;
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BackupOutcome {
    pub backup_path: Option<PathBuf>,
    pub final_path: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("{0}")]
    Io(#[from] io::Error),
    #[error("failed to create backup: {0}")]
    BackupCreate(String),
}

/// Copy the current file to `<name>.<ext>.bak.<stamp>` and then replace it atomically.
pub fn backup_and_swap(target: &Path, contents: &[u8]) -> Result<BackupOutcome, BackupError> {
    let parent = target
        .parent()
        .ok_or_else(|| BackupError::BackupCreate("target has no parent directory".into()))?;
    fs::create_dir_all(parent)?;

    let backup_path = if target.exists() {
        let candidate = backup_path_for(target, &backup_stamp());
        fs::copy(target, &candidate).map_err(|err| BackupError::BackupCreate(err.to_string()))?;
        Some(candidate)
    } else {
        None
    };

    atomic_write(target, contents)?;

    Ok(BackupOutcome {
        backup_path,
        final_path: target.to_path_buf(),
    })
}

/// Write through a sibling temp file, fsync, then rename over `target`.
pub fn atomic_write(target: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = build_temp_path(target);
    let mut file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&temp_path)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);

    #[cfg(target_os = "windows")]
    {
        use std::io::ErrorKind;
        if let Err(err) = fs::rename(&temp_path, target) {
            if err.kind() == ErrorKind::AlreadyExists || err.kind() == ErrorKind::PermissionDenied {
                fs::remove_file(target)?;
                fs::rename(&temp_path, target)?;
            } else {
                let _ = fs::remove_file(&temp_path);
                return Err(err);
            }
        }
    }

    #[cfg(not(target_os = "windows"))]
    {
        if let Err(err) = fs::rename(&temp_path, target) {
            let _ = fs::remove_file(&temp_path);
            return Err(err);
        }
    }

    Ok(())
}

fn backup_path_for(target: &Path, stamp: &str) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(format!(".bak.{stamp}"));
    target.with_file_name(name)
}

fn build_temp_path(target: &Path) -> PathBuf {
    let mut temp = target.to_path_buf();
    let pid = std::process::id();
    let suffix = format!("__tmp__pid_{}", pid);
    match temp.file_name() {
        Some(name) => {
            let mut os_string = name.to_os_string();
            os_string.push(suffix);
            temp.set_file_name(os_string);
        }
        None => {
            temp.push(format!("temp_{pid}"));
        }
    }
    temp
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_backup_and_swaps() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("item-names.json");
        fs::write(&target, b"[]").unwrap();
        let outcome = backup_and_swap(&target, b"[{\"id\":1}]").unwrap();
        let backup = outcome.backup_path.expect("backup created");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "[]");
        assert!(backup
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("item-names.json.bak."));
        assert_eq!(fs::read_to_string(&target).unwrap(), "[{\"id\":1}]");
    }

    #[test]
    fn new_file_has_no_backup() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("nested/strings/new.json");
        let outcome = backup_and_swap(&target, b"[]").unwrap();
        assert!(outcome.backup_path.is_none());
        assert!(target.exists());
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempdir().unwrap();
        let target = dir.path().join("storage.json");
        atomic_write(&target, b"{}").unwrap();
        atomic_write(&target, b"{\"a\":\"b\"}").unwrap();
        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names.len(), 1);
        assert_eq!(fs::read_to_string(&target).unwrap(), "{\"a\":\"b\"}");
    }
}
