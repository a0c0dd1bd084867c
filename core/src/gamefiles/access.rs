/// Write-permission helpers for game folders that ship read-only files.
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsureResult {
    pub path: String,
    pub is_readonly: bool,
    pub removed_readonly: bool,
    pub writable: bool,
    pub error: Option<String>,
}

impl EnsureResult {
    fn new(path: &Path) -> Self {
        Self {
            path: path.display().to_string(),
            is_readonly: false,
            removed_readonly: false,
            writable: false,
            error: None,
        }
    }
}

/// Clear the read-only flag on each file and report whether it can now be opened for writing.
/// Missing files are reported writable when their directory can be created.
pub fn ensure_writable<P: AsRef<Path>>(paths: &[P]) -> Vec<EnsureResult> {
    paths
        .iter()
        .map(|path| ensure_one_writable(path.as_ref()))
        .collect()
}

fn ensure_one_writable(path: &Path) -> EnsureResult {
    let mut result = EnsureResult::new(path);

    let metadata = match fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            match path.parent().map(fs::create_dir_all).transpose() {
                Ok(_) => result.writable = true,
                Err(err) => result.error = Some(err.to_string()),
            }
            return result;
        }
        Err(err) => {
            result.error = Some(err.to_string());
            return result;
        }
    };

    let mut permissions = metadata.permissions();
    result.is_readonly = permissions.readonly();
    if result.is_readonly {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        match fs::set_permissions(path, permissions) {
            Ok(()) => result.removed_readonly = true,
            Err(err) => {
                log::warn!("cannot clear read-only flag on {}: {err}", path.display());
                result.error = Some(err.to_string());
            }
        }
    }

    if metadata.is_dir() {
        result.writable = !result.is_readonly || result.removed_readonly;
        return result;
    }

    match OpenOptions::new().append(true).open(path) {
        Ok(_) => result.writable = true,
        Err(err) => {
            if result.error.is_none() {
                result.error = Some(err.to_string());
            }
        }
    }
    result
}

/// Create every directory in `paths`, with parents.
pub fn ensure_dirs<P: AsRef<Path>>(paths: &[P]) -> io::Result<Vec<PathBuf>> {
    paths
        .iter()
        .map(|path| {
            fs::create_dir_all(path.as_ref())?;
            Ok(path.as_ref().to_path_buf())
        })
        .collect()
}
