//! Release chores: version bumps, the updater manifest, and portable build naming.

use crate::time::format_rfc3339;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const WINDOWS_PLATFORM: &str = "windows-x86_64";
pub const LATEST_JSON_FILE: &str = "latest.json";
pub const DEFAULT_TAURI_CONF: &str = "apps/desktop/src-tauri/tauri.conf.json";

#[derive(Debug, thiserror::Error)]
pub enum ReleaseError {
    #[error("invalid version `{0}`, expected X.Y.Z")]
    InvalidVersion(String),
    #[error("no version found in {}", .0.display())]
    MissingVersion(PathBuf),
    #[error("no signed Windows installer in {}", .0.display())]
    NoSignedArtifact(PathBuf),
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON in {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> ReleaseError + '_ {
    move |source| ReleaseError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

/// Strict `X.Y.Z` release version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl Version {
    pub fn bumped(self, kind: BumpKind) -> Self {
        match kind {
            BumpKind::Major => Self {
                major: self.major + 1,
                minor: 0,
                patch: 0,
            },
            BumpKind::Minor => Self {
                minor: self.minor + 1,
                patch: 0,
                ..self
            },
            BumpKind::Patch => Self {
                patch: self.patch + 1,
                ..self
            },
        }
    }
}

impl FromStr for Version {
    type Err = ReleaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ReleaseError::InvalidVersion(s.to_string());
        let parts: Vec<&str> = s.trim().split('.').collect();
        let &[major, minor, patch] = parts.as_slice() else {
            return Err(invalid());
        };
        let number = |part: &str| -> Result<u64, ReleaseError> {
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            part.parse().map_err(|_| invalid())
        };
        Ok(Self {
            major: number(major)?,
            minor: number(minor)?,
            patch: number(patch)?,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

fn read_json(path: &Path) -> Result<Value, ReleaseError> {
    let contents = fs::read_to_string(path).map_err(io_error(path))?;
    serde_json::from_str(&contents).map_err(|source| ReleaseError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Two-space indent plus trailing newline, the npm convention.
fn write_json(path: &Path, value: &Value) -> Result<(), ReleaseError> {
    let mut json = serde_json::to_string_pretty(value).map_err(|source| ReleaseError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    json.push('\n');
    fs::write(path, json).map_err(io_error(path))
}

fn version_field(value: &Value) -> Option<&str> {
    value
        .get("version")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|version| !version.is_empty())
}

fn set_version(value: &mut Value, version: &Version) {
    if let Some(object) = value.as_object_mut() {
        object.insert("version".into(), Value::from(version.to_string()));
    }
}

/// The three files that carry the app version.
#[derive(Debug, Clone)]
pub struct ProjectFiles {
    pub package_json: PathBuf,
    pub package_lock: PathBuf,
    pub tauri_conf: PathBuf,
}

impl ProjectFiles {
    pub fn new(root: &Path, tauri_conf: &Path) -> Self {
        Self {
            package_json: root.join("package.json"),
            package_lock: root.join("package-lock.json"),
            tauri_conf: root.join(tauri_conf),
        }
    }

    /// Version from `tauri.conf.json`, falling back to `package.json`.
    pub fn current_version(&self) -> Result<Version, ReleaseError> {
        let tauri = read_json(&self.tauri_conf)?;
        if let Some(version) = version_field(&tauri) {
            return version.parse();
        }
        let package = read_json(&self.package_json)?;
        version_field(&package)
            .ok_or_else(|| ReleaseError::MissingVersion(self.package_json.clone()))?
            .parse()
    }
}

/// Bump the version and write it everywhere. A missing lock file is skipped.
pub fn bump_version(files: &ProjectFiles, kind: BumpKind) -> Result<Version, ReleaseError> {
    let next = files.current_version()?.bumped(kind);

    let mut package = read_json(&files.package_json)?;
    set_version(&mut package, &next);
    write_json(&files.package_json, &package)?;

    if files.package_lock.exists() {
        let mut lock = read_json(&files.package_lock)?;
        set_version(&mut lock, &next);
        if let Some(root) = lock.pointer_mut("/packages/") {
            set_version(root, &next);
        }
        write_json(&files.package_lock, &lock)?;
    } else {
        log::info!("{} not found, skipping", files.package_lock.display());
    }

    let mut tauri = read_json(&files.tauri_conf)?;
    set_version(&mut tauri, &next);
    write_json(&files.tauri_conf, &tauri)?;

    Ok(next)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformRelease {
    pub signature: String,
    pub url: String,
}

/// Updater manifest consumed by the desktop app's update check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LatestJson {
    pub version: String,
    pub notes: String,
    pub pub_date: String,
    pub platforms: BTreeMap<String, PlatformRelease>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedArtifact {
    pub file_name: String,
    pub signature_path: PathBuf,
}

fn find_signed(dir: &Path, matches: impl Fn(&str) -> bool) -> Option<SignedArtifact> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .ok()?
        .flatten()
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .filter(|name| matches(&name.to_lowercase()))
        .collect();
    names.sort();
    names.into_iter().find_map(|file_name| {
        let signature_path = dir.join(format!("{file_name}.sig"));
        signature_path.is_file().then_some(SignedArtifact {
            file_name,
            signature_path,
        })
    })
}

/// An `.msi` with a signature wins over an NSIS `-setup.exe`.
pub fn find_windows_artifact(bundle_dir: &Path) -> Option<SignedArtifact> {
    find_signed(&bundle_dir.join("msi"), |name| name.ends_with(".msi"))
        .or_else(|| find_signed(&bundle_dir.join("nsis"), |name| name.ends_with("-setup.exe")))
}

pub fn build_latest_json(
    bundle_dir: &Path,
    version: &Version,
    repo: &str,
    published: DateTime<Utc>,
) -> Result<LatestJson, ReleaseError> {
    let artifact = find_windows_artifact(bundle_dir)
        .ok_or_else(|| ReleaseError::NoSignedArtifact(bundle_dir.to_path_buf()))?;
    let signature = fs::read_to_string(&artifact.signature_path)
        .map_err(io_error(&artifact.signature_path))?
        .trim()
        .to_string();
    let url = format!(
        "https://github.com/{repo}/releases/download/v{version}/{}",
        artifact.file_name
    );

    let mut platforms = BTreeMap::new();
    platforms.insert(WINDOWS_PLATFORM.to_string(), PlatformRelease { signature, url });
    Ok(LatestJson {
        version: version.to_string(),
        notes: format!("Release v{version}"),
        pub_date: format_rfc3339(published),
        platforms,
    })
}

/// Write `latest.json` into the bundle directory and return its path.
pub fn write_latest_json(
    bundle_dir: &Path,
    version: &Version,
    repo: &str,
) -> Result<PathBuf, ReleaseError> {
    let latest = build_latest_json(bundle_dir, version, repo, Utc::now())?;
    let path = bundle_dir.join(LATEST_JSON_FILE);
    let value = serde_json::to_value(&latest).map_err(|source| ReleaseError::Json {
        path: path.clone(),
        source,
    })?;
    write_json(&path, &value)?;
    Ok(path)
}

/// Rename `{base}.exe` to `{base}_{version}.exe`. Running it again after a
/// rename is a no-op that returns the existing versioned file.
pub fn rename_portable(
    target_dir: &Path,
    base: &str,
    version: &Version,
) -> Result<Option<PathBuf>, ReleaseError> {
    let source = target_dir.join(format!("{base}.exe"));
    let destination = target_dir.join(format!("{base}_{version}.exe"));

    if !source.is_file() {
        return Ok(destination.is_file().then_some(destination));
    }
    if destination.exists() {
        fs::remove_file(&destination).map_err(io_error(&destination))?;
    }
    fs::rename(&source, &destination).map_err(io_error(&source))?;
    log::info!("renamed {} -> {}", source.display(), destination.display());
    Ok(Some(destination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn parses_strict_versions() {
        let version: Version = "1.4.9".parse().unwrap();
        assert_eq!(version.to_string(), "1.4.9");
        for bad in ["1.4", "1.4.9-beta", "v1.4.9", "1..2", "1.2.3.4", ""] {
            assert!(bad.parse::<Version>().is_err(), "{bad}");
        }
    }

    #[test]
    fn bump_resets_lower_components() {
        let version: Version = "1.4.9".parse().unwrap();
        assert_eq!(version.bumped(BumpKind::Patch).to_string(), "1.4.10");
        assert_eq!(version.bumped(BumpKind::Minor).to_string(), "1.5.0");
        assert_eq!(version.bumped(BumpKind::Major).to_string(), "2.0.0");
    }

    #[test]
    fn bump_updates_all_version_files() {
        let root = tempdir().unwrap();
        let conf = Path::new("src-tauri/tauri.conf.json");
        fs::create_dir_all(root.path().join("src-tauri")).unwrap();
        fs::write(root.path().join("package.json"), r#"{"name":"app","version":"0.3.1"}"#).unwrap();
        fs::write(
            root.path().join("package-lock.json"),
            r#"{"version":"0.3.1","packages":{"":{"version":"0.3.1"}}}"#,
        )
        .unwrap();
        fs::write(root.path().join(conf), r#"{"productName":"app","version":"0.3.1"}"#).unwrap();

        let files = ProjectFiles::new(root.path(), conf);
        let next = bump_version(&files, BumpKind::Minor).unwrap();
        assert_eq!(next.to_string(), "0.4.0");

        let lock = read_json(&files.package_lock).unwrap();
        assert_eq!(lock["version"], "0.4.0");
        assert_eq!(lock["packages"][""]["version"], "0.4.0");
        let package = fs::read_to_string(&files.package_json).unwrap();
        assert!(package.starts_with("{\n  \"name\": \"app\""));
        assert!(package.ends_with("}\n"));
        assert_eq!(read_json(&files.tauri_conf).unwrap()["version"], "0.4.0");
    }

    #[test]
    fn latest_json_prefers_signed_msi() {
        let bundle = tempdir().unwrap();
        let msi = bundle.path().join("msi");
        let nsis = bundle.path().join("nsis");
        fs::create_dir_all(&msi).unwrap();
        fs::create_dir_all(&nsis).unwrap();
        fs::write(msi.join("App_1.2.0_x64_en-US.msi"), b"").unwrap();
        fs::write(nsis.join("App_1.2.0_x64-setup.exe"), b"").unwrap();
        fs::write(nsis.join("App_1.2.0_x64-setup.exe.sig"), "nsis-sig").unwrap();

        let version: Version = "1.2.0".parse().unwrap();
        let published = Utc.with_ymd_and_hms(2024, 5, 1, 8, 0, 0).unwrap();
        let latest = build_latest_json(bundle.path(), &version, "owner/app", published).unwrap();
        // The msi has no signature, so the installer falls back to NSIS.
        let windows = &latest.platforms[WINDOWS_PLATFORM];
        assert_eq!(windows.signature, "nsis-sig");
        assert_eq!(
            windows.url,
            "https://github.com/owner/app/releases/download/v1.2.0/App_1.2.0_x64-setup.exe"
        );

        fs::write(msi.join("App_1.2.0_x64_en-US.msi.sig"), "msi-sig\n").unwrap();
        let latest = build_latest_json(bundle.path(), &version, "owner/app", published).unwrap();
        assert_eq!(latest.platforms[WINDOWS_PLATFORM].signature, "msi-sig");
        assert_eq!(latest.notes, "Release v1.2.0");
        assert_eq!(latest.pub_date, "2024-05-01T08:00:00.000Z");
    }

    #[test]
    fn missing_artifact_is_an_error() {
        let bundle = tempdir().unwrap();
        let version: Version = "1.0.0".parse().unwrap();
        assert!(matches!(
            write_latest_json(bundle.path(), &version, "owner/app"),
            Err(ReleaseError::NoSignedArtifact(_))
        ));
    }

    #[test]
    fn rename_portable_is_idempotent() {
        let target = tempdir().unwrap();
        fs::write(target.path().join("d2r-ultra-utility.exe"), b"exe").unwrap();
        let version: Version = "2.0.1".parse().unwrap();

        let renamed = rename_portable(target.path(), "d2r-ultra-utility", &version)
            .unwrap()
            .unwrap();
        assert!(renamed.ends_with("d2r-ultra-utility_2.0.1.exe"));
        let again = rename_portable(target.path(), "d2r-ultra-utility", &version).unwrap();
        assert_eq!(again, Some(renamed));
        assert!(!target.path().join("d2r-ultra-utility.exe").exists());
    }
}
