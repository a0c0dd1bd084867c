use anyhow::Context;
use clap::{Parser, Subcommand};
use d2r_utility_core::release::{
    bump_version, rename_portable, write_latest_json, BumpKind, ProjectFiles, Version,
    DEFAULT_TAURI_CONF,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "d2r-release")]
#[command(about = "Release helpers for D2R Ultra Utility", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bump the app version in package.json, package-lock.json and tauri.conf.json
    Bump {
        /// Which component to increment
        #[arg(value_enum)]
        kind: BumpKind,

        /// Project root
        #[arg(short, long, default_value = ".")]
        root: PathBuf,

        /// tauri.conf.json, relative to the root
        #[arg(short, long, default_value = DEFAULT_TAURI_CONF)]
        tauri_conf: PathBuf,
    },

    /// Write the updater manifest for a signed Windows bundle
    LatestJson {
        /// Tauri bundle directory (contains msi/ or nsis/)
        #[arg(short, long)]
        bundle_dir: PathBuf,

        /// Released version, X.Y.Z
        #[arg(short, long)]
        version: String,

        /// GitHub repository as owner/name
        #[arg(short, long)]
        repo: String,
    },

    /// Append the version to the portable executable name
    RenamePortable {
        /// Directory holding the built executable
        #[arg(short, long)]
        target_dir: PathBuf,

        /// Executable name without extension
        #[arg(short, long, default_value = "d2r-ultra-utility")]
        base: String,

        /// Released version, X.Y.Z
        #[arg(short, long)]
        version: String,
    },
}

impl Commands {
    fn execute(self) -> anyhow::Result<()> {
        match self {
            Commands::Bump {
                kind,
                root,
                tauri_conf,
            } => {
                let files = ProjectFiles::new(&root, &tauri_conf);
                let version = bump_version(&files, kind).context("version bump failed")?;
                println!("{version}");
            }
            Commands::LatestJson {
                bundle_dir,
                version,
                repo,
            } => {
                let version: Version = version.parse()?;
                let path = write_latest_json(&bundle_dir, &version, &repo)
                    .with_context(|| format!("could not write manifest for v{version}"))?;
                println!("{}", path.display());
            }
            Commands::RenamePortable {
                target_dir,
                base,
                version,
            } => {
                let version: Version = version.parse()?;
                match rename_portable(&target_dir, &base, &version)? {
                    Some(path) => println!("{}", path.display()),
                    None => log::warn!("{base}.exe not found in {}", target_dir.display()),
                }
            }
        }
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    cli.command.execute()?;

    Ok(())
}
