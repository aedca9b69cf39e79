//! CLI configuration management.
//!
//! Settings come from a TOML file, by default
//! `$XDG_CONFIG_HOME/bucketsync/config.toml` or
//! `~/.config/bucketsync/config.toml`, with command-line flags applied on
//! top. A missing default file means defaults.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Context;
use bucketsync_engine::SyncConfig;
use bucketsync_file_ops::{expand_home, home_dir};
use bucketsync_protocol::StorageClass;
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten)]
    pub sync: SyncConfig,

    /// Directory backing `s3://` addresses.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_root: Option<PathBuf>,
}

impl Config {
    /// Loads `explicit` if given (it must exist), otherwise the default
    /// location when present.
    pub fn load(explicit: Option<&Path>) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => {
                let path = config_path();
                if path.exists() {
                    Self::load_file(&path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    fn load_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Overrides file settings with whatever was given on the command line.
    pub fn apply_flags(&mut self, cli: &Cli) -> anyhow::Result<()> {
        let sync = &mut self.sync;

        if let Some(access_key) = &cli.access_key {
            sync.access_key = access_key.clone();
        }
        if let Some(secret_key) = &cli.secret_key {
            sync.secret_key = secret_key.clone();
        }
        if let Some(storage_class) = &cli.storage_class {
            sync.storage_class = StorageClass::from_str(storage_class)?;
        }
        if let Some(concurrency) = cli.concurrency {
            sync.concurrency = concurrency;
        }
        if let Some(part_size) = cli.part_size {
            sync.part_size = part_size;
        }
        if let Some(recursive) = cli.recursive {
            sync.recursive = recursive;
        }

        sync.check_content_hash |= cli.check_md5;
        sync.dry_run |= cli.dry_run;
        sync.verbose |= cli.verbose;
        sync.force |= cli.force;
        sync.skip_existing |= cli.skip_existing;

        if let Some(root) = &cli.store_root {
            self.store_root = Some(root.clone());
        }
        if let Some(root) = &self.store_root {
            self.store_root = Some(expand_home(&root.to_string_lossy()));
        }

        sync.validate()?;
        Ok(())
    }
}

/// Returns the default configuration file path.
fn config_path() -> PathBuf {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|dir| !dir.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".config"));
    base.join("bucketsync").join("config.toml")
}
