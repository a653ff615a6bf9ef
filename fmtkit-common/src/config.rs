// fmtkit-common/src/config.rs
use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::Result;

const DEFAULT_MANIFEST_NAME: &str = "pkg.json";
const DEFAULT_VENDOR_DIR: &str = "vendor";

#[derive(Debug, Clone)]
pub struct Config {
    pub manifest_name: String,
    pub vendor_dir: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading fmtkit configuration");

        let manifest_name = env::var("FMTKIT_MANIFEST")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                debug!(
                    "FMTKIT_MANIFEST environment variable not set or empty, falling back to default: {}",
                    DEFAULT_MANIFEST_NAME
                );
                DEFAULT_MANIFEST_NAME.to_string()
            });

        let vendor_dir = env::var("FMTKIT_VENDOR_DIR")
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| {
                debug!(
                    "FMTKIT_VENDOR_DIR environment variable not set or empty, falling back to default: {}",
                    DEFAULT_VENDOR_DIR
                );
                DEFAULT_VENDOR_DIR.to_string()
            });

        debug!("Configuration loaded successfully.");
        Ok(Self {
            manifest_name,
            vendor_dir,
        })
    }

    pub fn manifest_path(&self, dir: &Path) -> PathBuf {
        dir.join(&self.manifest_name)
    }

    pub fn vendor_dir_path(&self, base: &Path) -> PathBuf {
        base.join(&self.vendor_dir)
    }

    pub fn plugin_dir(&self, base: &Path, name: &str) -> PathBuf {
        self.vendor_dir_path(base).join(name)
    }

    /// On-disk entry path of a plugin installed under `base`'s vendor
    /// directory, using the platform dynamic-library file name.
    pub fn plugin_entry_path(&self, base: &Path, name: &str) -> PathBuf {
        self.plugin_dir(base, name).join(dylib_file_name(name))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::load().expect("Failed to load default configuration")
    }
}

/// Platform file name of a plugin dylib, e.g. `libfmt.so` on Linux.
pub fn dylib_file_name(name: &str) -> String {
    format!(
        "{}{}{}",
        env::consts::DLL_PREFIX,
        name,
        env::consts::DLL_SUFFIX
    )
}

pub fn load_config() -> Result<Config> {
    Config::load()
}
