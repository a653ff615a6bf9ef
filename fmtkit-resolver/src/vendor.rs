// fmtkit-resolver/src/vendor.rs
use std::path::{Path, PathBuf};

use fmtkit_common::manifest::closest_manifest;
use fmtkit_common::{Config, Result};
use tracing::debug;

/// Locates plugin packages installed under project vendor directories.
#[derive(Debug)]
pub struct VendorRegistry {
    config: Config,
}

impl VendorRegistry {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Upward search for a project manifest declaring `name`, starting at
    /// `start` and walking toward the filesystem root.
    ///
    /// The nearest manifest is consulted first; if it does not declare the
    /// package, the search resumes from the parent of that manifest's
    /// directory, terminating once that parent is the root itself. On a
    /// declaring manifest the search stops and the installed entry path
    /// relative to that directory is returned, whether or not the plugin
    /// is actually present on disk; a missing file surfaces as a load
    /// failure at the caller.
    pub fn locate(&self, start: &Path, name: &str) -> Result<Option<PathBuf>> {
        let root = start
            .ancestors()
            .last()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let mut cursor = start.to_path_buf();

        loop {
            let found = match closest_manifest(&self.config, &cursor)? {
                Some(found) => found,
                None => return Ok(None),
            };

            if found.manifest.declares(name) {
                let entry = self.config.plugin_entry_path(&found.dir, name);
                if entry.is_file() {
                    debug!(
                        "Found installed plugin '{}' at {}",
                        name,
                        entry.display()
                    );
                } else {
                    debug!(
                        "Plugin '{}' declared in {} but not installed at {}",
                        name,
                        found.dir.display(),
                        entry.display()
                    );
                }
                return Ok(Some(entry));
            }

            let parent = match found.dir.parent() {
                Some(parent) => parent,
                None => return Ok(None),
            };
            if parent == root {
                debug!(
                    "Manifest search for '{}' reached {} without a declaration",
                    name,
                    root.display()
                );
                return Ok(None);
            }
            cursor = parent.to_path_buf();
        }
    }
}
