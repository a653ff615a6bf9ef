//! Project manifest model and upward discovery.
//!
//! A project declares its packages in a `pkg.json` at the project root:
//!
//! ```json
//! {
//!   "name": "my-project",
//!   "dependencies": { "fmt": "^2.1" },
//!   "devDependencies": { "fmt-check": "^0.4" }
//! }
//! ```
//!
//! Values are version requirements; the resolver only consults the declared
//! names.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use super::config::Config;
use super::error::{FmtkitError, Result};

/// A parsed project manifest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,

    /// Runtime dependencies, name to version requirement.
    #[serde(default)]
    pub dependencies: HashMap<String, String>,

    /// Development dependencies, name to version requirement.
    #[serde(default, rename = "devDependencies")]
    pub dev_dependencies: HashMap<String, String>,
}

impl Manifest {
    /// Reads and parses a manifest file.
    pub fn read_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            FmtkitError::Manifest(path.display().to_string(), e.to_string())
        })
    }

    /// Whether `name` appears in either declared dependency set.
    pub fn declares(&self, name: &str) -> bool {
        self.dependencies.contains_key(name) || self.dev_dependencies.contains_key(name)
    }
}

/// The nearest manifest above a starting path, with its directory.
#[derive(Debug, Clone)]
pub struct FoundManifest {
    pub dir: PathBuf,
    pub manifest: Manifest,
}

/// Locates and parses the nearest manifest walking upward from `start`
/// toward the filesystem root. `start` may name a file or a directory.
pub fn closest_manifest(config: &Config, start: &Path) -> Result<Option<FoundManifest>> {
    for dir in start.ancestors() {
        let candidate = config.manifest_path(dir);
        if candidate.is_file() {
            debug!("Found manifest at {}", candidate.display());
            let manifest = Manifest::read_from(&candidate)?;
            return Ok(Some(FoundManifest {
                dir: dir.to_path_buf(),
                manifest,
            }));
        }
    }
    debug!("No manifest found above {}", start.display());
    Ok(None)
}
