use std::path::Path;

use fmtkit_common::Result;

/// Module-loading capability injected into the resolver.
///
/// `load_path` loads a project-local plugin from a resolved on-disk entry
/// path; `load_bundled` loads the copy shipped with the host by package
/// name. Keeping this a trait lets the resolver run against a test double
/// without a real plugin or dynamic linker.
pub trait ModuleLoader {
    type Module;

    fn load_path(&self, path: &Path) -> Result<Self::Module>;

    fn load_bundled(&self, name: &str) -> Result<Self::Module>;
}
