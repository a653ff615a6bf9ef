//! Project-local module resolution.
//!
//! `ModuleResolver` prefers a copy of the formatter plugin installed by
//! the project enclosing a starting path, falling back to the bundled
//! copy shipped with the host. Resolved instances are memoized per
//! starting path for the life of the resolver; a cache hit never re-reads
//! the project manifest, even if it has since changed on disk.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use fmtkit_common::{Config, Result};
use tracing::debug;

use crate::dylib::DylibLoader;
use crate::loader::ModuleLoader;
use crate::output::{LogSink, OutputSink};
use crate::vendor::VendorRegistry;

pub struct ModuleResolver<L: ModuleLoader> {
    pkg_name: String,
    registry: VendorRegistry,
    loader: L,
    output: Box<dyn OutputSink>,
    instances: Mutex<HashMap<PathBuf, Arc<L::Module>>>,
    bundled: Mutex<Option<Arc<L::Module>>>,
}

/// Resolver over the production dynamic-library backend.
pub type DylibResolver = ModuleResolver<DylibLoader>;

impl<L: ModuleLoader> ModuleResolver<L> {
    pub fn new(pkg_name: impl Into<String>, config: Config, loader: L) -> Self {
        Self::with_output(pkg_name, config, loader, Box::new(LogSink))
    }

    pub fn with_output(
        pkg_name: impl Into<String>,
        config: Config,
        loader: L,
        output: Box<dyn OutputSink>,
    ) -> Self {
        Self {
            pkg_name: pkg_name.into(),
            registry: VendorRegistry::new(config),
            loader,
            output,
            instances: Mutex::new(HashMap::new()),
            bundled: Mutex::new(None),
        }
    }

    pub fn package_name(&self) -> &str {
        &self.pkg_name
    }

    /// Returns the formatter module for `start_path`.
    ///
    /// Without a starting path the bundled module is returned directly,
    /// with no search and no cache interaction. Otherwise a previously
    /// resolved instance for that exact path wins unconditionally; on a
    /// miss the enclosing project is searched and the result, local or
    /// bundled, is cached under `start_path`. Only a failure to produce
    /// the bundled module is an error.
    pub fn instance(&self, start_path: Option<&Path>) -> Result<Arc<L::Module>> {
        let start = match start_path {
            Some(start) => start,
            None => return self.bundled_instance(),
        };

        if let Some(module) = self.instances.lock().unwrap().get(start) {
            debug!("Resolved {} for {} from cache", self.pkg_name, start.display());
            return Ok(Arc::clone(module));
        }

        let module = self.load_local(start)?;
        self.instances
            .lock()
            .unwrap()
            .insert(start.to_path_buf(), Arc::clone(&module));
        Ok(module)
    }

    /// Search-then-load with the single bundled-fallback branch.
    fn load_local(&self, start: &Path) -> Result<Arc<L::Module>> {
        match self.registry.locate(start, &self.pkg_name) {
            Ok(Some(entry)) => match self.loader.load_path(&entry) {
                Ok(module) => {
                    debug!("Loaded {} from {}", self.pkg_name, entry.display());
                    return Ok(Arc::new(module));
                }
                Err(e) => self.output.add_message(&format!(
                    "Failed to load {} from {}. Using bundled. ({e})",
                    self.pkg_name,
                    entry.display()
                )),
            },
            Ok(None) => self.output.add_message(&format!(
                "No project-local {} found from {}. Using bundled.",
                self.pkg_name,
                start.display()
            )),
            Err(e) => self.output.add_message(&format!(
                "Failed to load {} from {}. Using bundled. ({e})",
                self.pkg_name,
                start.display()
            )),
        }
        self.bundled_instance()
    }

    fn bundled_instance(&self) -> Result<Arc<L::Module>> {
        let mut guard = self.bundled.lock().unwrap();
        if let Some(module) = guard.as_ref() {
            return Ok(Arc::clone(module));
        }
        let module = Arc::new(self.loader.load_bundled(&self.pkg_name)?);
        *guard = Some(Arc::clone(&module));
        Ok(module)
    }
}

impl DylibResolver {
    /// Production resolver: project-local plugins via the dynamic linker,
    /// with the bundled copy shipped in `bundled_dir`.
    pub fn with_dylib(
        pkg_name: impl Into<String>,
        config: Config,
        bundled_dir: impl Into<PathBuf>,
    ) -> Self {
        Self::new(pkg_name, config, DylibLoader::new(bundled_dir))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use fmtkit_common::FmtkitError;

    use super::*;
    use crate::output::MemorySink;

    struct FakeModule {
        origin: String,
    }

    struct FakeLoader {
        fail_paths: bool,
        fail_bundled: bool,
        path_loads: Arc<AtomicUsize>,
        bundled_loads: Arc<AtomicUsize>,
    }

    impl FakeLoader {
        fn new() -> Self {
            Self {
                fail_paths: false,
                fail_bundled: false,
                path_loads: Arc::new(AtomicUsize::new(0)),
                bundled_loads: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl ModuleLoader for FakeLoader {
        type Module = FakeModule;

        fn load_path(&self, path: &Path) -> Result<FakeModule> {
            self.path_loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_paths {
                return Err(FmtkitError::Load(format!("refused {}", path.display())));
            }
            if !path.is_file() {
                return Err(FmtkitError::Load(format!("no plugin at {}", path.display())));
            }
            Ok(FakeModule {
                origin: path.display().to_string(),
            })
        }

        fn load_bundled(&self, name: &str) -> Result<FakeModule> {
            self.bundled_loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_bundled {
                return Err(FmtkitError::Load(format!("no bundled {name}")));
            }
            Ok(FakeModule {
                origin: format!("bundled:{name}"),
            })
        }
    }

    fn test_config() -> Config {
        Config {
            manifest_name: "fmtkit-test-pkg.json".to_string(),
            vendor_dir: "vendor".to_string(),
        }
    }

    fn resolver_with(
        loader: FakeLoader,
    ) -> (ModuleResolver<FakeLoader>, Arc<Mutex<Vec<String>>>) {
        let messages = Arc::new(Mutex::new(Vec::new()));
        let sink = MemorySink {
            messages: Arc::clone(&messages),
        };
        let resolver =
            ModuleResolver::with_output("fmt", test_config(), loader, Box::new(sink));
        (resolver, messages)
    }

    fn write_manifest(dir: &Path, content: &str) {
        fs::write(test_config().manifest_path(dir), content).unwrap();
    }

    fn install_plugin(proj: &Path, name: &str) -> PathBuf {
        let entry = test_config().plugin_entry_path(proj, name);
        fs::create_dir_all(entry.parent().unwrap()).unwrap();
        fs::write(&entry, "").unwrap();
        entry
    }

    #[test]
    fn test_resolves_from_declaring_project() {
        let loader = FakeLoader::new();
        let path_loads = Arc::clone(&loader.path_loads);
        let bundled_loads = Arc::clone(&loader.bundled_loads);
        let (resolver, messages) = resolver_with(loader);

        let tmp = tempfile::tempdir().unwrap();
        let proj = tmp.path();
        let src = proj.join("src");
        fs::create_dir_all(&src).unwrap();
        write_manifest(proj, r#"{ "dependencies": { "fmt": "^2.1" } }"#);
        let entry = install_plugin(proj, "fmt");

        let start = src.join("file");
        let module = resolver.instance(Some(&start)).unwrap();

        assert_eq!(module.origin, entry.display().to_string());
        assert_eq!(path_loads.load(Ordering::SeqCst), 1);
        assert_eq!(bundled_loads.load(Ordering::SeqCst), 0);
        assert!(messages.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cache_hit_skips_search_and_load() {
        let loader = FakeLoader::new();
        let path_loads = Arc::clone(&loader.path_loads);
        let (resolver, _messages) = resolver_with(loader);

        let tmp = tempfile::tempdir().unwrap();
        let proj = tmp.path();
        write_manifest(proj, r#"{ "dependencies": { "fmt": "1" } }"#);
        install_plugin(proj, "fmt");

        let start = proj.join("main.vo");
        let first = resolver.instance(Some(&start)).unwrap();

        // Removing the manifest must not matter: the cached instance wins,
        // with no re-search and no re-load.
        fs::remove_file(test_config().manifest_path(proj)).unwrap();
        let second = resolver.instance(Some(&start)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(path_loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_no_declaring_manifest_falls_back_with_diagnostic() {
        let loader = FakeLoader::new();
        let bundled_loads = Arc::clone(&loader.bundled_loads);
        let (resolver, messages) = resolver_with(loader);

        let tmp = tempfile::tempdir().unwrap();
        write_manifest(tmp.path(), r#"{ "name": "plain" }"#);

        let module = resolver.instance(Some(tmp.path())).unwrap();

        assert_eq!(module.origin, "bundled:fmt");
        assert_eq!(bundled_loads.load(Ordering::SeqCst), 1);
        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("fmt"));
        assert!(messages[0].contains("Using bundled"));
    }

    #[test]
    fn test_load_failure_falls_back_and_names_path() {
        let mut loader = FakeLoader::new();
        loader.fail_paths = true;
        let (resolver, messages) = resolver_with(loader);

        let tmp = tempfile::tempdir().unwrap();
        let proj = tmp.path();
        write_manifest(proj, r#"{ "dependencies": { "fmt": "1" } }"#);
        let entry = install_plugin(proj, "fmt");

        let module = resolver.instance(Some(proj)).unwrap();

        assert_eq!(module.origin, "bundled:fmt");
        let messages = messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains(&entry.display().to_string()));
    }

    #[test]
    fn test_declared_but_not_installed_falls_back() {
        let loader = FakeLoader::new();
        let (resolver, messages) = resolver_with(loader);

        let tmp = tempfile::tempdir().unwrap();
        write_manifest(tmp.path(), r#"{ "devDependencies": { "fmt": "1" } }"#);

        let module = resolver.instance(Some(tmp.path())).unwrap();

        assert_eq!(module.origin, "bundled:fmt");
        assert_eq!(messages.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_manifest_falls_back() {
        let loader = FakeLoader::new();
        let (resolver, messages) = resolver_with(loader);

        let tmp = tempfile::tempdir().unwrap();
        fs::write(test_config().manifest_path(tmp.path()), "{ not json").unwrap();

        let module = resolver.instance(Some(tmp.path())).unwrap();

        assert_eq!(module.origin, "bundled:fmt");
        assert_eq!(messages.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_fallback_result_is_cached() {
        let loader = FakeLoader::new();
        let bundled_loads = Arc::clone(&loader.bundled_loads);
        let (resolver, _messages) = resolver_with(loader);

        let tmp = tempfile::tempdir().unwrap();
        let start = tmp.path().join("orphan");

        let first = resolver.instance(Some(&start)).unwrap();
        let second = resolver.instance(Some(&start)).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(bundled_loads.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_instance_without_path_skips_cache_and_search() {
        let loader = FakeLoader::new();
        let bundled_loads = Arc::clone(&loader.bundled_loads);
        let path_loads = Arc::clone(&loader.path_loads);
        let (resolver, messages) = resolver_with(loader);

        let first = resolver.instance(None).unwrap();
        let second = resolver.instance(None).unwrap();

        assert_eq!(first.origin, "bundled:fmt");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(bundled_loads.load(Ordering::SeqCst), 1);
        assert_eq!(path_loads.load(Ordering::SeqCst), 0);
        assert!(resolver.instances.lock().unwrap().is_empty());
        assert!(messages.lock().unwrap().is_empty());
    }

    #[test]
    fn test_bundled_failure_propagates() {
        let mut loader = FakeLoader::new();
        loader.fail_bundled = true;
        let (resolver, _messages) = resolver_with(loader);

        let tmp = tempfile::tempdir().unwrap();

        let result = resolver.instance(Some(tmp.path()));
        assert!(matches!(result, Err(FmtkitError::Load(_))));
    }
}
