//! Dynamic-library plugin loading.
//!
//! A formatter plugin is a cdylib exporting `fmt_plugin_entry`, which
//! returns a table of C function pointers. The table's ABI version must
//! match the host's.

use std::path::{Path, PathBuf};

use fmtkit_common::config::dylib_file_name;
use fmtkit_common::error::{FmtkitError, Result};
use libloading::{Library, Symbol};
use tracing::debug;

use crate::loader::ModuleLoader;

/// ABI version - must match the version in the plugin's table.
pub const ABI_VERSION: u32 = 1;

/// Formats `input_len` bytes at `input`; returns a buffer owned by the
/// plugin, with its length written through `out_len`, or null on failure.
pub type FormatFn = extern "C" fn(input: *const u8, input_len: usize, out_len: *mut usize) -> *mut u8;

/// Releases a buffer returned by [`FormatFn`].
pub type ReleaseFn = extern "C" fn(buf: *mut u8, len: usize);

/// Plugin table from a loaded library.
#[repr(C)]
#[derive(Debug)]
pub struct PluginTable {
    pub abi_version: u32,
    pub format: FormatFn,
    pub release: ReleaseFn,
}

/// A loaded formatter plugin.
#[derive(Debug)]
pub struct PluginModule {
    /// Keep library alive.
    _lib: Library,
    path: PathBuf,
    table: PluginTable,
}

impl PluginModule {
    /// Load a plugin from a dynamic library path.
    pub fn open(path: &Path) -> Result<Self> {
        let lib = unsafe { Library::new(path) }.map_err(|e| {
            FmtkitError::Load(format!("failed to load plugin {}: {e}", path.display()))
        })?;

        let table = {
            let entry: Symbol<extern "C" fn() -> PluginTable> = unsafe {
                lib.get(b"fmt_plugin_entry").map_err(|_| {
                    FmtkitError::Load(format!(
                        "plugin {} missing fmt_plugin_entry",
                        path.display()
                    ))
                })?
            };
            entry()
        };

        if table.abi_version != ABI_VERSION {
            return Err(FmtkitError::AbiMismatch {
                expected: ABI_VERSION,
                found: table.abi_version,
            });
        }

        Ok(Self {
            _lib: lib,
            path: path.to_path_buf(),
            table,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Formats `input` through the plugin's entry point.
    pub fn format(&self, input: &str) -> Result<String> {
        let mut out_len = 0usize;
        let buf = (self.table.format)(input.as_ptr(), input.len(), &mut out_len);
        if buf.is_null() {
            return Err(FmtkitError::Plugin(format!(
                "plugin {} failed to format input",
                self.path.display()
            )));
        }

        let bytes = unsafe { std::slice::from_raw_parts(buf, out_len) }.to_vec();
        (self.table.release)(buf, out_len);

        String::from_utf8(bytes).map_err(|e| {
            FmtkitError::Plugin(format!(
                "plugin {} returned invalid UTF-8: {e}",
                self.path.display()
            ))
        })
    }
}

/// Production loader backed by the platform dynamic linker.
///
/// The bundled fallback copy lives in a directory shipped with the host,
/// under the platform dylib file name of the package.
pub struct DylibLoader {
    bundled_dir: PathBuf,
}

impl DylibLoader {
    pub fn new(bundled_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundled_dir: bundled_dir.into(),
        }
    }
}

impl ModuleLoader for DylibLoader {
    type Module = PluginModule;

    fn load_path(&self, path: &Path) -> Result<PluginModule> {
        PluginModule::open(path)
    }

    fn load_bundled(&self, name: &str) -> Result<PluginModule> {
        let path = self.bundled_dir.join(dylib_file_name(name));
        debug!("Loading bundled plugin '{}' from {}", name, path.display());
        PluginModule::open(&path)
    }
}
