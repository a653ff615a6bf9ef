// fmtkit-resolver/src/lib.rs
pub mod dylib;
pub mod loader;
pub mod output;
pub mod resolver;
pub mod vendor;

// Re-export key types
pub use dylib::{DylibLoader, PluginModule, PluginTable, ABI_VERSION};
pub use loader::ModuleLoader;
pub use output::{LogSink, OutputSink};
pub use resolver::{DylibResolver, ModuleResolver};
pub use vendor::VendorRegistry;
