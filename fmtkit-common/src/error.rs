use std::sync::Arc;

use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum FmtkitError {
    #[error("I/O Error: {0}")]
    Io(#[from] Arc<std::io::Error>),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] Arc<serde_json::Error>),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Manifest Error in {0}: {1}")]
    Manifest(String, String),

    #[error("Plugin Load Error: {0}")]
    Load(String),

    #[error("Plugin ABI mismatch: expected {expected}, found {found}")]
    AbiMismatch { expected: u32, found: u32 },

    #[error("Plugin Error: {0}")]
    Plugin(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),
}

impl From<std::io::Error> for FmtkitError {
    fn from(err: std::io::Error) -> Self {
        FmtkitError::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for FmtkitError {
    fn from(err: serde_json::Error) -> Self {
        FmtkitError::Json(Arc::new(err))
    }
}

pub type Result<T> = std::result::Result<T, FmtkitError>;
