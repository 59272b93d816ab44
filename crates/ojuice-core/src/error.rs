use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Process not attached")]
    NotAttached,

    #[error("Process not found: {0}")]
    ProcessNotFound(String),

    #[error("Failed to open process: {0}")]
    ProcessOpenFailed(String),

    #[error("Module not found: {0}")]
    ModuleNotFound(String),

    #[error("Pointer chain for '{0}' is empty")]
    EmptyChain(String),

    #[error("Failed to read process memory at address {address:#x}: {message}")]
    MemoryReadFailed { address: u64, message: String },

    #[error("Failed to write process memory at address {address:#x}: {message}")]
    MemoryWriteFailed { address: u64, message: String },

    #[error("Failed to terminate process: {0}")]
    TerminateFailed(String),

    #[error("Field '{0}' is not configured")]
    NotConfigured(String),

    #[error("Unknown field key: '{0}'")]
    UnknownKey(String),

    #[error("Invalid offset: {0}")]
    InvalidOffset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
