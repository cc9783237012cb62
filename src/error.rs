//! Global error handling for promptfs
//!
//! Recoverable conditions (a bad ignore pattern, an unreadable directory) are
//! logged where they happen and never reach this type. Everything here aborts
//! the operation that produced it.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::clipboard::ClipboardError;

/// Global error type for promptfs operations
#[derive(Error, Debug)]
pub enum PromptError {
    /// File system errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// A selected file could not be read while generating a prompt
    #[error("Failed to read {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A selected file is not valid UTF-8 text
    #[error("File is not valid UTF-8: {path}")]
    Decode { path: PathBuf },

    /// Path not found
    #[error("Path not found: {0}")]
    NotFound(String),

    /// Settings store errors
    #[error("Settings error: {0}")]
    Settings(String),

    /// JSON processing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Clipboard errors
    #[error("Clipboard error: {0}")]
    Clipboard(#[from] ClipboardError),

    /// Tokenizer errors
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Invalid argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Specialized Result type for promptfs operations
pub type Result<T> = std::result::Result<T, PromptError>;

/// Creates a PromptError with a formatted message
#[macro_export]
macro_rules! error {
    ($error_type:ident, $($arg:tt)*) => {
        $crate::error::PromptError::$error_type(format!($($arg)*))
    };
}

/// Returns an error result with a formatted message
#[macro_export]
macro_rules! bail {
    ($error_type:ident, $($arg:tt)*) => {
        return Err($crate::error!($error_type, $($arg)*))
    };
}

/// Ensures a condition is true, otherwise returns an error
#[macro_export]
macro_rules! ensure {
    ($cond:expr, $error_type:ident, $($arg:tt)*) => {
        if !($cond) {
            $crate::bail!($error_type, $($arg)*)
        }
    };
}

impl From<PromptError> for io::Error {
    fn from(err: PromptError) -> Self {
        io::Error::new(io::ErrorKind::Other, err.to_string())
    }
}
