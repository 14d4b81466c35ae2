//! src/error.rs
//! ============================================================================
//! # MenuError: Unified Error Type for the Menu Engine
//!
//! Registration, lookup, composition builds and discovery scans never fail;
//! they log and carry on. Errors only surface from document and config I/O,
//! from module loaders (caught and logged by the scanner), and from an audit
//! run under fail-fast.

use std::{io, path::PathBuf};
use thiserror::Error;

pub type MenuResult<T> = Result<T, MenuError>;

/// Unified error type for all menu engine operations.
#[derive(Debug, Error)]
pub enum MenuError {
    /// Standard IO error, auto-converted from `io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TOML config parsing error.
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// TOML serialization error (config or menu document).
    #[error("Config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Platform config directory could not be resolved.
    #[error("Could not determine config directory")]
    ConfigDir,

    /// Menu document could not be read or written.
    #[error("Failed to access menu document {path:?}: {source}")]
    DocumentIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Menu document is not valid TOML.
    #[error("Menu document {path:?} is malformed: {source}")]
    DocumentParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A module unit could not be loaded during discovery.
    #[error("Failed to load module {module}: {reason}")]
    ModuleLoad { module: String, reason: String },

    /// Audit produced error findings while running fail-fast.
    #[error("Menu composition audit failed with {errors} error(s)")]
    AuditFailed { errors: usize },

    /// Any other error, with description.
    #[error("Unexpected error: {0}")]
    Other(String),
}

impl MenuError {
    /// Attach extra context to an error.
    pub fn with_context<S: Into<String>>(self, ctx: S) -> Self {
        Self::Other(format!("{}: {}", ctx.into(), self))
    }

    /// Shorthand used by module loaders.
    pub fn module_load(module: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModuleLoad {
            module: module.into(),
            reason: reason.into(),
        }
    }
}

// Allow conversion from `anyhow::Error` as fallback.
impl From<anyhow::Error> for MenuError {
    fn from(e: anyhow::Error) -> Self {
        Self::Other(e.to_string())
    }
}
