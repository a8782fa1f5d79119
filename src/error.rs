//! Error types for pkgassets
//!
//! All modules use `AssetsResult<T>` as their return type.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pkgassets operations
pub type AssetsResult<T> = Result<T, AssetsError>;

/// All errors that can occur in pkgassets
#[derive(Error, Debug)]
pub enum AssetsError {
    // Cache errors
    #[error("Asset cache is invalid: {reason}")]
    CacheInvalid { reason: String },

    #[error("Failed to write asset cache {path}: {source}")]
    CacheWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Asset cache write left {0} placeholder(s) unresolved")]
    UnresolvedPlaceholders(usize),

    #[error("Item groups must be read in order: all {0} groups have already been read")]
    GroupOrder(usize),

    // Dependency graph errors
    #[error("Dependency graph {path} is invalid: {reason}")]
    GraphInvalid { path: PathBuf, reason: String },

    #[error("Dependency graph has no target for '{framework}'{}", rid_suffix(.runtime_identifier))]
    TargetNotFound {
        framework: String,
        runtime_identifier: String,
    },

    #[error("Package {name} {version} was not found in any package folder")]
    PackageNotFound { name: String, version: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

fn rid_suffix(runtime_identifier: &str) -> String {
    if runtime_identifier.is_empty() {
        String::new()
    } else {
        format!(" and runtime identifier '{}'", runtime_identifier)
    }
}

impl AssetsError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a cache invalidation error
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::CacheInvalid {
            reason: reason.into(),
        }
    }

    /// Whether the cache can recover from this error by regenerating the file
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::CacheInvalid { .. } | Self::Io { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::TargetNotFound { .. } => {
                Some("Restore the project for this target framework and runtime identifier")
            }
            Self::PackageNotFound { .. } => Some("Run a package restore to populate the package folders"),
            Self::CacheWrite { .. } => Some("Check that the cache directory is writable"),
            _ => None,
        }
    }
}
