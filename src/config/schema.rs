//! Configuration schema for pkgassets
//!
//! Configuration is stored at `~/.config/pkgassets/config.toml`

use crate::cache::DEFAULT_CACHE_FILE_NAME;
use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Defaults for resolve requests
    pub resolve: ResolveConfig,

    /// Cache settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Resolve defaults, overridable per invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveConfig {
    /// Source language of the project, used for analyzer selection
    pub project_language: String,

    /// Report a runtime identifier that no package recognizes
    pub ensure_runtime_package_dependencies: bool,

    /// Log restore diagnostics recorded in the graph
    pub emit_log_messages: bool,

    pub mark_package_references_as_externally_resolved: bool,

    pub disable_framework_assemblies: bool,

    pub disable_transitive_project_references: bool,

    /// Tolerate missing targets, producing empty results that are never persisted
    pub design_time_build: bool,

    /// Cultures whose satellite assemblies are kept; unset keeps every culture
    pub satellite_resource_languages: Option<Vec<String>>,

    pub copy_local_runtime_target_assets: bool,

    /// Packages never copied to the output directory
    pub copy_local_package_exclusions: Vec<String>,

    /// Package references kept out of publish
    pub exclude_from_publish: Vec<String>,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            project_language: "C#".to_string(),
            ensure_runtime_package_dependencies: false,
            emit_log_messages: true,
            mark_package_references_as_externally_resolved: true,
            disable_framework_assemblies: false,
            disable_transitive_project_references: false,
            design_time_build: false,
            satellite_resource_languages: None,
            copy_local_runtime_target_assets: false,
            copy_local_package_exclusions: Vec::new(),
            exclude_from_publish: Vec::new(),
        }
    }
}

/// Cache settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Write the cache to disk; when off, every resolve builds in memory
    pub enabled: bool,

    /// Cache file name, placed next to the dependency graph
    pub file_name: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            file_name: DEFAULT_CACHE_FILE_NAME.to_string(),
        }
    }
}
