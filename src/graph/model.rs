//! Dependency graph document
//!
//! The graph is produced by a restore step and handed to us as JSON. Every
//! field is optional so partially populated documents still load.

use crate::error::{AssetsError, AssetsResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Classification of a library entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryKind {
    Package,
    Project,
    #[default]
    #[serde(other)]
    Other,
}

impl LibraryKind {
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("package") {
            Self::Package
        } else if value.eq_ignore_ascii_case("project") {
            Self::Project
        } else {
            Self::Other
        }
    }
}

fn deserialize_kind<'de, D>(deserializer: D) -> Result<LibraryKind, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(LibraryKind::parse(&raw))
}

/// A package-relative file with optional properties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Asset {
    pub path: String,
    pub locale: Option<String>,
    pub aliases: Option<String>,
    pub asset_type: Option<String>,
    /// Runtime identifier a runtime-target asset applies to
    pub rid: Option<String>,
}

impl Asset {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// A content file shipped by a package
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ContentFile {
    pub path: String,
    pub build_action: Option<String>,
    pub copy_to_output: bool,
    pub pp_output_path: Option<String>,
    pub output_path: Option<String>,
    pub code_language: Option<String>,
}

/// A package or project as resolved within one target
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TargetLibrary {
    pub name: String,
    pub version: String,
    #[serde(rename = "type", deserialize_with = "deserialize_kind")]
    pub kind: LibraryKind,
    pub dependencies: Vec<String>,
    pub compile: Vec<Asset>,
    pub runtime: Vec<Asset>,
    pub native: Vec<Asset>,
    pub resource: Vec<Asset>,
    pub runtime_targets: Vec<Asset>,
    pub content_files: Vec<ContentFile>,
    pub framework_assemblies: Vec<String>,
}

impl TargetLibrary {
    pub fn package(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            kind: LibraryKind::Package,
            ..Self::default()
        }
    }

    pub fn project(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            kind: LibraryKind::Project,
            ..Self::package(name, version)
        }
    }

    pub fn is_package(&self) -> bool {
        self.kind == LibraryKind::Package
    }

    pub fn is_project(&self) -> bool {
        self.kind == LibraryKind::Project
    }
}

/// Libraries resolved for one (framework, runtime identifier) pair
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Target {
    pub framework: String,
    pub runtime_identifier: Option<String>,
    pub libraries: Vec<TargetLibrary>,
}

impl Target {
    pub fn new(framework: impl Into<String>, runtime_identifier: Option<&str>) -> Self {
        Self {
            framework: framework.into(),
            runtime_identifier: runtime_identifier.map(str::to_string),
            libraries: Vec::new(),
        }
    }

    /// Case-insensitive library lookup
    pub fn library(&self, name: &str) -> Option<&TargetLibrary> {
        self.libraries
            .iter()
            .find(|l| l.name.eq_ignore_ascii_case(name))
    }

    fn matches(&self, framework: &str, runtime_identifier: &str) -> bool {
        self.framework.eq_ignore_ascii_case(framework)
            && self
                .runtime_identifier
                .as_deref()
                .unwrap_or("")
                .eq_ignore_ascii_case(runtime_identifier)
    }
}

/// Graph-level library entry carrying the full file list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Library {
    pub name: String,
    pub version: String,
    #[serde(rename = "type", deserialize_with = "deserialize_kind")]
    pub kind: LibraryKind,
    /// Every file in the package, relative to its root
    pub files: Vec<String>,
    /// Project file path, relative to the restoring project
    pub path: Option<String>,
}

impl Library {
    pub fn is_package(&self) -> bool {
        self.kind == LibraryKind::Package
    }

    pub fn is_project(&self) -> bool {
        self.kind == LibraryKind::Project
    }
}

/// Restore-time facts about the root project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectInfo {
    pub direct_dependencies: Vec<String>,
}

/// Severity recorded for a restore diagnostic
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum LogLevel {
    Error,
    Warning,
    Minimal,
    #[default]
    Information,
    Verbose,
    Debug,
}

impl LogLevel {
    /// Case-insensitive; unknown levels are informational
    fn parse(value: &str) -> Self {
        [
            Self::Error,
            Self::Warning,
            Self::Minimal,
            Self::Information,
            Self::Verbose,
            Self::Debug,
        ]
        .into_iter()
        .find(|level| level.name().eq_ignore_ascii_case(value))
        .unwrap_or(Self::Information)
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Minimal => "Minimal",
            Self::Information => "Information",
            Self::Verbose => "Verbose",
            Self::Debug => "Debug",
        }
    }

    /// Severity metadata value; anything below a warning is informational and
    /// carries no severity
    pub fn severity(&self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::Warning => "Warning",
            _ => "",
        }
    }
}

fn deserialize_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    Ok(LogLevel::parse(&raw))
}

/// A diagnostic recorded during restore
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogMessage {
    pub code: String,
    #[serde(deserialize_with = "deserialize_level")]
    pub level: LogLevel,
    pub message: String,
}

/// The resolved dependency graph for a project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DependencyGraph {
    pub targets: Vec<Target>,
    pub libraries: Vec<Library>,
    pub project: ProjectInfo,
    pub package_folders: Vec<PathBuf>,
    pub logs: Vec<LogMessage>,
}

impl DependencyGraph {
    /// Load a graph document from disk
    pub fn load(path: &Path) -> AssetsResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AssetsError::io(format!("reading dependency graph {}", path.display()), e)
        })?;
        let graph = Self::parse(&content).map_err(|e| AssetsError::GraphInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(
            "Loaded dependency graph {} ({} targets, {} libraries)",
            path.display(),
            graph.targets.len(),
            graph.libraries.len()
        );
        Ok(graph)
    }

    pub fn parse(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Find the target for a framework and runtime identifier (`""` = RID-agnostic)
    pub fn target(&self, framework: &str, runtime_identifier: &str) -> Option<&Target> {
        self.targets
            .iter()
            .find(|t| t.matches(framework, runtime_identifier))
    }

    /// Like [`Self::target`], but a missing target is an error
    pub fn require_target(&self, framework: &str, runtime_identifier: &str) -> AssetsResult<&Target> {
        self.target(framework, runtime_identifier)
            .ok_or_else(|| AssetsError::TargetNotFound {
                framework: framework.to_string(),
                runtime_identifier: runtime_identifier.to_string(),
            })
    }

    /// Project file paths of every project library, `\` normalized to `/`
    pub fn project_paths(&self) -> HashMap<&str, String> {
        self.libraries
            .iter()
            .filter(|l| l.is_project())
            .filter_map(|l| {
                l.path
                    .as_deref()
                    .map(|p| (l.name.as_str(), p.replace('\\', "/")))
            })
            .collect()
    }

    /// Names of project libraries in `target` that the root project reaches
    /// only through other libraries.
    ///
    /// The walk keeps a visited set, so dependency cycles terminate.
    pub fn transitive_project_references<'a>(&self, target: &'a Target) -> Vec<&'a TargetLibrary> {
        let direct: HashSet<String> = self
            .project
            .direct_dependencies
            .iter()
            .map(|d| d.to_ascii_lowercase())
            .collect();

        let by_name: HashMap<String, &TargetLibrary> = target
            .libraries
            .iter()
            .map(|l| (l.name.to_ascii_lowercase(), l))
            .collect();

        let mut reachable: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = direct.iter().cloned().collect();
        while let Some(name) = stack.pop() {
            if !reachable.insert(name.clone()) {
                continue;
            }
            if let Some(library) = by_name.get(&name) {
                stack.extend(
                    library
                        .dependencies
                        .iter()
                        .map(|d| d.to_ascii_lowercase())
                        .filter(|d| !reachable.contains(d)),
                );
            }
        }

        target
            .libraries
            .iter()
            .filter(|l| l.is_project())
            .filter(|l| {
                let key = l.name.to_ascii_lowercase();
                reachable.contains(&key) && !direct.contains(&key)
            })
            .collect()
    }

    /// Lowercased names of `target` libraries that publish leaves out when
    /// the package references in `excluded` are not published.
    ///
    /// A library stays published while some path from a published direct
    /// dependency reaches it.
    pub fn publish_exclusions(&self, target: &Target, excluded: &[String]) -> HashSet<String> {
        if excluded.is_empty() {
            return HashSet::new();
        }

        let excluded: HashSet<String> = excluded.iter().map(|e| e.to_ascii_lowercase()).collect();
        let by_name: HashMap<String, &TargetLibrary> = target
            .libraries
            .iter()
            .map(|l| (l.name.to_ascii_lowercase(), l))
            .collect();

        let mut included: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = self
            .project
            .direct_dependencies
            .iter()
            .map(|d| d.to_ascii_lowercase())
            .filter(|d| !excluded.contains(d))
            .collect();
        while let Some(name) = stack.pop() {
            if included.contains(&name) {
                continue;
            }
            // Dependencies missing from the target are skipped
            if let Some(library) = by_name.get(&name) {
                stack.extend(library.dependencies.iter().map(|d| d.to_ascii_lowercase()));
                included.insert(name);
            }
        }

        by_name
            .into_keys()
            .filter(|name| !included.contains(name))
            .collect()
    }
}
