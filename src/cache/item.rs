//! Items and item groups produced by asset resolution

use serde::Serialize;
use std::fmt;

/// Well-known metadata keys
pub mod keys {
    pub const ALIASES: &str = "Aliases";
    pub const ASSET_TYPE: &str = "AssetType";
    pub const BUILD_ACTION: &str = "BuildAction";
    pub const CODE_LANGUAGE: &str = "CodeLanguage";
    pub const COPY_LOCAL: &str = "CopyLocal";
    pub const COPY_TO_OUTPUT: &str = "CopyToOutput";
    pub const COPY_TO_PUBLISH_DIRECTORY: &str = "CopyToPublishDirectory";
    pub const CULTURE: &str = "Culture";
    pub const DESTINATION_SUBDIRECTORY: &str = "DestinationSubDirectory";
    pub const DESTINATION_SUB_PATH: &str = "DestinationSubPath";
    pub const DIAGNOSTIC_CODE: &str = "DiagnosticCode";
    pub const EXTERNALLY_RESOLVED: &str = "ExternallyResolved";
    pub const HINT_PATH: &str = "HintPath";
    pub const NUGET_IS_FRAMEWORK_REFERENCE: &str = "NuGetIsFrameworkReference";
    pub const NUGET_PACKAGE_ID: &str = "NuGetPackageId";
    pub const NUGET_PACKAGE_VERSION: &str = "NuGetPackageVersion";
    pub const NUGET_SOURCE_TYPE: &str = "NuGetSourceType";
    pub const OUTPUT_PATH: &str = "OutputPath";
    pub const PACK: &str = "Pack";
    pub const PATH_IN_PACKAGE: &str = "PathInPackage";
    pub const PP_OUTPUT_PATH: &str = "PPOutputPath";
    pub const PRIVATE: &str = "Private";
    pub const RUNTIME_IDENTIFIER: &str = "RuntimeIdentifier";
    pub const SEVERITY: &str = "Severity";
}

/// One resolved asset (or log message) with its metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Item {
    /// Primary key: usually an absolute file path, or message text for logs
    pub spec: String,

    /// Metadata in the order it was written
    pub metadata: Vec<(String, String)>,
}

impl Item {
    pub fn new(spec: impl Into<String>) -> Self {
        Self {
            spec: spec.into(),
            metadata: Vec::new(),
        }
    }

    /// Builder-style metadata append
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.set(key, value);
        self
    }

    /// Look up a metadata value by key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a metadata value, replacing an existing one; empty values remove the key
    pub fn set(&mut self, key: &str, value: &str) {
        if value.is_empty() {
            self.metadata.retain(|(k, _)| k != key);
            return;
        }
        match self.metadata.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.metadata.push((key.to_string(), value.to_string())),
        }
    }
}

/// The ten output groups, in the fixed order they appear in a cache file.
///
/// The order is part of the file format: groups are positional and carry no
/// name or offset, so reordering requires a format version bump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ItemGroupKind {
    Analyzers,
    CompileTimeAssemblies,
    ContentFilesToPreprocess,
    FrameworkAssemblies,
    LogMessages,
    NativeLibraries,
    ResourceAssemblies,
    RuntimeAssemblies,
    RuntimeTargets,
    TransitiveProjectReferences,
}

/// Number of item groups in every cache file
pub const ITEM_GROUP_COUNT: usize = 10;

impl ItemGroupKind {
    /// All groups in file order
    pub const ALL: [ItemGroupKind; ITEM_GROUP_COUNT] = [
        Self::Analyzers,
        Self::CompileTimeAssemblies,
        Self::ContentFilesToPreprocess,
        Self::FrameworkAssemblies,
        Self::LogMessages,
        Self::NativeLibraries,
        Self::ResourceAssemblies,
        Self::RuntimeAssemblies,
        Self::RuntimeTargets,
        Self::TransitiveProjectReferences,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Analyzers => "Analyzers",
            Self::CompileTimeAssemblies => "CompileTimeAssemblies",
            Self::ContentFilesToPreprocess => "ContentFilesToPreprocess",
            Self::FrameworkAssemblies => "FrameworkAssemblies",
            Self::LogMessages => "LogMessages",
            Self::NativeLibraries => "NativeLibraries",
            Self::ResourceAssemblies => "ResourceAssemblies",
            Self::RuntimeAssemblies => "RuntimeAssemblies",
            Self::RuntimeTargets => "RuntimeTargets",
            Self::TransitiveProjectReferences => "TransitiveProjectReferences",
        }
    }

    /// Position of this group in the file
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for ItemGroupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// All ten groups, indexed by [`ItemGroupKind`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemGroups {
    groups: [Vec<Item>; ITEM_GROUP_COUNT],
}

impl ItemGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, kind: ItemGroupKind) -> &[Item] {
        &self.groups[kind.index()]
    }

    pub fn get_mut(&mut self, kind: ItemGroupKind) -> &mut Vec<Item> {
        &mut self.groups[kind.index()]
    }

    pub fn set(&mut self, kind: ItemGroupKind, items: Vec<Item>) {
        self.groups[kind.index()] = items;
    }

    /// Iterate groups in file order
    pub fn iter(&self) -> impl Iterator<Item = (ItemGroupKind, &[Item])> {
        ItemGroupKind::ALL
            .iter()
            .map(move |kind| (*kind, self.get(*kind)))
    }

    /// Total item count across all groups
    pub fn total(&self) -> usize {
        self.groups.iter().map(Vec::len).sum()
    }
}
