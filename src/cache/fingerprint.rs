//! Settings fingerprint for cache validation
//!
//! A cache file is only reused when the settings that shaped it hash to the
//! same digest. Fields are fed to the hasher in one fixed order; strings are
//! length-prefixed and booleans are a single byte, so no two distinct
//! settings tuples share a byte stream.

use super::framing::length_prefix;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Length in bytes of a settings fingerprint (SHA-256)
pub const FINGERPRINT_LEN: usize = 256 / 8;

/// Build settings that change what the writer produces
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveSettings {
    /// Path to the project file being built
    pub project_path: String,

    /// Target framework moniker, e.g. `net8.0`
    pub target_framework: String,

    pub disable_transitive_project_references: bool,

    pub disable_framework_assemblies: bool,

    pub mark_package_references_as_externally_resolved: bool,

    /// Project source language (`C#`, `VB`, `F#`, ...)
    pub project_language: Option<String>,

    /// Runtime identifier for runtime assets; `None` and `""` both mean RID-agnostic
    pub runtime_identifier: Option<String>,

    /// Report a runtime identifier that contributed no RID-specific libraries
    pub ensure_runtime_package_dependencies: bool,

    /// Cultures whose satellite assemblies are kept; `None` keeps every culture
    pub satellite_resource_languages: Option<Vec<String>>,

    /// Give runtime-target assets copy-local metadata too
    pub copy_local_runtime_target_assets: bool,

    /// Packages whose assets are never copied to the output directory
    pub copy_local_package_exclusions: Vec<String>,

    /// Package references kept out of publish, along with the dependencies
    /// only they pull in
    pub exclude_from_publish: Vec<String>,
}

impl ResolveSettings {
    pub fn new(project_path: impl Into<String>, target_framework: impl Into<String>) -> Self {
        Self {
            project_path: project_path.into(),
            target_framework: target_framework.into(),
            ..Self::default()
        }
    }

    /// Runtime identifier, or `""` when none is in effect
    pub fn runtime_identifier(&self) -> &str {
        self.runtime_identifier.as_deref().unwrap_or("")
    }

    pub fn project_language(&self) -> &str {
        self.project_language.as_deref().unwrap_or("")
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::compute(self)
    }
}

/// SHA-256 digest of [`ResolveSettings`]
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    pub fn compute(settings: &ResolveSettings) -> Self {
        let mut hasher = Sha256::new();

        hash_str(&mut hasher, &settings.project_path);
        hash_str(&mut hasher, &settings.target_framework);
        hash_bool(&mut hasher, settings.disable_transitive_project_references);
        hash_bool(&mut hasher, settings.disable_framework_assemblies);
        hash_bool(&mut hasher, settings.mark_package_references_as_externally_resolved);
        hash_str(&mut hasher, settings.project_language());
        hash_str(&mut hasher, settings.runtime_identifier());
        hash_bool(&mut hasher, settings.ensure_runtime_package_dependencies);
        hash_bool(&mut hasher, settings.satellite_resource_languages.is_some());
        hash_list(
            &mut hasher,
            settings.satellite_resource_languages.as_deref().unwrap_or(&[]),
        );
        hash_bool(&mut hasher, settings.copy_local_runtime_target_assets);
        hash_list(&mut hasher, &settings.copy_local_package_exclusions);
        hash_list(&mut hasher, &settings.exclude_from_publish);

        Self(hasher.finalize().into())
    }

    pub fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", &self.to_hex()[..12])
    }
}

fn hash_str(hasher: &mut Sha256, value: &str) {
    // Strings longer than u32::MAX bytes are not representable in settings
    let len = u32::try_from(value.len()).unwrap_or(u32::MAX);
    let (prefix, used) = length_prefix(len);
    hasher.update(&prefix[..used]);
    hasher.update(value.as_bytes());
}

fn hash_list(hasher: &mut Sha256, values: &[String]) {
    let count = u32::try_from(values.len()).unwrap_or(u32::MAX);
    hasher.update(count.to_le_bytes());
    for value in values {
        hash_str(hasher, value);
    }
}

fn hash_bool(hasher: &mut Sha256, value: bool) {
    hasher.update([u8::from(value)]);
}
