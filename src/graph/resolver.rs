//! Package directory resolution
//!
//! Maps a (package name, version) pair to the directory the package was
//! restored into, and package-relative asset paths to absolute paths.

use super::model::DependencyGraph;
use crate::error::{AssetsError, AssetsResult};
use std::path::{Path, PathBuf, MAIN_SEPARATOR};
use tracing::debug;

/// Resolves restored packages to directories on disk
pub trait PackageResolver {
    /// Absolute directory of a restored package
    fn resolve_directory(&self, name: &str, version: &str) -> AssetsResult<PathBuf>;

    /// Absolute path of a package-relative asset (`/` or `\` separated)
    fn resolve_asset_path(&self, name: &str, version: &str, relative: &str) -> AssetsResult<PathBuf> {
        let root = self.resolve_directory(name, version)?;
        Ok(root.join(normalize_separators(relative)))
    }
}

impl<F> PackageResolver for F
where
    F: Fn(&str, &str) -> AssetsResult<PathBuf>,
{
    fn resolve_directory(&self, name: &str, version: &str) -> AssetsResult<PathBuf> {
        self(name, version)
    }
}

/// Rewrite both `/` and `\` to the platform separator
pub fn normalize_separators(relative: &str) -> String {
    relative
        .chars()
        .map(|c| if c == '/' || c == '\\' { MAIN_SEPARATOR } else { c })
        .collect()
}

/// Probes package folders using the `<folder>/<name>/<version>` layout with
/// lowercase name and version
#[derive(Debug, Clone)]
pub struct FolderPackageResolver {
    folders: Vec<PathBuf>,
}

impl FolderPackageResolver {
    pub fn new(folders: Vec<PathBuf>) -> Self {
        Self { folders }
    }

    /// Use the package folders recorded in the graph
    pub fn from_graph(graph: &DependencyGraph) -> Self {
        Self::new(graph.package_folders.clone())
    }

    fn candidate(folder: &Path, name: &str, version: &str) -> PathBuf {
        folder
            .join(name.to_lowercase())
            .join(version.to_lowercase())
    }
}

impl PackageResolver for FolderPackageResolver {
    fn resolve_directory(&self, name: &str, version: &str) -> AssetsResult<PathBuf> {
        for folder in &self.folders {
            let candidate = Self::candidate(folder, name, version);
            if candidate.is_dir() {
                return Ok(candidate);
            }
            debug!("Package {} {} not in {}", name, version, folder.display());
        }

        Err(AssetsError::PackageNotFound {
            name: name.to_string(),
            version: version.to_string(),
        })
    }
}
