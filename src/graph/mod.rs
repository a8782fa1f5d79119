//! Dependency graph input
//!
//! The restore step records which packages and projects a build uses, per
//! target framework and runtime identifier. This module holds that model and
//! the collaborators that turn package-relative paths into absolute ones.

pub mod model;
pub mod resolver;

pub use model::{
    Asset, ContentFile, DependencyGraph, Library, LibraryKind, LogLevel, LogMessage, ProjectInfo,
    Target, TargetLibrary,
};
pub use resolver::{normalize_separators, FolderPackageResolver, PackageResolver};
