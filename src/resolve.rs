//! Resolve orchestration
//!
//! Reads the item groups through the cache, adds the metadata every consumer
//! expects on references, and reports restore diagnostics.

use crate::cache::{keys, AssetsCache, CachedGroups, Item, ItemGroupKind, ItemGroups, ResolveSettings};
use crate::error::AssetsResult;
use crate::graph::PackageResolver;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Everything needed to resolve one project's assets
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    pub graph_path: PathBuf,
    pub cache_path: PathBuf,
    pub settings: ResolveSettings,
    pub emit_log_messages: bool,
    pub cache_enabled: bool,
    pub design_time_build: bool,
}

impl ResolveRequest {
    /// A request with the cache file next to the graph under its default name
    pub fn new(graph_path: impl Into<PathBuf>, settings: ResolveSettings) -> Self {
        let graph_path = graph_path.into();
        Self {
            cache_path: default_cache_path(&graph_path, crate::cache::DEFAULT_CACHE_FILE_NAME),
            graph_path,
            settings,
            emit_log_messages: true,
            cache_enabled: true,
            design_time_build: false,
        }
    }
}

/// `<graph dir>/<file_name>`
pub fn default_cache_path(graph_path: &Path, file_name: &str) -> PathBuf {
    match graph_path.parent() {
        Some(dir) => dir.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Resolved item groups
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedAssets {
    pub groups: ItemGroups,
    /// The cache was rebuilt (or built in memory) for this resolve
    pub regenerated: bool,
}

impl ResolvedAssets {
    pub fn get(&self, kind: ItemGroupKind) -> &[Item] {
        self.groups.get(kind)
    }
}

/// Resolve assets for `request`.
///
/// `resolver` overrides the package folders recorded in the graph.
pub fn resolve<'a>(
    request: &'a ResolveRequest,
    resolver: Option<&'a dyn PackageResolver>,
) -> AssetsResult<ResolvedAssets> {
    let mut cache = AssetsCache::new(&request.cache_path, &request.graph_path, &request.settings)
        .with_enabled(request.cache_enabled)
        .with_design_time_build(request.design_time_build);
    if let Some(resolver) = resolver {
        cache = cache.with_resolver(resolver);
    }

    let CachedGroups {
        mut groups,
        regenerated,
    } = cache.read_all()?;

    apply_implicit_metadata(
        &mut groups,
        request.settings.mark_package_references_as_externally_resolved,
    );

    if request.emit_log_messages {
        emit_log_messages(
            groups.get(ItemGroupKind::LogMessages),
            &request.settings.project_path,
        );
    }

    Ok(ResolvedAssets {
        groups,
        regenerated,
    })
}

/// Metadata implied by the group an item belongs to rather than stored in the cache
pub fn apply_implicit_metadata(groups: &mut ItemGroups, externally_resolved: bool) {
    for item in groups.get_mut(ItemGroupKind::CompileTimeAssemblies) {
        let spec = item.spec.clone();
        item.set(keys::NUGET_SOURCE_TYPE, "Package");
        item.set(keys::PRIVATE, "false");
        item.set(keys::HINT_PATH, &spec);
        if externally_resolved {
            item.set(keys::EXTERNALLY_RESOLVED, "true");
        }
    }

    for item in groups.get_mut(ItemGroupKind::FrameworkAssemblies) {
        item.set(keys::NUGET_IS_FRAMEWORK_REFERENCE, "true");
        item.set(keys::NUGET_SOURCE_TYPE, "Package");
        item.set(keys::PACK, "false");
        item.set(keys::PRIVATE, "false");
    }
}

/// Report restore diagnostics at the level their severity calls for
pub fn emit_log_messages(messages: &[Item], project: &str) {
    for message in messages {
        let code = message.get(keys::DIAGNOSTIC_CODE).unwrap_or("");
        match message.get(keys::SEVERITY) {
            Some("Error") => error!(code, project, "{}", message.spec),
            Some("Warning") => warn!(code, project, "{}", message.spec),
            _ => info!(code, project, "{}", message.spec),
        }
    }
}
