//! Cache writer: walks the dependency graph and emits the ten item groups

use super::fingerprint::ResolveSettings;
use super::framing::FramedWriter;
use super::item::{keys, Item, ItemGroupKind, ItemGroups};
use super::rules::{
    culture_subdirectory, destination_subdirectory, file_name, is_applicable_analyzer,
    is_placeholder_file,
};
use super::strings::StringTable;
use super::{CACHE_FORMAT_VERSION, CACHE_SIGNATURE};
use crate::error::{AssetsError, AssetsResult};
use crate::graph::{Asset, DependencyGraph, PackageResolver, Target, TargetLibrary};
use std::borrow::Cow;
use std::collections::HashSet;
use std::fs;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Produces one cache file from a dependency graph
pub struct CacheWriter<'a> {
    graph: &'a DependencyGraph,
    resolver: &'a dyn PackageResolver,
    settings: &'a ResolveSettings,
    compile_target: Cow<'a, Target>,
    runtime_target: Cow<'a, Target>,
    /// Lowercased names of packages never copied to the output directory
    copy_local_exclusions: HashSet<String>,
    /// Lowercased names of packages left out of publish
    publish_exclusions: HashSet<String>,
    persistable: bool,
}

impl<'a> CacheWriter<'a> {
    /// Select the compile-time and runtime targets for `settings`.
    ///
    /// A missing target is an error unless `design_time_build` is set, in
    /// which case an empty target stands in and the result must not be
    /// persisted (see [`Self::can_persist`]).
    pub fn new(
        graph: &'a DependencyGraph,
        resolver: &'a dyn PackageResolver,
        settings: &'a ResolveSettings,
        design_time_build: bool,
    ) -> AssetsResult<Self> {
        let framework = settings.target_framework.as_str();
        let rid = settings.runtime_identifier();
        let mut persistable = true;

        let mut select = |runtime_identifier: &str| -> AssetsResult<Cow<'a, Target>> {
            if design_time_build {
                match graph.target(framework, runtime_identifier) {
                    Some(target) => Ok(Cow::Borrowed(target)),
                    None => {
                        warn!(
                            "No target for '{}' '{}' in design-time build, using an empty target",
                            framework, runtime_identifier
                        );
                        persistable = false;
                        Ok(Cow::Owned(Target::new(framework, Some(runtime_identifier))))
                    }
                }
            } else {
                graph
                    .require_target(framework, runtime_identifier)
                    .map(Cow::Borrowed)
            }
        };

        let compile_target = select("")?;
        let runtime_target = select(rid)?;

        let copy_local_exclusions = settings
            .copy_local_package_exclusions
            .iter()
            .map(|name| name.to_ascii_lowercase())
            .collect();
        let publish_exclusions =
            graph.publish_exclusions(&runtime_target, &settings.exclude_from_publish);
        if !publish_exclusions.is_empty() {
            debug!("{} package(s) excluded from publish", publish_exclusions.len());
        }

        Ok(Self {
            graph,
            resolver,
            settings,
            compile_target,
            runtime_target,
            copy_local_exclusions,
            publish_exclusions,
            persistable,
        })
    }

    /// Whether the output reflects the real graph and may be written to disk
    pub fn can_persist(&self) -> bool {
        self.persistable
    }

    /// Build every group in file order
    pub fn groups(&self) -> AssetsResult<ItemGroups> {
        let mut groups = ItemGroups::new();
        for kind in ItemGroupKind::ALL {
            groups.set(kind, self.group(kind)?);
        }
        Ok(groups)
    }

    /// Build the items of one group
    pub fn group(&self, kind: ItemGroupKind) -> AssetsResult<Vec<Item>> {
        match kind {
            ItemGroupKind::Analyzers => self.analyzers(),
            ItemGroupKind::CompileTimeAssemblies => self.compile_time_assemblies(),
            ItemGroupKind::ContentFilesToPreprocess => self.content_files_to_preprocess(),
            ItemGroupKind::FrameworkAssemblies => Ok(self.framework_assemblies()),
            ItemGroupKind::LogMessages => Ok(self.log_messages()),
            ItemGroupKind::NativeLibraries => self.native_libraries(),
            ItemGroupKind::ResourceAssemblies => self.resource_assemblies(),
            ItemGroupKind::RuntimeAssemblies => self.runtime_assemblies(),
            ItemGroupKind::RuntimeTargets => self.runtime_targets(),
            ItemGroupKind::TransitiveProjectReferences => Ok(self.transitive_project_references()),
        }
    }

    /// Write the cache to `path`.
    ///
    /// The file is assembled next to `path` and renamed into place only once
    /// complete, so a failed write never leaves a partial file at `path`.
    pub fn write_to_file(&self, path: &Path) -> AssetsResult<()> {
        let to_write_error = |e: AssetsError| match e {
            AssetsError::Io { source, .. } => AssetsError::CacheWrite {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| AssetsError::CacheWrite {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut temp = NamedTempFile::new_in(dir).map_err(|e| AssetsError::CacheWrite {
            path: path.to_path_buf(),
            source: e,
        })?;

        let out = self
            .write(BufWriter::new(temp.as_file_mut()))
            .map_err(to_write_error)?;
        out.into_inner().map_err(|e| AssetsError::CacheWrite {
            path: path.to_path_buf(),
            source: e.into_error(),
        })?;

        temp.persist(path).map_err(|e| AssetsError::CacheWrite {
            path: path.to_path_buf(),
            source: e.error,
        })?;

        info!("Wrote asset cache {}", path.display());
        Ok(())
    }

    /// Write the cache into memory, positioned at the start
    pub fn write_to_memory(&self) -> AssetsResult<Cursor<Vec<u8>>> {
        let mut cursor = self.write(Cursor::new(Vec::new()))?;
        cursor.set_position(0);
        Ok(cursor)
    }

    /// Write header, item groups, and string table to `out`
    pub fn write<W: Write + Seek>(&self, out: W) -> AssetsResult<W> {
        let io = |e| AssetsError::io("writing asset cache", e);
        let mut out = FramedWriter::new(out);
        let mut table = StringTable::new();

        // The signature is patched in last, so an interrupted write never
        // carries a valid header.
        let signature = out.write_placeholder().map_err(io)?;
        out.write_i32(CACHE_FORMAT_VERSION).map_err(io)?;
        out.write_bytes(self.settings.fingerprint().as_bytes())
            .map_err(io)?;
        let table_offset = out.write_placeholder().map_err(io)?;

        for kind in ItemGroupKind::ALL {
            let count = out.write_placeholder().map_err(io)?;
            let items = self.group(kind)?;
            for item in &items {
                write_item(&mut out, &mut table, item).map_err(io)?;
            }
            debug!("{}: {} item(s)", kind, items.len());
            out.resolve(count, to_i32(items.len())?).map_err(io)?;
        }

        let offset = out.position().map_err(io)?;
        out.write_i32(to_i32(table.len())?).map_err(io)?;
        for s in table.strings() {
            out.write_string(s).map_err(io)?;
        }
        out.resolve(table_offset, to_i32(offset)?).map_err(io)?;
        out.resolve(signature, CACHE_SIGNATURE).map_err(io)?;

        debug!("Asset cache string table holds {} string(s)", table.len());

        out.finish()
    }

    fn analyzers(&self) -> AssetsResult<Vec<Item>> {
        let language = self.settings.project_language();
        let mut items = Vec::new();

        for library in self.graph.libraries.iter().filter(|l| l.is_package()) {
            for file in &library.files {
                if is_placeholder_file(file) || !is_applicable_analyzer(file, language) {
                    continue;
                }
                if let Some(target_library) = self.runtime_target.library(&library.name) {
                    let path = self.resolve(target_library, file)?;
                    items.push(library_item(path, target_library));
                }
            }
        }

        Ok(items)
    }

    fn compile_time_assemblies(&self) -> AssetsResult<Vec<Item>> {
        self.package_assets(
            &self.compile_target,
            |l| &l.compile,
            keep_all,
            |_, asset, item| {
                item.set(keys::ALIASES, asset.aliases.as_deref().unwrap_or(""));
            },
        )
    }

    fn content_files_to_preprocess(&self) -> AssetsResult<Vec<Item>> {
        let mut items = Vec::new();

        for library in packages(&self.runtime_target) {
            for file in &library.content_files {
                let pp_output_path = file.pp_output_path.as_deref().unwrap_or("");
                if pp_output_path.is_empty() || is_placeholder_file(&file.path) {
                    continue;
                }

                let path = self.resolve(library, &file.path)?;
                let mut item = library_item(path, library);
                item.set(keys::PATH_IN_PACKAGE, &file.path);
                item.set(keys::BUILD_ACTION, file.build_action.as_deref().unwrap_or(""));
                item.set(keys::COPY_TO_OUTPUT, bool_str(file.copy_to_output));
                item.set(keys::PP_OUTPUT_PATH, pp_output_path);
                item.set(keys::OUTPUT_PATH, file.output_path.as_deref().unwrap_or(""));
                item.set(keys::CODE_LANGUAGE, file.code_language.as_deref().unwrap_or(""));
                items.push(item);
            }
        }

        Ok(items)
    }

    fn framework_assemblies(&self) -> Vec<Item> {
        if self.settings.disable_framework_assemblies {
            return Vec::new();
        }

        // One item per framework assembly, attributed to the first package asking for it
        let mut written = HashSet::new();
        let mut items = Vec::new();
        for library in packages(&self.compile_target) {
            for name in &library.framework_assemblies {
                if written.insert(name.as_str()) {
                    items.push(library_item(name.clone(), library));
                }
            }
        }
        items
    }

    fn log_messages(&self) -> Vec<Item> {
        let mut items: Vec<Item> = self
            .graph
            .logs
            .iter()
            .map(|log| {
                Item::new(log.message.clone())
                    .with(keys::DIAGNOSTIC_CODE, &log.code)
                    .with(keys::SEVERITY, log.level.severity())
            })
            .collect();

        if let Some(message) = self.unsupported_runtime_identifier_message() {
            items.push(message);
        }

        items
    }

    /// A RID that resolved no libraries beyond the RID-agnostic graph is
    /// most likely unknown to every package in the graph.
    fn unsupported_runtime_identifier_message(&self) -> Option<Item> {
        let rid = self.settings.runtime_identifier();
        if !self.settings.ensure_runtime_package_dependencies || rid.is_empty() {
            return None;
        }
        if self.compile_target.libraries.len() < self.runtime_target.libraries.len() {
            return None;
        }

        debug!("Runtime identifier '{}' added no libraries to the graph", rid);
        Some(
            Item::new(format!(
                "The specified runtime identifier '{}' is not recognized.",
                rid
            ))
            .with(keys::SEVERITY, "Error"),
        )
    }

    fn native_libraries(&self) -> AssetsResult<Vec<Item>> {
        self.package_assets(
            &self.runtime_target,
            |l| &l.native,
            keep_all,
            |library, asset, item| {
                item.set(keys::ASSET_TYPE, "native");
                self.copy_local_metadata(library, item, file_name(&asset.path), None);
            },
        )
    }

    fn resource_assemblies(&self) -> AssetsResult<Vec<Item>> {
        let wanted = |asset: &Asset| match &self.settings.satellite_resource_languages {
            None => true,
            Some(languages) => {
                let locale = asset.locale.as_deref().unwrap_or("");
                languages.iter().any(|l| l.eq_ignore_ascii_case(locale))
            }
        };

        self.package_assets(
            &self.runtime_target,
            |l| &l.resource,
            wanted,
            |library, asset, item| {
                item.set(keys::ASSET_TYPE, "resources");
                if let Some(locale) = asset.locale.as_deref().filter(|l| !l.is_empty()) {
                    let subdirectory = culture_subdirectory(locale);
                    let file = file_name(&asset.path);
                    if !self.copy_local_metadata(
                        library,
                        item,
                        file,
                        Some(subdirectory.as_str()),
                    ) {
                        item.set(keys::DESTINATION_SUBDIRECTORY, &subdirectory);
                    }
                    item.set(keys::CULTURE, locale);
                }
            },
        )
    }

    fn runtime_assemblies(&self) -> AssetsResult<Vec<Item>> {
        self.package_assets(
            &self.runtime_target,
            |l| &l.runtime,
            keep_all,
            |library, asset, item| {
                item.set(keys::ASSET_TYPE, "runtime");
                self.copy_local_metadata(library, item, file_name(&asset.path), None);
            },
        )
    }

    fn runtime_targets(&self) -> AssetsResult<Vec<Item>> {
        self.package_assets(
            &self.runtime_target,
            |l| &l.runtime_targets,
            keep_all,
            |library, asset, item| {
                let asset_type = asset.asset_type.as_deref().unwrap_or("").to_lowercase();
                item.set(keys::ASSET_TYPE, &asset_type);

                let subdirectory = destination_subdirectory(&asset.path);
                let file = file_name(&asset.path);
                let copied = self.settings.copy_local_runtime_target_assets
                    && self.copy_local_metadata(library, item, file, Some(subdirectory.as_str()));
                if !copied {
                    item.set(keys::DESTINATION_SUBDIRECTORY, &subdirectory);
                }
                item.set(keys::RUNTIME_IDENTIFIER, asset.rid.as_deref().unwrap_or(""));
            },
        )
    }

    /// Mark an asset for copying to the output (and publish) directory.
    ///
    /// Returns false, writing nothing, when the package is excluded from
    /// copy-local.
    fn copy_local_metadata(
        &self,
        library: &TargetLibrary,
        item: &mut Item,
        file: &str,
        subdirectory: Option<&str>,
    ) -> bool {
        let name = library.name.to_ascii_lowercase();
        if self.copy_local_exclusions.contains(&name) {
            return false;
        }

        item.set(keys::COPY_LOCAL, "true");
        if self.publish_exclusions.contains(&name) {
            item.set(keys::COPY_TO_PUBLISH_DIRECTORY, "false");
        }
        match subdirectory {
            Some(subdirectory) => {
                item.set(keys::DESTINATION_SUB_PATH, &format!("{}{}", subdirectory, file));
                item.set(keys::DESTINATION_SUBDIRECTORY, subdirectory);
            }
            None => item.set(keys::DESTINATION_SUB_PATH, file),
        }
        true
    }

    fn transitive_project_references(&self) -> Vec<Item> {
        if self.settings.disable_transitive_project_references {
            return Vec::new();
        }

        let paths = self.graph.project_paths();
        let mut items = Vec::new();
        for library in self.graph.transitive_project_references(&self.runtime_target) {
            match paths.get(library.name.as_str()) {
                Some(path) => items.push(library_item(path.clone(), library)),
                None => warn!("Project {} has no project path, skipping", library.name),
            }
        }
        items
    }

    /// Assets of one kind from every package library in `target` that pass
    /// `keep`, minus placeholders
    fn package_assets<S, K, M>(
        &self,
        target: &Target,
        select: S,
        keep: K,
        metadata: M,
    ) -> AssetsResult<Vec<Item>>
    where
        S: Fn(&TargetLibrary) -> &Vec<Asset>,
        K: Fn(&Asset) -> bool,
        M: Fn(&TargetLibrary, &Asset, &mut Item),
    {
        let mut items = Vec::new();

        for library in packages(target) {
            for asset in select(library) {
                if is_placeholder_file(&asset.path) || !keep(asset) {
                    continue;
                }

                let path = self.resolve(library, &asset.path)?;
                let mut item = library_item(path, library);
                item.set(keys::PATH_IN_PACKAGE, &asset.path);
                metadata(library, asset, &mut item);
                items.push(item);
            }
        }

        Ok(items)
    }

    fn resolve(&self, library: &TargetLibrary, relative: &str) -> AssetsResult<String> {
        let path = self
            .resolver
            .resolve_asset_path(&library.name, &library.version, relative)?;
        Ok(path.to_string_lossy().into_owned())
    }
}

fn packages(target: &Target) -> impl Iterator<Item = &TargetLibrary> {
    target.libraries.iter().filter(|l| l.is_package())
}

fn library_item(spec: String, library: &TargetLibrary) -> Item {
    Item::new(spec)
        .with(keys::NUGET_PACKAGE_ID, &library.name)
        .with(keys::NUGET_PACKAGE_VERSION, &library.version)
}

fn keep_all(_: &Asset) -> bool {
    true
}

/// `True` / `False`, the casing build consumers compare against
fn bool_str(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn write_item<W: Write + Seek>(
    out: &mut FramedWriter<W>,
    table: &mut StringTable,
    item: &Item,
) -> std::io::Result<()> {
    out.write_string(&item.spec)?;

    let pairs: Vec<(i32, i32)> = item
        .metadata
        .iter()
        .filter(|(_, value)| !value.is_empty())
        .map(|(key, value)| (table.intern(key), table.intern(value)))
        .collect();

    out.write_i32(pairs.len() as i32)?;
    for (key, value) in pairs {
        out.write_i32(key)?;
        out.write_i32(value)?;
    }
    Ok(())
}

fn to_i32<T: TryInto<i32> + Copy + std::fmt::Display>(value: T) -> AssetsResult<i32> {
    value
        .try_into()
        .map_err(|_| AssetsError::Internal(format!("{} does not fit the cache format", value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::reader::CacheHandle;
    use crate::graph::{ContentFile, Library, LibraryKind, LogLevel, LogMessage};
    use std::path::PathBuf;

    const ROOT: &str = "/packages";

    fn resolver(name: &str, version: &str) -> AssetsResult<PathBuf> {
        Ok(PathBuf::from(ROOT).join(name.to_lowercase()).join(version))
    }

    fn settings() -> ResolveSettings {
        let mut settings = ResolveSettings::new("/src/App/App.csproj", "net8.0");
        settings.project_language = Some("cs".to_string());
        settings
    }

    fn graph_with(runtime: Vec<TargetLibrary>) -> DependencyGraph {
        let mut target = Target::new("net8.0", None);
        target.libraries = runtime;
        DependencyGraph {
            targets: vec![target],
            ..DependencyGraph::default()
        }
    }

    fn expected_path(name: &str, version: &str, relative: &str) -> String {
        crate::graph::PackageResolver::resolve_asset_path(&resolver, name, version, relative)
            .unwrap()
            .to_string_lossy()
            .into_owned()
    }

    fn round_trip(writer: &CacheWriter<'_>, settings: &ResolveSettings) -> ItemGroups {
        let stream = writer.write_to_memory().unwrap();
        CacheHandle::from_stream(stream, &settings.fingerprint())
            .unwrap()
            .read_all()
            .unwrap()
    }

    #[test]
    fn single_runtime_assembly_scenario() {
        let mut foo = TargetLibrary::package("Foo", "1.0.0");
        foo.runtime.push(Asset::new("lib/net/Foo.dll"));
        let graph = graph_with(vec![foo]);
        let settings = settings();

        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        let groups = round_trip(&writer, &settings);

        let runtime = groups.get(ItemGroupKind::RuntimeAssemblies);
        assert_eq!(runtime.len(), 1);
        assert_eq!(runtime[0].spec, expected_path("Foo", "1.0.0", "lib/net/Foo.dll"));
        assert_eq!(runtime[0].get(keys::NUGET_PACKAGE_ID), Some("Foo"));
        assert_eq!(runtime[0].get(keys::NUGET_PACKAGE_VERSION), Some("1.0.0"));

        for (kind, items) in groups.iter() {
            if kind != ItemGroupKind::RuntimeAssemblies {
                assert!(items.is_empty(), "{} should be empty", kind);
            }
        }
    }

    #[test]
    fn round_trip_matches_writer_output() {
        let mut foo = TargetLibrary::package("Foo", "1.0.0");
        foo.compile.push(Asset {
            aliases: Some("foo".to_string()),
            ..Asset::new("ref/net8.0/Foo.dll")
        });
        foo.runtime.push(Asset::new("lib/net8.0/Foo.dll"));
        foo.native.push(Asset::new("runtimes/linux-x64/native/libfoo.so"));
        foo.resource.push(Asset {
            locale: Some("de".to_string()),
            ..Asset::new("lib/net8.0/de/Foo.resources.dll")
        });
        foo.runtime_targets.push(Asset {
            asset_type: Some("Native".to_string()),
            rid: Some("win-x64".to_string()),
            ..Asset::new("runtimes/win-x64/native/foo.dll")
        });
        foo.content_files.push(ContentFile {
            path: "contentFiles/cs/any/Gen.cs.pp".to_string(),
            build_action: Some("Compile".to_string()),
            pp_output_path: Some("Gen.cs".to_string()),
            output_path: Some("Gen.cs".to_string()),
            code_language: Some("cs".to_string()),
            ..ContentFile::default()
        });
        foo.framework_assemblies.push("System.Xml".to_string());

        let mut graph = graph_with(vec![foo]);
        graph.logs.push(LogMessage {
            code: "NU1603".to_string(),
            level: LogLevel::Warning,
            message: "approximate match".to_string(),
        });
        let settings = settings();
        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();

        let expected = writer.groups().unwrap();
        assert_eq!(round_trip(&writer, &settings), expected);
        // Rewriting produces identical bytes
        assert_eq!(
            writer.write_to_memory().unwrap().into_inner(),
            writer.write_to_memory().unwrap().into_inner()
        );

        let rt = &expected.get(ItemGroupKind::RuntimeTargets)[0];
        assert_eq!(rt.get(keys::ASSET_TYPE), Some("native"));
        assert_eq!(rt.get(keys::RUNTIME_IDENTIFIER), Some("win-x64"));
        let resources = &expected.get(ItemGroupKind::ResourceAssemblies)[0];
        assert_eq!(resources.get(keys::CULTURE), Some("de"));
        let compile = &expected.get(ItemGroupKind::CompileTimeAssemblies)[0];
        assert_eq!(compile.get(keys::ALIASES), Some("foo"));
        let content = &expected.get(ItemGroupKind::ContentFilesToPreprocess)[0];
        assert_eq!(content.get(keys::COPY_TO_OUTPUT), Some("False"));
        assert_eq!(content.get(keys::PP_OUTPUT_PATH), Some("Gen.cs"));
        let log = &expected.get(ItemGroupKind::LogMessages)[0];
        assert_eq!(log.get(keys::SEVERITY), Some("Warning"));
    }

    #[test]
    fn placeholders_are_excluded_everywhere() {
        let mut foo = TargetLibrary::package("Foo", "1.0.0");
        foo.compile.push(Asset::new("ref/net8.0/_._"));
        foo.runtime.push(Asset::new("lib/net8.0/_._"));
        foo.native.push(Asset::new("_._"));
        foo.resource.push(Asset {
            locale: Some("de".to_string()),
            ..Asset::new("lib\\net8.0\\de\\_._")
        });
        foo.runtime_targets.push(Asset::new("runtimes/win/lib/_._"));
        foo.content_files.push(ContentFile {
            path: "contentFiles/any/any/_._".to_string(),
            pp_output_path: Some("x".to_string()),
            ..ContentFile::default()
        });
        let mut graph = graph_with(vec![foo]);
        graph.libraries.push(Library {
            name: "Foo".to_string(),
            version: "1.0.0".to_string(),
            kind: LibraryKind::Package,
            files: vec!["analyzers/dotnet/cs/_._".to_string()],
            path: None,
        });
        let settings = settings();

        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        assert_eq!(round_trip(&writer, &settings).total(), 0);
    }

    #[test]
    fn analyzers_follow_project_language() {
        let mut graph = graph_with(vec![TargetLibrary::package("Foo", "1.0.0")]);
        graph.libraries.push(Library {
            name: "Foo".to_string(),
            version: "1.0.0".to_string(),
            kind: LibraryKind::Package,
            files: vec![
                "analyzers/dotnet/cs/Foo.Analyzer.dll".to_string(),
                "analyzers/dotnet/vb/Foo.Analyzer.dll".to_string(),
                "lib/net8.0/Foo.dll".to_string(),
            ],
            path: None,
        });

        let mut cs = settings();
        cs.project_language = Some("cs".to_string());
        let writer = CacheWriter::new(&graph, &resolver, &cs, false).unwrap();
        let analyzers = writer.group(ItemGroupKind::Analyzers).unwrap();
        assert_eq!(analyzers.len(), 1);
        assert_eq!(
            analyzers[0].spec,
            expected_path("Foo", "1.0.0", "analyzers/dotnet/cs/Foo.Analyzer.dll")
        );

        let mut vb = settings();
        vb.project_language = Some("vb".to_string());
        let writer = CacheWriter::new(&graph, &resolver, &vb, false).unwrap();
        let analyzers = writer.group(ItemGroupKind::Analyzers).unwrap();
        assert_eq!(analyzers.len(), 1);
        assert!(analyzers[0].spec.contains("vb"));
    }

    #[test]
    fn analyzers_require_runtime_target_library() {
        let mut graph = graph_with(Vec::new());
        graph.libraries.push(Library {
            name: "Foo".to_string(),
            version: "1.0.0".to_string(),
            kind: LibraryKind::Package,
            files: vec!["analyzers/dotnet/Foo.Analyzer.dll".to_string()],
            path: None,
        });
        let settings = settings();
        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        assert!(writer.group(ItemGroupKind::Analyzers).unwrap().is_empty());
    }

    #[test]
    fn unsupported_rid_message_synthesized() {
        let libraries: Vec<_> = (0..5)
            .map(|i| TargetLibrary::package(format!("P{}", i), "1.0.0"))
            .collect();
        let mut graph = graph_with(libraries.clone());
        let mut rid_target = Target::new("net8.0", Some("bogus-rid"));
        rid_target.libraries = libraries;
        graph.targets.push(rid_target);

        let mut settings = settings();
        settings.runtime_identifier = Some("bogus-rid".to_string());
        settings.ensure_runtime_package_dependencies = true;

        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        let logs = writer.group(ItemGroupKind::LogMessages).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].get(keys::SEVERITY), Some("Error"));
        assert!(logs[0].spec.contains("bogus-rid"));

        settings.ensure_runtime_package_dependencies = false;
        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        assert!(writer.group(ItemGroupKind::LogMessages).unwrap().is_empty());
    }

    #[test]
    fn rid_with_extra_libraries_is_accepted() {
        let mut graph = graph_with(vec![TargetLibrary::package("A", "1.0.0")]);
        let mut rid_target = Target::new("net8.0", Some("linux-x64"));
        rid_target.libraries = vec![
            TargetLibrary::package("A", "1.0.0"),
            TargetLibrary::package("runtime.linux-x64.A", "1.0.0"),
        ];
        graph.targets.push(rid_target);

        let mut settings = settings();
        settings.runtime_identifier = Some("linux-x64".to_string());
        settings.ensure_runtime_package_dependencies = true;

        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        assert!(writer.group(ItemGroupKind::LogMessages).unwrap().is_empty());
    }

    #[test]
    fn framework_assemblies_deduplicated_and_disableable() {
        let mut a = TargetLibrary::package("A", "1.0.0");
        a.framework_assemblies = vec!["System.Xml".to_string(), "System.Net".to_string()];
        let mut b = TargetLibrary::package("B", "2.0.0");
        b.framework_assemblies = vec!["System.Xml".to_string()];
        let graph = graph_with(vec![a, b]);

        let mut settings = settings();
        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        let items = writer.group(ItemGroupKind::FrameworkAssemblies).unwrap();
        let names: Vec<_> = items.iter().map(|i| i.spec.as_str()).collect();
        assert_eq!(names, vec!["System.Xml", "System.Net"]);
        assert_eq!(items[0].get(keys::NUGET_PACKAGE_ID), Some("A"));

        settings.disable_framework_assemblies = true;
        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        assert!(writer.group(ItemGroupKind::FrameworkAssemblies).unwrap().is_empty());
    }

    #[test]
    fn transitive_project_references() {
        let mut direct = TargetLibrary::project("Direct", "1.0.0");
        direct.dependencies = vec!["Indirect".to_string()];
        let indirect = TargetLibrary::project("Indirect", "1.0.0");
        let mut graph = graph_with(vec![direct, indirect]);
        graph.project.direct_dependencies = vec!["Direct".to_string()];
        for (name, path) in [("Direct", "..\\Direct\\Direct.csproj"), ("Indirect", "../Indirect/Indirect.csproj")] {
            graph.libraries.push(Library {
                name: name.to_string(),
                version: "1.0.0".to_string(),
                kind: LibraryKind::Project,
                files: Vec::new(),
                path: Some(path.to_string()),
            });
        }

        let mut settings = settings();
        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        let items = writer
            .group(ItemGroupKind::TransitiveProjectReferences)
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].spec, "../Indirect/Indirect.csproj");

        settings.disable_transitive_project_references = true;
        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        assert!(writer
            .group(ItemGroupKind::TransitiveProjectReferences)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn runtime_assets_are_copied_locally() {
        let mut foo = TargetLibrary::package("Foo", "1.0.0");
        foo.runtime.push(Asset::new("lib/net8.0/Foo.dll"));
        foo.native.push(Asset::new("runtimes/linux-x64/native/libfoo.so"));
        let mut graph = graph_with(vec![foo]);
        graph.project.direct_dependencies = vec!["Foo".to_string()];
        let mut settings = settings();

        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        let runtime = &writer.group(ItemGroupKind::RuntimeAssemblies).unwrap()[0];
        assert_eq!(runtime.get(keys::COPY_LOCAL), Some("true"));
        assert_eq!(runtime.get(keys::DESTINATION_SUB_PATH), Some("Foo.dll"));
        assert_eq!(runtime.get(keys::COPY_TO_PUBLISH_DIRECTORY), None);
        let native = &writer.group(ItemGroupKind::NativeLibraries).unwrap()[0];
        assert_eq!(native.get(keys::DESTINATION_SUB_PATH), Some("libfoo.so"));

        settings.exclude_from_publish = vec!["foo".to_string()];
        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        let runtime = &writer.group(ItemGroupKind::RuntimeAssemblies).unwrap()[0];
        assert_eq!(runtime.get(keys::COPY_LOCAL), Some("true"));
        assert_eq!(runtime.get(keys::COPY_TO_PUBLISH_DIRECTORY), Some("false"));

        settings.copy_local_package_exclusions = vec!["FOO".to_string()];
        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        let runtime = &writer.group(ItemGroupKind::RuntimeAssemblies).unwrap()[0];
        assert_eq!(runtime.get(keys::COPY_LOCAL), None);
        assert_eq!(runtime.get(keys::DESTINATION_SUB_PATH), None);
        assert_eq!(runtime.get(keys::COPY_TO_PUBLISH_DIRECTORY), None);
    }

    #[test]
    fn satellite_languages_filter_resources() {
        let mut foo = TargetLibrary::package("Foo", "1.0.0");
        for locale in ["de", "fr"] {
            foo.resource.push(Asset {
                locale: Some(locale.to_string()),
                ..Asset::new(format!("lib/net8.0/{}/Foo.resources.dll", locale))
            });
        }
        let graph = graph_with(vec![foo]);
        let mut settings = settings();

        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        assert_eq!(writer.group(ItemGroupKind::ResourceAssemblies).unwrap().len(), 2);

        settings.satellite_resource_languages = Some(vec!["DE".to_string()]);
        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        let resources = writer.group(ItemGroupKind::ResourceAssemblies).unwrap();
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].get(keys::CULTURE), Some("de"));
        let sep = std::path::MAIN_SEPARATOR;
        assert_eq!(
            resources[0].get(keys::DESTINATION_SUB_PATH),
            Some(format!("de{sep}Foo.resources.dll").as_str())
        );
        assert_eq!(
            resources[0].get(keys::DESTINATION_SUBDIRECTORY),
            Some(format!("de{sep}").as_str())
        );

        settings.satellite_resource_languages = Some(Vec::new());
        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        assert!(writer.group(ItemGroupKind::ResourceAssemblies).unwrap().is_empty());
    }

    #[test]
    fn runtime_target_copy_local_is_opt_in() {
        let mut foo = TargetLibrary::package("Foo", "1.0.0");
        foo.runtime_targets.push(Asset {
            asset_type: Some("Native".to_string()),
            rid: Some("win-x64".to_string()),
            ..Asset::new("runtimes/win-x64/native/foo.dll")
        });
        let graph = graph_with(vec![foo]);
        let mut settings = settings();
        let sep = std::path::MAIN_SEPARATOR;
        let subdirectory = format!("runtimes{sep}win-x64{sep}native{sep}");

        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        let item = &writer.group(ItemGroupKind::RuntimeTargets).unwrap()[0];
        assert_eq!(item.get(keys::COPY_LOCAL), None);
        assert_eq!(item.get(keys::DESTINATION_SUBDIRECTORY), Some(subdirectory.as_str()));

        settings.copy_local_runtime_target_assets = true;
        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        let item = &writer.group(ItemGroupKind::RuntimeTargets).unwrap()[0];
        assert_eq!(item.get(keys::COPY_LOCAL), Some("true"));
        assert_eq!(
            item.get(keys::DESTINATION_SUB_PATH),
            Some(format!("{subdirectory}foo.dll").as_str())
        );
        assert_eq!(item.get(keys::DESTINATION_SUBDIRECTORY), Some(subdirectory.as_str()));
    }

    #[test]
    fn shared_metadata_values_stored_once() {
        let mut foo = TargetLibrary::package("Foo", "1.0.0");
        foo.runtime.push(Asset::new("lib/net8.0/Foo.dll"));
        foo.runtime.push(Asset::new("lib/net8.0/Foo.Extra.dll"));
        let graph = graph_with(vec![foo]);
        let settings = settings();

        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        let handle = CacheHandle::from_stream(writer.write_to_memory().unwrap(), &settings.fingerprint())
            .unwrap();
        let strings = handle.strings();
        assert_eq!(strings.iter().filter(|s| *s == "1.0.0").count(), 1);
        assert_eq!(strings.iter().filter(|s| *s == "runtime").count(), 1);
        assert_eq!(strings.iter().filter(|s| *s == keys::NUGET_PACKAGE_ID).count(), 1);
    }

    #[test]
    fn empty_metadata_is_not_written() {
        let mut foo = TargetLibrary::package("Foo", "1.0.0");
        foo.compile.push(Asset::new("ref/net8.0/Foo.dll"));
        let graph = graph_with(vec![foo]);
        let settings = settings();

        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        let groups = round_trip(&writer, &settings);
        let item = &groups.get(ItemGroupKind::CompileTimeAssemblies)[0];
        assert_eq!(item.get(keys::ALIASES), None);
        assert!(item.metadata.iter().all(|(_, v)| !v.is_empty()));
    }

    #[test]
    fn missing_target_is_an_error() {
        let graph = DependencyGraph::default();
        let settings = settings();
        let err = CacheWriter::new(&graph, &resolver, &settings, false)
            .err()
            .unwrap();
        assert!(matches!(err, AssetsError::TargetNotFound { .. }));
    }

    #[test]
    fn design_time_build_uses_empty_target() {
        let graph = DependencyGraph::default();
        let settings = settings();
        let writer = CacheWriter::new(&graph, &resolver, &settings, true).unwrap();
        assert!(!writer.can_persist());
        assert_eq!(writer.groups().unwrap().total(), 0);
    }

    #[test]
    fn resolver_failure_aborts_write() {
        let mut foo = TargetLibrary::package("Foo", "1.0.0");
        foo.runtime.push(Asset::new("lib/net8.0/Foo.dll"));
        let graph = graph_with(vec![foo]);
        let settings = settings();
        let failing = |name: &str, version: &str| -> AssetsResult<PathBuf> {
            Err(AssetsError::PackageNotFound {
                name: name.to_string(),
                version: version.to_string(),
            })
        };

        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("obj").join("project.assets.cache");
        let writer = CacheWriter::new(&graph, &failing, &settings, false).unwrap();
        let err = writer.write_to_file(&path).unwrap_err();
        assert!(matches!(err, AssetsError::PackageNotFound { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn write_to_file_creates_directories() {
        let graph = graph_with(Vec::new());
        let settings = settings();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("obj").join("project.assets.cache");

        let writer = CacheWriter::new(&graph, &resolver, &settings, false).unwrap();
        writer.write_to_file(&path).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"PKGA");
    }
}
