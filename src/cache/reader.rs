//! Cache reader and the open/regenerate policy around it

use super::fingerprint::{Fingerprint, ResolveSettings, FINGERPRINT_LEN};
use super::framing::FramedReader;
use super::item::{Item, ItemGroupKind, ItemGroups, ITEM_GROUP_COUNT};
use super::writer::CacheWriter;
use super::{CACHE_FORMAT_VERSION, CACHE_SIGNATURE};
use crate::error::{AssetsError, AssetsResult};
use crate::graph::{DependencyGraph, FolderPackageResolver, PackageResolver};
use std::fs::{self, File};
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Decoded fixed-size cache header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheHeader {
    pub version: i32,
    pub fingerprint: Fingerprint,
    pub string_table_offset: u64,
}

/// Sequential reader over the item groups of one cache.
///
/// The string table is loaded eagerly when the handle is created; groups are
/// then read strictly in file order.
pub struct CacheHandle<R: Read + Seek> {
    reader: FramedReader<R>,
    header: CacheHeader,
    strings: Vec<String>,
    next_group: usize,
    regenerated: bool,
}

impl<R: Read + Seek> CacheHandle<R> {
    /// Open a cache stream, requiring its fingerprint to equal `expected`
    pub fn from_stream(stream: R, expected: &Fingerprint) -> AssetsResult<Self> {
        let mut reader = FramedReader::new(stream)?;
        let header = read_header(&mut reader, Some(expected))?;
        Self::with_header(reader, header)
    }

    /// Open a cache stream without checking what settings produced it
    pub fn inspect(stream: R) -> AssetsResult<Self> {
        let mut reader = FramedReader::new(stream)?;
        let header = read_header(&mut reader, None)?;
        Self::with_header(reader, header)
    }

    fn with_header(mut reader: FramedReader<R>, header: CacheHeader) -> AssetsResult<Self> {
        let groups_start = reader.position()?;
        reader.seek_to(header.string_table_offset)?;

        let count = reader.read_count("string count")?;
        // Every string takes at least its one-byte length prefix
        let remaining = reader.len() - header.string_table_offset;
        if count as u64 > remaining {
            return Err(AssetsError::invalid(format!(
                "string table claims {} strings in {} bytes",
                count, remaining
            )));
        }
        let mut strings = Vec::with_capacity(count);
        for _ in 0..count {
            strings.push(reader.read_string()?);
        }

        reader.seek_to(groups_start)?;
        Ok(Self {
            reader,
            header,
            strings,
            next_group: 0,
            regenerated: false,
        })
    }

    pub fn header(&self) -> &CacheHeader {
        &self.header
    }

    /// Interned strings, in index order
    pub fn strings(&self) -> &[String] {
        &self.strings
    }

    /// The group the next [`Self::read_item_group`] call returns, if any remain
    pub fn next_group(&self) -> Option<ItemGroupKind> {
        ItemGroupKind::ALL.get(self.next_group).copied()
    }

    /// Whether this cache was rebuilt while opening it
    pub fn was_regenerated(&self) -> bool {
        self.regenerated
    }

    /// Read the next item group
    pub fn read_item_group(&mut self) -> AssetsResult<Vec<Item>> {
        if self.next_group >= ITEM_GROUP_COUNT {
            return Err(AssetsError::GroupOrder(self.next_group));
        }

        let count = self.reader.read_count("item count")?;
        let mut items = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            items.push(self.read_item()?);
        }
        self.next_group += 1;

        if self.next_group == ITEM_GROUP_COUNT {
            let end = self.reader.position()?;
            if end != self.header.string_table_offset {
                return Err(AssetsError::invalid(format!(
                    "item groups end at {} but string table starts at {}",
                    end, self.header.string_table_offset
                )));
            }
        }
        Ok(items)
    }

    /// Read every remaining group
    pub fn read_all(mut self) -> AssetsResult<ItemGroups> {
        let mut groups = ItemGroups::new();
        while let Some(kind) = self.next_group() {
            let items = self.read_item_group()?;
            groups.set(kind, items);
        }
        Ok(groups)
    }

    fn read_item(&mut self) -> AssetsResult<Item> {
        let spec = self.reader.read_string()?;
        let count = self.reader.read_count("metadata count")?;
        let mut item = Item::new(spec);
        for _ in 0..count {
            let key_index = self.reader.read_count("string index")?;
            let value_index = self.reader.read_count("string index")?;
            item.metadata
                .push((self.string(key_index)?, self.string(value_index)?));
        }
        Ok(item)
    }

    fn string(&self, index: usize) -> AssetsResult<String> {
        self.strings.get(index).cloned().ok_or_else(|| {
            AssetsError::invalid(format!(
                "string index {} out of range ({} strings)",
                index,
                self.strings.len()
            ))
        })
    }
}

/// Read and validate the header; with `expected`, the stored fingerprint must match it
fn read_header<R: Read + Seek>(
    reader: &mut FramedReader<R>,
    expected: Option<&Fingerprint>,
) -> AssetsResult<CacheHeader> {
    let signature = reader.read_i32()?;
    if signature != CACHE_SIGNATURE {
        return Err(AssetsError::invalid(format!(
            "bad signature {:#010x}",
            signature
        )));
    }

    let version = reader.read_i32()?;
    if version != CACHE_FORMAT_VERSION {
        return Err(AssetsError::invalid(format!(
            "unsupported format version {} (expected {})",
            version, CACHE_FORMAT_VERSION
        )));
    }

    let fingerprint = match expected {
        Some(expected) => {
            if !reader.bytes_equal(expected.as_bytes())? {
                return Err(AssetsError::invalid(format!(
                    "fingerprint does not match settings {}",
                    expected
                )));
            }
            *expected
        }
        None => {
            let bytes = reader.read_bytes(FINGERPRINT_LEN)?;
            let mut fingerprint = [0u8; FINGERPRINT_LEN];
            fingerprint.copy_from_slice(&bytes);
            Fingerprint::from_bytes(fingerprint)
        }
    };

    let offset = reader.read_count("string table offset")? as u64;
    let groups_start = reader.position()?;
    if offset < groups_start || offset > reader.len() {
        return Err(AssetsError::invalid(format!(
            "string table offset {} outside {}..{}",
            offset,
            groups_start,
            reader.len()
        )));
    }

    Ok(CacheHeader {
        version,
        fingerprint,
        string_table_offset: offset,
    })
}

/// Backing store of an open cache
pub enum CacheStream {
    File(BufReader<File>),
    Memory(Cursor<Vec<u8>>),
}

impl Read for CacheStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::File(f) => f.read(buf),
            Self::Memory(m) => m.read(buf),
        }
    }
}

impl Seek for CacheStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            Self::File(f) => f.seek(pos),
            Self::Memory(m) => m.seek(pos),
        }
    }
}

/// Item groups read from a cache, with how they were obtained
#[derive(Debug, Clone, PartialEq)]
pub struct CachedGroups {
    pub groups: ItemGroups,
    pub regenerated: bool,
}

/// Locates, validates, and if needed rebuilds the cache for one set of
/// resolve settings.
pub struct AssetsCache<'a> {
    cache_path: PathBuf,
    graph_path: PathBuf,
    settings: &'a ResolveSettings,
    resolver: Option<&'a dyn PackageResolver>,
    enabled: bool,
    design_time_build: bool,
}

impl<'a> AssetsCache<'a> {
    pub fn new(
        cache_path: impl Into<PathBuf>,
        graph_path: impl Into<PathBuf>,
        settings: &'a ResolveSettings,
    ) -> Self {
        Self {
            cache_path: cache_path.into(),
            graph_path: graph_path.into(),
            settings,
            resolver: None,
            enabled: true,
            design_time_build: false,
        }
    }

    /// Resolve package directories with `resolver` instead of the graph's package folders
    pub fn with_resolver(mut self, resolver: &'a dyn PackageResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Build in memory on every open, never touching the cache file
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_design_time_build(mut self, design_time_build: bool) -> Self {
        self.design_time_build = design_time_build;
        self
    }

    /// Open the cache, rebuilding it once if it is missing, stale, or was
    /// written for different settings.
    pub fn open(&self) -> AssetsResult<CacheHandle<CacheStream>> {
        let expected = self.settings.fingerprint();
        if !self.enabled {
            return self.generate(&expected);
        }

        match self.open_fresh(&expected) {
            Ok(handle) => {
                debug!("Using asset cache {}", self.cache_path.display());
                Ok(handle)
            }
            Err(e) if e.is_recoverable() => {
                debug!("Regenerating asset cache {}: {}", self.cache_path.display(), e);
                self.generate(&expected)
            }
            Err(e) => Err(e),
        }
    }

    /// Open and read every group.
    ///
    /// A cache found corrupt partway through is rebuilt once; a second
    /// failure propagates.
    pub fn read_all(&self) -> AssetsResult<CachedGroups> {
        let handle = self.open()?;
        let regenerated = handle.was_regenerated();
        match handle.read_all() {
            Ok(groups) => Ok(CachedGroups {
                groups,
                regenerated,
            }),
            Err(e @ AssetsError::CacheInvalid { .. }) if !regenerated => {
                warn!("Asset cache {} is corrupt: {}", self.cache_path.display(), e);
                let groups = self.generate(&self.settings.fingerprint())?.read_all()?;
                Ok(CachedGroups {
                    groups,
                    regenerated: true,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn open_fresh(&self, expected: &Fingerprint) -> AssetsResult<CacheHandle<CacheStream>> {
        let cache_modified = modified(&self.cache_path)?;
        let graph_modified = modified(&self.graph_path)?;
        if cache_modified < graph_modified {
            return Err(AssetsError::invalid("cache is older than the dependency graph"));
        }
        self.open_file(expected)
    }

    fn open_file(&self, expected: &Fingerprint) -> AssetsResult<CacheHandle<CacheStream>> {
        let file = File::open(&self.cache_path).map_err(|e| {
            AssetsError::io(format!("opening {}", self.cache_path.display()), e)
        })?;
        CacheHandle::from_stream(CacheStream::File(BufReader::new(file)), expected)
    }

    fn generate(&self, expected: &Fingerprint) -> AssetsResult<CacheHandle<CacheStream>> {
        let graph = DependencyGraph::load(&self.graph_path)?;

        let folders;
        let resolver: &dyn PackageResolver = match self.resolver {
            Some(resolver) => resolver,
            None => {
                folders = FolderPackageResolver::from_graph(&graph);
                &folders
            }
        };

        let writer = CacheWriter::new(&graph, resolver, self.settings, self.design_time_build)?;
        let mut handle = if self.enabled && writer.can_persist() {
            writer.write_to_file(&self.cache_path)?;
            self.open_file(expected)?
        } else {
            info!("Building asset cache in memory");
            CacheHandle::from_stream(CacheStream::Memory(writer.write_to_memory()?), expected)?
        };
        handle.regenerated = true;
        Ok(handle)
    }
}

fn modified(path: &Path) -> AssetsResult<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| AssetsError::io(format!("reading timestamp of {}", path.display()), e))
}
