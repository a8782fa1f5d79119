//! Binary asset cache
//!
//! Resolving package assets from the dependency graph is expensive, so the
//! result is stored next to the graph as a compact binary file and reused
//! until the graph changes or the resolve settings do.
//!
//! # File layout
//!
//! | Section | Contents |
//! |---------|----------|
//! | Header | signature `PKGA`, format version, 32-byte settings fingerprint, string table offset |
//! | Item groups | ten groups in fixed order, each an item count followed by items |
//! | String table | string count followed by every interned metadata string |
//!
//! An item is its spec string followed by a count of (key index, value
//! index) pairs into the string table. All integers are little-endian i32.
//!
//! The signature is written last, so a file abandoned mid-write is never
//! accepted.
//!
//! # Freshness
//!
//! A cache is reused when it is at least as new as the graph and its
//! fingerprint matches the current settings. Otherwise it is rebuilt once;
//! a rebuilt cache that still fails to load is an error.

pub mod fingerprint;
pub mod framing;
pub mod item;
pub mod reader;
pub mod rules;
pub mod strings;
pub mod writer;

pub use fingerprint::{Fingerprint, ResolveSettings};
pub use item::{keys, Item, ItemGroupKind, ItemGroups};
pub use reader::{AssetsCache, CacheHandle, CacheHeader, CacheStream, CachedGroups};
pub use writer::CacheWriter;

/// `PKGA` read as a little-endian i32
pub const CACHE_SIGNATURE: i32 =
    (b'P' as i32) | ((b'K' as i32) << 8) | ((b'G' as i32) << 16) | ((b'A' as i32) << 24);

/// Bumped whenever the layout changes
pub const CACHE_FORMAT_VERSION: i32 = 1;

/// Default cache file name, placed next to the dependency graph
pub const DEFAULT_CACHE_FILE_NAME: &str = "project.assets.cache";
