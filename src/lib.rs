//! pkgassets - package asset resolution with a binary cache
//!
//! Turns a restored dependency graph into the item groups a build consumes
//! (compile and runtime assemblies, native libraries, satellite resources,
//! analyzers, content files, diagnostics), and keeps the result in a
//! fingerprinted binary cache so repeated builds skip the graph walk.

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod graph;
pub mod resolve;

pub use error::{AssetsError, AssetsResult};
