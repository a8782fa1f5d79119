//! Metadata string table
//!
//! Every metadata key and value in a cache file is stored once, at the end of
//! the file, and referenced from items by index.

use std::collections::HashMap;

const INITIAL_CAPACITY: usize = 32;

/// Write-side string table that assigns each distinct string one index
#[derive(Debug)]
pub struct StringTable {
    index: HashMap<String, i32>,
    strings: Vec<String>,
}

impl StringTable {
    pub fn new() -> Self {
        Self {
            index: HashMap::with_capacity(INITIAL_CAPACITY),
            strings: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    /// Return the index of `value`, appending it if this is its first use
    pub fn intern(&mut self, value: &str) -> i32 {
        if let Some(&existing) = self.index.get(value) {
            return existing;
        }
        let assigned = self.strings.len() as i32;
        self.index.insert(value.to_string(), assigned);
        self.strings.push(value.to_string());
        assigned
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Strings in index order
    pub fn strings(&self) -> &[String] {
        &self.strings
    }
}

impl Default for StringTable {
    fn default() -> Self {
        Self::new()
    }
}
