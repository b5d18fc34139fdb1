//! Source location resolution

use halscan_core::{PresumedLoc, RawLoc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Maps raw positions back to files.
pub trait SourceResolver {
    /// Presumed position of a file-backed location.
    ///
    /// Returns `None` for invalid locations and for locations that only
    /// exist inside a macro expansion.
    fn presumed_loc(&self, loc: RawLoc) -> Option<PresumedLoc>;
}

impl<R: SourceResolver + ?Sized> SourceResolver for &R {
    fn presumed_loc(&self, loc: RawLoc) -> Option<PresumedLoc> {
        (**self).presumed_loc(loc)
    }
}

/// A precomputed location table, as shipped in a TU dump
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<LocationEntry>", into = "Vec<LocationEntry>")]
pub struct LocationTable {
    entries: BTreeMap<RawLoc, PresumedLoc>,
}

/// Serialized row of a [`LocationTable`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocationEntry {
    pub loc: RawLoc,
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl LocationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the file position of `loc`
    pub fn insert(&mut self, loc: RawLoc, presumed: PresumedLoc) {
        self.entries.insert(loc, presumed);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SourceResolver for LocationTable {
    fn presumed_loc(&self, loc: RawLoc) -> Option<PresumedLoc> {
        if !loc.is_valid() {
            return None;
        }
        self.entries.get(&loc).cloned()
    }
}

impl From<Vec<LocationEntry>> for LocationTable {
    fn from(rows: Vec<LocationEntry>) -> Self {
        let entries = rows
            .into_iter()
            .map(|row| (row.loc, PresumedLoc::new(row.file, row.line, row.column)))
            .collect();
        Self { entries }
    }
}

impl From<LocationTable> for Vec<LocationEntry> {
    fn from(table: LocationTable) -> Self {
        table
            .entries
            .into_iter()
            .map(|(loc, p)| LocationEntry {
                loc,
                file: p.file,
                line: p.line,
                column: p.column,
            })
            .collect()
    }
}
