//! Source location types

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Opaque source position as handed out by the frontend.
///
/// The value only means something to the frontend's location service; the
/// engine stores it as-is and resolves it when the translation unit is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawLoc(pub u32);

impl RawLoc {
    /// The location that never resolves to anything
    pub const INVALID: RawLoc = RawLoc(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// A pair of raw positions, begin and end inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct RawRange {
    pub begin: RawLoc,
    pub end: RawLoc,
}

impl RawRange {
    pub fn new(begin: RawLoc, end: RawLoc) -> Self {
        Self { begin, end }
    }
}

/// A position after macro expansion has been accounted for
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresumedLoc {
    /// File name as the frontend reports it (may be relative)
    pub file: String,
    /// Line (1-based)
    pub line: u32,
    /// Column (1-based)
    pub column: u32,
}

impl PresumedLoc {
    pub fn new(file: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

/// Header span of a `for` or `while` loop, from the keyword to the closing
/// parenthesis of the condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopSpan {
    /// Absolute, symlink-resolved file path
    pub file: String,
    pub begin_line: u32,
    pub begin_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl LoopSpan {
    pub fn new(
        file: impl Into<String>,
        begin_line: u32,
        begin_column: u32,
        end_line: u32,
        end_column: u32,
    ) -> Self {
        Self {
            file: file.into(),
            begin_line,
            begin_column,
            end_line,
            end_column,
        }
    }

    /// Begin position packed as `line << 32 | column`
    pub fn begin_key(&self) -> u64 {
        (u64::from(self.begin_line) << 32) | u64::from(self.begin_column)
    }

    /// End position packed as `line << 32 | column`
    pub fn end_key(&self) -> u64 {
        (u64::from(self.end_line) << 32) | u64::from(self.end_column)
    }
}

impl Ord for LoopSpan {
    fn cmp(&self, other: &Self) -> Ordering {
        self.file
            .cmp(&other.file)
            .then_with(|| self.begin_key().cmp(&other.begin_key()))
            .then_with(|| self.end_key().cmp(&other.end_key()))
    }
}

impl PartialOrd for LoopSpan {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for LoopSpan {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for LoopSpan {}

impl std::fmt::Display for LoopSpan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}-{}:{}",
            self.file, self.begin_line, self.begin_column, self.end_line, self.end_column
        )
    }
}
