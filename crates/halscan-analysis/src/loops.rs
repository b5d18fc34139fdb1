//! Loop header spans
//!
//! `for` and `while` headers are recorded as raw ranges while the tree is
//! walked and resolved to canonical file positions once the TU is complete.
//! `do ... while` loops are not recorded, but loops nested in them are.

use halscan_core::{LoopSpan, RawRange};
use halscan_frontend::ast::{walk_stmt, walk_unit, Stmt, TranslationUnit, Visit};
use halscan_frontend::SourceResolver;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use tracing::debug;

/// Collects loop header ranges of a whole TU
#[derive(Debug, Default)]
pub struct LoopSpanCollector {
    ranges: Vec<RawRange>,
}

impl LoopSpanCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record every loop header in `unit`
    pub fn collect(&mut self, unit: &TranslationUnit) {
        walk_unit(self, unit);
    }

    /// Raw header ranges in traversal order
    pub fn ranges(&self) -> &[RawRange] {
        &self.ranges
    }

    /// Resolve the recorded ranges to canonical spans.
    ///
    /// A range is dropped when an endpoint is not file-backed, when the two
    /// endpoints land in different files, or when its file cannot be
    /// canonicalized.
    pub fn resolve<R: SourceResolver>(&self, resolver: &R) -> BTreeSet<LoopSpan> {
        let mut canonical: HashMap<String, Option<String>> = HashMap::new();
        let mut spans = BTreeSet::new();

        for range in &self.ranges {
            let (Some(begin), Some(end)) = (resolver.presumed_loc(range.begin), resolver.presumed_loc(range.end))
            else {
                debug!("Dropping loop {:?}: not in a file", range);
                continue;
            };
            if begin.file != end.file {
                debug!("Dropping loop {:?}: spans {} and {}", range, begin.file, end.file);
                continue;
            }

            let file = canonical
                .entry(begin.file.clone())
                .or_insert_with(|| canonicalize(&begin.file));
            let Some(file) = file else {
                continue;
            };
            spans.insert(LoopSpan::new(
                file.clone(),
                begin.line,
                begin.column,
                end.line,
                end.column,
            ));
        }
        spans
    }
}

/// Absolute path with symlinks resolved; relative names are taken from the
/// current directory.
fn canonicalize(file: &str) -> Option<String> {
    match fs::canonicalize(file) {
        Ok(path) => Some(path.to_string_lossy().into_owned()),
        Err(err) => {
            debug!("Cannot canonicalize {}: {}", file, err);
            None
        }
    }
}

impl Visit for LoopSpanCollector {
    fn visit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::For { header, .. } | Stmt::While { header, .. } => self.ranges.push(*header),
            _ => {}
        }
        walk_stmt(self, stmt);
    }
}
