//! Findings of one translation unit
//!
//! Filled by the analysis passes, then folded together with the persisted
//! caches at the end of the TU.

use crate::LoopSpan;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default)]
pub struct TuFacts {
    /// Success value per function name
    pub success: BTreeMap<String, i64>,
    /// Functions seen declared in a project header
    pub declared: BTreeSet<String>,
    /// Functions defined in the main file
    pub defined: BTreeSet<String>,
    /// Resolved loop header spans
    pub loops: BTreeSet<LoopSpan>,
    /// Peripheral register-block type names
    pub struct_names: BTreeSet<String>,
}

impl TuFacts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a success value unless the function already has one.
    ///
    /// Returns `true` if the record was added.
    pub fn record_success(&mut self, function: &str, value: i64) -> bool {
        if self.success.contains_key(function) {
            return false;
        }
        self.success.insert(function.to_string(), value);
        true
    }

    pub fn has_success(&self, function: &str) -> bool {
        self.success.contains_key(function)
    }

    /// API surface: declared in a header and defined in a main file
    pub fn api_names(&self) -> impl Iterator<Item = &String> {
        self.declared.intersection(&self.defined)
    }
}
