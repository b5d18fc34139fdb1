//! Serialized frontend output for one translation unit
//!
//! A frontend that cannot host the engine in-process writes a JSON dump of
//! the syntax tree, the macro expansions it saw and the location table, and
//! the engine is run on that dump afterwards.

use crate::ast::TranslationUnit;
use crate::macros::MacroExpansion;
use crate::source::LocationTable;
use halscan_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TuDump {
    pub unit: TranslationUnit,
    /// Expansions in the order the preprocessor reported them
    #[serde(default)]
    pub macros: Vec<MacroExpansion>,
    #[serde(default)]
    pub locations: LocationTable,
}

impl TuDump {
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::Parse(format!("invalid TU dump: {}", e)))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let dump = Self::from_json(&text)?;
        debug!(
            "Loaded TU dump {:?}: {} decls, {} macro expansions",
            path,
            dump.unit.decls.len(),
            dump.macros.len()
        );
        Ok(dump)
    }
}
