//! Enumerator to enum type lookup
//!
//! Built once per TU from every enum declaration the tree contains, headers
//! and function-local enums included.

use halscan_frontend::ast::{walk_decl, walk_unit, ConstId, Decl, EnumDecl, EnumId, TranslationUnit, Visit};
use std::collections::HashMap;
use tracing::debug;

/// Maps each enumerator of a TU to the enum declaring it
#[derive(Debug, Default)]
pub struct EnumRegistry {
    types: HashMap<EnumId, EnumDecl>,
    owners: HashMap<ConstId, EnumId>,
}

impl EnumRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry over every enum in `unit`
    pub fn from_unit(unit: &TranslationUnit) -> Self {
        let mut registry = Self::new();
        registry.register_unit(unit);
        registry
    }

    /// Register every enum declaration reachable in `unit`
    pub fn register_unit(&mut self, unit: &TranslationUnit) {
        walk_unit(self, unit);
        debug!(
            "Registered {} enum types, {} enumerators",
            self.types.len(),
            self.owners.len()
        );
    }

    /// Register one enum. Enumerators already known keep their first owner.
    pub fn register(&mut self, decl: &EnumDecl) {
        for constant in &decl.constants {
            self.owners.entry(constant.id).or_insert(decl.id);
        }
        self.types.entry(decl.id).or_insert_with(|| decl.clone());
    }

    /// Enum type owning `constant`
    pub fn lookup(&self, constant: ConstId) -> Option<&EnumDecl> {
        self.owners.get(&constant).and_then(|id| self.types.get(id))
    }

    /// Enum type by id
    pub fn get(&self, id: EnumId) -> Option<&EnumDecl> {
        self.types.get(&id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Visit for EnumRegistry {
    fn visit_decl(&mut self, decl: &Decl) {
        if let Decl::Enum(decl) = decl {
            self.register(decl);
        }
        walk_decl(self, decl);
    }
}
