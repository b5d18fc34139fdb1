//! Success return value inference
//!
//! HAL functions usually report success through an enumerator such as
//! `HAL_OK`. For every function of a TU this module guesses which integer
//! that is, and sorts the function into the declared and defined API sets.
//!
//! Two strategies are tried:
//! - the declared return type is an enum: take its first "good" enumerator
//! - otherwise scan the body for returned enumerators, or returned locals
//!   holding one, and take the first good enumerator of their types

use crate::enum_registry::EnumRegistry;
use halscan_core::{AnalysisConfig, Origin, TuFacts};
use halscan_frontend::ast::{
    walk_decl, walk_expr, walk_stmt, walk_unit, Decl, DeclRef, EnumId, Expr, FunctionDecl, InitStyle,
    Stmt, TranslationUnit, TypeRef, VarId, VarScope, Visit,
};
use indexmap::IndexSet;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Whether an enumerator name reads as a success status.
///
/// Plain substring test, so `NOT_OK` passes as well.
pub fn is_success_name(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.contains("ok") || lower.contains("success")
}

/// Per-TU success value inference
pub struct SuccessValueInferencer<'a> {
    registry: &'a EnumRegistry,
    consult_assignments: bool,
}

impl<'a> SuccessValueInferencer<'a> {
    pub fn new(registry: &'a EnumRegistry, config: &AnalysisConfig) -> Self {
        Self {
            registry,
            consult_assignments: config.consult_assignments,
        }
    }

    /// Classify and infer every function declared in `unit`
    pub fn run(&self, unit: &TranslationUnit, facts: &mut TuFacts) {
        let mut pass = FunctionPass {
            inferencer: self,
            facts,
        };
        walk_unit(&mut pass, unit);
    }

    /// Handle one function declaration
    pub fn process(&self, func: &FunctionDecl, facts: &mut TuFacts) {
        if func.is_noreturn {
            debug!("Skipping noreturn function {}", func.name);
            return;
        }

        match (func.has_body(), func.origin) {
            (true, Origin::MainFile) => {
                facts.defined.insert(func.name.clone());
            }
            (_, Origin::LocalHeader) => {
                facts.declared.insert(func.name.clone());
            }
            _ => {}
        }

        if !func.has_body() || facts.has_success(&func.name) {
            return;
        }
        if let Some(value) = self.infer(func) {
            debug!("Success value of {} is {}", func.name, value);
            facts.record_success(&func.name, value);
        }
    }

    /// Success value of `func`, if one can be guessed
    pub fn infer(&self, func: &FunctionDecl) -> Option<i64> {
        if let TypeRef::Enum(id) = &func.return_type {
            // an enum return type decides on its own, the body is not consulted
            return self.first_success_value([*id]);
        }

        let body = func.body.as_ref()?;
        let mut scan = ReturnScan::new(self.registry);
        scan.visit_stmt(body);

        let candidates: IndexSet<EnumId> = if !scan.returned_types.is_empty() {
            scan.returned_types
        } else {
            scan.returned_vars
                .iter()
                .filter_map(|var| {
                    scan.decl_types.get(var).or_else(|| {
                        if self.consult_assignments {
                            scan.assigned_types.get(var)
                        } else {
                            None
                        }
                    })
                })
                .copied()
                .collect()
        };
        if candidates.len() > 1 {
            warn!(
                "Function {} returns values of {} different enum types",
                func.name,
                candidates.len()
            );
        }

        self.first_success_value(candidates)
    }

    fn first_success_value(&self, candidates: impl IntoIterator<Item = EnumId>) -> Option<i64> {
        candidates
            .into_iter()
            .filter_map(|id| self.registry.get(id))
            .flat_map(|decl| decl.constants.iter())
            .find(|constant| is_success_name(&constant.name))
            .map(|constant| constant.value)
    }
}

/// Hands every function declaration to the inferencer, block-scope
/// prototypes included
struct FunctionPass<'i, 'r, 'f> {
    inferencer: &'i SuccessValueInferencer<'r>,
    facts: &'f mut TuFacts,
}

impl Visit for FunctionPass<'_, '_, '_> {
    fn visit_decl(&mut self, decl: &Decl) {
        if let Decl::Function(func) = decl {
            self.inferencer.process(func, self.facts);
        }
        walk_decl(self, decl);
    }
}

/// Single pass over one function body
struct ReturnScan<'r> {
    registry: &'r EnumRegistry,
    /// Locals declared with `= ENUMERATOR`
    decl_types: HashMap<VarId, EnumId>,
    /// Locals whose last plain assignment was an enumerator
    assigned_types: HashMap<VarId, EnumId>,
    returned_types: IndexSet<EnumId>,
    returned_vars: IndexSet<VarId>,
}

impl<'r> ReturnScan<'r> {
    fn new(registry: &'r EnumRegistry) -> Self {
        Self {
            registry,
            decl_types: HashMap::new(),
            assigned_types: HashMap::new(),
            returned_types: IndexSet::new(),
            returned_vars: IndexSet::new(),
        }
    }

    fn enum_of(&self, expr: &Expr) -> Option<EnumId> {
        match expr.referenced_decl()? {
            DeclRef::EnumConstant { id, .. } => self.registry.lookup(*id).map(|decl| decl.id),
            _ => None,
        }
    }
}

fn local_var(expr: &Expr) -> Option<VarId> {
    match expr.referenced_decl()? {
        DeclRef::Var {
            id,
            scope: VarScope::Local,
            ..
        } => Some(*id),
        _ => None,
    }
}

impl Visit for ReturnScan<'_> {
    fn visit_decl(&mut self, decl: &Decl) {
        if let Decl::Var(var) = decl {
            if let Some(init) = var.init.as_ref().filter(|i| var.is_local && i.style == InitStyle::C) {
                if let Some(ty) = self.enum_of(&init.expr) {
                    self.decl_types.insert(var.id, ty);
                }
            }
        }
        walk_decl(self, decl);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        if let Stmt::Return { value: Some(value) } = stmt {
            if let Some(ty) = self.enum_of(value) {
                self.returned_types.insert(ty);
            } else if let Some(var) = local_var(value) {
                self.returned_vars.insert(var);
            }
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        if let Expr::Assignment { target, value } = expr {
            if let (Some(var), Some(ty)) = (local_var(target), self.enum_of(value)) {
                self.assigned_types.insert(var, ty);
            }
        }
        walk_expr(self, expr);
    }
}
