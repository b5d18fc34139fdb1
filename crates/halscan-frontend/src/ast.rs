//! Syntax tree handed over by the frontend
//!
//! Identifiers are already resolved: every reference names the declaration
//! it binds to, and enums, enumerators and variables carry TU-unique ids.

use halscan_core::{Origin, RawRange};
use serde::{Deserialize, Serialize};

/// Identity of an enum declaration within one TU
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnumId(pub u32);

/// Identity of an enumerator within one TU
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstId(pub u32);

/// Identity of a variable declaration within one TU
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(pub u32);

/// A whole translation unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Primary source file
    pub main_file: String,
    /// Top-level declarations, headers included, in source order
    pub decls: Vec<Decl>,
}

/// Declaration kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decl {
    Enum(EnumDecl),
    Function(FunctionDecl),
    Var(VarDecl),
    /// Records, typedefs and everything else the engine has no use for
    Other,
}

/// Enum declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumDecl {
    pub id: EnumId,
    /// Tag name, empty for anonymous enums
    #[serde(default)]
    pub name: String,
    pub constants: Vec<EnumConstant>,
}

/// Enumerator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumConstant {
    pub id: ConstId,
    pub name: String,
    pub value: i64,
}

/// Function declaration or definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: String,
    /// Canonical declared return type
    pub return_type: TypeRef,
    pub origin: Origin,
    /// `noreturn` / `_Noreturn` / `__attribute__((noreturn))`
    #[serde(default)]
    pub is_noreturn: bool,
    #[serde(default)]
    pub body: Option<Stmt>,
}

impl FunctionDecl {
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}

/// Type as far as the engine cares
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeRef {
    /// Canonically an enumeration type
    Enum(EnumId),
    /// Anything else, spelled as written
    Other(String),
}

/// Variable declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VarDecl {
    pub id: VarId,
    pub name: String,
    /// Block-scope variable (not a parameter, not a global)
    #[serde(default)]
    pub is_local: bool,
    #[serde(default)]
    pub init: Option<Initializer>,
}

/// Variable initializer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Initializer {
    pub style: InitStyle,
    pub expr: Expr,
}

/// How an initializer was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitStyle {
    /// `T x = e;`
    C,
    /// `T x(e);`
    Call,
    /// `T x{e};`
    List,
}

/// Statement kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stmt {
    Compound {
        stmts: Vec<Stmt>,
    },
    Decl {
        decls: Vec<Decl>,
    },
    Expr {
        expr: Expr,
    },
    Return {
        #[serde(default)]
        value: Option<Expr>,
    },
    If {
        cond: Expr,
        then: Box<Stmt>,
        #[serde(default)]
        otherwise: Option<Box<Stmt>>,
    },
    While {
        /// `while` keyword to closing parenthesis of the condition
        header: RawRange,
        cond: Expr,
        body: Box<Stmt>,
    },
    DoWhile {
        body: Box<Stmt>,
        cond: Expr,
    },
    For {
        /// `for` keyword to closing parenthesis of the header
        header: RawRange,
        #[serde(default)]
        init: Option<Box<Stmt>>,
        #[serde(default)]
        cond: Option<Expr>,
        #[serde(default)]
        inc: Option<Expr>,
        body: Box<Stmt>,
    },
    Switch {
        cond: Expr,
        body: Box<Stmt>,
    },
    Case {
        value: Expr,
        body: Box<Stmt>,
    },
    Default {
        body: Box<Stmt>,
    },
    Label {
        name: String,
        body: Box<Stmt>,
    },
    Goto {
        label: String,
    },
    Break,
    Continue,
    Null,
}

/// Expression kinds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    /// Identifier reference, already bound to its declaration
    Ref { target: DeclRef },
    IntLiteral { value: i64 },
    /// Float, string and character literals
    Literal { text: String },
    Paren { inner: Box<Expr> },
    Cast { ty: TypeRef, operand: Box<Expr> },
    UnaryOp { op: String, operand: Box<Expr> },
    BinaryOp { op: String, left: Box<Expr>, right: Box<Expr> },
    /// Plain `=`
    Assignment { target: Box<Expr>, value: Box<Expr> },
    /// `+=`, `|=`, ...
    CompoundAssignment { op: String, target: Box<Expr>, value: Box<Expr> },
    Conditional { cond: Box<Expr>, then: Box<Expr>, otherwise: Box<Expr> },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    MemberAccess { object: Box<Expr>, member: String, is_pointer: bool },
    Index { base: Box<Expr>, index: Box<Expr> },
}

impl Expr {
    /// Strip parentheses and casts, implicit or written
    pub fn ignore_parens_and_casts(&self) -> &Expr {
        let mut expr = self;
        loop {
            match expr {
                Expr::Paren { inner } => expr = &**inner,
                Expr::Cast { operand, .. } => expr = &**operand,
                _ => return expr,
            }
        }
    }

    /// The declaration this expression names, looking through parens and casts
    pub fn referenced_decl(&self) -> Option<&DeclRef> {
        match self.ignore_parens_and_casts() {
            Expr::Ref { target } => Some(target),
            _ => None,
        }
    }
}

/// What an identifier resolves to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclRef {
    EnumConstant { id: ConstId, name: String },
    Var { id: VarId, name: String, scope: VarScope },
    Function { name: String },
}

/// Storage scope of a referenced variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VarScope {
    Local,
    Param,
    Global,
}

/// Tree walker.
///
/// Override the `visit_*` hooks you need and call the matching `walk_*`
/// function to keep descending.
pub trait Visit {
    fn visit_decl(&mut self, decl: &Decl) {
        walk_decl(self, decl);
    }

    fn visit_stmt(&mut self, stmt: &Stmt) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &Expr) {
        walk_expr(self, expr);
    }
}

pub fn walk_unit<V: Visit + ?Sized>(visitor: &mut V, unit: &TranslationUnit) {
    for decl in &unit.decls {
        visitor.visit_decl(decl);
    }
}

pub fn walk_decl<V: Visit + ?Sized>(visitor: &mut V, decl: &Decl) {
    match decl {
        Decl::Function(func) => {
            if let Some(body) = &func.body {
                visitor.visit_stmt(body);
            }
        }
        Decl::Var(var) => {
            if let Some(init) = &var.init {
                visitor.visit_expr(&init.expr);
            }
        }
        Decl::Enum(_) | Decl::Other => {}
    }
}

pub fn walk_stmt<V: Visit + ?Sized>(visitor: &mut V, stmt: &Stmt) {
    match stmt {
        Stmt::Compound { stmts } => {
            for s in stmts {
                visitor.visit_stmt(s);
            }
        }
        Stmt::Decl { decls } => {
            for d in decls {
                visitor.visit_decl(d);
            }
        }
        Stmt::Expr { expr } => visitor.visit_expr(expr),
        Stmt::Return { value } => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        Stmt::If {
            cond,
            then,
            otherwise,
        } => {
            visitor.visit_expr(cond);
            visitor.visit_stmt(then);
            if let Some(otherwise) = otherwise {
                visitor.visit_stmt(otherwise);
            }
        }
        Stmt::While { cond, body, .. } => {
            visitor.visit_expr(cond);
            visitor.visit_stmt(body);
        }
        Stmt::DoWhile { body, cond } => {
            visitor.visit_stmt(body);
            visitor.visit_expr(cond);
        }
        Stmt::For {
            init,
            cond,
            inc,
            body,
            ..
        } => {
            if let Some(init) = init {
                visitor.visit_stmt(init);
            }
            if let Some(cond) = cond {
                visitor.visit_expr(cond);
            }
            if let Some(inc) = inc {
                visitor.visit_expr(inc);
            }
            visitor.visit_stmt(body);
        }
        Stmt::Switch { cond, body } => {
            visitor.visit_expr(cond);
            visitor.visit_stmt(body);
        }
        Stmt::Case { value, body } => {
            visitor.visit_expr(value);
            visitor.visit_stmt(body);
        }
        Stmt::Default { body } | Stmt::Label { body, .. } => visitor.visit_stmt(body),
        Stmt::Goto { .. } | Stmt::Break | Stmt::Continue | Stmt::Null => {}
    }
}

pub fn walk_expr<V: Visit + ?Sized>(visitor: &mut V, expr: &Expr) {
    match expr {
        Expr::Ref { .. } | Expr::IntLiteral { .. } | Expr::Literal { .. } => {}
        Expr::Paren { inner } => visitor.visit_expr(inner),
        Expr::Cast { operand, .. } | Expr::UnaryOp { operand, .. } => visitor.visit_expr(operand),
        Expr::BinaryOp { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Expr::Assignment { target, value } | Expr::CompoundAssignment { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            visitor.visit_expr(cond);
            visitor.visit_expr(then);
            visitor.visit_expr(otherwise);
        }
        Expr::Call { callee, args } => {
            visitor.visit_expr(callee);
            for arg in args {
                visitor.visit_expr(arg);
            }
        }
        Expr::MemberAccess { object, .. } => visitor.visit_expr(object),
        Expr::Index { base, index } => {
            visitor.visit_expr(base);
            visitor.visit_expr(index);
        }
    }
}
