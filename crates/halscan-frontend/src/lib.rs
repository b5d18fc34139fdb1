//! halscan Frontend interface
//!
//! What the engine consumes from the compiler frontend: a resolved syntax
//! tree, the macro expansions seen by the preprocessor and a service mapping
//! raw positions back to files.
//!
//! ## Modules
//!
//! - `ast` - Tagged-variant syntax tree and the `Visit` walker
//! - `macros` - Macro expansion events and preprocessing tokens
//! - `source` - Location resolution
//! - `dump` - JSON dumps of a whole translation unit

pub mod ast;
pub mod dump;
pub mod macros;
pub mod source;

pub use ast::{Decl, Expr, Stmt, TranslationUnit, Visit};
pub use dump::TuDump;
pub use macros::{MacroExpansion, Token, TokenKind};
pub use source::{LocationTable, SourceResolver};

#[cfg(test)]
mod tests;
