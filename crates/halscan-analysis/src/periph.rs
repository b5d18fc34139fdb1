//! Peripheral register-block struct names
//!
//! Vendor headers expose peripherals as object-like macros casting a base
//! address to a struct pointer:
//!
//! ```c
//! #define USART1 ((USART_TypeDef *) USART1_BASE)
//! ```
//!
//! The matcher walks the replacement list of every such expansion and
//! captures the struct type name.

use halscan_frontend::{MacroExpansion, Token, TokenKind};
use std::collections::BTreeSet;
use tracing::debug;

/// Position in `( ( IDENT * ) ADDR )`
#[derive(Debug, Clone, PartialEq, Eq)]
enum State {
    Begin,
    FirstLParen,
    SecondLParen,
    TypeName(String),
    Star(String),
    FirstRParen(String),
    Addr(String),
    Accept(String),
}

impl State {
    /// Next state after `token`, or `None` if the pattern breaks
    fn step(self, token: &Token) -> Option<State> {
        use TokenKind::*;
        let next = match (self, token.kind) {
            (State::Begin, LParen) => State::FirstLParen,
            (State::FirstLParen, LParen) => State::SecondLParen,
            (State::SecondLParen, Identifier) => State::TypeName(token.spelling.clone()),
            (State::TypeName(name), Star) => State::Star(name),
            (State::Star(name), RParen) => State::FirstRParen(name),
            (State::FirstRParen(name), NumericConstant | Identifier) => State::Addr(name),
            (State::Addr(name), RParen) => State::Accept(name),
            _ => return None,
        };
        Some(next)
    }
}

/// Match one replacement list, returning the struct name on success
pub fn match_address_cast(tokens: &[Token]) -> Option<String> {
    let mut state = State::Begin;
    for token in tokens {
        state = state.step(token)?;
        // whatever follows the closing parenthesis is not looked at
        if let State::Accept(name) = state {
            return Some(name);
        }
    }
    None
}

/// Accumulates struct names over the macro expansions of a TU
#[derive(Debug, Default)]
pub struct PeriphStructNameExtractor {
    names: BTreeSet<String>,
}

impl PeriphStructNameExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one expansion event
    pub fn macro_expands(&mut self, expansion: &MacroExpansion) {
        if expansion.params > 0 || expansion.args > 0 {
            return;
        }
        if !expansion.name.is(TokenKind::Identifier) || expansion.replacement.is_empty() {
            return;
        }
        if let Some(name) = match_address_cast(&expansion.replacement) {
            debug!("Macro {} names peripheral struct {}", expansion.name.spelling, name);
            self.names.insert(name);
        }
    }

    pub fn into_names(self) -> BTreeSet<String> {
        self.names
    }
}
