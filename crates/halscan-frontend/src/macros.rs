//! Macro expansion events reported by the preprocessor

use serde::{Deserialize, Serialize};

/// Preprocessing token kinds the engine distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    LParen,
    RParen,
    Star,
    Identifier,
    NumericConstant,
    Keyword,
    /// Any other punctuator
    Punct,
    /// String and character literals, stray characters
    Other,
}

const KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Bool", "_Atomic", "_Noreturn",
    "_Alignas", "_Alignof", "_Static_assert", "_Thread_local",
];

/// A preprocessing token with its spelling.
///
/// Serialized as the bare spelling; the kind is recovered on load.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Token {
    pub kind: TokenKind,
    pub spelling: String,
}

impl Token {
    pub fn new(kind: TokenKind, spelling: impl Into<String>) -> Self {
        Self {
            kind,
            spelling: spelling.into(),
        }
    }

    /// Classify a single token spelling
    pub fn from_spelling(spelling: impl Into<String>) -> Self {
        let spelling = spelling.into();
        let kind = classify(&spelling);
        Self { kind, spelling }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }
}

impl From<String> for Token {
    fn from(spelling: String) -> Self {
        Token::from_spelling(spelling)
    }
}

impl From<Token> for String {
    fn from(token: Token) -> Self {
        token.spelling
    }
}

fn classify(spelling: &str) -> TokenKind {
    let mut chars = spelling.chars();
    let Some(first) = chars.next() else {
        return TokenKind::Other;
    };
    match first {
        '(' if spelling.len() == 1 => TokenKind::LParen,
        ')' if spelling.len() == 1 => TokenKind::RParen,
        '*' if spelling.len() == 1 => TokenKind::Star,
        '0'..='9' => TokenKind::NumericConstant,
        '.' if chars.next().is_some_and(|c| c.is_ascii_digit()) => TokenKind::NumericConstant,
        c if c == '_' || c.is_ascii_alphabetic() => {
            if !spelling.chars().all(|c| c == '_' || c.is_ascii_alphanumeric()) {
                TokenKind::Other
            } else if KEYWORDS.contains(&spelling) {
                TokenKind::Keyword
            } else {
                TokenKind::Identifier
            }
        }
        '"' | '\'' => TokenKind::Other,
        c if c.is_ascii_punctuation() => TokenKind::Punct,
        _ => TokenKind::Other,
    }
}

/// Split a replacement list written as source text into tokens.
///
/// Enough for object-like macro bodies: identifiers, numbers, single-character
/// punctuators and quoted literals.
pub fn tokenize(text: &str) -> Vec<Token> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;
        if c == b'_' || c.is_ascii_alphanumeric() || (c == b'.' && next_is_digit(bytes, i)) {
            // pp-numbers swallow suffixes and hex digits the same way identifiers do
            while i < bytes.len() && (bytes[i] == b'_' || bytes[i] == b'.' || bytes[i].is_ascii_alphanumeric()) {
                if bytes[i] == b'.' && !c.is_ascii_digit() && c != b'.' {
                    break;
                }
                i += 1;
            }
        } else if c == b'"' || c == b'\'' {
            i += 1;
            while i < bytes.len() && bytes[i] != c {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            i = (i + 1).min(bytes.len());
        } else {
            i += text[i..].chars().next().map_or(1, char::len_utf8);
        }
        tokens.push(Token::from_spelling(&text[start..i]));
    }
    tokens
}

fn next_is_digit(bytes: &[u8], i: usize) -> bool {
    bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit())
}

/// One expansion of a macro at a use site
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroExpansion {
    /// Name token of the expanded macro
    pub name: Token,
    /// Parameters in the macro definition
    #[serde(default)]
    pub params: usize,
    /// Arguments supplied at the use site
    #[serde(default)]
    pub args: usize,
    /// Replacement list from the definition
    pub replacement: Vec<Token>,
}

impl MacroExpansion {
    /// Expansion of an object-like macro
    pub fn object_like(name: &str, replacement: &str) -> Self {
        Self {
            name: Token::from_spelling(name),
            params: 0,
            args: 0,
            replacement: tokenize(replacement),
        }
    }

    /// Expansion of a function-like macro
    pub fn function_like(name: &str, params: usize, args: usize, replacement: &str) -> Self {
        Self {
            name: Token::from_spelling(name),
            params,
            args,
            replacement: tokenize(replacement),
        }
    }
}
