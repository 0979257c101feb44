// src/syntax/mod.rs
//! Structural parser: turns significant tokens into a [`SyntaxTree`].
//!
//! The tree models declarations, statements, and the handful of expression
//! shapes the analyses need. Anything the parser cannot structure becomes an
//! `Opaque` node and a [`ParseRecoveryWarning`]; parsing itself never fails.

mod parser;
pub mod tree;

pub use tree::{
    Call, Capture, CaptureKind, ClassKeyword, FunctionDecl, JumpKind, Lambda, MemberAccess, NameRef,
    Node, NodeId, NodeKind, SyntaxTree, VarDecl,
};

use crate::error::ParseRecoveryWarning;
use crate::lexer::Lexed;

/// Default nesting limit for blocks and parenthesized expressions.
pub const DEFAULT_MAX_NESTING: usize = 256;

#[derive(Debug, Clone)]
pub struct Parsed {
    pub tree: SyntaxTree,
    pub warnings: Vec<ParseRecoveryWarning>,
    /// Significant tokens swallowed by opaque nodes.
    pub opaque_tokens: usize,
    pub total_tokens: usize,
}

impl Parsed {
    /// Share of significant tokens the parser could not structure.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn opaque_ratio(&self) -> f64 {
        if self.total_tokens == 0 {
            return 0.0;
        }
        self.opaque_tokens as f64 / self.total_tokens as f64
    }
}

/// Parses a lexed unit. `source_len` is the byte length of the text the
/// tokens came from; the root node spans all of it.
#[must_use]
pub fn parse(lexed: &Lexed<'_>, source_len: usize, max_nesting: usize) -> Parsed {
    let toks = lexed.significant();
    let mut p = parser::Parser::new(&toks, source_len, max_nesting.max(1));
    p.parse_translation_unit();
    Parsed {
        tree: p.tree,
        warnings: p.warnings,
        opaque_tokens: p.opaque_tokens,
        total_tokens: toks.len(),
    }
}

/// Lexes and parses `src` in one step.
#[must_use]
pub fn parse_source(src: &str) -> Parsed {
    let lexed = crate::lexer::Lexer::tokenize(src);
    parse(&lexed, src.len(), DEFAULT_MAX_NESTING)
}

#[cfg(test)]
#[path = "parser_test.rs"]
mod tests;
