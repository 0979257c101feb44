// src/lexer/mod.rs
//! Lexer for C++ source text.
//!
//! Produces a lazy stream of classified tokens. Whitespace is dropped; every
//! other byte of the input lands in exactly one token, comments and
//! preprocessor lines included. Malformed literals and comments are recorded
//! as [`LexError`]s and the offending bytes (up to end of line, or end of file
//! for block comments and raw strings) become a single `Invalid` token, so
//! lexing always runs to the end of the buffer.

mod token;

pub use token::{is_builtin_type, is_keyword, LiteralKind, Span, Token, TokenKind};

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LexErrorKind {
    UnterminatedString,
    UnterminatedChar,
    UnterminatedRawString,
    UnterminatedBlockComment,
    StrayCharacter,
}

impl LexErrorKind {
    fn describe(self) -> &'static str {
        match self {
            Self::UnterminatedString => "unterminated string literal",
            Self::UnterminatedChar => "unterminated character literal",
            Self::UnterminatedRawString => "unterminated raw string literal",
            Self::UnterminatedBlockComment => "unterminated block comment",
            Self::StrayCharacter => "stray character",
        }
    }
}

/// A malformed token. `offset` is where the construct began.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("{} at {line}:{column} (offset {offset})", .kind.describe())]
pub struct LexError {
    pub kind: LexErrorKind,
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

/// Result of draining a [`Lexer`].
#[derive(Debug, Clone, Default)]
pub struct Lexed<'src> {
    pub tokens: Vec<Token<'src>>,
    pub errors: Vec<LexError>,
}

impl<'src> Lexed<'src> {
    /// Tokens the parser consumes: comments and directives filtered out.
    #[must_use]
    pub fn significant(&self) -> Vec<Token<'src>> {
        self.tokens.iter().copied().filter(|t| !t.is_trivia()).collect()
    }
}

/// Lazy, restartable token stream. Cloning a lexer restarts nothing; create a
/// new one with [`Lexer::new`] to start over from the top.
#[derive(Debug, Clone)]
pub struct Lexer<'src> {
    src: &'src str,
    pos: usize,
    line: usize,
    column: usize,
    line_start: bool,
    errors: Vec<LexError>,
}

impl<'src> Lexer<'src> {
    #[must_use]
    pub fn new(src: &'src str) -> Self {
        Self { src, pos: 0, line: 1, column: 1, line_start: true, errors: Vec::new() }
    }

    /// Lexes the whole buffer.
    #[must_use]
    pub fn tokenize(src: &'src str) -> Lexed<'src> {
        let mut lexer = Self::new(src);
        let tokens: Vec<Token<'src>> = lexer.by_ref().collect();
        Lexed { tokens, errors: lexer.errors }
    }

    /// Errors seen so far.
    #[must_use]
    pub fn errors(&self) -> &[LexError] {
        &self.errors
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn rest(&self) -> &'src str {
        &self.src[self.pos..]
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
            self.line_start = true;
        } else {
            self.column += 1;
            if !c.is_whitespace() {
                self.line_start = false;
            }
        }
        Some(c)
    }

    fn bump_n(&mut self, n: usize) {
        for _ in 0..n {
            if self.bump().is_none() {
                break;
            }
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    /// Advances to (not past) the next newline.
    fn skip_to_eol(&mut self) {
        while self.peek().is_some_and(|c| c != '\n') {
            self.bump();
        }
    }

    fn skip_to_eof(&mut self) {
        while self.bump().is_some() {}
    }

    fn error(&mut self, kind: LexErrorKind, start: Span) {
        self.errors.push(LexError {
            kind,
            offset: start.start,
            line: start.line,
            column: start.column,
        });
    }

    fn lex_line_comment(&mut self) -> TokenKind {
        self.skip_to_eol();
        TokenKind::Comment
    }

    fn lex_block_comment(&mut self, start: Span) -> TokenKind {
        self.bump_n(2);
        while !self.rest().is_empty() {
            if self.rest().starts_with("*/") {
                self.bump_n(2);
                return TokenKind::Comment;
            }
            self.bump();
        }
        self.error(LexErrorKind::UnterminatedBlockComment, start);
        TokenKind::Invalid
    }

    fn lex_directive(&mut self) -> TokenKind {
        loop {
            self.skip_to_eol();
            // A trailing backslash continues the directive onto the next line.
            let body = self.src[..self.pos].trim_end_matches([' ', '\t', '\r']);
            if body.ends_with('\\') && self.peek() == Some('\n') {
                self.bump();
                continue;
            }
            break;
        }
        // Keep the token free of trailing whitespace so spans stay tight.
        let trimmed = self.src[..self.pos].trim_end().len();
        let overshoot = self.pos - trimmed;
        if overshoot > 0 && !self.src[trimmed..self.pos].contains('\n') {
            self.pos = trimmed;
            self.column -= self.src[trimmed..trimmed + overshoot].chars().count();
        }
        TokenKind::Directive
    }

    fn lex_quoted(&mut self, quote: char, start: Span) -> TokenKind {
        self.bump();
        while let Some(c) = self.peek() {
            match c {
                // The escaped char may be a newline (line continuation).
                '\\' => self.bump_n(2),
                '\n' => break,
                c if c == quote => {
                    self.bump();
                    return TokenKind::Literal(if quote == '"' {
                        LiteralKind::String
                    } else {
                        LiteralKind::Char
                    });
                }
                _ => {
                    self.bump();
                }
            }
        }
        let kind = if quote == '"' {
            LexErrorKind::UnterminatedString
        } else {
            LexErrorKind::UnterminatedChar
        };
        self.error(kind, start);
        self.skip_to_eol();
        TokenKind::Invalid
    }

    /// Raw string: `R"delim( ... )delim"`. The cursor sits on the opening quote.
    fn lex_raw_string(&mut self, start: Span) -> TokenKind {
        self.bump();
        let delim_start = self.pos;
        while self.peek().is_some_and(|c| c != '(' && c != '\n' && c != '"') {
            self.bump();
        }
        if self.peek() != Some('(') {
            self.error(LexErrorKind::UnterminatedRawString, start);
            self.skip_to_eol();
            return TokenKind::Invalid;
        }
        let closing = format!("){}\"", &self.src[delim_start..self.pos]);
        self.bump();
        match self.rest().find(&closing) {
            Some(idx) => {
                let target = self.pos + idx + closing.len();
                while self.pos < target {
                    self.bump();
                }
                TokenKind::Literal(LiteralKind::String)
            }
            None => {
                self.error(LexErrorKind::UnterminatedRawString, start);
                self.skip_to_eof();
                TokenKind::Invalid
            }
        }
    }

    fn lex_number(&mut self) -> TokenKind {
        let mut prev = '\0';
        while let Some(c) = self.peek() {
            let digit_sep = c == '\''
                && self.peek_at(1).is_some_and(|n| n.is_ascii_alphanumeric());
            let exponent_sign = matches!(c, '+' | '-') && matches!(prev, 'e' | 'E' | 'p' | 'P');
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' || digit_sep || exponent_sign {
                prev = c;
                self.bump();
            } else {
                break;
            }
        }
        TokenKind::Literal(LiteralKind::Number)
    }

    fn lex_word(&mut self, start: Span) -> TokenKind {
        while self.peek().is_some_and(|c| c.is_alphanumeric() || c == '_') {
            self.bump();
        }
        let word = &self.src[start.start..self.pos];
        match (word, self.peek()) {
            ("R" | "LR" | "uR" | "UR" | "u8R", Some('"')) => self.lex_raw_string(start),
            ("L" | "u" | "U" | "u8", Some(q @ ('"' | '\''))) => self.lex_quoted(q, start),
            _ if is_keyword(word) => TokenKind::Keyword,
            _ => TokenKind::Identifier,
        }
    }

    fn lex_symbol(&mut self, c: char, start: Span) -> TokenKind {
        if token::PUNCT.contains(&c) {
            self.bump();
            return TokenKind::Punct;
        }
        if let Some(op) = token::OPERATORS.iter().find(|op| self.rest().starts_with(**op)) {
            self.bump_n(op.chars().count());
            return TokenKind::Operator;
        }
        self.bump();
        self.error(LexErrorKind::StrayCharacter, start);
        TokenKind::Invalid
    }

    fn next_kind(&mut self, c: char, start: Span, at_line_start: bool) -> TokenKind {
        let rest = self.rest();
        if rest.starts_with("//") {
            return self.lex_line_comment();
        }
        if rest.starts_with("/*") {
            return self.lex_block_comment(start);
        }
        if c == '#' && at_line_start {
            return self.lex_directive();
        }
        if c == '"' || c == '\'' {
            return self.lex_quoted(c, start);
        }
        if c.is_ascii_digit() || (c == '.' && self.peek_at(1).is_some_and(|n| n.is_ascii_digit())) {
            return self.lex_number();
        }
        if c.is_alphabetic() || c == '_' {
            return self.lex_word(start);
        }
        self.lex_symbol(c, start)
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Token<'src>> {
        self.skip_whitespace();
        let c = self.peek()?;
        let at_line_start = self.line_start;
        let start = Span::new(self.pos, self.pos, self.line, self.column);
        let kind = self.next_kind(c, start, at_line_start);
        let span = Span::new(start.start, self.pos, start.line, start.column);
        Some(Token { kind, text: &self.src[span.start..span.end], span })
    }
}

#[cfg(test)]
#[path = "lexer_test.rs"]
mod tests;
