// src/syntax/parser.rs
//! Forgiving recursive-descent parser.
//!
//! Every construct is attempted speculatively: when a parse routine gets
//! stuck, the nodes it allocated are rolled back and the tokens up to the next
//! statement or brace boundary become one `Opaque` node. Parsing never aborts.

#[path = "parser_expr.rs"]
mod expr;
#[path = "parser_stmt.rs"]
mod stmt;

use super::tree::{ClassKeyword, FunctionDecl, NodeId, NodeKind, SyntaxTree, VarDecl};
use crate::error::ParseRecoveryWarning;
use crate::lexer::{is_builtin_type, LiteralKind, Span, Token, TokenKind};
use tracing::debug;

/// Parser could not make sense of the tokens at hand.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Stuck(pub &'static str);

pub(crate) type PResult<T> = Result<T, Stuck>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeclContext {
    Namespace,
    Class,
    Block,
}

const SPECIFIERS: &[&str] = &[
    "static", "inline", "virtual", "explicit", "constexpr", "consteval", "constinit",
    "extern", "mutable", "friend", "thread_local", "register", "volatile", "const",
    "typename",
];

pub(crate) struct Parser<'t, 'src> {
    toks: &'t [Token<'src>],
    pos: usize,
    pub(crate) tree: SyntaxTree,
    pub(crate) warnings: Vec<ParseRecoveryWarning>,
    pub(crate) opaque_tokens: usize,
    depth: usize,
    max_depth: usize,
}

impl<'t, 'src> Parser<'t, 'src> {
    pub(crate) fn new(toks: &'t [Token<'src>], source_len: usize, max_depth: usize) -> Self {
        Self {
            toks,
            pos: 0,
            tree: SyntaxTree::new(source_len),
            warnings: Vec::new(),
            opaque_tokens: 0,
            depth: 0,
            max_depth,
        }
    }

    // --- token cursor ---

    pub(crate) fn peek(&self) -> Option<&Token<'src>> {
        self.toks.get(self.pos)
    }

    pub(crate) fn peek_at(&self, n: usize) -> Option<&Token<'src>> {
        self.toks.get(self.pos + n)
    }

    /// Is the token at `idx` the (non-literal) text `s`?
    pub(crate) fn is_at(&self, idx: usize, s: &str) -> bool {
        self.toks
            .get(idx)
            .is_some_and(|t| t.text == s && !matches!(t.kind, TokenKind::Literal(_)))
    }

    pub(crate) fn at(&self, s: &str) -> bool {
        self.is_at(self.pos, s)
    }

    pub(crate) fn at_ident(&self) -> bool {
        self.peek().is_some_and(Token::is_ident)
    }

    pub(crate) fn at_eof(&self) -> bool {
        self.pos >= self.toks.len()
    }

    pub(crate) fn bump(&mut self) -> Option<Token<'src>> {
        let t = self.toks.get(self.pos).copied();
        if t.is_some() {
            self.pos += 1;
        }
        t
    }

    pub(crate) fn eat(&mut self, s: &str) -> bool {
        if self.at(s) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, s: &'static str) -> PResult<Token<'src>> {
        if self.at(s) {
            self.bump().ok_or(Stuck("unexpected end of input"))
        } else {
            Err(Stuck(match s {
                ";" => "expected `;`",
                ")" => "expected `)`",
                "}" => "expected `}`",
                "]" => "expected `]`",
                "{" => "expected `{`",
                "(" => "expected `(`",
                _ => "unexpected token",
            }))
        }
    }

    pub(crate) fn span_at(&self, idx: usize) -> Span {
        self.toks.get(idx).map_or_else(
            || self.toks.last().map_or(Span::default(), |t| Span::new(t.span.end, t.span.end, t.span.line, t.span.column)),
            |t| t.span,
        )
    }

    /// End offset of the last consumed token.
    pub(crate) fn prev_end(&self) -> usize {
        self.pos.checked_sub(1).map_or(0, |i| self.toks[i].span.end)
    }

    pub(crate) fn enter(&mut self) -> PResult<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            self.depth -= 1;
            return Err(Stuck("nesting too deep"));
        }
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Index of the bracket closing the one at `open`.
    pub(crate) fn matching(&self, open: usize) -> Option<usize> {
        let mut stack: Vec<&str> = Vec::new();
        for (i, t) in self.toks.iter().enumerate().skip(open) {
            if t.kind != TokenKind::Punct {
                continue;
            }
            match t.text {
                "(" => stack.push(")"),
                "[" => stack.push("]"),
                "{" => stack.push("}"),
                ")" | "]" | "}" => {
                    if stack.pop() != Some(t.text) {
                        return None;
                    }
                    if stack.is_empty() {
                        return Some(i);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Finds the `>` closing the template argument list opened at `open`.
    /// In expression mode the list must not contain logical operators and must
    /// be followed by `(`, `{` or `::`.
    pub(crate) fn template_close(&self, open: usize, expr_mode: bool) -> Option<usize> {
        if !self.is_at(open, "<") {
            return None;
        }
        let mut depth: i32 = 0;
        let mut i = open;
        while let Some(t) = self.toks.get(i) {
            if i - open > 96 {
                return None;
            }
            match (t.kind, t.text) {
                (TokenKind::Operator, "<") => depth += 1,
                (TokenKind::Operator, ">") => depth -= 1,
                (TokenKind::Operator, ">>") => depth -= 2,
                (TokenKind::Punct, "(" | "[") => i = self.matching(i)?,
                (TokenKind::Punct, ";" | "{" | "}" | ")" | "]") => return None,
                (TokenKind::Operator, "&&" | "||" | "=" | "<<") if expr_mode => return None,
                _ => {}
            }
            if depth <= 0 {
                if expr_mode && !(self.is_at(i + 1, "(") || self.is_at(i + 1, "{") || self.is_at(i + 1, "::")) {
                    return None;
                }
                return Some(i);
            }
            i += 1;
        }
        None
    }

    // --- recovery ---

    /// Synthesizes an `Opaque` node from token `start` to the next statement
    /// or brace boundary and leaves the cursor after it.
    pub(crate) fn recover(&mut self, parent: NodeId, start: usize, reason: &'static str) {
        self.pos = start;
        let mut braces = 0usize;
        while let Some(t) = self.peek().copied() {
            if t.kind == TokenKind::Punct {
                match t.text {
                    "{" => braces += 1,
                    "}" if braces == 0 => {
                        if self.pos == start {
                            self.bump();
                        }
                        break;
                    }
                    "}" => {
                        braces -= 1;
                        if braces == 0 {
                            self.bump();
                            self.eat(";");
                            break;
                        }
                    }
                    ";" if braces == 0 => {
                        self.bump();
                        break;
                    }
                    _ => {}
                }
            }
            self.bump();
        }
        if self.pos == start {
            return;
        }
        let first = self.span_at(start);
        let span = Span::new(first.start, self.prev_end(), first.line, first.column);
        self.tree.alloc(NodeKind::Opaque { reason: reason.to_string() }, span, parent);
        self.opaque_tokens += self.pos - start;
        debug!(line = first.line, reason, "parser recovered with an opaque span");
        self.warnings.push(ParseRecoveryWarning {
            start: span.start,
            end: span.end,
            line: first.line,
            reason: reason.to_string(),
        });
    }

    /// Runs `f` speculatively under `parent`, one nesting level deeper; on
    /// failure rolls back and recovers with an opaque node.
    pub(crate) fn attempt<F>(&mut self, parent: NodeId, f: F)
    where
        F: FnOnce(&mut Self) -> PResult<()>,
    {
        let start = self.pos;
        let checkpoint = self.tree.checkpoint(parent);
        let depth = self.depth;
        let result = match self.enter() {
            Ok(()) => f(self),
            Err(stuck) => Err(stuck),
        };
        self.depth = depth;
        let reason = match result {
            Ok(()) if self.pos > start || self.at_eof() => return,
            Ok(()) => "no progress",
            Err(Stuck(reason)) => reason,
        };
        self.tree.rollback(parent, checkpoint);
        self.recover(parent, start, reason);
    }

    // --- translation unit and items ---

    pub(crate) fn parse_translation_unit(&mut self) {
        let root = self.tree.root();
        while !self.at_eof() {
            self.attempt(root, |p| p.parse_item(root, DeclContext::Namespace));
        }
    }

    /// Items until the `}` closing the current scope (not consumed).
    fn parse_items(&mut self, parent: NodeId, ctx: DeclContext) {
        while !self.at_eof() && !self.at("}") {
            self.attempt(parent, |p| p.parse_item(parent, ctx));
        }
    }

    pub(crate) fn parse_item(&mut self, parent: NodeId, ctx: DeclContext) -> PResult<()> {
        let Some(tok) = self.peek().copied() else { return Ok(()) };
        match tok.text {
            ";" => {
                self.bump();
                Ok(())
            }
            "}" => Err(Stuck("unbalanced `}`")),
            "namespace" => self.parse_namespace(parent),
            "inline" if self.is_at(self.pos + 1, "namespace") => {
                self.bump();
                self.parse_namespace(parent)
            }
            "template" => {
                self.skip_template_header()?;
                self.parse_item(parent, ctx)
            }
            "class" | "struct" | "union" => self.parse_class_or_decl(parent, ctx),
            "enum" => self.skip_enum(),
            "using" | "typedef" | "static_assert" => self.skip_past_semicolon(),
            "friend" if self.is_at(self.pos + 1, "class") || self.is_at(self.pos + 1, "struct") => {
                self.skip_past_semicolon()
            }
            "public" | "private" | "protected" if self.is_at(self.pos + 1, ":") => {
                self.pos += 2;
                Ok(())
            }
            "extern" if self.peek_at(1).is_some_and(|t| t.kind == TokenKind::Literal(LiteralKind::String)) => {
                self.pos += 2;
                if self.at("{") {
                    self.parse_linkage_block(parent)
                } else {
                    self.parse_item(parent, ctx)
                }
            }
            _ => self.parse_declaration(parent, ctx),
        }
    }

    fn parse_namespace(&mut self, parent: NodeId) -> PResult<()> {
        let start = self.expect("namespace")?.span;
        let mut name = String::new();
        while self.at_ident() || self.at("::") {
            name.push_str(self.bump().map_or("", |t| t.text));
        }
        if self.at("=") {
            return self.skip_past_semicolon();
        }
        self.expect("{")?;
        let kind = NodeKind::Namespace { name: (!name.is_empty()).then_some(name) };
        let id = self.tree.alloc(kind, start, parent);
        self.parse_items(id, DeclContext::Namespace);
        self.expect("}")?;
        self.tree.set_end(id, self.prev_end());
        Ok(())
    }

    fn parse_linkage_block(&mut self, parent: NodeId) -> PResult<()> {
        let start = self.expect("{")?.span;
        let id = self.tree.alloc(NodeKind::Namespace { name: None }, start, parent);
        self.parse_items(id, DeclContext::Namespace);
        self.expect("}")?;
        self.tree.set_end(id, self.prev_end());
        Ok(())
    }

    fn skip_template_header(&mut self) -> PResult<()> {
        self.expect("template")?;
        if self.at("<") {
            let close = self.template_close(self.pos, false).ok_or(Stuck("malformed template header"))?;
            self.pos = close + 1;
        }
        // `requires` clauses run up to the declaration they constrain.
        if self.at("requires") {
            while !self.at_eof() && !self.at("class") && !self.at("struct") && !self.at("{") && !self.at(";") {
                if self.at("(") {
                    self.pos = self.matching(self.pos).ok_or(Stuck("unbalanced requires clause"))?;
                }
                self.bump();
                if self.peek().is_some_and(|t| t.is_ident() || is_builtin_type(t.text)) && self.is_at(self.pos + 1, "(") {
                    break;
                }
            }
        }
        Ok(())
    }

    pub(crate) fn skip_enum(&mut self) -> PResult<()> {
        while !self.at_eof() && !self.at("{") && !self.at(";") {
            self.bump();
        }
        if self.at("{") {
            self.pos = self.matching(self.pos).ok_or(Stuck("unbalanced enum body"))? + 1;
        }
        self.skip_past_semicolon()
    }

    pub(crate) fn skip_past_semicolon(&mut self) -> PResult<()> {
        while let Some(t) = self.peek().copied() {
            match t.text {
                ";" => {
                    self.bump();
                    return Ok(());
                }
                "(" | "[" | "{" if t.kind == TokenKind::Punct => {
                    self.pos = self.matching(self.pos).ok_or(Stuck("unbalanced brackets"))? + 1;
                }
                "}" if t.kind == TokenKind::Punct => return Err(Stuck("expected `;`")),
                _ => {
                    self.bump();
                }
            }
        }
        Err(Stuck("unexpected end of input"))
    }

    fn skip_attributes(&mut self) -> PResult<()> {
        loop {
            if self.at("[") && self.is_at(self.pos + 1, "[") {
                self.pos = self.matching(self.pos).ok_or(Stuck("unbalanced attribute"))? + 1;
            } else if (self.at("alignas") || self.peek().is_some_and(|t| t.text == "__attribute__" || t.text == "__declspec"))
                && self.is_at(self.pos + 1, "(")
            {
                self.pos = self.matching(self.pos + 1).ok_or(Stuck("unbalanced attribute"))? + 1;
            } else {
                return Ok(());
            }
        }
    }

    pub(crate) fn parse_class_or_decl(&mut self, parent: NodeId, ctx: DeclContext) -> PResult<()> {
        let start_pos = self.pos;
        let kw_tok = self.bump().ok_or(Stuck("unexpected end of input"))?;
        let keyword = match kw_tok.text {
            "struct" => ClassKeyword::Struct,
            "union" => ClassKeyword::Union,
            _ => ClassKeyword::Class,
        };
        self.skip_attributes()?;
        let mut name = String::new();
        if self.at_ident() {
            name = self.parse_qualified_name(false)?.last;
        }
        if self.at(";") {
            // Forward declaration.
            self.bump();
            return Ok(());
        }
        if self.peek().is_some_and(|t| t.text == "final") {
            self.bump();
        }
        if self.at(":") {
            while !self.at_eof() && !self.at("{") && !self.at(";") {
                self.bump();
            }
        }
        if !self.at("{") {
            // Elaborated type specifier: `struct stat buf;`
            self.pos = start_pos;
            return self.parse_declaration(parent, ctx);
        }
        self.bump();
        let id = self.tree.alloc(NodeKind::Class { name, keyword }, kw_tok.span, parent);
        self.parse_items(id, DeclContext::Class);
        self.expect("}")?;
        self.tree.set_end(id, self.prev_end());
        // Trailing declarators (`} instance;`) carry no structure worth keeping.
        self.skip_past_semicolon()
    }

    // --- names and types ---

    /// Parses `a::b<T>::c`, `~Name`, or `operator+=`. Template arguments are
    /// kept in `text` and stripped from `last`.
    pub(crate) fn parse_qualified_name(&mut self, expr_mode: bool) -> PResult<QualifiedName> {
        let start = self.pos;
        let mut segments: Vec<String> = Vec::new();
        self.eat("::");
        loop {
            let seg = if self.at("~") && self.peek_at(1).is_some_and(Token::is_ident) {
                self.bump();
                format!("~{}", self.bump().map_or("", |t| t.text))
            } else if self.at("operator") {
                self.parse_operator_name()?
            } else if self.at_ident() {
                self.bump().map_or(String::new(), |t| t.text.to_string())
            } else {
                return Err(Stuck("expected a name"));
            };
            segments.push(seg);
            if self.at("<") {
                if let Some(close) = self.template_close(self.pos, expr_mode) {
                    self.pos = close + 1;
                }
            }
            if self.at("::") && self.peek_at(1).is_some_and(|t| t.is_ident() || t.text == "~" || t.text == "operator") {
                self.bump();
                continue;
            }
            break;
        }
        let last = segments.pop().unwrap_or_default();
        Ok(QualifiedName {
            text: join_tokens(&self.toks[start..self.pos]),
            qualifier: (!segments.is_empty()).then(|| segments.join("::")),
            last,
            start,
        })
    }

    fn parse_operator_name(&mut self) -> PResult<String> {
        self.expect_word("operator")?;
        let mut name = String::from("operator");
        if self.at("(") && self.is_at(self.pos + 1, ")") {
            self.pos += 2;
            name.push_str("()");
            return Ok(name);
        }
        let mut sep = " ";
        while let Some(t) = self.peek().copied() {
            if t.text == "(" {
                break;
            }
            if t.kind == TokenKind::Operator || t.text == "[" || t.text == "]" {
                sep = "";
            }
            name.push_str(sep);
            name.push_str(t.text);
            self.bump();
        }
        Ok(name)
    }

    fn expect_word(&mut self, w: &'static str) -> PResult<()> {
        if self.peek().is_some_and(|t| t.text == w) {
            self.bump();
            Ok(())
        } else {
            Err(Stuck("unexpected token"))
        }
    }

    /// Consumes specifiers plus a base type. Returns the token range of the type.
    pub(crate) fn parse_type(&mut self) -> PResult<(usize, usize)> {
        self.skip_attributes()?;
        let start = self.pos;
        let mut saw_base = false;
        loop {
            let Some(t) = self.peek().copied() else { break };
            if SPECIFIERS.contains(&t.text) && t.kind == TokenKind::Keyword {
                self.bump();
            } else if matches!(t.text, "struct" | "class" | "enum" | "union") && t.kind == TokenKind::Keyword {
                self.bump();
            } else if !saw_base && t.text == "decltype" {
                self.bump();
                if self.at("(") {
                    self.pos = self.matching(self.pos).ok_or(Stuck("unbalanced decltype"))? + 1;
                }
                saw_base = true;
            } else if t.kind == TokenKind::Keyword && is_builtin_type(t.text) {
                // `unsigned long long`, `long double`, ...
                self.bump();
                saw_base = true;
            } else if !saw_base && (t.is_ident() || t.text == "::") {
                self.parse_qualified_name(false)?;
                saw_base = true;
            } else {
                break;
            }
        }
        if !saw_base {
            return Err(Stuck("expected a type"));
        }
        Ok((start, self.pos))
    }

    /// Pointer/reference declarator operators following a base type.
    pub(crate) fn parse_ptr_ops(&mut self) -> String {
        let mut ops = String::new();
        while let Some(t) = self.peek().copied() {
            match t.text {
                "*" | "&" | "&&" | "..." => ops.push_str(t.text),
                "const" | "volatile" if !ops.is_empty() => {
                    ops.push(' ');
                    ops.push_str(t.text);
                }
                _ => break,
            }
            self.bump();
        }
        ops
    }

    // --- declarations ---

    /// Parses a declaration statement/item including its terminating `;`
    /// (or function body).
    pub(crate) fn parse_declaration(&mut self, parent: NodeId, ctx: DeclContext) -> PResult<()> {
        if !self.parse_declarators(parent, ctx)? {
            self.expect(";")?;
        }
        Ok(())
    }

    /// Parses a declaration up to its terminator. Returns `true` when a
    /// function was consumed, body or `;` included.
    pub(crate) fn parse_declarators(&mut self, parent: NodeId, ctx: DeclContext) -> PResult<bool> {
        self.skip_attributes()?;
        let decl_start = self.pos;
        // Constructors, destructors, and conversion operators have no return type.
        if ctx != DeclContext::Block && self.try_untyped_function(parent, decl_start)? {
            return Ok(true);
        }
        let (ty_start, ty_end) = self.parse_type()?;
        let base_ty = join_tokens(&self.toks[ty_start..ty_end]);
        let mut node_start = decl_start;
        loop {
            let ops = self.parse_ptr_ops();
            let ty = format!("{base_ty}{ops}");
            if self.at("[") {
                // Structured binding: `auto& [a, b] = ...`
                let close = self.matching(self.pos).ok_or(Stuck("unbalanced structured binding"))?;
                let name = join_tokens(&self.toks[self.pos..=close]);
                let name_span = self.span_at(self.pos).join(self.span_at(close));
                self.pos = close + 1;
                self.finish_variable(parent, node_start, VarDecl { name, ty, name_span, has_init: false })?;
            } else {
                let name = self.parse_qualified_name(false)?;
                let name_span = self.span_at(name.start).join(self.span_at(self.pos - 1));
                if self.at("(") && ctx != DeclContext::Block {
                    self.finish_function(parent, node_start, name, ty)?;
                    return Ok(true);
                }
                let decl = VarDecl { name: name.last, ty, name_span, has_init: false };
                self.finish_variable(parent, node_start, decl)?;
            }
            if !self.eat(",") {
                return Ok(false);
            }
            node_start = self.pos;
        }
    }

    fn try_untyped_function(&mut self, parent: NodeId, start: usize) -> PResult<bool> {
        let mut probe = self.pos;
        while self
            .toks
            .get(probe)
            .is_some_and(|t| t.kind == TokenKind::Keyword && matches!(t.text, "explicit" | "virtual" | "inline" | "constexpr" | "friend"))
        {
            probe += 1;
        }
        let saved = self.pos;
        self.pos = probe;
        let looks_untyped = (self.at_ident() || self.at("~") || self.at("::") || self.at("operator"))
            && self.parse_qualified_name(false).is_ok()
            && self.at("(");
        self.pos = saved;
        if !looks_untyped {
            return Ok(false);
        }
        self.pos = probe;
        let name = self.parse_qualified_name(false)?;
        self.finish_function(parent, start, name, String::new())?;
        Ok(true)
    }

    fn finish_variable(&mut self, parent: NodeId, start: usize, mut decl: VarDecl) -> PResult<()> {
        if self.at("[") {
            self.pos = self.matching(self.pos).ok_or(Stuck("unbalanced array declarator"))? + 1;
            decl.ty.push_str("[]");
        }
        if self.at(":") {
            // Bit-field width.
            self.bump();
            self.bump();
        }
        let first = self.span_at(start);
        let has_init = self.at("=") || self.at("(") || self.at("{");
        decl.has_init = has_init;
        let id = self.tree.alloc(NodeKind::Variable(decl), first, parent);
        if self.eat("=") {
            self.parse_expression(id, &[",", ";"])?;
        } else if self.at("(") || self.at("{") {
            let close_text = if self.at("(") { ")" } else { "}" };
            self.bump();
            self.parse_expression(id, &[close_text])?;
            self.expect(close_text)?;
        }
        self.tree.set_end(id, self.prev_end());
        Ok(())
    }

    fn finish_function(
        &mut self,
        parent: NodeId,
        start: usize,
        name: QualifiedName,
        return_type: String,
    ) -> PResult<()> {
        let decl = FunctionDecl {
            name: name.last,
            qualifier: name.qualifier,
            return_type,
            has_body: false,
        };
        let id = self.tree.alloc(NodeKind::Function(decl), self.span_at(start), parent);
        self.parse_parameters(id)?;
        self.skip_function_suffix()?;
        if self.eat(":") {
            self.parse_member_initializers(id)?;
        }
        if self.at("{") {
            self.parse_block(id)?;
            if let NodeKind::Function(f) = self.tree.kind_mut(id) {
                f.has_body = true;
            }
        } else if self.at("try") {
            return Err(Stuck("function-try-block"));
        } else {
            self.expect(";")?;
        }
        self.tree.set_end(id, self.prev_end());
        Ok(())
    }

    /// `( params )`, each parameter becoming a `Parameter` node.
    pub(crate) fn parse_parameters(&mut self, parent: NodeId) -> PResult<()> {
        let open = self.pos;
        let close = self.matching(open).ok_or(Stuck("unbalanced parameter list"))?;
        let mut piece_start = open + 1;
        let mut i = open + 1;
        while i <= close {
            let t = self.toks[i];
            if t.kind == TokenKind::Punct && matches!(t.text, "(" | "[" | "{") {
                i = self.matching(i).ok_or(Stuck("unbalanced parameter list"))? + 1;
                continue;
            }
            if t.text == "<" {
                if let Some(c) = self.template_close(i, false) {
                    i = c + 1;
                    continue;
                }
            }
            if i == close || (t.kind == TokenKind::Punct && t.text == ",") {
                self.push_parameter(parent, piece_start, i);
                piece_start = i + 1;
            }
            i += 1;
        }
        self.pos = close + 1;
        Ok(())
    }

    fn push_parameter(&mut self, parent: NodeId, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let mut decl_end = end;
        for (k, t) in self.toks[start..end].iter().enumerate() {
            if t.text == "=" && t.kind == TokenKind::Operator {
                decl_end = start + k;
                break;
            }
        }
        let toks = &self.toks[start..decl_end];
        if toks.is_empty() || (toks.len() == 1 && (toks[0].text == "void" || toks[0].text == "...")) {
            return;
        }
        let mut name_idx = toks.len().saturating_sub(1);
        if toks[name_idx].text == "]" {
            name_idx = toks.iter().rposition(|t| t.text == "[").map_or(0, |p| p.saturating_sub(1));
        }
        let named = toks.len() > 1
            && toks[name_idx].is_ident()
            && name_idx > 0
            && toks[name_idx - 1].text != "::";
        let (name, ty, name_span) = if named {
            (toks[name_idx].text.to_string(), join_tokens(&toks[..name_idx]), toks[name_idx].span)
        } else {
            (String::new(), join_tokens(toks), toks[0].span)
        };
        let span = toks[0].span.join(self.toks[end - 1].span);
        self.tree.alloc(NodeKind::Parameter(VarDecl { name, ty, name_span, has_init: decl_end != end }), span, parent);
    }

    fn skip_function_suffix(&mut self) -> PResult<()> {
        while let Some(t) = self.peek().copied() {
            match t.text {
                "const" | "volatile" | "&" | "&&" | "override" | "final" | "mutable" | "constexpr" => {
                    self.bump();
                }
                "noexcept" | "throw" | "requires" => {
                    self.bump();
                    if self.at("(") {
                        self.pos = self.matching(self.pos).ok_or(Stuck("unbalanced specifier"))? + 1;
                    }
                }
                "->" => {
                    self.bump();
                    self.parse_type()?;
                    self.parse_ptr_ops();
                }
                "=" => {
                    // `= 0`, `= default`, `= delete`
                    self.bump();
                    self.bump();
                }
                "[" if self.is_at(self.pos + 1, "[") => self.skip_attributes()?,
                _ => return Ok(()),
            }
        }
        Ok(())
    }

    /// Constructor member initializers: `: a(x), b{y}`.
    fn parse_member_initializers(&mut self, parent: NodeId) -> PResult<()> {
        while !self.at_eof() && !self.at("{") {
            self.parse_postfix_chain(parent)?;
            if !self.eat(",") {
                break;
            }
        }
        if self.at("{") {
            Ok(())
        } else {
            Err(Stuck("malformed member initializer list"))
        }
    }
}

/// Result of [`Parser::parse_qualified_name`].
#[derive(Debug, Clone)]
pub(crate) struct QualifiedName {
    /// Full normalized text, template arguments included.
    pub text: String,
    pub qualifier: Option<String>,
    pub last: String,
    /// Token index the name starts at.
    pub start: usize,
}

/// Joins token texts, spacing only between adjacent words.
#[must_use]
pub(crate) fn join_tokens(toks: &[Token<'_>]) -> String {
    let mut out = String::new();
    let mut prev_word = false;
    for t in toks {
        let word = matches!(t.kind, TokenKind::Identifier | TokenKind::Keyword | TokenKind::Literal(_));
        if word && prev_word {
            out.push(' ');
        }
        out.push_str(t.text);
        prev_word = word;
    }
    out
}

/// Removes `<...>` groups: `std::make_unique<T>` becomes `std::make_unique`.
#[must_use]
pub(crate) fn strip_template_args(text: &str) -> String {
    if text.starts_with("operator") {
        return text.to_string();
    }
    let mut depth = 0usize;
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => depth += 1,
            '>' if depth > 0 => depth -= 1,
            _ if depth == 0 => out.push(c),
            _ => {}
        }
    }
    out
}
