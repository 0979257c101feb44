// src/syntax/parser_stmt.rs
use super::{join_tokens, DeclContext, PResult, Parser, Stuck, SPECIFIERS};
use crate::lexer::{is_builtin_type, TokenKind};
use crate::syntax::tree::{JumpKind, NodeId, NodeKind, VarDecl};

impl<'t, 'src> Parser<'t, 'src> {
    /// `{ statements }` as a `Block` under `parent`.
    pub(crate) fn parse_block(&mut self, parent: NodeId) -> PResult<NodeId> {
        self.enter()?;
        let result = self.block_inner(parent);
        self.leave();
        result
    }

    fn block_inner(&mut self, parent: NodeId) -> PResult<NodeId> {
        let open = self.expect("{")?;
        let id = self.tree.alloc(NodeKind::Block, open.span, parent);
        while !self.at_eof() && !self.at("}") {
            self.attempt(id, |p| p.parse_statement(id));
        }
        self.expect("}")?;
        self.tree.set_end(id, self.prev_end());
        Ok(id)
    }

    /// Body of a loop or branch. Failures stay local to the body.
    fn parse_substatement(&mut self, parent: NodeId) {
        self.attempt(parent, |p| p.parse_statement(parent));
    }

    pub(crate) fn parse_statement(&mut self, parent: NodeId) -> PResult<()> {
        let Some(t) = self.peek().copied() else { return Ok(()) };
        let keyword = t.kind == TokenKind::Keyword;
        match t.text {
            "{" if t.kind == TokenKind::Punct => {
                self.parse_block(parent)?;
            }
            ";" if t.kind == TokenKind::Punct => {
                self.tree.alloc(NodeKind::ExprStmt, t.span, parent);
                self.bump();
            }
            "for" if keyword => self.parse_for(parent)?,
            "while" if keyword => {
                self.bump();
                let id = self.tree.alloc(NodeKind::While, t.span, parent);
                self.expect("(")?;
                self.parse_condition(id)?;
                self.parse_substatement(id);
                self.tree.set_end(id, self.prev_end());
            }
            "do" if keyword => {
                self.bump();
                let id = self.tree.alloc(NodeKind::DoWhile, t.span, parent);
                self.parse_substatement(id);
                if !self.eat("while") {
                    return Err(Stuck("expected `while` after do body"));
                }
                self.expect("(")?;
                self.parse_expression(id, &[")"])?;
                self.expect(")")?;
                self.expect(";")?;
                self.tree.set_end(id, self.prev_end());
            }
            "if" if keyword => {
                self.bump();
                let id = self.tree.alloc(NodeKind::If, t.span, parent);
                self.eat("constexpr");
                self.eat("!");
                if self.eat("consteval") {
                    self.parse_substatement(id);
                } else {
                    self.expect("(")?;
                    self.parse_condition(id)?;
                    self.parse_substatement(id);
                }
                if self.eat("else") {
                    self.parse_substatement(id);
                }
                self.tree.set_end(id, self.prev_end());
            }
            "switch" if keyword => {
                self.bump();
                let id = self.tree.alloc(NodeKind::Switch, t.span, parent);
                self.expect("(")?;
                self.parse_condition(id)?;
                self.parse_substatement(id);
                self.tree.set_end(id, self.prev_end());
            }
            "case" if keyword => {
                while !self.at_eof() && !self.at(":") {
                    if self.at("{") || self.at(";") {
                        return Err(Stuck("malformed case label"));
                    }
                    self.bump();
                }
                self.expect_colon()?;
            }
            "default" if keyword && self.is_at(self.pos + 1, ":") => self.pos += 2,
            "try" if keyword => self.parse_try(parent)?,
            "return" | "throw" | "break" | "continue" | "goto" | "co_return" if keyword => {
                let kind = match t.text {
                    "throw" => JumpKind::Throw,
                    "break" => JumpKind::Break,
                    "continue" => JumpKind::Continue,
                    "goto" => JumpKind::Goto,
                    _ => JumpKind::Return,
                };
                self.bump();
                let id = self.tree.alloc(NodeKind::Jump(kind), t.span, parent);
                self.parse_expression(id, &[])?;
                self.expect(";")?;
                self.tree.set_end(id, self.prev_end());
            }
            "class" | "struct" | "union" if keyword => self.parse_class_or_decl(parent, DeclContext::Block)?,
            "enum" if keyword => self.skip_enum()?,
            "using" | "typedef" | "static_assert" | "asm" if keyword => self.skip_past_semicolon()?,
            "else" | "catch" if keyword => return Err(Stuck("dangling clause")),
            _ if t.is_ident() && self.is_at(self.pos + 1, ":") => {
                // Label.
                self.pos += 2;
            }
            _ if self.looks_like_declaration() => self.parse_declaration(parent, DeclContext::Block)?,
            _ => {
                let id = self.tree.alloc(NodeKind::ExprStmt, t.span, parent);
                self.parse_expression(id, &[])?;
                self.expect(";")?;
                self.tree.set_end(id, self.prev_end());
            }
        }
        Ok(())
    }

    fn expect_colon(&mut self) -> PResult<()> {
        if self.eat(":") {
            Ok(())
        } else {
            Err(Stuck("expected `:`"))
        }
    }

    /// Parenthesized condition after the `(`: optional init statements, then
    /// an expression or a declaration. Consumes the `)`.
    fn parse_condition(&mut self, parent: NodeId) -> PResult<()> {
        loop {
            if self.looks_like_declaration() {
                self.parse_declarators(parent, DeclContext::Block)?;
            } else {
                self.parse_expression(parent, &[")"])?;
            }
            if !self.eat(";") {
                break;
            }
        }
        self.expect(")")?;
        Ok(())
    }

    fn parse_try(&mut self, parent: NodeId) -> PResult<()> {
        let start = self.bump().ok_or(Stuck("unexpected end of input"))?;
        let id = self.tree.alloc(NodeKind::Try, start.span, parent);
        self.parse_block(id)?;
        while self.at("catch") {
            let kw = self.bump().ok_or(Stuck("unexpected end of input"))?;
            let clause = self.tree.alloc(NodeKind::Catch, kw.span, id);
            if !self.at("(") {
                return Err(Stuck("expected `(` after catch"));
            }
            self.parse_parameters(clause)?;
            self.parse_block(clause)?;
            self.tree.set_end(clause, self.prev_end());
        }
        self.tree.set_end(id, self.prev_end());
        Ok(())
    }

    fn parse_for(&mut self, parent: NodeId) -> PResult<()> {
        let kw = self.bump().ok_or(Stuck("unexpected end of input"))?;
        if !self.at("(") {
            return Err(Stuck("expected `(` after for"));
        }
        let open = self.pos;
        let close = self.matching(open).ok_or(Stuck("unbalanced for header"))?;
        match self.range_for_colon(open, close) {
            Some((init_end, colon)) => self.parse_range_for(parent, kw.span, init_end, colon),
            None => self.parse_classic_for(parent, kw.span),
        }
    }

    /// Locates the `:` of a range-based for header. Returns the index just
    /// past an init statement (or the `(`) and the colon index.
    fn range_for_colon(&self, open: usize, close: usize) -> Option<(usize, usize)> {
        let mut semis = Vec::new();
        let mut colon = None;
        let mut i = open + 1;
        while i < close {
            let t = self.toks[i];
            match (t.kind, t.text) {
                (TokenKind::Punct, "(" | "[" | "{") => {
                    i = self.matching(i)?;
                }
                (TokenKind::Punct, ";") => semis.push(i),
                (TokenKind::Operator, "?") => return None,
                (TokenKind::Operator, ":") if colon.is_none() => colon = Some(i),
                _ => {}
            }
            i += 1;
        }
        let colon = colon?;
        match semis.as_slice() {
            [] => Some((open + 1, colon)),
            [s] if *s < colon => Some((s + 1, colon)),
            _ => None,
        }
    }

    fn parse_range_for(
        &mut self,
        parent: NodeId,
        kw: crate::lexer::Span,
        decl_start: usize,
        colon: usize,
    ) -> PResult<()> {
        let id = self.tree.alloc(NodeKind::RangeFor { is_reference: false }, kw, parent);
        // A C++20 init statement is skipped; the loop variable stays the first child.
        self.pos = decl_start;
        let (ts, te) = self.parse_type()?;
        let ops = self.parse_ptr_ops();
        let is_reference = ops.contains('&');
        let ty = format!("{}{ops}", join_tokens(&self.toks[ts..te]));
        let (name, name_span) = if self.at("[") {
            let close = self.matching(self.pos).ok_or(Stuck("unbalanced structured binding"))?;
            let text = join_tokens(&self.toks[self.pos..=close]);
            let span = self.span_at(self.pos).join(self.span_at(close));
            self.pos = close + 1;
            (text, span)
        } else if self.at_ident() {
            let tok = self.bump().ok_or(Stuck("expected a name"))?;
            (tok.text.to_string(), tok.span)
        } else {
            return Err(Stuck("expected loop variable"));
        };
        if self.pos != colon {
            return Err(Stuck("malformed range-for declaration"));
        }
        let var_span = self.span_at(decl_start).join(name_span);
        let decl = VarDecl { name, ty, name_span, has_init: true };
        self.tree.alloc(NodeKind::Variable(decl), var_span, id);
        self.bump();
        self.parse_expression(id, &[")"])?;
        self.expect(")")?;
        self.parse_substatement(id);
        if let NodeKind::RangeFor { is_reference: r } = self.tree.kind_mut(id) {
            *r = is_reference;
        }
        self.tree.set_end(id, self.prev_end());
        Ok(())
    }

    fn parse_classic_for(&mut self, parent: NodeId, kw: crate::lexer::Span) -> PResult<()> {
        let id = self.tree.alloc(NodeKind::For, kw, parent);
        self.expect("(")?;
        if !self.eat(";") {
            if self.looks_like_declaration() {
                self.parse_declaration(id, DeclContext::Block)?;
            } else {
                self.parse_expression(id, &[])?;
                self.expect(";")?;
            }
        }
        self.parse_expression(id, &[])?;
        self.expect(";")?;
        self.parse_expression(id, &[")"])?;
        self.expect(")")?;
        self.parse_substatement(id);
        self.tree.set_end(id, self.prev_end());
        Ok(())
    }

    /// Token-level probe: specifiers, a type, declarator operators, then a
    /// name (or structured binding) followed by something only a declarator
    /// can be followed by.
    pub(crate) fn looks_like_declaration(&self) -> bool {
        let toks = self.toks;
        let at = |i: usize, s: &str| self.is_at(i, s);
        let mut i = self.pos;
        if at(i, "[") && at(i + 1, "[") {
            match self.matching(i) {
                Some(c) => i = c + 1,
                None => return false,
            }
        }
        while toks.get(i).is_some_and(|t| {
            t.kind == TokenKind::Keyword
                && (SPECIFIERS.contains(&t.text) || matches!(t.text, "struct" | "class" | "enum" | "union"))
        }) {
            i += 1;
        }
        let Some(head) = toks.get(i) else { return false };
        let mut is_auto = false;
        if head.kind == TokenKind::Keyword && is_builtin_type(head.text) {
            is_auto = head.text == "auto";
            while toks.get(i).is_some_and(|t| t.kind == TokenKind::Keyword && is_builtin_type(t.text)) {
                i += 1;
            }
        } else if head.text == "decltype" {
            match self.matching(i + 1) {
                Some(c) => i = c + 1,
                None => return false,
            }
        } else if head.is_ident() || head.text == "::" {
            if at(i, "::") {
                i += 1;
            }
            loop {
                if !toks.get(i).is_some_and(|t| t.is_ident()) {
                    return false;
                }
                i += 1;
                if at(i, "<") {
                    match self.template_close(i, false) {
                        Some(c) => i = c + 1,
                        None => return false,
                    }
                }
                if at(i, "::") {
                    i += 1;
                    continue;
                }
                break;
            }
        } else {
            return false;
        }
        while toks
            .get(i)
            .is_some_and(|t| matches!(t.text, "const" | "volatile" | "*" | "&" | "&&") && t.kind != TokenKind::Punct)
        {
            i += 1;
        }
        if at(i, "[") {
            return is_auto;
        }
        if !toks.get(i).is_some_and(|t| t.is_ident()) {
            return false;
        }
        i += 1;
        matches!(toks.get(i).map(|t| t.text), Some("=" | ";" | "(" | "{" | "[" | "," | ":"))
            && !matches!(toks.get(i).map(|t| t.kind), Some(TokenKind::Literal(_)))
    }
}
