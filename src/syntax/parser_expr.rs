// src/syntax/parser_expr.rs
//! Expression scanning.
//!
//! Expressions are not parsed into precedence trees. The scanner walks the
//! tokens flatly and only builds nodes the analyses consume: names, member
//! accesses, calls, subscripts, lambdas, and `new`/`delete`.

use super::{join_tokens, strip_template_args, PResult, Parser, Stuck};
use crate::lexer::{Span, TokenKind};
use crate::syntax::tree::{Call, Capture, CaptureKind, Lambda, MemberAccess, NameRef, NodeId, NodeKind};

const ASSIGN_OPS: &[&str] = &["=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>="];

const CASTS: &[&str] = &["static_cast", "dynamic_cast", "const_cast", "reinterpret_cast"];

const UNEVALUATED: &[&str] = &["sizeof", "alignof", "decltype", "typeid", "noexcept"];

impl<'t, 'src> Parser<'t, 'src> {
    /// Scans an expression under `parent` up to, not including, one of
    /// `terms` at depth zero. Closing brackets and `;` always end the scan.
    pub(crate) fn parse_expression(&mut self, parent: NodeId, terms: &[&str]) -> PResult<()> {
        self.enter()?;
        let result = self.scan_expression(parent, terms);
        self.leave();
        result
    }

    fn scan_expression(&mut self, parent: NodeId, terms: &[&str]) -> PResult<()> {
        let mut last_chain: Option<NodeId> = None;
        let mut pending_write = false;
        while let Some(t) = self.peek().copied() {
            let structural = matches!(t.kind, TokenKind::Punct | TokenKind::Operator);
            if structural && terms.contains(&t.text) {
                return Ok(());
            }
            if t.kind == TokenKind::Punct {
                match t.text {
                    ";" | "}" | ")" | "]" => return Ok(()),
                    "(" | "{" => {
                        let close = if t.text == "(" { ")" } else { "}" };
                        self.bump();
                        self.parse_expression(parent, &[close])?;
                        self.expect(close)?;
                    }
                    "[" if self.lambda_starts_here() => {
                        self.parse_lambda(parent)?;
                    }
                    "[" => {
                        self.bump();
                        self.parse_expression(parent, &["]"])?;
                        self.expect("]")?;
                    }
                    _ => {
                        self.bump();
                    }
                }
                last_chain = None;
                continue;
            }
            match t.text {
                "new" if t.kind == TokenKind::Keyword => {
                    self.parse_new(parent)?;
                    last_chain = None;
                }
                "delete" if t.kind == TokenKind::Keyword => {
                    self.parse_delete(parent)?;
                    last_chain = None;
                }
                kw if t.kind == TokenKind::Keyword && CASTS.contains(&kw) => {
                    self.bump();
                    if let Some(close) = self.template_close(self.pos, false) {
                        self.pos = close + 1;
                    }
                    last_chain = None;
                }
                kw if t.kind == TokenKind::Keyword && UNEVALUATED.contains(&kw) => {
                    self.bump();
                    self.eat("...");
                    if self.at("(") {
                        self.pos = self.matching(self.pos).ok_or(Stuck("unbalanced parentheses"))? + 1;
                    }
                    last_chain = None;
                }
                "this" | "::" => {
                    let chain = self.parse_postfix_chain(parent)?;
                    if std::mem::take(&mut pending_write) {
                        self.mark_write(chain);
                    }
                    last_chain = Some(chain);
                }
                _ if t.is_ident() => {
                    let chain = self.parse_postfix_chain(parent)?;
                    if std::mem::take(&mut pending_write) {
                        self.mark_write(chain);
                    }
                    last_chain = Some(chain);
                }
                op if t.kind == TokenKind::Operator && ASSIGN_OPS.contains(&op) => {
                    if let Some(chain) = last_chain.take() {
                        self.mark_write(chain);
                    }
                    self.bump();
                }
                "++" | "--" if t.kind == TokenKind::Operator => {
                    // Postfix forms are consumed by the chain; this one is prefix.
                    pending_write = true;
                    self.bump();
                }
                _ => {
                    self.bump();
                    last_chain = None;
                }
            }
        }
        Ok(())
    }

    /// A `[` opens a lambda unless it follows something subscriptable and the
    /// bracket is followed by a parameter list, body, or specifier.
    fn lambda_starts_here(&self) -> bool {
        let prev_subscriptable = self.pos.checked_sub(1).and_then(|i| self.toks.get(i)).is_some_and(|p| {
            p.is_ident()
                || matches!(p.kind, TokenKind::Literal(_))
                || matches!(p.text, ")" | "]" | "this")
        });
        if prev_subscriptable {
            return false;
        }
        let Some(close) = self.matching(self.pos) else { return false };
        self.toks
            .get(close + 1)
            .is_some_and(|n| matches!(n.text, "(" | "{" | "<" | "mutable" | "->" | "constexpr" | "noexcept"))
    }

    fn parse_lambda(&mut self, parent: NodeId) -> PResult<NodeId> {
        let open = self.pos;
        let close = self.matching(open).ok_or(Stuck("unbalanced lambda captures"))?;
        let captures = self.parse_captures(open + 1, close);
        let id = self.tree.alloc(NodeKind::Lambda(Lambda { captures }), self.span_at(open), parent);
        self.pos = close + 1;
        if let Some(tclose) = self.template_close(self.pos, false) {
            self.pos = tclose + 1;
        }
        if self.at("(") {
            self.parse_parameters(id)?;
        }
        while let Some(t) = self.peek().copied() {
            match t.text {
                "mutable" | "constexpr" | "consteval" => {
                    self.bump();
                }
                "noexcept" => {
                    self.bump();
                    if self.at("(") {
                        self.pos = self.matching(self.pos).ok_or(Stuck("unbalanced noexcept"))? + 1;
                    }
                }
                "->" => {
                    self.bump();
                    self.parse_type()?;
                    self.parse_ptr_ops();
                }
                _ => break,
            }
        }
        if !self.at("{") {
            return Err(Stuck("expected lambda body"));
        }
        self.parse_block(id)?;
        self.tree.set_end(id, self.prev_end());
        Ok(id)
    }

    fn parse_captures(&self, from: usize, to: usize) -> Vec<Capture> {
        let mut captures = Vec::new();
        let mut piece_start = from;
        let mut i = from;
        while i <= to {
            let at_end = i == to;
            if !at_end && self.toks[i].kind == TokenKind::Punct && matches!(self.toks[i].text, "(" | "{" | "[") {
                i = self.matching(i).map_or(to, |c| c + 1);
                continue;
            }
            if at_end || self.toks[i].text == "," {
                if let Some(c) = capture_from(&self.toks[piece_start..i]) {
                    captures.push(c);
                }
                piece_start = i + 1;
            }
            i += 1;
        }
        captures
    }

    /// Primary name (or `this`) plus member, call, and subscript suffixes.
    /// Returns the outermost node of the chain. Every suffix wraps the chain
    /// one level deeper and is charged against the nesting limit.
    pub(crate) fn parse_postfix_chain(&mut self, parent: NodeId) -> PResult<NodeId> {
        let depth = self.depth;
        let result = self.postfix_chain(parent);
        self.depth = depth;
        result
    }

    fn postfix_chain(&mut self, parent: NodeId) -> PResult<NodeId> {
        let start = self.pos;
        let first = self.span_at(start);
        let mut text = if self.at("this") {
            self.bump();
            String::from("this")
        } else {
            strip_template_args(&self.parse_qualified_name(true)?.text)
        };
        let span = Span::new(first.start, self.prev_end(), first.line, first.column);
        let mut node = self.tree.alloc(NodeKind::Name(NameRef { name: text.clone(), is_write: false }), span, parent);
        let mut receiver: Option<String> = None;
        let mut method = text.rsplit("::").next().unwrap_or(&text).to_string();
        loop {
            if self.at("(") {
                self.enter()?;
                let call = Call { callee: text.clone(), receiver: receiver.take(), method: method.clone() };
                node = self.tree.wrap(node, NodeKind::Call(call));
                self.bump();
                self.parse_expression(node, &[")"])?;
                self.expect(")")?;
                self.tree.set_end(node, self.prev_end());
                text.push_str("()");
            } else if self.at(".") || self.at("->") {
                self.enter()?;
                let arrow = self.at("->");
                let op = if arrow { "->" } else { "." };
                self.bump();
                self.eat("template");
                let member = self.parse_qualified_name(true)?.last;
                let access = MemberAccess { base: text.clone(), member: member.clone(), arrow, is_write: false };
                node = self.tree.wrap(node, NodeKind::MemberAccess(access));
                self.tree.set_end(node, self.prev_end());
                receiver = Some(text.clone());
                text = format!("{text}{op}{member}");
                method = member;
            } else if self.at("[") && !self.is_at(self.pos + 1, "[") {
                self.enter()?;
                node = self.tree.wrap(node, NodeKind::Subscript);
                self.bump();
                self.parse_expression(node, &["]"])?;
                self.expect("]")?;
                self.tree.set_end(node, self.prev_end());
                text.push_str("[]");
                receiver = None;
            } else if self.at("{") && matches!(self.tree.kind(node), NodeKind::Name(_)) {
                // Functional construction: `Point{1, 2}`.
                self.enter()?;
                let call = Call { callee: text.clone(), receiver: None, method: method.clone() };
                node = self.tree.wrap(node, NodeKind::Call(call));
                self.bump();
                self.parse_expression(node, &["}"])?;
                self.expect("}")?;
                self.tree.set_end(node, self.prev_end());
                text.push_str("{}");
            } else if self.at("++") || self.at("--") {
                self.mark_write(node);
                self.bump();
                break;
            } else {
                break;
            }
        }
        Ok(node)
    }

    /// Flags the storage an assignment targets: the name or member at the
    /// end of the chain, looking through subscripts.
    fn mark_write(&mut self, mut node: NodeId) {
        while matches!(self.tree.kind(node), NodeKind::Subscript) {
            match self.tree.children(node).first() {
                Some(&base) => node = base,
                None => return,
            }
        }
        match self.tree.kind_mut(node) {
            NodeKind::Name(n) => n.is_write = true,
            NodeKind::MemberAccess(m) => m.is_write = true,
            _ => {}
        }
    }

    fn parse_new(&mut self, parent: NodeId) -> PResult<NodeId> {
        let start = self.pos;
        self.bump();
        let mut placement = false;
        if self.at("(") {
            let close = self.matching(self.pos).ok_or(Stuck("unbalanced placement arguments"))?;
            placement = true;
            self.pos = close + 1;
        }
        let (ts, te) = self.parse_type()?;
        let base = join_tokens(&self.toks[ts..te]);
        let ty = format!("{base}{}", self.parse_ptr_ops());
        let kind = NodeKind::New { ty, is_array: false, placement };
        let id = self.tree.alloc(kind, self.span_at(start), parent);
        let mut is_array = false;
        while self.at("[") {
            is_array = true;
            self.bump();
            self.parse_expression(id, &["]"])?;
            self.expect("]")?;
        }
        if self.at("(") || self.at("{") {
            let close = if self.at("(") { ")" } else { "}" };
            self.bump();
            self.parse_expression(id, &[close])?;
            self.expect(close)?;
        }
        if let NodeKind::New { is_array: a, .. } = self.tree.kind_mut(id) {
            *a = is_array;
        }
        self.tree.set_end(id, self.prev_end());
        Ok(id)
    }

    fn parse_delete(&mut self, parent: NodeId) -> PResult<NodeId> {
        let start = self.pos;
        self.bump();
        let is_array = self.at("[") && self.is_at(self.pos + 1, "]");
        if is_array {
            self.pos += 2;
        }
        let kind = NodeKind::Delete { target: String::new(), is_array };
        let id = self.tree.alloc(kind, self.span_at(start), parent);
        while self.at("*") || self.at("(") {
            if self.at("(") {
                self.bump();
                self.parse_expression(id, &[")"])?;
                self.expect(")")?;
                break;
            }
            self.bump();
        }
        let operand_start = self.pos;
        if self.at_ident() || self.at("this") || self.at("::") {
            self.parse_postfix_chain(id)?;
        }
        let target = join_tokens(&self.toks[operand_start..self.pos]);
        if let NodeKind::Delete { target: t, .. } = self.tree.kind_mut(id) {
            *t = target;
        }
        self.tree.set_end(id, self.prev_end());
        Ok(id)
    }
}

fn capture_from(toks: &[crate::lexer::Token<'_>]) -> Option<Capture> {
    let first = toks.first()?;
    let named = |idx: usize| toks.get(idx).filter(|t| t.is_ident()).map(|t| t.text.to_string());
    let capture = match (first.text, toks.len()) {
        ("&", 1) => Capture { kind: CaptureKind::DefaultRef, name: None },
        ("=", 1) => Capture { kind: CaptureKind::DefaultCopy, name: None },
        ("this", _) => Capture { kind: CaptureKind::This, name: None },
        ("*", _) if toks.get(1).is_some_and(|t| t.text == "this") => {
            Capture { kind: CaptureKind::This, name: None }
        }
        ("&", _) => Capture { kind: CaptureKind::ByRef, name: named(1) },
        _ => Capture { kind: CaptureKind::ByCopy, name: named(0) },
    };
    Some(capture)
}
