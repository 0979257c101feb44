// src/syntax/tree.rs
//! Arena-backed syntax tree.
//!
//! Nodes own their children through index lists; the parent link is a plain
//! index used for upward lookups only.

use crate::lexer::Span;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClassKeyword {
    Class,
    Struct,
    Union,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JumpKind {
    Return,
    Throw,
    Break,
    Continue,
    Goto,
}

/// A declared variable, member, or parameter as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VarDecl {
    pub name: String,
    /// Declared type with declarator modifiers (`*`, `&`) folded in.
    pub ty: String,
    pub name_span: Span,
    pub has_init: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunctionDecl {
    /// Unqualified name (`start`, `~Server`, `operator==`).
    pub name: String,
    /// Qualifier of an out-of-line definition (`Server` in `Server::start`).
    pub qualifier: Option<String>,
    pub return_type: String,
    pub has_body: bool,
}

impl FunctionDecl {
    /// Innermost class named by the qualifier, if any.
    #[must_use]
    pub fn owner_class(&self) -> Option<&str> {
        let q = self.qualifier.as_deref()?;
        Some(q.rsplit("::").next().unwrap_or(q))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaptureKind {
    /// `[&]`
    DefaultRef,
    /// `[=]`
    DefaultCopy,
    /// `[this]` or `[*this]`
    This,
    ByRef,
    ByCopy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capture {
    pub kind: CaptureKind,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct Lambda {
    pub captures: Vec<Capture>,
}

impl Lambda {
    /// True when the body can reach members of the enclosing object.
    #[must_use]
    pub fn captures_this(&self) -> bool {
        self.captures.iter().any(|c| {
            matches!(c.kind, CaptureKind::This | CaptureKind::DefaultRef | CaptureKind::DefaultCopy)
        })
    }

    #[must_use]
    pub fn has_default_capture(&self) -> bool {
        self.captures
            .iter()
            .any(|c| matches!(c.kind, CaptureKind::DefaultRef | CaptureKind::DefaultCopy))
    }

    #[must_use]
    pub fn captures_name(&self, name: &str) -> bool {
        self.captures.iter().any(|c| c.name.as_deref() == Some(name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Call {
    /// Callee text with template arguments removed (`std::make_unique`, `m_workers.emplace_back`).
    pub callee: String,
    /// Object the method is invoked on, for `a.f()` / `a->f()`.
    pub receiver: Option<String>,
    /// Last path segment of the callee.
    pub method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberAccess {
    pub base: String,
    pub member: String,
    pub arrow: bool,
    pub is_write: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameRef {
    /// Possibly qualified (`std::endl`).
    pub name: String,
    pub is_write: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    TranslationUnit,
    Namespace { name: Option<String> },
    Class { name: String, keyword: ClassKeyword },
    Function(FunctionDecl),
    Parameter(VarDecl),
    Variable(VarDecl),
    Block,
    For,
    /// Children: loop variable, range expression nodes, body (last).
    RangeFor { is_reference: bool },
    While,
    DoWhile,
    If,
    Switch,
    Try,
    Catch,
    Jump(JumpKind),
    ExprStmt,
    Call(Call),
    Lambda(Lambda),
    New { ty: String, is_array: bool, placement: bool },
    Delete { target: String, is_array: bool },
    MemberAccess(MemberAccess),
    Name(NameRef),
    Subscript,
    Opaque { reason: String },
}

impl NodeKind {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::TranslationUnit => "TranslationUnit",
            Self::Namespace { .. } => "NamespaceDecl",
            Self::Class { .. } => "ClassDecl",
            Self::Function(_) => "FunctionDecl",
            Self::Parameter(_) => "ParameterDecl",
            Self::Variable(_) => "VariableDecl",
            Self::Block => "Block",
            Self::For => "ForStmt",
            Self::RangeFor { .. } => "RangeForStmt",
            Self::While => "WhileStmt",
            Self::DoWhile => "DoStmt",
            Self::If => "IfStmt",
            Self::Switch => "SwitchStmt",
            Self::Try => "TryStmt",
            Self::Catch => "CatchClause",
            Self::Jump(_) => "JumpStmt",
            Self::ExprStmt => "ExprStmt",
            Self::Call(_) => "CallExpr",
            Self::Lambda(_) => "LambdaExpr",
            Self::New { .. } => "NewExpr",
            Self::Delete { .. } => "DeleteExpr",
            Self::MemberAccess(_) => "MemberAccessExpr",
            Self::Name(_) => "NameExpr",
            Self::Subscript => "SubscriptExpr",
            Self::Opaque { .. } => "Opaque",
        }
    }

    /// Statement-level kinds. Loops and branches count.
    #[must_use]
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Self::Block
                | Self::For
                | Self::RangeFor { .. }
                | Self::While
                | Self::DoWhile
                | Self::If
                | Self::Switch
                | Self::Try
                | Self::Jump(_)
                | Self::ExprStmt
                | Self::Variable(_)
                | Self::Opaque { .. }
        )
    }

    #[must_use]
    pub fn is_loop(&self) -> bool {
        matches!(self, Self::For | Self::RangeFor { .. } | Self::While | Self::DoWhile)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Node {
    pub kind: NodeKind,
    pub span: Span,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyntaxTree {
    nodes: Vec<Node>,
}

impl SyntaxTree {
    /// Creates a tree whose root spans `source_len` bytes.
    #[must_use]
    pub fn new(source_len: usize) -> Self {
        let root = Node {
            kind: NodeKind::TranslationUnit,
            span: Span::new(0, source_len, 1, 1),
            parent: None,
            children: Vec::new(),
        };
        Self { nodes: vec![root] }
    }

    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    #[must_use]
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    #[must_use]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes[id.0].span
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Pre-order walk of `id` and everything below it, in source order.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants { tree: self, stack: vec![id] }
    }

    /// Pre-order walk of the whole tree.
    #[must_use]
    pub fn walk(&self) -> Descendants<'_> {
        self.descendants(self.root())
    }

    #[must_use]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).last().copied()
    }

    // --- construction (parser only) ---

    pub(crate) fn alloc(&mut self, kind: NodeKind, span: Span, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { kind, span, parent: Some(parent), children: Vec::new() });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub(crate) fn set_end(&mut self, id: NodeId, end: usize) {
        self.nodes[id.0].span.end = end;
    }

    pub(crate) fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        &mut self.nodes[id.0].kind
    }

    /// Inserts a new node in place of `child`, making `child` its first child.
    pub(crate) fn wrap(&mut self, child: NodeId, kind: NodeKind) -> NodeId {
        let parent = self.nodes[child.0].parent.unwrap_or(NodeId(0));
        let span = self.nodes[child.0].span;
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node { kind, span, parent: Some(parent), children: vec![child] });
        if let Some(slot) = self.nodes[parent.0].children.iter_mut().find(|c| **c == child) {
            *slot = id;
        }
        self.nodes[child.0].parent = Some(id);
        id
    }

    /// Rollback point for speculative parsing.
    pub(crate) fn checkpoint(&self, parent: NodeId) -> (usize, usize) {
        (self.nodes.len(), self.nodes[parent.0].children.len())
    }

    /// Discards every node allocated since `checkpoint` was taken.
    pub(crate) fn rollback(&mut self, parent: NodeId, checkpoint: (usize, usize)) {
        let (arena_len, child_len) = checkpoint;
        self.nodes.truncate(arena_len);
        self.nodes[parent.0].children.truncate(child_len);
    }

    /// Checks the span invariants: every child inside its parent, siblings
    /// ordered and disjoint, parent links consistent.
    ///
    /// # Errors
    /// Returns a description of the first violation found.
    pub fn validate(&self) -> Result<(), String> {
        for id in self.walk() {
            let node = self.node(id);
            let mut prev_end: Option<usize> = None;
            for &child in &node.children {
                let c = self.node(child);
                if c.parent != Some(id) {
                    return Err(format!("node {} has a stale parent link", child.0));
                }
                if !node.span.contains(&c.span) {
                    return Err(format!(
                        "{} {}..{} escapes parent {} {}..{}",
                        c.kind.label(),
                        c.span.start,
                        c.span.end,
                        node.kind.label(),
                        node.span.start,
                        node.span.end
                    ));
                }
                if prev_end.is_some_and(|end| c.span.start < end) {
                    return Err(format!(
                        "{} at {} overlaps its previous sibling",
                        c.kind.label(),
                        c.span.start
                    ));
                }
                prev_end = Some(c.span.end);
            }
        }
        Ok(())
    }
}

pub struct Descendants<'t> {
    tree: &'t SyntaxTree,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack.extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}
