// src/symbols/mod.rs
//! Symbol & scope tracking over a [`SyntaxTree`].
//!
//! Built in passes over one unit:
//! 1. scopes and declarations, with a class table for members and methods;
//! 2. ownership: raw pointers that receive a `new`;
//! 3. thread launches: lambdas and methods handed to a spawning call;
//! 4. member accesses with the locks held at each site (see [`protection`]).
//!
//! Resolution is lexical and conservative. A name the tracker cannot pin
//! down resolves to [`Resolved::Unresolved`] and the rules skip it.

pub mod protection;
pub mod scope;
pub mod types;

use std::collections::{BTreeMap, HashMap, HashSet};

pub use protection::{MemberAccessSite, ProtectionRelation};
pub use scope::{ClassInfo, DeclId, Declaration, MethodInfo, Scope, ScopeId, ScopeKind, Storage};
pub use types::{TypeCategory, TypeDescriptor};

use crate::syntax::{Call, Lambda, NodeId, NodeKind, SyntaxTree};

/// Callees that run their callable argument on a new thread.
const THREAD_LAUNCHERS: &[&str] = &[
    "std::thread",
    "std::jthread",
    "thread",
    "jthread",
    "std::async",
    "async",
    "pthread_create",
    "boost::thread",
    "QThread::create",
];

/// Container methods that construct a thread element in place.
const THREAD_EMPLACE: &[&str] = &["emplace_back", "push_back", "emplace", "emplace_front", "push_front"];

#[derive(Debug, Clone, Copy)]
pub enum Resolved<'a> {
    Decl(&'a Declaration),
    /// Undeclared member of the class an out-of-line method belongs to.
    PresumedMember { class: &'a str },
    Unresolved,
}

#[derive(Debug, Clone)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    decls: Vec<Declaration>,
    node_scope: HashMap<NodeId, ScopeId>,
    node_decl: HashMap<NodeId, Vec<DeclId>>,
    classes: BTreeMap<String, ClassInfo>,
    launched: HashSet<NodeId>,
    accesses: Vec<MemberAccessSite>,
    relations: Vec<ProtectionRelation>,
    lock_names: HashSet<String>,
}

impl SymbolTable {
    /// Runs every tracking pass over `tree`.
    #[must_use]
    pub fn build(tree: &SyntaxTree) -> Self {
        let root = tree.root();
        let mut table = Self {
            scopes: vec![Scope::new(ScopeKind::TranslationUnit, root, None)],
            decls: Vec::new(),
            node_scope: HashMap::from([(root, ScopeId(0))]),
            node_decl: HashMap::new(),
            classes: BTreeMap::new(),
            launched: HashSet::new(),
            accesses: Vec::new(),
            relations: Vec::new(),
            lock_names: HashSet::new(),
        };
        for id in tree.walk() {
            if let NodeKind::Class { name, .. } = tree.kind(id) {
                table.classes.entry(name.clone()).or_insert_with(|| ClassInfo::new(name, true));
            }
        }
        for &child in tree.children(root) {
            table.declare(tree, child, ScopeId(0));
        }
        table.mark_owning_pointers(tree);
        table.mark_thread_launches(tree);
        protection::analyze(&mut table, tree);
        table
    }

    // --- pass 1: scopes and declarations ---

    fn open_scope(&mut self, kind: ScopeKind, node: NodeId, parent: ScopeId) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope::new(kind, node, Some(parent)));
        self.node_scope.insert(node, id);
        id
    }

    fn add_decl(&mut self, tree: &SyntaxTree, node: NodeId, scope: ScopeId, storage: Storage) {
        let (NodeKind::Variable(v) | NodeKind::Parameter(v)) = tree.kind(node) else { return };
        if v.name.is_empty() {
            return;
        }
        let ty = TypeDescriptor::classify(&v.ty);
        for name in binding_names(&v.name) {
            let id = DeclId(self.decls.len());
            self.decls.push(Declaration {
                name: name.to_string(),
                ty: ty.clone(),
                storage,
                scope,
                node,
                span: v.name_span,
            });
            self.scopes[scope.0].insert(name, id);
            self.node_decl.entry(node).or_default().push(id);
            if storage == Storage::Member {
                if let ScopeKind::Class(class) = &self.scopes[scope.0].kind {
                    if let Some(info) = self.classes.get_mut(class) {
                        info.fields.insert(name.to_string(), id);
                    }
                }
            }
        }
    }

    fn declare(&mut self, tree: &SyntaxTree, node: NodeId, scope: ScopeId) {
        let kind = tree.kind(node);
        let inner = match kind {
            NodeKind::Namespace { .. } => self.open_scope(ScopeKind::Namespace, node, scope),
            NodeKind::Class { name, .. } => self.open_scope(ScopeKind::Class(name.clone()), node, scope),
            NodeKind::Function(f) => {
                let class = match &self.scopes[scope.0].kind {
                    ScopeKind::Class(c) => Some(c.clone()),
                    _ => f.owner_class().map(str::to_string),
                };
                if let Some(class) = &class {
                    self.classes
                        .entry(class.clone())
                        .or_insert_with(|| ClassInfo::new(class, false))
                        .method_mut(&f.name);
                }
                self.open_scope(ScopeKind::Function { name: f.name.clone(), class }, node, scope)
            }
            NodeKind::Lambda(_) => self.open_scope(ScopeKind::Lambda { launched: false }, node, scope),
            NodeKind::Block
            | NodeKind::For
            | NodeKind::RangeFor { .. }
            | NodeKind::Catch
            | NodeKind::If
            | NodeKind::While
            | NodeKind::Switch => self.open_scope(ScopeKind::Block, node, scope),
            NodeKind::Variable(_) => {
                let storage = match &self.scopes[scope.0].kind {
                    ScopeKind::Class(_) => Storage::Member,
                    k if k.is_global() => Storage::Global,
                    _ => Storage::Local,
                };
                self.add_decl(tree, node, scope, storage);
                scope
            }
            NodeKind::Parameter(_) => {
                self.add_decl(tree, node, scope, Storage::Parameter);
                scope
            }
            _ => scope,
        };
        for &child in tree.children(node) {
            self.declare(tree, child, inner);
        }
    }

    // --- pass 2: ownership ---

    fn mark_owning_pointers(&mut self, tree: &SyntaxTree) {
        let mut owning = Vec::new();
        for id in tree.walk() {
            if !matches!(tree.kind(id), NodeKind::New { placement: false, .. }) {
                continue;
            }
            let Some(parent) = tree.parent(id) else { continue };
            match tree.kind(parent) {
                NodeKind::Variable(_) => {
                    owning.extend(self.node_decl.get(&parent).into_iter().flatten().copied());
                }
                NodeKind::ExprStmt => {
                    if let Some(target) = assignment_target(tree, parent, id) {
                        if let Resolved::Decl(d) = self.resolve(tree, &target, id, false) {
                            owning.extend(self.node_decl.get(&d.node).into_iter().flatten().copied());
                        }
                    }
                }
                _ => {}
            }
        }
        for id in owning {
            let ty = &mut self.decls[id.0].ty;
            if let TypeCategory::Pointer { owning } = &mut ty.category {
                *owning = true;
            }
        }
    }

    // --- pass 3: thread launches ---

    fn mark_thread_launches(&mut self, tree: &SyntaxTree) {
        let mut lambdas = Vec::new();
        let mut entries: Vec<(String, String)> = Vec::new();
        for id in tree.walk() {
            if !self.is_launch_site(tree, id) {
                continue;
            }
            for &arg in tree.children(id) {
                match tree.kind(arg) {
                    NodeKind::Lambda(_) => lambdas.push(arg),
                    NodeKind::Name(n) => {
                        if let Some((class, method)) = n.name.rsplit_once("::") {
                            let class = class.rsplit("::").next().unwrap_or(class);
                            if self.classes.contains_key(class) {
                                entries.push((class.to_string(), method.to_string()));
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
        for lambda in lambdas {
            self.launched.insert(lambda);
            if let Some(&sid) = self.node_scope.get(&lambda) {
                self.scopes[sid.0].kind = ScopeKind::Lambda { launched: true };
            }
        }
        for (class, method) in entries {
            if let Some(info) = self.classes.get_mut(&class) {
                info.method_mut(&method).thread_entry = true;
            }
        }
    }

    /// A call or declaration whose callable arguments run on another thread.
    fn is_launch_site(&self, tree: &SyntaxTree, id: NodeId) -> bool {
        match tree.kind(id) {
            NodeKind::Call(call) => self.is_launch_call(tree, id, call),
            NodeKind::Variable(_) => self
                .declarations_at(id)
                .any(|d| matches!(d.ty.category, TypeCategory::Thread)),
            _ => false,
        }
    }

    fn is_launch_call(&self, tree: &SyntaxTree, id: NodeId, call: &Call) -> bool {
        if THREAD_LAUNCHERS.contains(&call.callee.as_str()) {
            return true;
        }
        let Some(receiver) = call.receiver.as_deref() else { return false };
        if !THREAD_EMPLACE.contains(&call.method.as_str()) {
            return false;
        }
        let receiver = receiver.strip_prefix("this->").unwrap_or(receiver);
        match self.resolve(tree, receiver, id, false) {
            Resolved::Decl(d) => matches!(d.ty.category, TypeCategory::ThreadContainer),
            Resolved::PresumedMember { .. } | Resolved::Unresolved => {
                let lower = receiver.to_ascii_lowercase();
                lower.contains("thread") || lower.contains("worker")
            }
        }
    }

    // --- queries ---

    #[must_use]
    pub fn scope(&self, id: ScopeId) -> &Scope {
        &self.scopes[id.0]
    }

    #[must_use]
    pub fn decl(&self, id: DeclId) -> &Declaration {
        &self.decls[id.0]
    }

    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.decls.iter()
    }

    /// Declarations introduced by a `Variable` or `Parameter` node.
    pub fn declarations_at(&self, node: NodeId) -> impl Iterator<Item = &Declaration> {
        self.node_decl.get(&node).into_iter().flatten().map(|d| &self.decls[d.0])
    }

    #[must_use]
    pub fn class(&self, name: &str) -> Option<&ClassInfo> {
        self.classes.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassInfo> {
        self.classes.values()
    }

    /// True for a lambda passed to a thread-launching call.
    #[must_use]
    pub fn is_launched(&self, lambda: NodeId) -> bool {
        self.launched.contains(&lambda)
    }

    #[must_use]
    pub fn accesses(&self) -> &[MemberAccessSite] {
        &self.accesses
    }

    #[must_use]
    pub fn relations(&self) -> &[ProtectionRelation] {
        &self.relations
    }

    /// Names used as the argument of a lock guard or a `.lock()` receiver.
    #[must_use]
    pub fn is_lock_name(&self, name: &str) -> bool {
        self.lock_names.contains(name)
    }

    /// Innermost scope containing `node`; the node's own scope if it opens one.
    #[must_use]
    pub fn scope_of(&self, tree: &SyntaxTree, node: NodeId) -> ScopeId {
        std::iter::once(node)
            .chain(tree.ancestors(node))
            .find_map(|n| self.node_scope.get(&n).copied())
            .unwrap_or(ScopeId(0))
    }

    /// Resolves `name` as used at `at`, walking outward through enclosing
    /// scopes. Crossing a lambda boundary requires the lambda to capture the
    /// name (or `this` for members). `is_callee` suppresses member
    /// presumption for names in call position.
    #[must_use]
    pub fn resolve<'a>(&'a self, tree: &'a SyntaxTree, name: &str, at: NodeId, is_callee: bool) -> Resolved<'a> {
        if let Some((qualifier, last)) = name.rsplit_once("::") {
            let class = qualifier.rsplit("::").next().unwrap_or(qualifier);
            return self
                .classes
                .get(class)
                .and_then(|c| c.fields.get(last))
                .map_or(Resolved::Unresolved, |&d| Resolved::Decl(&self.decls[d.0]));
        }
        let use_start = tree.span(at).start;
        let mut gates: Vec<&'a Lambda> = Vec::new();
        let mut current = Some(self.scope_of(tree, at));
        while let Some(sid) = current {
            let scope = &self.scopes[sid.0];
            if let Some(did) = scope.lookup(name) {
                let decl = &self.decls[did.0];
                let in_view = matches!(decl.storage, Storage::Member | Storage::Global) || decl.span.start <= use_start;
                if in_view {
                    let reachable = match decl.storage {
                        Storage::Member => gates.iter().all(|l| l.captures_this()),
                        Storage::Global => true,
                        Storage::Local | Storage::Parameter => {
                            gates.iter().all(|l| l.has_default_capture() || l.captures_name(name))
                        }
                    };
                    return if reachable { Resolved::Decl(decl) } else { Resolved::Unresolved };
                }
            }
            match &scope.kind {
                ScopeKind::Lambda { .. } => {
                    if let NodeKind::Lambda(l) = tree.kind(scope.node) {
                        gates.push(l);
                    }
                }
                ScopeKind::Function { class: Some(class), .. } if !self.parent_is_class(sid) => {
                    if let Some(found) = self.resolve_out_of_line(sid, class, name, is_callee, &gates) {
                        return found;
                    }
                }
                _ => {}
            }
            current = scope.parent;
        }
        Resolved::Unresolved
    }

    fn parent_is_class(&self, sid: ScopeId) -> bool {
        self.scopes[sid.0]
            .parent
            .is_some_and(|p| matches!(self.scopes[p.0].kind, ScopeKind::Class(_)))
    }

    /// Member lookup from the body of `Class::method` defined outside the class.
    fn resolve_out_of_line<'a>(
        &'a self,
        function: ScopeId,
        class: &str,
        name: &str,
        is_callee: bool,
        gates: &[&Lambda],
    ) -> Option<Resolved<'a>> {
        let (key, info) = self.classes.get_key_value(class)?;
        let this_visible = gates.iter().all(|l| l.captures_this());
        if let Some(&d) = info.fields.get(name) {
            return Some(if this_visible { Resolved::Decl(&self.decls[d.0]) } else { Resolved::Unresolved });
        }
        if info.declared || is_callee || info.methods.contains_key(name) || !looks_like_member(name) {
            return None;
        }
        if self.declared_globally(function, name) {
            return None;
        }
        Some(if this_visible { Resolved::PresumedMember { class: key } } else { Resolved::Unresolved })
    }

    fn declared_globally(&self, from: ScopeId, name: &str) -> bool {
        let mut current = self.scopes[from.0].parent;
        while let Some(sid) = current {
            let scope = &self.scopes[sid.0];
            if scope.kind.is_global() && scope.lookup(name).is_some() {
                return true;
            }
            current = scope.parent;
        }
        false
    }
}

/// Identifier shapes that can plausibly name a data member: not a macro
/// or constant in ALL_CAPS, not a type-like capitalized name.
fn looks_like_member(name: &str) -> bool {
    let Some(first) = name.chars().next() else { return false };
    if first.is_ascii_uppercase() {
        return false;
    }
    let all_caps = name.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
    !all_caps && name != "std"
}

/// Names bound by a declarator; a structured binding yields several.
fn binding_names(text: &str) -> Vec<&str> {
    if let Some(inner) = text.strip_prefix('[') {
        inner
            .trim_end_matches(']')
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    } else {
        vec![text]
    }
}

/// `p = new T` inside an expression statement: the written name right
/// before the allocation.
fn assignment_target(tree: &SyntaxTree, stmt: NodeId, new: NodeId) -> Option<String> {
    let children = tree.children(stmt);
    let pos = children.iter().position(|&c| c == new)?;
    let prev = *children.get(pos.checked_sub(1)?)?;
    match tree.kind(prev) {
        NodeKind::Name(n) if n.is_write => Some(n.name.clone()),
        NodeKind::MemberAccess(m) if m.is_write && m.base == "this" => Some(m.member.clone()),
        _ => None,
    }
}

#[cfg(test)]
#[path = "symbols_test.rs"]
mod tests;
