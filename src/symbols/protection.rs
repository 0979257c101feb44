// src/symbols/protection.rs
//! Member accesses and the locks that guard them.
//!
//! Every method body is walked in source order with the set of held locks.
//! A lock guard holds its mutex until the end of the enclosing block (or an
//! explicit `unlock()`); a bare `m.lock()` holds until `m.unlock()` in the
//! same block. Launched lambdas start with nothing held.

use std::collections::{HashMap, HashSet};

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use super::{Resolved, ScopeKind, Storage, SymbolTable, TypeCategory};
use crate::lexer::Span;
use crate::syntax::{NodeId, NodeKind, SyntaxTree};

static LOCKISH_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?i)(mutex|mtx|lock)").ok());

/// One read or write of a data member inside a method body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberAccessSite {
    pub class: String,
    pub member: String,
    #[serde(skip)]
    pub node: NodeId,
    pub span: Span,
    pub is_write: bool,
    /// Innermost lock held at the site.
    pub lock: Option<String>,
    /// Inside a lambda handed to a thread-launching call.
    pub in_launched_lambda: bool,
    /// Method the access appears in.
    pub function: Option<String>,
    /// Runs on a spawned thread: launched lambda or thread-reachable method.
    pub thread_context: bool,
}

/// `member` was accessed with `lock` held.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ProtectionRelation {
    pub class: String,
    pub member: String,
    pub lock: String,
}

struct Guard {
    name: String,
    lock: String,
    /// Constructed with `std::defer_lock` or `std::try_to_lock`.
    deferred: bool,
}

#[derive(Debug, Clone)]
struct Frame {
    class: String,
    function: String,
    launched: bool,
    /// Constructors and destructors run before/after any sharing.
    lifecycle: bool,
}

struct Walker<'a> {
    tree: &'a SyntaxTree,
    table: &'a SymbolTable,
    sites: Vec<MemberAccessSite>,
    /// (class, caller, callee). Caller `None` for launched lambdas.
    calls: Vec<(String, Option<String>, String)>,
    lock_names: HashSet<String>,
}

pub(super) fn analyze(table: &mut SymbolTable, tree: &SyntaxTree) {
    let (mut sites, calls, lock_names) = {
        let mut walker = Walker {
            tree,
            table,
            sites: Vec::new(),
            calls: Vec::new(),
            lock_names: HashSet::new(),
        };
        walker.walk_methods();
        (walker.sites, walker.calls, walker.lock_names)
    };

    for (class, caller, callee) in calls {
        let Some(info) = table.classes.get_mut(&class) else { continue };
        if !info.methods.contains_key(&callee) && info.declared {
            continue;
        }
        match caller {
            Some(caller) => {
                info.method_mut(&caller).internal_calls.insert(callee);
            }
            None => info.method_mut(&callee).thread_entry = true,
        }
    }

    let reachable: HashMap<String, HashSet<String>> =
        table.classes.values().map(|c| (c.name.clone(), c.thread_reachable())).collect();
    for site in &mut sites {
        let on_thread_method = site
            .function
            .as_ref()
            .is_some_and(|f| reachable.get(&site.class).is_some_and(|r| r.contains(f)));
        site.thread_context = site.in_launched_lambda || on_thread_method;
    }

    let mut relations: Vec<ProtectionRelation> = Vec::new();
    for site in &sites {
        let Some(lock) = &site.lock else { continue };
        let relation = ProtectionRelation { class: site.class.clone(), member: site.member.clone(), lock: lock.clone() };
        if !relations.contains(&relation) {
            relations.push(relation);
        }
    }

    table.accesses = sites;
    table.relations = relations;
    table.lock_names = lock_names;
}

impl SymbolTable {
    /// Members of `class` accessed both with and without a lock held.
    #[must_use]
    pub fn inconsistent_members(&self, class: &str) -> Vec<&str> {
        let mut locked = HashSet::new();
        let mut unlocked = HashSet::new();
        for site in self.accesses.iter().filter(|s| s.class == class) {
            if site.lock.is_some() {
                locked.insert(site.member.as_str());
            } else {
                unlocked.insert(site.member.as_str());
            }
        }
        let mut members: Vec<&str> = locked.intersection(&unlocked).copied().collect();
        members.sort_unstable();
        members
    }

    /// Locks `member` was seen under.
    pub fn protecting_locks<'a>(&'a self, class: &'a str, member: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.relations
            .iter()
            .filter(move |r| r.class == class && r.member == member)
            .map(|r| r.lock.as_str())
    }
}

impl<'a> Walker<'a> {
    fn walk_methods(&mut self) {
        let (tree, table) = (self.tree, self.table);
        for id in tree.walk() {
            let NodeKind::Function(f) = tree.kind(id) else { continue };
            if !f.has_body {
                continue;
            }
            let Some(&sid) = table.node_scope.get(&id) else { continue };
            let ScopeKind::Function { class: Some(class), name } = &table.scope(sid).kind else {
                continue;
            };
            let bare = class.rsplit("::").next().unwrap_or(class);
            let frame = Frame {
                class: class.clone(),
                function: name.clone(),
                launched: false,
                lifecycle: name == bare || name.starts_with('~'),
            };
            for &child in tree.children(id) {
                if !matches!(tree.kind(child), NodeKind::Parameter(_)) {
                    self.visit(child, &frame, &[], false);
                }
            }
        }
    }

    /// Statements of one block, tracking locks acquired and released along the way.
    fn walk_block(&mut self, block: NodeId, frame: &Frame, outer: &[String]) {
        let tree = self.tree;
        let mut held: Vec<String> = outer.to_vec();
        let mut guards: HashMap<String, String> = HashMap::new();
        for &stmt in tree.children(block) {
            self.visit(stmt, frame, &held, false);
            if let Some(guard) = self.guard_acquisition(stmt) {
                self.lock_names.insert(guard.lock.clone());
                if !guard.deferred {
                    held.push(guard.lock.clone());
                }
                guards.insert(guard.name, guard.lock);
                continue;
            }
            if let Some((receiver, acquire)) = lock_call(tree, stmt) {
                let lock = guards.get(&receiver).cloned().or_else(|| self.mutex_receiver(stmt, &receiver));
                let Some(lock) = lock else { continue };
                self.lock_names.insert(lock.clone());
                if acquire {
                    held.push(lock);
                } else if let Some(pos) = held.iter().rposition(|l| *l == lock) {
                    held.remove(pos);
                }
            }
        }
    }

    /// A lock guard declaration and the mutex it manages.
    fn guard_acquisition(&self, stmt: NodeId) -> Option<Guard> {
        let tree = self.tree;
        let NodeKind::Variable(v) = tree.kind(stmt) else { return None };
        let decl = self.table.declarations_at(stmt).next()?;
        if decl.ty.category != TypeCategory::LockGuard {
            return None;
        }
        let mut lock = None;
        let mut deferred = false;
        for &arg in tree.children(stmt) {
            let text = match tree.kind(arg) {
                NodeKind::Name(n) => n.name.clone(),
                NodeKind::MemberAccess(m) if m.base == "this" => m.member.clone(),
                NodeKind::MemberAccess(m) => format!("{}.{}", m.base, m.member),
                _ => continue,
            };
            if matches!(text.as_str(), "std::defer_lock" | "defer_lock" | "std::try_to_lock" | "try_to_lock") {
                deferred = true;
            } else if lock.is_none() {
                lock = Some(text);
            }
        }
        Some(Guard { name: v.name.clone(), lock: lock.unwrap_or_else(|| v.name.clone()), deferred })
    }

    fn mutex_receiver(&self, at: NodeId, receiver: &str) -> Option<String> {
        let receiver = receiver.strip_prefix("this->").unwrap_or(receiver);
        let is_mutex = match self.table.resolve(self.tree, receiver, at, false) {
            Resolved::Decl(d) => matches!(d.ty.category, TypeCategory::Mutex),
            Resolved::PresumedMember { .. } | Resolved::Unresolved => {
                LOCKISH_RE.as_ref().is_some_and(|re| re.is_match(receiver))
            }
        };
        is_mutex.then(|| receiver.to_string())
    }

    fn visit(&mut self, node: NodeId, frame: &Frame, held: &[String], write: bool) {
        let tree = self.tree;
        match tree.kind(node) {
            NodeKind::Function(_) | NodeKind::Class { .. } => {}
            NodeKind::Block => self.walk_block(node, frame, held),
            NodeKind::Lambda(_) if self.table.is_launched(node) => {
                let inner = Frame { launched: true, ..frame.clone() };
                for &child in tree.children(node) {
                    self.visit(child, &inner, &[], false);
                }
            }
            NodeKind::Call(call) => {
                let children = tree.children(node);
                if let Some(&callee) = children.first() {
                    match tree.kind(callee) {
                        NodeKind::Name(n) if !n.name.contains("::") => self.record_call(frame, &n.name),
                        NodeKind::Name(n) => {
                            if let Some((q, m)) = n.name.rsplit_once("::") {
                                if q.rsplit("::").next() == Some(frame.class.as_str()) {
                                    self.record_call(frame, m);
                                }
                            }
                        }
                        NodeKind::MemberAccess(m) if m.base == "this" => self.record_call(frame, &call.method),
                        NodeKind::MemberAccess(_) => {
                            for &base in tree.children(callee) {
                                self.visit(base, frame, held, false);
                            }
                        }
                        _ => self.visit(callee, frame, held, false),
                    }
                }
                for &arg in children.iter().skip(1) {
                    self.visit(arg, frame, held, false);
                }
            }
            NodeKind::MemberAccess(m) => {
                if m.base == "this" {
                    self.record(node, &m.member, frame, held, m.is_write || write);
                } else {
                    let writes_base = (m.is_write || write) && !m.arrow;
                    for &child in tree.children(node) {
                        self.visit(child, frame, held, writes_base);
                    }
                }
            }
            NodeKind::Name(n) => {
                let resolved = self.table.resolve(tree, &n.name, node, false);
                let member = match resolved {
                    Resolved::Decl(d) if d.storage == Storage::Member => Some(d.name.clone()),
                    Resolved::PresumedMember { .. } => Some(n.name.clone()),
                    _ => None,
                };
                if let Some(member) = member {
                    self.record(node, &member, frame, held, n.is_write || write);
                }
            }
            _ => {
                for &child in tree.children(node) {
                    self.visit(child, frame, held, false);
                }
            }
        }
    }

    fn record_call(&mut self, frame: &Frame, callee: &str) {
        let caller = (!frame.launched).then(|| frame.function.clone());
        self.calls.push((frame.class.clone(), caller, callee.to_string()));
    }

    fn record(&mut self, node: NodeId, member: &str, frame: &Frame, held: &[String], is_write: bool) {
        if frame.lifecycle && !frame.launched {
            return;
        }
        self.sites.push(MemberAccessSite {
            class: frame.class.clone(),
            member: member.to_string(),
            node,
            span: self.tree.span(node),
            is_write,
            lock: held.last().cloned(),
            in_launched_lambda: frame.launched,
            function: Some(frame.function.clone()),
            thread_context: frame.launched,
        });
    }
}

/// `m.lock()` / `m.unlock()` as a statement: receiver and whether it acquires.
fn lock_call(tree: &SyntaxTree, stmt: NodeId) -> Option<(String, bool)> {
    if !matches!(tree.kind(stmt), NodeKind::ExprStmt) {
        return None;
    }
    let &first = tree.children(stmt).first()?;
    let NodeKind::Call(call) = tree.kind(first) else { return None };
    let receiver = call.receiver.clone()?;
    match call.method.as_str() {
        "lock" | "lock_shared" => Some((receiver, true)),
        "unlock" | "unlock_shared" => Some((receiver, false)),
        _ => None,
    }
}
