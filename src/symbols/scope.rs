// src/symbols/scope.rs
use std::collections::{HashMap, HashSet};

use super::types::TypeDescriptor;
use crate::lexer::Span;
use crate::syntax::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(pub(crate) usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub(crate) usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    TranslationUnit,
    Namespace,
    Class(String),
    /// Function body. `class` is the owning class of a method, inline or out-of-line.
    Function { name: String, class: Option<String> },
    /// `launched` when the lambda is handed to a thread-launching call.
    Lambda { launched: bool },
    Block,
}

impl ScopeKind {
    /// Namespace-level scopes: names declared here need no capture.
    #[must_use]
    pub fn is_global(&self) -> bool {
        matches!(self, Self::TranslationUnit | Self::Namespace)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Storage {
    Member,
    Local,
    Parameter,
    Global,
}

/// A declared name: variable, member, or parameter.
#[derive(Debug, Clone)]
pub struct Declaration {
    pub name: String,
    pub ty: TypeDescriptor,
    pub storage: Storage,
    pub scope: ScopeId,
    pub node: NodeId,
    pub span: Span,
}

/// One lexical scope. Declarations are kept in source order; the map holds
/// the latest declaration of each name.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub node: NodeId,
    pub parent: Option<ScopeId>,
    pub decls: Vec<DeclId>,
    names: HashMap<String, DeclId>,
}

impl Scope {
    #[must_use]
    pub fn new(kind: ScopeKind, node: NodeId, parent: Option<ScopeId>) -> Self {
        Self { kind, node, parent, decls: Vec::new(), names: HashMap::new() }
    }

    pub fn insert(&mut self, name: &str, decl: DeclId) {
        self.decls.push(decl);
        self.names.insert(name.to_string(), decl);
    }

    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<DeclId> {
        self.names.get(name).copied()
    }
}

/// A method as seen from its class: what it calls on the same object.
#[derive(Debug, Clone, Default)]
pub struct MethodInfo {
    pub name: String,
    /// Same-class methods invoked by this one.
    pub internal_calls: HashSet<String>,
    /// Runs on a spawned thread: passed as a thread entry point, or called
    /// from a launched lambda.
    pub thread_entry: bool,
}

/// Everything known about a class name within one unit.
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: String,
    /// False when the class is only known through out-of-line method
    /// qualifiers; its members are then presumed from usage.
    pub declared: bool,
    pub fields: HashMap<String, DeclId>,
    pub methods: HashMap<String, MethodInfo>,
}

impl ClassInfo {
    #[must_use]
    pub fn new(name: &str, declared: bool) -> Self {
        Self { name: name.to_string(), declared, fields: HashMap::new(), methods: HashMap::new() }
    }

    pub fn method_mut(&mut self, name: &str) -> &mut MethodInfo {
        self.methods
            .entry(name.to_string())
            .or_insert_with(|| MethodInfo { name: name.to_string(), ..MethodInfo::default() })
    }

    /// Methods reachable from a thread entry through same-class calls.
    #[must_use]
    pub fn thread_reachable(&self) -> HashSet<String> {
        let mut reached: HashSet<String> =
            self.methods.values().filter(|m| m.thread_entry).map(|m| m.name.clone()).collect();
        let mut stack: Vec<String> = reached.iter().cloned().collect();
        while let Some(name) = stack.pop() {
            let Some(method) = self.methods.get(&name) else { continue };
            for callee in &method.internal_calls {
                if reached.insert(callee.clone()) {
                    stack.push(callee.clone());
                }
            }
        }
        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_reachability_follows_internal_calls() {
        let mut class = ClassInfo::new("Server", true);
        class.method_mut("run").thread_entry = true;
        class.method_mut("run").internal_calls.insert("step".into());
        class.method_mut("step").internal_calls.insert("flush".into());
        class.method_mut("stop");
        let reached = class.thread_reachable();
        assert!(reached.contains("run"));
        assert!(reached.contains("step"));
        assert!(reached.contains("flush"));
        assert!(!reached.contains("stop"));
    }

    #[test]
    fn later_declaration_shadows_in_lookup() {
        let mut scope = Scope::new(ScopeKind::Block, NodeId(1), None);
        scope.insert("x", DeclId(0));
        scope.insert("x", DeclId(3));
        assert_eq!(scope.lookup("x"), Some(DeclId(3)));
        assert_eq!(scope.decls.len(), 2);
        assert!(scope.lookup("y").is_none());
    }
}
