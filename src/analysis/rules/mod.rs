// src/analysis/rules/mod.rs
//! The closed rule set.
//!
//! Every rule is a pure function of the syntax tree and the symbol table.
//! Rules never see each other's output; the engine merges their findings
//! through the collector.

mod concurrency_c01;
mod memory_r01;
mod performance_p01;
mod performance_p02;

use std::collections::BTreeSet;

use rayon::prelude::*;

use crate::symbols::SymbolTable;
use crate::syntax::{NodeId, NodeKind, SyntaxTree};
use crate::types::{Finding, LineIndex, Location, RuleId};

/// Read-only view of one analyzed unit.
pub struct RuleContext<'a> {
    pub file: &'a str,
    pub tree: &'a SyntaxTree,
    pub symbols: &'a SymbolTable,
    pub lines: &'a LineIndex,
}

impl RuleContext<'_> {
    #[must_use]
    pub fn locate(&self, node: NodeId) -> Location {
        self.lines.locate(self.tree.span(node))
    }

    #[must_use]
    pub fn finding(&self, rule: RuleId, node: NodeId, message: String) -> Finding {
        Finding::new(rule, self.file, self.locate(node), message)
    }

    /// Nearest enclosing function or lambda.
    #[must_use]
    pub fn enclosing_body(&self, node: NodeId) -> Option<NodeId> {
        self.tree
            .ancestors(node)
            .find(|&a| matches!(self.tree.kind(a), NodeKind::Function(_) | NodeKind::Lambda(_)))
    }
}

impl RuleId {
    /// Runs this rule over one unit.
    #[must_use]
    pub fn evaluate(self, ctx: &RuleContext<'_>) -> Vec<Finding> {
        let mut out = Vec::new();
        match self {
            Self::RangeForCopy => performance_p01::check(ctx, &mut out),
            Self::LoopFlush => performance_p02::check(ctx, &mut out),
            Self::OwningRawPointer => memory_r01::check(ctx, &mut out),
            Self::UnsynchronizedSharedState => concurrency_c01::check(ctx, &mut out),
        }
        out
    }
}

/// Enabled rules. Iteration order is the declaration order of [`RuleId`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSet {
    enabled: BTreeSet<RuleId>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::all()
    }
}

impl RuleSet {
    #[must_use]
    pub fn all() -> Self {
        Self { enabled: RuleId::ALL.into_iter().collect() }
    }

    #[must_use]
    pub fn none() -> Self {
        Self { enabled: BTreeSet::new() }
    }

    pub fn set(&mut self, rule: RuleId, enabled: bool) {
        if enabled {
            self.enabled.insert(rule);
        } else {
            self.enabled.remove(&rule);
        }
    }

    #[must_use]
    pub fn is_enabled(&self, rule: RuleId) -> bool {
        self.enabled.contains(&rule)
    }

    pub fn iter(&self) -> impl Iterator<Item = RuleId> + '_ {
        self.enabled.iter().copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }
}

/// Evaluates the enabled rules concurrently. The result is unordered;
/// callers pass it through the collector.
#[must_use]
pub fn run(ctx: &RuleContext<'_>, rules: &RuleSet) -> Vec<Vec<Finding>> {
    let rules: Vec<RuleId> = rules.iter().collect();
    rules.par_iter().map(|rule| rule.evaluate(ctx)).collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::syntax::parse_source;

    /// Parses `src` and runs a single rule over it.
    pub fn check(rule: RuleId, src: &str) -> Vec<Finding> {
        let parsed = parse_source(src);
        let symbols = SymbolTable::build(&parsed.tree);
        let lines = LineIndex::new(src);
        let ctx = RuleContext { file: "test.cpp", tree: &parsed.tree, symbols: &symbols, lines: &lines };
        let mut findings = rule.evaluate(&ctx);
        findings.sort_by_key(|f| f.location.start);
        findings
    }

    pub fn lines_of(findings: &[Finding]) -> Vec<usize> {
        findings.iter().map(|f| f.location.line).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_set_toggles() {
        let mut set = RuleSet::all();
        assert_eq!(set.len(), 4);
        set.set(RuleId::LoopFlush, false);
        assert!(!set.is_enabled(RuleId::LoopFlush));
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![RuleId::RangeForCopy, RuleId::OwningRawPointer, RuleId::UnsynchronizedSharedState]
        );
        assert!(RuleSet::none().is_empty());
    }
}
