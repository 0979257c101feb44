// src/analysis/rules/performance_p02.rs
//! P02: stream flush inside a `for` loop.

use super::RuleContext;
use crate::syntax::{NodeId, NodeKind};
use crate::types::{Finding, RuleId};

const FLUSH_MANIPULATORS: &[&str] = &["std::endl", "endl", "std::flush", "std::ends"];
const FLUSH_FUNCTIONS: &[&str] = &["fflush", "std::fflush"];

pub(super) fn check(ctx: &RuleContext<'_>, out: &mut Vec<Finding>) {
    for id in ctx.tree.walk() {
        let Some(what) = flush_operation(ctx, id) else { continue };
        if !innermost_loop_is_for(ctx, id) {
            continue;
        }
        out.push(
            ctx.finding(RuleId::LoopFlush, id, format!("`{what}` flushes the stream on every iteration"))
                .with_suggestion("write '\\n' and flush once after the loop"),
        );
    }
}

fn flush_operation(ctx: &RuleContext<'_>, id: NodeId) -> Option<String> {
    match ctx.tree.kind(id) {
        NodeKind::Name(n) if FLUSH_MANIPULATORS.contains(&n.name.as_str()) && !is_callee(ctx, id) => {
            Some(n.name.clone())
        }
        NodeKind::Call(c) if FLUSH_FUNCTIONS.contains(&c.callee.as_str()) => Some(format!("{}()", c.callee)),
        NodeKind::Call(c) if c.method == "flush" && c.receiver.is_some() => Some(format!("{}()", c.callee)),
        _ => None,
    }
}

fn is_callee(ctx: &RuleContext<'_>, id: NodeId) -> bool {
    ctx.tree
        .parent(id)
        .is_some_and(|p| matches!(ctx.tree.kind(p), NodeKind::Call(_)) && ctx.tree.children(p).first() == Some(&id))
}

/// Walks outward to the nearest loop, stopping at function and lambda bodies.
fn innermost_loop_is_for(ctx: &RuleContext<'_>, id: NodeId) -> bool {
    for ancestor in ctx.tree.ancestors(id) {
        match ctx.tree.kind(ancestor) {
            NodeKind::For | NodeKind::RangeFor { .. } => return true,
            NodeKind::While | NodeKind::DoWhile | NodeKind::Function(_) | NodeKind::Lambda(_) => return false,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use crate::analysis::rules::test_support::{check, lines_of};
    use crate::types::RuleId;

    fn p02(src: &str) -> Vec<usize> {
        lines_of(&check(RuleId::LoopFlush, src))
    }

    #[test]
    fn endl_in_range_for() {
        let src = "void f(const std::vector<int>& v) {\n  for (int x : v) {\n    std::cout << x << std::endl;\n  }\n  std::cout << std::endl;\n}";
        assert_eq!(p02(src), vec![3]);
    }

    #[test]
    fn nested_depth_still_counts() {
        let src = "void f() {\n  for (int i = 0; i < 3; ++i) {\n    if (i) {\n      { std::cout << i << std::endl; }\n    }\n  }\n}";
        assert_eq!(p02(src), vec![4]);
    }

    #[test]
    fn one_finding_per_call_site() {
        let src = "void f() {\n  for (;;) {\n    std::cout << 1 << std::endl << 2 << std::endl;\n    out.flush();\n    fflush(stdout);\n  }\n}";
        assert_eq!(p02(src), vec![3, 3, 4, 5]);
    }

    #[test]
    fn while_loops_do_not_qualify() {
        let src = "void f() {\n  while (true) {\n    std::cout << std::endl;\n  }\n  for (;;) {\n    while (busy()) { std::cout << std::flush; }\n  }\n}";
        assert!(p02(src).is_empty());
    }

    #[test]
    fn lambda_boundary_stops_the_walk() {
        let src = "void f() {\n  for (int i = 0; i < 2; ++i) {\n    auto log = [] { std::cout << std::endl; };\n    log();\n  }\n}";
        assert!(p02(src).is_empty());
    }

    #[test]
    fn plain_newline_is_clean() {
        let src = "void f(const std::vector<int>& v) {\n  for (int x : v) { std::cout << x << '\\n'; }\n}";
        assert!(p02(src).is_empty());
    }
}
