// src/analysis/rules/memory_r01.rs
//! R01: `new` stored in a raw local pointer without a dominating `delete`.
//!
//! A release counts only when the `delete` is a direct statement of the
//! allocating block and nothing between the two can leave the block early:
//! no jump, no call, no further allocation, no stream I/O. The `delete`
//! must also be the block's last statement, bar a `return` or a reset to
//! `nullptr`. Pointers that escape the function are somebody else's problem
//! and are skipped.

use super::RuleContext;
use crate::symbols::{Declaration, Resolved, Storage, TypeCategory};
use crate::syntax::{JumpKind, NodeId, NodeKind, SyntaxTree};
use crate::types::{Finding, RuleId};

#[cfg(test)]
#[path = "memory_r01_test.rs"]
mod tests;

const STREAMS: &[&str] = &["cout", "cerr", "clog", "wcout", "wcerr", "cin"];

/// What stands between the allocation and the end of its scope.
enum Exposure {
    NoRelease,
    ConditionalRelease(NodeId),
    /// `delete` reached only if `hazard` does not exit or throw first.
    Hazard { hazard: NodeId, label: &'static str, release: NodeId },
    UsedAfterRelease { release: NodeId, using: NodeId },
    /// Statements after the `delete` still run with the block open.
    NotLast { release: NodeId, next: NodeId },
}

pub(super) fn check(ctx: &RuleContext<'_>, out: &mut Vec<Finding>) {
    let tree = ctx.tree;
    for id in tree.walk() {
        let NodeKind::New { ty, is_array, placement: false } = tree.kind(id) else { continue };
        let Some((stmt, decl)) = allocation_target(ctx, id) else { continue };
        let Some(block) = tree.parent(stmt).filter(|&b| matches!(tree.kind(b), NodeKind::Block)) else {
            continue;
        };
        let Some(body) = ctx.enclosing_body(stmt) else { continue };
        let uses = uses_of(ctx, body, decl);
        if uses.iter().any(|&u| escapes(tree, u)) {
            continue;
        }
        let Some(exposure) = exposure(ctx, block, stmt, decl, &uses) else { continue };

        let mut finding = ctx
            .finding(
                RuleId::OwningRawPointer,
                id,
                format!("`{}` owns `new {ty}` through a raw pointer", decl.name),
            )
            .with_suggestion(format!("hold it in `std::unique_ptr<{}>`", owner_type(ty, *is_array)));
        finding = match exposure {
            Exposure::NoRelease => finding.with_note("no `delete` releases it in this scope"),
            Exposure::ConditionalRelease(release) => finding
                .with_related(ctx.locate(release), "released only on this path")
                .with_note("the `delete` is not a direct statement of the allocating block"),
            Exposure::Hazard { hazard, label, release } => finding
                .with_related(ctx.locate(hazard), label)
                .with_related(ctx.locate(release), "released here")
                .with_note("the release is skipped if control leaves the block first"),
            Exposure::UsedAfterRelease { release, using } => finding
                .with_related(ctx.locate(release), "released here")
                .with_related(ctx.locate(using), "used after release"),
            Exposure::NotLast { release, next } => finding
                .with_related(ctx.locate(release), "released here")
                .with_related(ctx.locate(next), "block continues after release")
                .with_note("the `delete` is not the last statement before scope exit"),
        };
        out.push(finding);
    }
}

/// Statement that stores the allocation and the local pointer receiving it.
fn allocation_target<'a>(ctx: &RuleContext<'a>, new: NodeId) -> Option<(NodeId, &'a Declaration)> {
    let tree = ctx.tree;
    let stmt = tree.parent(new)?;
    let decl = match tree.kind(stmt) {
        NodeKind::Variable(_) => ctx.symbols.declarations_at(stmt).next()?,
        NodeKind::ExprStmt => {
            let children = tree.children(stmt);
            let pos = children.iter().position(|&c| c == new)?;
            let target = children[pos.checked_sub(1)?];
            let NodeKind::Name(n) = tree.kind(target) else { return None };
            if !n.is_write {
                return None;
            }
            match ctx.symbols.resolve(tree, &n.name, target, false) {
                Resolved::Decl(d) => d,
                Resolved::PresumedMember { .. } | Resolved::Unresolved => return None,
            }
        }
        _ => return None,
    };
    let owning = matches!(decl.ty.category, TypeCategory::Pointer { owning: true });
    (owning && decl.storage == Storage::Local).then_some((stmt, decl))
}

/// Name nodes in `body` that resolve to `decl`.
fn uses_of(ctx: &RuleContext<'_>, body: NodeId, decl: &Declaration) -> Vec<NodeId> {
    ctx.tree
        .descendants(body)
        .filter(|&id| match ctx.tree.kind(id) {
            NodeKind::Name(n) if n.name == decl.name => {
                matches!(ctx.symbols.resolve(ctx.tree, &n.name, id, false), Resolved::Decl(d) if d.node == decl.node)
            }
            _ => false,
        })
        .collect()
}

/// Passed to a call, returned, stored elsewhere, or captured into another declaration.
fn escapes(tree: &SyntaxTree, use_site: NodeId) -> bool {
    let Some(parent) = tree.parent(use_site) else { return false };
    let siblings = tree.children(parent);
    match tree.kind(parent) {
        NodeKind::Call(_) => siblings.first() != Some(&use_site),
        NodeKind::Jump(JumpKind::Return) | NodeKind::Variable(_) | NodeKind::Lambda(_) => true,
        NodeKind::ExprStmt => {
            let pos = siblings.iter().position(|&s| s == use_site).unwrap_or(0);
            siblings[..pos].iter().any(|&s| is_written(tree, s))
        }
        _ => false,
    }
}

fn is_written(tree: &SyntaxTree, id: NodeId) -> bool {
    match tree.kind(id) {
        NodeKind::Name(n) => n.is_write,
        NodeKind::MemberAccess(m) => m.is_write,
        NodeKind::Subscript => tree.children(id).first().is_some_and(|&b| is_written(tree, b)),
        _ => false,
    }
}

fn exposure(
    ctx: &RuleContext<'_>,
    block: NodeId,
    alloc: NodeId,
    decl: &Declaration,
    uses: &[NodeId],
) -> Option<Exposure> {
    let tree = ctx.tree;
    let stmts = tree.children(block);
    let start = stmts.iter().position(|&s| s == alloc)?;
    let after = &stmts[start + 1..];

    let release_pos = after.iter().position(|&s| releases(tree, s, &decl.name));
    let Some(release_pos) = release_pos else {
        let nested = tree
            .descendants(block)
            .find(|&d| matches!(tree.kind(d), NodeKind::Delete { target, .. } if target_name(target) == decl.name));
        return Some(nested.map_or(Exposure::NoRelease, Exposure::ConditionalRelease));
    };
    let release = after[release_pos];

    for &stmt in &after[..release_pos] {
        if let Some((hazard, label)) = first_hazard(tree, stmt) {
            return Some(Exposure::Hazard { hazard, label, release });
        }
    }

    let release_end = tree.span(release).end;
    let reused = uses.iter().copied().find(|&u| {
        tree.span(u).start >= release_end && !is_written(tree, u)
    });
    if let Some(using) = reused {
        return Some(Exposure::UsedAfterRelease { release, using });
    }

    let next = after[release_pos + 1..].iter().copied().find(|&s| !is_scope_exit(tree, s, &decl.name));
    next.map(|next| Exposure::NotLast { release, next })
}

/// Statements that may follow the release: `return`, an empty statement,
/// or nulling the released pointer.
fn is_scope_exit(tree: &SyntaxTree, stmt: NodeId, name: &str) -> bool {
    match tree.kind(stmt) {
        NodeKind::Jump(JumpKind::Return) => true,
        NodeKind::ExprStmt => {
            let children = tree.children(stmt);
            let Some((&first, rest)) = children.split_first() else { return true };
            let resets = matches!(tree.kind(first), NodeKind::Name(n) if n.is_write && n.name == name);
            resets
                && rest
                    .iter()
                    .all(|&c| matches!(tree.kind(c), NodeKind::Name(n) if matches!(n.name.as_str(), "nullptr" | "NULL")))
        }
        _ => false,
    }
}

/// `delete p;` as a statement.
fn releases(tree: &SyntaxTree, stmt: NodeId, name: &str) -> bool {
    if !matches!(tree.kind(stmt), NodeKind::ExprStmt) {
        return false;
    }
    tree.children(stmt)
        .first()
        .is_some_and(|&c| matches!(tree.kind(c), NodeKind::Delete { target, .. } if target_name(target) == name))
}

fn target_name(target: &str) -> &str {
    let t = target.trim().trim_start_matches('(').trim_end_matches(')').trim();
    t.strip_prefix("this->").unwrap_or(t)
}

/// First construct in `stmt` that may leave the block before the release.
fn first_hazard(tree: &SyntaxTree, stmt: NodeId) -> Option<(NodeId, &'static str)> {
    let mut stack = vec![stmt];
    while let Some(id) = stack.pop() {
        let label = match tree.kind(id) {
            NodeKind::Jump(JumpKind::Throw) => Some("may throw before release"),
            NodeKind::Jump(_) => Some("may exit before release"),
            NodeKind::Call(_) => Some("call may throw before release"),
            NodeKind::New { .. } => Some("allocation may throw before release"),
            NodeKind::Name(n) if is_stream(&n.name) => Some("stream I/O may throw before release"),
            NodeKind::Opaque { .. } => Some("unparsed code before release"),
            NodeKind::Lambda(_) | NodeKind::Class { .. } | NodeKind::Function(_) => continue,
            _ => None,
        };
        if let Some(label) = label {
            return Some((id, label));
        }
        stack.extend(tree.children(id).iter().rev().copied());
    }
    None
}

fn is_stream(name: &str) -> bool {
    let last = name.rsplit("::").next().unwrap_or(name);
    STREAMS.contains(&last)
}

fn owner_type(ty: &str, is_array: bool) -> String {
    if is_array {
        format!("{ty}[]")
    } else {
        ty.to_string()
    }
}
