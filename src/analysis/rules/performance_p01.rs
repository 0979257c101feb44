// src/analysis/rules/performance_p01.rs
//! P01: range-for loop variable bound by value.
//!
//! Only fires when the element type is known to be more than a register
//! copy. `auto` loop variables take their element type from the declared
//! type of the range; when that cannot be read off, the loop is skipped.

use super::RuleContext;
use crate::symbols::types::{base_type, is_small_trivial, is_unresolved_element, TypeDescriptor};
use crate::symbols::{Resolved, TypeCategory};
use crate::syntax::{NodeId, NodeKind, VarDecl};
use crate::types::{Finding, RuleId};

#[cfg(test)]
#[path = "performance_p01_test.rs"]
mod tests;

pub(super) fn check(ctx: &RuleContext<'_>, out: &mut Vec<Finding>) {
    for id in ctx.tree.walk() {
        let NodeKind::RangeFor { is_reference: false } = ctx.tree.kind(id) else { continue };
        let Some(&var) = ctx.tree.children(id).first() else { continue };
        let NodeKind::Variable(decl) = ctx.tree.kind(var) else { continue };
        let Some(element) = element_type(ctx, id, decl) else { continue };
        if is_small_trivial(&element) || is_unresolved_element(&element) {
            continue;
        }
        out.push(
            ctx.finding(
                RuleId::RangeForCopy,
                var,
                format!("range-for variable `{}` copies each `{element}` element", decl.name),
            )
            .with_suggestion(format!("bind by reference: `{} {}`", reference_form(&decl.ty), decl.name))
            .with_note("the copy is made on every iteration"),
        );
    }
}

/// Type of each copied element: the declared loop type, or for `auto` the
/// element type of the range's declaration.
fn element_type(ctx: &RuleContext<'_>, range_for: NodeId, decl: &VarDecl) -> Option<String> {
    let declared = TypeDescriptor::classify(&decl.ty);
    if matches!(declared.category, TypeCategory::Pointer { .. }) {
        return None;
    }
    if declared.category != TypeCategory::Inferred {
        return Some(declared.base);
    }
    let children = ctx.tree.children(range_for);
    if children.len() != 3 {
        return None;
    }
    let range = children[1];
    let name = match ctx.tree.kind(range) {
        NodeKind::Name(n) => n.name.clone(),
        NodeKind::MemberAccess(m) if m.base == "this" => m.member.clone(),
        _ => return None,
    };
    match ctx.symbols.resolve(ctx.tree, &name, range, false) {
        Resolved::Decl(d) => d.ty.element_type(),
        Resolved::PresumedMember { .. } | Resolved::Unresolved => None,
    }
}

fn reference_form(ty: &str) -> String {
    let base = base_type(ty);
    if base == "auto" {
        "const auto&".to_string()
    } else {
        format!("const {base}&")
    }
}
