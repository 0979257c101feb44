// src/analysis/rules/concurrency_c01.rs
//! C01: member guarded by a lock in one place and touched bare in another,
//! with at least one access running on a spawned thread.
//!
//! This is an inference from lexical lock extents, not a proof. Members
//! guarded by something the tracker cannot see (atomics, external locks)
//! are skipped rather than reported.

use regex::Regex;
use std::sync::LazyLock;

use super::RuleContext;
use crate::symbols::MemberAccessSite;
use crate::types::{Finding, RuleId};

#[cfg(test)]
#[path = "concurrency_c01_test.rs"]
mod tests;

static SYNC_NAME_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)(mutex|mtx|thread|worker|atomic|lock)").ok());

pub(super) fn check(ctx: &RuleContext<'_>, out: &mut Vec<Finding>) {
    for class in ctx.symbols.classes() {
        for member in ctx.symbols.inconsistent_members(&class.name) {
            if !is_shared_data(ctx, &class.name, member) {
                continue;
            }
            let sites: Vec<&MemberAccessSite> = ctx
                .symbols
                .accesses()
                .iter()
                .filter(|s| s.class == class.name && s.member == member)
                .collect();
            if !sites.iter().any(|s| s.thread_context) || !sites.iter().any(|s| s.is_write) {
                continue;
            }
            report(ctx, &class.name, member, &sites, out);
        }
    }
}

/// Members that are plain data rather than synchronization machinery.
fn is_shared_data(ctx: &RuleContext<'_>, class: &str, member: &str) -> bool {
    if ctx.symbols.is_lock_name(member) {
        return false;
    }
    let declared = ctx
        .symbols
        .class(class)
        .and_then(|c| c.fields.get(member))
        .map(|&d| ctx.symbols.decl(d));
    match declared {
        Some(decl) => !decl.ty.is_sync_primitive() && !decl.ty.is_immutable_value(),
        None => !SYNC_NAME_RE.as_ref().is_some_and(|re| re.is_match(member)),
    }
}

fn verb(site: &MemberAccessSite) -> &'static str {
    if site.is_write {
        "written"
    } else {
        "read"
    }
}

fn report(ctx: &RuleContext<'_>, class: &str, member: &str, sites: &[&MemberAccessSite], out: &mut Vec<Finding>) {
    let (locked, bare): (Vec<&MemberAccessSite>, Vec<&MemberAccessSite>) =
        sites.iter().copied().partition(|s| s.lock.is_some());
    let Some(first_locked) = locked.first() else { return };
    let lock = first_locked.lock.as_deref().unwrap_or_default();

    for site in &bare {
        let mut finding = Finding::new(
            RuleId::UnsynchronizedSharedState,
            ctx.file,
            ctx.lines.locate(site.span),
            format!("`{class}::{member}` is {} here without holding `{lock}`", verb(site)),
        )
        .with_related(ctx.lines.locate(first_locked.span), format!("{} under `{lock}` here", verb(first_locked)))
        .with_suggestion(format!("lock `{lock}` here, or make `{member}` atomic"));
        if site.thread_context {
            finding = finding.with_note("this access runs on a spawned thread");
        }
        out.push(finding);
    }

    for site in &locked {
        let held = site.lock.as_deref().unwrap_or(lock);
        let mut finding = Finding::new(
            RuleId::UnsynchronizedSharedState,
            ctx.file,
            ctx.lines.locate(site.span),
            format!("`{class}::{member}` is {} under `{held}` here but accessed elsewhere without it", verb(site)),
        );
        for other in &bare {
            finding = finding.with_related(ctx.lines.locate(other.span), format!("{} without a lock", verb(other)));
        }
        let guarded_by: Vec<&str> = ctx.symbols.protecting_locks(class, member).collect();
        if guarded_by.len() > 1 {
            finding = finding.with_note(format!("seen under different locks: {}", guarded_by.join(", ")));
        }
        out.push(finding);
    }
}
