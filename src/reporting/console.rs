use crate::reporting::guidance::get_guidance;
use crate::reporting::shared::{counts_phrase, duration, header, next_occurrence, rule_counts, snippet};
use crate::types::{Finding, ScanReport, Severity, UnitReport};
use colored::Colorize;
use std::collections::HashMap;

/// Prints a scan report to stdout. The first finding of each rule gets the
/// full block; repeats get a compact back-reference.
pub fn print_report(report: &ScanReport) {
    let counts = rule_counts(report);
    let mut shown = HashMap::new();
    let units = report.units_by_priority();

    for f in units.iter().flat_map(|u| &u.findings) {
        let total = counts.get(&f.rule).copied().unwrap_or(1);
        let occurrence = next_occurrence(&mut shown, f.rule);
        if occurrence == 1 {
            print_finding_full(f, occurrence, total);
        } else {
            print_finding_compact(f, occurrence, total);
        }
    }

    print_diagnostics(&units);
    print_summary(report);
}

fn print_header(f: &Finding, occurrence: usize, total: usize) {
    let header = header(f, occurrence, total);
    match f.severity {
        Severity::Critical => println!("{}", header.red().bold()),
        Severity::Warning => println!("{}", header.yellow()),
        Severity::Suggestion => println!("{}", header.dimmed()),
    }
    println!("  {} {}:{}:{}", "-->".blue(), f.file, f.location.line, f.location.column);
}

fn print_related(f: &Finding) {
    for r in &f.related {
        println!("   {} {}:{}: {}", "=".blue(), r.location.line, r.location.column, r.label.dimmed());
    }
}

fn print_finding_full(f: &Finding, occurrence: usize, total: usize) {
    print_header(f, occurrence, total);
    print_snippet(f);
    print_related(f);
    for note in &f.notes {
        println!("   {} {} {}", "=".blue(), "note:".cyan(), note);
    }
    if let Some(s) = &f.suggestion {
        println!("   {} {} {}", "=".blue(), "help:".green(), s);
    }

    let guidance = get_guidance(f.rule);
    println!("   {}", "|".blue());
    println!("   {} {} {}", "=".blue(), "WHY:".cyan(), guidance.why);
    println!("   {} {} {}", "=".blue(), "FIX:".green(), guidance.fix);
    println!(
        "   {} {}",
        "=".blue(),
        format!("DISABLE: {} = false in cppsieve.toml [rules]", f.rule).dimmed()
    );
    println!();
}

fn print_finding_compact(f: &Finding, occurrence: usize, total: usize) {
    print_header(f, occurrence, total);
    print_related(f);
    println!("   {} {}: see first {} above", "=".blue(), f.code.yellow(), f.code);
    println!();
}

fn print_snippet(f: &Finding) {
    let lines = snippet(&f.file, f.location.line);
    if lines.is_empty() {
        return;
    }
    println!("   {}", "|".blue());
    for (n, text) in &lines {
        let gutter = format!("{n:3} |");
        if *n == f.location.line {
            println!("   {} {}", gutter.blue(), text);
            let pad = " ".repeat(f.location.column.saturating_sub(1));
            let width = if f.location.end_line == f.location.line {
                f.location.end_column.saturating_sub(f.location.column).max(1)
            } else {
                text.len().saturating_sub(f.location.column.saturating_sub(1)).max(1)
            };
            println!("   {} {}{}", "    |".blue(), pad, "^".repeat(width).red().bold());
        } else {
            println!("   {} {}", gutter.blue().dimmed(), text.dimmed());
        }
    }
}

fn print_diagnostics(units: &[&UnitReport]) {
    for unit in units {
        let label = unit.category.label();
        for d in &unit.diagnostics {
            let at = d.line().map_or_else(|| unit.file.clone(), |l| format!("{}:{l}", unit.file));
            println!("{} {at} [{label}]: {}", "note:".cyan(), d.to_string().dimmed());
        }
    }
}

fn print_summary(report: &ScanReport) {
    let elapsed = duration(report);
    let Some(summary) = counts_phrase(report) else {
        println!(
            "{} No findings in {} units ({elapsed:?}).",
            "OK".green().bold(),
            report.summary.units_analyzed
        );
        return;
    };
    let clean = format!("{} of {} units clean.", report.clean_unit_count(), report.summary.units_analyzed);
    let score = format!("Score {}/100.", report.summary.score);
    if report.summary.critical > 0 {
        println!("{} cppsieve found {summary} ({elapsed:?}). {clean} {}", "X".red().bold(), score.bold());
    } else {
        println!("{} cppsieve found {summary} ({elapsed:?}). {clean} {}", "~".yellow().bold(), score.bold());
    }
}
