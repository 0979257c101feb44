use crate::reporting::guidance::get_guidance;
use crate::reporting::shared::{counts_phrase, duration, header, next_occurrence, rule_counts, snippet};
use crate::types::{Finding, ScanReport};
use anyhow::Result;
use std::collections::HashMap;
use std::fmt::Write;

/// One line per finding, for embedding in logs or other tools' input.
///
/// # Errors
/// Returns error if formatting fails.
pub fn format_report_string(report: &ScanReport) -> Result<String> {
    let mut out = String::new();
    for f in report.units_by_priority().into_iter().flat_map(|u| &u.findings) {
        writeln!(
            out,
            "FILE: {} | RULE: {} {} | {} | LINE: {}:{} | {}",
            f.file,
            f.code,
            f.rule,
            f.severity.to_string().to_uppercase(),
            f.location.line,
            f.location.column,
            f.message
        )?;
    }
    Ok(out)
}

/// Multi-line report without ANSI colors, same layout as the console output.
///
/// # Errors
/// Returns error if formatting fails.
pub fn build_rich_report(report: &ScanReport) -> Result<String> {
    let mut out = String::new();
    let counts = rule_counts(report);
    let mut shown = HashMap::new();
    let units = report.units_by_priority();

    for f in units.iter().flat_map(|u| &u.findings) {
        let total = counts.get(&f.rule).copied().unwrap_or(1);
        let occurrence = next_occurrence(&mut shown, f.rule);
        if occurrence == 1 {
            write_finding_full(&mut out, f, occurrence, total)?;
        } else {
            write_finding_compact(&mut out, f, occurrence, total)?;
        }
    }

    for unit in &units {
        let label = unit.category.label();
        for d in &unit.diagnostics {
            match d.line() {
                Some(line) => writeln!(out, "note: {}:{line} [{label}]: {d}", unit.file)?,
                None => writeln!(out, "note: {} [{label}]: {d}", unit.file)?,
            }
        }
    }

    let elapsed = duration(report);
    match counts_phrase(report) {
        None => writeln!(out, "OK No findings in {} units ({elapsed:?}).", report.summary.units_analyzed)?,
        Some(summary) => writeln!(
            out,
            "cppsieve found {summary} ({elapsed:?}). {} of {} units clean. Score {}/100.",
            report.clean_unit_count(),
            report.summary.units_analyzed,
            report.summary.score
        )?,
    }
    Ok(out)
}

fn write_finding_full(out: &mut String, f: &Finding, occurrence: usize, total: usize) -> Result<()> {
    writeln!(out, "{}", header(f, occurrence, total))?;
    writeln!(out, "  --> {}:{}:{}", f.file, f.location.line, f.location.column)?;
    let lines = snippet(&f.file, f.location.line);
    if !lines.is_empty() {
        writeln!(out, "   |")?;
        for (n, text) in &lines {
            writeln!(out, "   {n:3} | {text}")?;
        }
    }
    for r in &f.related {
        writeln!(out, "   = {}:{}: {}", r.location.line, r.location.column, r.label)?;
    }
    for note in &f.notes {
        writeln!(out, "   = note: {note}")?;
    }
    if let Some(s) = &f.suggestion {
        writeln!(out, "   = help: {s}")?;
    }
    let guidance = get_guidance(f.rule);
    writeln!(out, "   |")?;
    writeln!(out, "   = WHY: {}", guidance.why)?;
    writeln!(out, "   = FIX: {}", guidance.fix)?;
    writeln!(out, "   = DISABLE: {} = false in cppsieve.toml [rules]", f.rule)?;
    writeln!(out)?;
    Ok(())
}

fn write_finding_compact(out: &mut String, f: &Finding, occurrence: usize, total: usize) -> Result<()> {
    writeln!(out, "{}", header(f, occurrence, total))?;
    writeln!(out, "  --> {}:{}:{}", f.file, f.location.line, f.location.column)?;
    for r in &f.related {
        writeln!(out, "   = {}:{}: {}", r.location.line, r.location.column, r.label)?;
    }
    writeln!(out, "   = {}: see first {} above", f.code, f.code)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Engine, SourceUnit};

    fn scan(src: &str) -> ScanReport {
        Engine::default().analyze_all(&[SourceUnit::new("virtual/loop.cpp", src)])
    }

    const TWO_LOOPS: &str = "\
void f(const std::vector<std::string>& v) {
  for (auto s : v) {}
  for (auto t : v) {}
}";

    #[test]
    fn first_occurrence_is_full_then_compact() {
        let text = build_rich_report(&scan(TWO_LOOPS)).expect("formats");
        assert!(text.contains("warn[P01]: [1 of 2] range-for variable `s`"));
        assert!(text.contains("warn[P01]: [2 of 2] range-for variable `t`"));
        assert_eq!(text.matches("= WHY:").count(), 1);
        assert!(text.contains("= P01: see first P01 above"));
        assert!(text.contains("  --> virtual/loop.cpp:2:8"));
        assert!(text.contains("Score 90/100."));
    }

    #[test]
    fn clean_report_says_ok() {
        let text = build_rich_report(&scan("int main() { return 0; }")).expect("formats");
        assert!(text.starts_with("OK No findings in 1 units"));
    }

    #[test]
    fn concurrency_units_are_listed_first() {
        let racy = "class Flag {\n  std::mutex m;\n  bool ready = false;\n  void set() { std::lock_guard<std::mutex> g(m); ready = true; }\n  void spawn() { std::thread t([this] { if (ready) {} }); t.join(); }\n};";
        let report = Engine::default()
            .analyze_all(&[SourceUnit::new("virtual/loop.cpp", TWO_LOOPS), SourceUnit::new("virtual/flag.cpp", racy)]);
        assert_eq!(report.units[0].file, "virtual/loop.cpp");
        let text = build_rich_report(&report).expect("formats");
        let racy_at = text.find("--> virtual/flag.cpp").expect("racy finding shown");
        let loop_at = text.find("--> virtual/loop.cpp").expect("loop finding shown");
        assert!(racy_at < loop_at);
        assert!(text.contains("0 of 2 units clean."));
        let lines = format_report_string(&report).expect("formats");
        assert!(lines.lines().next().unwrap_or_default().starts_with("FILE: virtual/flag.cpp | RULE: C01"));
    }

    #[test]
    fn diagnostics_carry_the_unit_category() {
        let report = scan("void f() {\n  int x = (1;\n}");
        let text = build_rich_report(&report).expect("formats");
        assert!(text.contains("note: virtual/loop.cpp:2 [implementation]: parse recovery:"), "{text}");
    }

    #[test]
    fn one_line_format() {
        let text = format_report_string(&scan(TWO_LOOPS)).expect("formats");
        let first = text.lines().next().unwrap_or_default();
        assert!(first.starts_with("FILE: virtual/loop.cpp | RULE: P01 range-for-copy | WARNING | LINE: 2:8 |"));
        assert_eq!(text.lines().count(), 2);
    }
}
