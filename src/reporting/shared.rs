use std::collections::HashMap;
use std::time::Duration;

use crate::types::{Finding, RuleId, ScanReport};

pub(crate) fn rule_counts(report: &ScanReport) -> HashMap<RuleId, usize> {
    let mut counts: HashMap<RuleId, usize> = HashMap::new();
    for f in report.findings() {
        *counts.entry(f.rule).or_insert(0) += 1;
    }
    counts
}

pub(crate) fn next_occurrence(shown: &mut HashMap<RuleId, usize>, rule: RuleId) -> usize {
    let entry = shown.entry(rule).or_insert(0);
    *entry += 1;
    *entry
}

pub(crate) fn header(f: &Finding, occurrence: usize, total: usize) -> String {
    let count_label = if total > 1 { format!(" [{occurrence} of {total}]") } else { String::new() };
    format!("{}[{}]:{count_label} {}", f.severity.prefix(), f.code, f.message)
}

pub(crate) fn pluralize(word: &str, count: usize) -> String {
    if count == 1 {
        word.to_string()
    } else {
        format!("{word}s")
    }
}

pub(crate) fn duration(report: &ScanReport) -> Duration {
    let ms = u64::try_from(report.duration_ms).unwrap_or(u64::MAX);
    Duration::from_millis(ms)
}

/// "2 warnings, 1 suggestion", or `None` when there is nothing to count.
pub(crate) fn counts_phrase(report: &ScanReport) -> Option<String> {
    let s = &report.summary;
    let parts: Vec<String> = [(s.critical, "error"), (s.warning, "warning"), (s.suggestion, "suggestion")]
        .into_iter()
        .filter(|(n, _)| *n > 0)
        .map(|(n, word)| format!("{n} {}", pluralize(word, n)))
        .collect();
    (!parts.is_empty()).then(|| parts.join(", "))
}

/// Lines `row - 1 ..= row + 1` of `path`, if it can still be read.
pub(crate) fn snippet(path: &str, row: usize) -> Vec<(usize, String)> {
    let Ok(content) = std::fs::read_to_string(path) else {
        return Vec::new();
    };
    let lines: Vec<&str> = content.lines().collect();
    let idx = row.saturating_sub(1);
    let start = idx.saturating_sub(1);
    let end = (idx + 1).min(lines.len().saturating_sub(1));
    (start..=end)
        .filter_map(|i| lines.get(i).map(|l| (i + 1, (*l).to_string())))
        .collect()
}
