// src/analysis/collector.rs
//! Merges per-rule findings into one ordered, duplicate-free list.

use std::collections::BTreeMap;

use crate::types::{Finding, RuleId};

/// Findings keyed by (start, end, rule). Identical keys are merged: the
/// first finding wins and later related locations are appended to it.
#[derive(Debug, Default)]
pub struct Collector {
    findings: BTreeMap<(usize, usize, RuleId), Finding>,
}

impl Collector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ingest(&mut self, finding: Finding) {
        let key = (finding.location.start, finding.location.end, finding.rule);
        match self.findings.get_mut(&key) {
            Some(existing) => {
                for related in finding.related {
                    if !existing.related.contains(&related) {
                        existing.related.push(related);
                    }
                }
            }
            None => {
                self.findings.insert(key, finding);
            }
        }
    }

    pub fn merge(&mut self, batches: impl IntoIterator<Item = Vec<Finding>>) {
        for batch in batches {
            for finding in batch {
                self.ingest(finding);
            }
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.findings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.findings.is_empty()
    }

    /// Findings in source order; ties broken by rule.
    #[must_use]
    pub fn finish(self) -> Vec<Finding> {
        self.findings.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;

    fn at(start: usize, rule: RuleId) -> Finding {
        let location = Location { line: 1, column: start + 1, end_line: 1, end_column: start + 3, start, end: start + 2 };
        Finding::new(rule, "a.cpp", location, format!("{rule} at {start}"))
    }

    #[test]
    fn orders_by_position_then_rule() {
        let mut c = Collector::new();
        c.merge([
            vec![at(9, RuleId::LoopFlush)],
            vec![at(2, RuleId::OwningRawPointer), at(2, RuleId::RangeForCopy)],
        ]);
        let order: Vec<(usize, RuleId)> = c.finish().iter().map(|f| (f.location.start, f.rule)).collect();
        assert_eq!(
            order,
            vec![(2, RuleId::RangeForCopy), (2, RuleId::OwningRawPointer), (9, RuleId::LoopFlush)]
        );
    }

    #[test]
    fn duplicates_merge_related_locations() {
        let mut c = Collector::new();
        let other = at(20, RuleId::LoopFlush).location;
        c.ingest(at(4, RuleId::UnsynchronizedSharedState).with_related(other, "first"));
        c.ingest(at(4, RuleId::UnsynchronizedSharedState).with_related(other, "first"));
        c.ingest(at(4, RuleId::UnsynchronizedSharedState).with_related(other, "second"));
        assert_eq!(c.len(), 1);
        let merged = c.finish();
        assert_eq!(merged[0].related.len(), 2);
    }
}
