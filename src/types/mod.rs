use serde::Serialize;
use std::fmt;

use crate::error::UnitDiagnostic;
use crate::file_class::FileCategory;

mod location;
pub use location::{LineIndex, Location, Related};

/// How urgently a finding should be addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Worth a look. Not wrong as written.
    Suggestion,
    /// Likely defect or measurable cost.
    Warning,
    /// Crash, data loss, or undefined behaviour.
    Critical,
}

impl Severity {
    /// Prefix word for the report line.
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Critical => "error",
            Self::Warning => "warn",
            Self::Suggestion => "info",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "suggestion" | "info" => Some(Self::Suggestion),
            "warning" | "warn" => Some(Self::Warning),
            "critical" | "error" => Some(Self::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Suggestion => "suggestion",
            Self::Warning => "warning",
            Self::Critical => "critical",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Performance,
    MemorySafety,
    Concurrency,
}

/// The closed set of detectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    RangeForCopy,
    LoopFlush,
    OwningRawPointer,
    UnsynchronizedSharedState,
}

impl RuleId {
    pub const ALL: [RuleId; 4] = [
        RuleId::RangeForCopy,
        RuleId::LoopFlush,
        RuleId::OwningRawPointer,
        RuleId::UnsynchronizedSharedState,
    ];

    /// Short stable code shown in reports.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Self::RangeForCopy => "P01",
            Self::LoopFlush => "P02",
            Self::OwningRawPointer => "R01",
            Self::UnsynchronizedSharedState => "C01",
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::RangeForCopy => "range-for-copy",
            Self::LoopFlush => "loop-flush",
            Self::OwningRawPointer => "owning-raw-pointer",
            Self::UnsynchronizedSharedState => "unsynchronized-shared-state",
        }
    }

    #[must_use]
    pub fn category(self) -> Category {
        match self {
            Self::RangeForCopy | Self::LoopFlush => Category::Performance,
            Self::OwningRawPointer => Category::MemorySafety,
            Self::UnsynchronizedSharedState => Category::Concurrency,
        }
    }

    #[must_use]
    pub fn default_severity(self) -> Severity {
        Severity::Warning
    }

    /// Accepts the kebab-case name or the code, case-insensitively.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(s) || r.code().eq_ignore_ascii_case(s))
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One reported antipattern instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub rule: RuleId,
    pub code: &'static str,
    pub severity: Severity,
    pub category: Category,
    pub file: String,
    pub message: String,
    pub location: Location,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<Related>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

impl Finding {
    #[must_use]
    pub fn new(rule: RuleId, file: &str, location: Location, message: String) -> Self {
        Self {
            rule,
            code: rule.code(),
            severity: rule.default_severity(),
            category: rule.category(),
            file: file.to_string(),
            message,
            location,
            related: Vec::new(),
            suggestion: None,
            notes: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_related(mut self, location: Location, label: impl Into<String>) -> Self {
        self.related.push(Related { location, label: label.into() });
        self
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    #[must_use]
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

/// How far a unit's findings can be trusted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitConfidence {
    Full,
    /// Parts of the unit were lexed or parsed with recovery.
    Reduced,
    /// Analysis aborted; the unit contributes no findings.
    Failed,
}

/// Analysis results for a single translation unit.
#[derive(Debug, Clone, Serialize)]
pub struct UnitReport {
    pub file: String,
    pub category: FileCategory,
    pub confidence: UnitConfidence,
    pub findings: Vec<Finding>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<UnitDiagnostic>,
    pub token_count: usize,
    pub opaque_ratio: f64,
}

impl UnitReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.findings.is_empty()
    }

    #[must_use]
    pub fn failed(&self) -> bool {
        self.confidence == UnitConfidence::Failed
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub critical: usize,
    pub warning: usize,
    pub suggestion: usize,
    pub units_analyzed: usize,
    pub units_failed: usize,
    /// 0..=100, higher is better.
    pub score: u32,
}

impl Summary {
    #[must_use]
    pub fn from_units(units: &[UnitReport]) -> Self {
        let mut summary = Self { units_analyzed: units.len(), ..Self::default() };
        for unit in units {
            if unit.failed() {
                summary.units_failed += 1;
            }
            for f in &unit.findings {
                match f.severity {
                    Severity::Critical => summary.critical += 1,
                    Severity::Warning => summary.warning += 1,
                    Severity::Suggestion => summary.suggestion += 1,
                }
            }
        }
        summary.score = score(summary.critical, summary.warning, summary.suggestion);
        summary
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.critical + self.warning + self.suggestion
    }
}

/// `100 - 15 * critical - 5 * warning - 1 * suggestion`, clamped to 0..=100.
#[must_use]
pub fn score(critical: usize, warning: usize, suggestion: usize) -> u32 {
    let penalty = critical
        .saturating_mul(15)
        .saturating_add(warning.saturating_mul(5))
        .saturating_add(suggestion);
    u32::try_from(100usize.saturating_sub(penalty)).unwrap_or(0)
}

/// Aggregated results from scanning multiple units.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub units: Vec<UnitReport>,
    pub summary: Summary,
    pub duration_ms: u128,
}

impl ScanReport {
    #[must_use]
    pub fn new(units: Vec<UnitReport>, duration_ms: u128) -> Self {
        let summary = Summary::from_units(&units);
        Self { units, summary, duration_ms }
    }

    pub fn findings(&self) -> impl Iterator<Item = &Finding> {
        self.units.iter().flat_map(|u| &u.findings)
    }

    /// Drops findings below `min` and recomputes the summary.
    pub fn retain_severity(&mut self, min: Severity) {
        for unit in &mut self.units {
            unit.findings.retain(|f| f.severity >= min);
        }
        self.summary = Summary::from_units(&self.units);
    }

    #[must_use]
    pub fn has_findings_at_least(&self, min: Severity) -> bool {
        self.findings().any(|f| f.severity >= min)
    }

    /// Units in display order: by category priority, input order within a
    /// category.
    #[must_use]
    pub fn units_by_priority(&self) -> Vec<&UnitReport> {
        let mut units: Vec<&UnitReport> = self.units.iter().collect();
        units.sort_by_key(|u| u.category.priority());
        units
    }

    /// Units that analyzed without failing and produced no findings.
    #[must_use]
    pub fn clean_unit_count(&self) -> usize {
        self.units.iter().filter(|u| u.is_clean() && !u.failed()).count()
    }
}
