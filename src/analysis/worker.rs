// src/analysis/worker.rs
//! Single-unit pipeline: lex, parse, track, run rules, collect.

use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, trace, warn};

use super::collector::Collector;
use super::rules::{self, RuleContext, RuleSet};
use super::CancelToken;
use crate::error::{AnalysisIncomplete, EngineError, Result, UnitDiagnostic};
use crate::file_class;
use crate::lexer::Lexer;
use crate::symbols::SymbolTable;
use crate::syntax;
use crate::types::{Finding, LineIndex, UnitConfidence, UnitReport};

/// One translation unit as handed over by file discovery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    pub file: String,
    pub text: String,
}

impl SourceUnit {
    #[must_use]
    pub fn new(file: impl Into<String>, text: impl Into<String>) -> Self {
        Self { file: file.into(), text: text.into() }
    }
}

/// Per-unit knobs, fixed for a whole scan.
#[derive(Debug, Clone)]
pub struct UnitOptions {
    pub rules: RuleSet,
    pub max_opaque_ratio: f64,
    pub max_nesting: usize,
}

impl Default for UnitOptions {
    fn default() -> Self {
        Self { rules: RuleSet::all(), max_opaque_ratio: 0.5, max_nesting: syntax::DEFAULT_MAX_NESTING }
    }
}

struct Outcome {
    findings: Vec<Finding>,
    diagnostics: Vec<UnitDiagnostic>,
    token_count: usize,
    opaque_ratio: f64,
    reduced: bool,
}

/// Analyzes one unit. Never fails: errors become a `Failed` report with a
/// diagnostic and no findings.
#[must_use]
pub fn analyze_unit(unit: &SourceUnit, options: &UnitOptions, cancel: &CancelToken) -> UnitReport {
    let _span = tracing::debug_span!("unit", file = %unit.file).entered();
    let category = file_class::classify(&unit.file, &unit.text);
    let result = catch_unwind(AssertUnwindSafe(|| run_pipeline(unit, options, cancel))).unwrap_or_else(|_| {
        Err(EngineError::InternalInvariantViolation {
            unit: unit.file.clone(),
            detail: "analysis panicked".into(),
        })
    });

    match result {
        Ok(outcome) => {
            debug!(findings = outcome.findings.len(), "unit analyzed");
            UnitReport {
                file: unit.file.clone(),
                category,
                confidence: if outcome.reduced { UnitConfidence::Reduced } else { UnitConfidence::Full },
                findings: outcome.findings,
                diagnostics: outcome.diagnostics,
                token_count: outcome.token_count,
                opaque_ratio: outcome.opaque_ratio,
            }
        }
        Err(err) => {
            warn!(error = %err, "unit analysis failed");
            let diagnostic = match err {
                EngineError::Cancelled { stage, .. } => UnitDiagnostic::Cancelled { stage: stage.to_string() },
                EngineError::InternalInvariantViolation { detail, .. } => {
                    UnitDiagnostic::InternalInvariantViolation { detail }
                }
                other => UnitDiagnostic::InternalInvariantViolation { detail: other.to_string() },
            };
            UnitReport {
                file: unit.file.clone(),
                category,
                confidence: UnitConfidence::Failed,
                findings: Vec::new(),
                diagnostics: vec![diagnostic],
                token_count: 0,
                opaque_ratio: 0.0,
            }
        }
    }
}

fn checkpoint(cancel: &CancelToken, unit: &SourceUnit, stage: &'static str) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(EngineError::Cancelled { unit: unit.file.clone(), stage });
    }
    Ok(())
}

fn run_pipeline(unit: &SourceUnit, options: &UnitOptions, cancel: &CancelToken) -> Result<Outcome> {
    checkpoint(cancel, unit, "lexing")?;
    let lexed = Lexer::tokenize(&unit.text);
    let mut diagnostics: Vec<UnitDiagnostic> = Vec::new();
    for err in &lexed.errors {
        debug!(line = err.line, column = err.column, "lex error: {err}");
        diagnostics.push(UnitDiagnostic::Lex(err.clone()));
    }
    let mut reduced = !lexed.errors.is_empty();

    checkpoint(cancel, unit, "parsing")?;
    let parsed = syntax::parse(&lexed, unit.text.len(), options.max_nesting);
    parsed.tree.validate().map_err(|detail| EngineError::InternalInvariantViolation {
        unit: unit.file.clone(),
        detail,
    })?;
    for warning in &parsed.warnings {
        trace!(line = warning.line, reason = %warning.reason, "parse recovery");
        diagnostics.push(UnitDiagnostic::ParseRecovery(warning.clone()));
    }
    let opaque_ratio = parsed.opaque_ratio();
    if opaque_ratio > options.max_opaque_ratio {
        debug!(opaque_ratio, "too much of the unit is opaque");
        diagnostics.push(UnitDiagnostic::AnalysisIncomplete(AnalysisIncomplete {
            opaque_ratio,
            threshold: options.max_opaque_ratio,
        }));
        reduced = true;
    }

    checkpoint(cancel, unit, "tracking")?;
    let symbols = SymbolTable::build(&parsed.tree);
    trace!(declarations = symbols.declarations().count(), accesses = symbols.accesses().len(), "symbols built");

    checkpoint(cancel, unit, "rules")?;
    let lines = LineIndex::new(&unit.text);
    let ctx = RuleContext { file: &unit.file, tree: &parsed.tree, symbols: &symbols, lines: &lines };
    let mut collector = Collector::new();
    collector.merge(rules::run(&ctx, &options.rules));

    Ok(Outcome {
        findings: collector.finish(),
        diagnostics,
        token_count: parsed.total_tokens,
        opaque_ratio,
        reduced,
    })
}
