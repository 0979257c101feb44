//! Scan orchestration: fans units out across the rayon pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::types::{ScanReport, UnitReport};

use super::worker::{self, SourceUnit, UnitOptions};

/// Stack for scan workers. Tree passes recurse once per nesting level.
const WORKER_STACK_BYTES: usize = 16 * 1024 * 1024;

/// Shared cancellation flag. Checked between pipeline stages; a cancelled
/// unit reports `Failed` with a `Cancelled` diagnostic.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// The analysis engine. Units are independent: no state is shared between
/// them beyond the read-only options.
pub struct Engine {
    options: UnitOptions,
    cancel: CancelToken,
}

impl Engine {
    #[must_use]
    pub fn new(options: UnitOptions) -> Self {
        Self { options, cancel: CancelToken::new() }
    }

    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(UnitOptions {
            rules: config.rules.clone(),
            max_opaque_ratio: config.max_opaque_ratio,
            max_nesting: config.max_nesting,
        })
    }

    /// A handle that cancels every analysis started by this engine.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn options(&self) -> &UnitOptions {
        &self.options
    }

    #[must_use]
    pub fn analyze(&self, unit: &SourceUnit) -> UnitReport {
        worker::analyze_unit(unit, &self.options, &self.cancel)
    }

    /// Convenience for a single in-memory buffer.
    #[must_use]
    pub fn analyze_source(&self, file: &str, text: &str) -> UnitReport {
        self.analyze(&SourceUnit::new(file, text))
    }

    /// Analyzes all units in parallel. Report order follows input order.
    #[must_use]
    pub fn analyze_all(&self, units: &[SourceUnit]) -> ScanReport {
        let start = std::time::Instant::now();
        debug!(units = units.len(), rules = self.options.rules.len(), "starting scan");

        let scan = || -> Vec<UnitReport> { units.par_iter().map(|unit| self.analyze(unit)).collect() };
        let reports = match rayon::ThreadPoolBuilder::new()
            .stack_size(WORKER_STACK_BYTES)
            .thread_name(|i| format!("cppsieve-worker-{i}"))
            .build()
        {
            Ok(pool) => pool.install(scan),
            Err(e) => {
                warn!(error = %e, "could not build the scan pool; using the global one");
                scan()
            }
        };

        let report = ScanReport::new(reports, start.elapsed().as_millis());
        info!(
            units = report.summary.units_analyzed,
            findings = report.summary.total(),
            failed = report.summary.units_failed,
            "scan complete"
        );
        report
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(UnitOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnitDiagnostic;
    use crate::types::{RuleId, UnitConfidence};

    #[test]
    fn cancelled_engine_fails_units_without_findings() {
        let engine = Engine::default();
        engine.cancel_token().cancel();
        let report = engine.analyze_source("a.cpp", "int main() { int* p = new int; return 0; }");
        assert_eq!(report.confidence, UnitConfidence::Failed);
        assert!(report.findings.is_empty());
        assert!(matches!(&report.diagnostics[..], [UnitDiagnostic::Cancelled { stage }] if stage == "lexing"));
    }

    #[test]
    fn disabled_rules_do_not_run() {
        let src = "void f(const std::vector<std::string>& v) { for (auto s : v) { std::cout << s << std::endl; } }";
        let mut config = Config::new();
        config.rules.set(RuleId::LoopFlush, false);
        let report = Engine::from_config(&config).analyze_source("a.cpp", src);
        let rules: Vec<RuleId> = report.findings.iter().map(|f| f.rule).collect();
        assert_eq!(rules, vec![RuleId::RangeForCopy]);
    }

    #[test]
    fn opaque_heavy_unit_is_reduced() {
        let options = UnitOptions { max_opaque_ratio: 0.0, ..UnitOptions::default() };
        let report = Engine::new(options).analyze_source("a.cpp", "void f() {\n  int x = (1;\n  int ok;\n}");
        assert_eq!(report.confidence, UnitConfidence::Reduced);
        assert!(report.diagnostics.iter().any(|d| matches!(d, UnitDiagnostic::AnalysisIncomplete(_))));
        assert!(report.diagnostics.iter().any(|d| matches!(d, UnitDiagnostic::ParseRecovery(w) if w.line == 2)));
    }

    #[test]
    fn long_member_chain_stays_within_its_unit() {
        let chain = format!("void f() {{ int x = a{}; }}", ".b".repeat(3000));
        let units = [SourceUnit::new("chain.cpp", chain), SourceUnit::new("ok.cpp", "int main() { return 0; }")];
        let scan = Engine::default().analyze_all(&units);
        assert_eq!(scan.units.len(), 2);
        let deep = &scan.units[0];
        assert_ne!(deep.confidence, UnitConfidence::Failed);
        assert!(deep
            .diagnostics
            .iter()
            .any(|d| matches!(d, UnitDiagnostic::ParseRecovery(w) if w.reason == "nesting too deep")));
        assert_eq!(scan.units[1].confidence, UnitConfidence::Full);
        assert!(scan.units[1].diagnostics.is_empty());
    }

    #[test]
    fn scan_preserves_input_order() {
        let units: Vec<SourceUnit> =
            (0..8).map(|i| SourceUnit::new(format!("u{i}.cpp"), format!("int f{i}() {{ return {i}; }}"))).collect();
        let scan = Engine::default().analyze_all(&units);
        let files: Vec<&str> = scan.units.iter().map(|u| u.file.as_str()).collect();
        assert_eq!(files, units.iter().map(|u| u.file.as_str()).collect::<Vec<_>>());
        assert_eq!(scan.summary.units_analyzed, 8);
        assert_eq!(scan.summary.score, 100);
    }
}
