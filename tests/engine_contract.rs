// tests/engine_contract.rs - Determinism, isolation, and failure containment
use cppsieve_core::analysis::{Engine, SourceUnit};
use cppsieve_core::types::{Finding, UnitConfidence};

const RACY: &str = "\
class Flag {
  std::mutex m;
  bool ready = false;
  void set() { std::lock_guard<std::mutex> g(m); ready = true; }
  void spawn() { std::thread t([this] { if (ready) {} }); t.join(); }
};";

const LOOPS: &str = "\
void f(const std::vector<std::string>& v) {
  for (auto s : v) { std::cout << s << std::endl; }
}";

fn findings(unit: &SourceUnit) -> Vec<Finding> {
    Engine::default().analyze(unit).findings
}

#[test]
fn repeated_analysis_is_identical() {
    let unit = SourceUnit::new("racy.cpp", RACY);
    let first = findings(&unit);
    assert!(!first.is_empty());
    for _ in 0..5 {
        assert_eq!(findings(&unit), first);
    }
}

#[test]
fn units_do_not_influence_each_other() {
    let racy = SourceUnit::new("racy.cpp", RACY);
    let loops = SourceUnit::new("loops.cpp", LOOPS);
    let alone_racy = findings(&racy);
    let alone_loops = findings(&loops);

    let batch = Engine::default().analyze_all(&[loops.clone(), racy.clone(), loops, racy]);
    assert_eq!(batch.units[0].findings, alone_loops);
    assert_eq!(batch.units[1].findings, alone_racy);
    assert_eq!(batch.units[2].findings, alone_loops);
    assert_eq!(batch.units[3].findings, alone_racy);
}

#[test]
fn findings_are_in_source_order() {
    let report = Engine::default().analyze(&SourceUnit::new("loops.cpp", LOOPS));
    let starts: Vec<usize> = report.findings.iter().map(|f| f.location.start).collect();
    let mut sorted = starts.clone();
    sorted.sort_unstable();
    assert_eq!(starts, sorted);
    assert_eq!(report.findings.len(), 2);
}

#[test]
fn malformed_input_still_reports() {
    let src = "void f() {\n  const char* s = \"unterminated;\n  int* p = new int;\n}\n";
    let report = Engine::default().analyze(&SourceUnit::new("bad.cpp", src));
    assert_eq!(report.confidence, UnitConfidence::Reduced);
    assert!(report.diagnostics.iter().any(|d| d.line() == Some(2)));
}

#[test]
fn empty_and_garbage_units_do_not_fail() {
    for src in ["", "   \n\t", "}}}{{{", ")))(((", "#define X(a) a\n", "template<<<>>>"] {
        let report = Engine::default().analyze(&SourceUnit::new("junk.cpp", src));
        assert_ne!(report.confidence, UnitConfidence::Failed, "{src:?}");
    }
}

#[test]
fn lex_errors_stay_inside_their_unit() {
    let racy = SourceUnit::new("racy.cpp", RACY);
    let loops = SourceUnit::new("loops.cpp", LOOPS);
    let clean = SourceUnit::new("clean.cpp", "int main() { return 0; }");
    let open_string = SourceUnit::new("string.cpp", "void f() {\n  const char* s = \"oops;\n}\n");
    let open_raw = SourceUnit::new("raw.cpp", "void g() {\n  auto r = R\"(never closed;\n}\n");
    let engine = Engine::default();
    let alone: Vec<_> = [&racy, &loops, &clean].into_iter().map(|u| engine.analyze(u)).collect();
    assert!(!alone[0].findings.is_empty());
    assert!(!alone[1].findings.is_empty());

    let batch = engine.analyze_all(&[open_string, racy, open_raw, loops, clean]);
    assert_eq!(batch.units.len(), 5);
    for broken in [&batch.units[0], &batch.units[2]] {
        assert_eq!(broken.confidence, UnitConfidence::Reduced, "{}", broken.file);
    }
    for (got, want) in [&batch.units[1], &batch.units[3], &batch.units[4]].into_iter().zip(&alone) {
        assert_eq!(got.findings, want.findings, "{}", got.file);
        assert_eq!(got.confidence, want.confidence, "{}", got.file);
        assert_eq!(got.diagnostics, want.diagnostics, "{}", got.file);
    }
    assert_eq!(batch.units[4].confidence, UnitConfidence::Full);
}
