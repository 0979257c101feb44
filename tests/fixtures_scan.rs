// tests/fixtures_scan.rs - End-to-end scans over the C++ fixtures
use cppsieve_core::analysis::{Engine, SourceUnit};
use cppsieve_core::discovery;
use cppsieve_core::types::{RuleId, ScanReport, UnitConfidence, UnitReport};
use std::path::PathBuf;

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn fixture(name: &str) -> SourceUnit {
    let text = std::fs::read_to_string(fixtures_dir().join(name)).unwrap();
    SourceUnit::new(name, text)
}

fn scan_all() -> ScanReport {
    let units: Vec<SourceUnit> = ["main.cpp", "server.cpp", "server.hpp", "utils.h"].into_iter().map(fixture).collect();
    Engine::default().analyze_all(&units)
}

fn unit<'a>(report: &'a ScanReport, file: &str) -> &'a UnitReport {
    report.units.iter().find(|u| u.file == file).unwrap()
}

fn coded_lines(unit: &UnitReport) -> Vec<(usize, &'static str)> {
    unit.findings.iter().map(|f| (f.location.line, f.code)).collect()
}

#[test]
fn main_cpp_reports_copy_flush_and_raw_pointer() {
    let report = scan_all();
    let main = unit(&report, "main.cpp");
    assert_eq!(main.confidence, UnitConfidence::Full);
    assert_eq!(coded_lines(main), vec![(11, "P01"), (12, "P02"), (15, "R01")]);

    let p01 = &main.findings[0];
    assert!(p01.message.contains("`item`"));
    assert_eq!(p01.suggestion.as_deref(), Some("bind by reference: `const auto& item`"));

    let p02 = &main.findings[1];
    assert!(p02.message.contains("std::endl"));

    let r01 = &main.findings[2];
    assert_eq!(r01.rule, RuleId::OwningRawPointer);
    let related: Vec<(usize, &str)> = r01.related.iter().map(|r| (r.location.line, r.label.as_str())).collect();
    assert_eq!(related, vec![(16, "stream I/O may throw before release"), (17, "released here")]);
}

#[test]
fn endl_outside_a_loop_is_not_reported() {
    let report = scan_all();
    let main = unit(&report, "main.cpp");
    assert!(!main.findings.iter().any(|f| f.rule == RuleId::LoopFlush && f.location.line == 16));
}

#[test]
fn server_cpp_reports_running_flag_race() {
    let report = scan_all();
    let server = unit(&report, "server.cpp");
    assert_eq!(coded_lines(server), vec![(6, "C01"), (10, "C01"), (18, "C01")]);
    assert!(server.findings.iter().all(|f| f.message.contains("Server::m_running")));

    let locked_write = &server.findings[0];
    assert!(locked_write.message.contains("under `m_mutex`"));
    let related: Vec<usize> = locked_write.related.iter().map(|r| r.location.line).collect();
    assert_eq!(related, vec![10, 18]);

    let threaded_read = &server.findings[1];
    assert!(threaded_read.message.contains("read here without holding `m_mutex`"));
    assert_eq!(threaded_read.related[0].location.line, 6);
}

#[test]
fn headers_are_clean() {
    let report = scan_all();
    for file in ["server.hpp", "utils.h"] {
        let u = unit(&report, file);
        assert!(u.findings.is_empty(), "{file}: {:?}", u.findings);
        assert_ne!(u.confidence, UnitConfidence::Failed);
    }
}

#[test]
fn summary_counts_and_score() {
    let report = scan_all();
    assert_eq!(report.summary.units_analyzed, 4);
    assert_eq!(report.summary.warning, 6);
    assert_eq!(report.summary.units_failed, 0);
    assert_eq!(report.summary.score, 70);
}

#[test]
fn discovery_finds_all_fixtures() {
    let files = discovery::discover(&[fixtures_dir()]).unwrap();
    let names: Vec<String> = files
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    assert_eq!(names, vec!["main.cpp", "server.cpp", "server.hpp", "utils.h"]);
}

#[test]
fn disabling_a_rule_removes_only_its_findings() {
    let mut config = cppsieve_core::config::Config::new();
    config.disable("R01").unwrap();
    let report = Engine::from_config(&config).analyze(&fixture("main.cpp"));
    assert_eq!(coded_lines(&report), vec![(11, "P01"), (12, "P02")]);
}
