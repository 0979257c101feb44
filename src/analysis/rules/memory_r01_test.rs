// src/analysis/rules/memory_r01_test.rs

use crate::analysis::rules::test_support::{check, lines_of};
use crate::types::{Finding, RuleId};

fn r01(src: &str) -> Vec<Finding> {
    check(RuleId::OwningRawPointer, src)
}

#[test]
fn immediate_release_is_clean() {
    let src = "void f() {\n  int* p = new int(42);\n  delete p;\n}";
    assert!(r01(src).is_empty());
}

#[test]
fn early_return_before_release() {
    let src = "void f(bool bail) {\n  int* p = new int(42);\n  if (bail) {\n    return;\n  }\n  delete p;\n}";
    let findings = r01(src);
    assert_eq!(lines_of(&findings), vec![2]);
    let labels: Vec<&str> = findings[0].related.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["may exit before release", "released here"]);
    assert_eq!(findings[0].related[0].location.line, 4);
}

#[test]
fn stream_output_between_allocation_and_release() {
    let src = "int main() {\n  int* raw = new int(42);\n  std::cout << *raw << std::endl;\n  delete raw;\n  return 0;\n}";
    let findings = r01(src);
    assert_eq!(lines_of(&findings), vec![2]);
    assert_eq!(findings[0].related[0].label, "stream I/O may throw before release");
    assert_eq!(findings[0].suggestion.as_deref(), Some("hold it in `std::unique_ptr<int>`"));
}

#[test]
fn missing_release() {
    let src = "void f() {\n  char* buf = new char[64];\n  buf[0] = 0;\n}";
    let findings = r01(src);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].notes, vec!["no `delete` releases it in this scope".to_string()]);
    assert_eq!(findings[0].suggestion.as_deref(), Some("hold it in `std::unique_ptr<char[]>`"));
}

#[test]
fn conditional_release() {
    let src = "void f(bool done) {\n  int* p = new int;\n  if (done) { delete p; }\n}";
    let findings = r01(src);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].related[0].location.line, 3);
}

#[test]
fn use_after_release() {
    let src = "void f() {\n  int* p = new int(1);\n  delete p;\n  std::cout << *p;\n}";
    let findings = r01(src);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].related[1].label, "used after release");
    assert_eq!(findings[0].related[1].location.line, 4);
}

#[test]
fn nulling_after_release_is_fine() {
    let src = "void f() {\n  int* p = new int(1);\n  delete p;\n  p = nullptr;\n}";
    assert!(r01(src).is_empty());
}

#[test]
fn escaping_pointers_are_skipped() {
    let returned = "int* make() {\n  int* p = new int(1);\n  return p;\n}";
    let handed_off = "void f() {\n  Node* n = new Node();\n  list.adopt(n);\n}";
    let wrapped = "void f() {\n  Foo* raw = new Foo;\n  std::unique_ptr<Foo> owner(raw);\n}";
    let stored = "void f() {\n  int* p = new int;\n  m_slot = p;\n}";
    for src in [returned, handed_off, wrapped, stored] {
        assert!(r01(src).is_empty(), "unexpected finding for:\n{src}");
    }
}

#[test]
fn placement_and_members_are_ignored() {
    let placement = "void f(void* mem) {\n  Foo* p = new (mem) Foo();\n}";
    let member = "struct S {\n  int* data;\n  void init() { data = new int[8]; }\n};";
    assert!(r01(placement).is_empty());
    assert!(r01(member).is_empty());
}

#[test]
fn assignment_to_declared_pointer() {
    let src = "void f() {\n  int* p;\n  p = new int(3);\n}";
    assert_eq!(lines_of(&r01(src)), vec![3]);
}

#[test]
fn release_must_end_the_block() {
    let src = "void g();\nvoid f() {\n  int* p = new int(42);\n  delete p;\n  g();\n}";
    let findings = r01(src);
    assert_eq!(lines_of(&findings), vec![3]);
    let labels: Vec<&str> = findings[0].related.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["released here", "block continues after release"]);
    assert_eq!(findings[0].related[1].location.line, 5);
}

#[test]
fn return_after_release_ends_the_block() {
    let src = "int f() {\n  int* p = new int(42);\n  delete p;\n  p = NULL;\n  return 0;\n}";
    assert!(r01(src).is_empty());
}
