// src/analysis/rules/performance_p01_test.rs

use crate::analysis::rules::test_support::{check, lines_of};
use crate::types::RuleId;

fn p01(src: &str) -> Vec<crate::types::Finding> {
    check(RuleId::RangeForCopy, src)
}

#[test]
fn flags_auto_copy_of_strings() {
    let src = "void f() {\n  std::vector<std::string> items;\n  for (auto item : items) {\n    use(item);\n  }\n}";
    let findings = p01(src);
    assert_eq!(lines_of(&findings), vec![3]);
    let f = &findings[0];
    assert!(f.message.contains("`item`"));
    assert!(f.message.contains("std::string"));
    assert_eq!(f.suggestion.as_deref(), Some("bind by reference: `const auto& item`"));
    assert_eq!(f.location.column, 8);
}

#[test]
fn reference_binding_is_clean() {
    let src = "void f(std::vector<std::string>& items) {\n  for (auto& item : items) {}\n  for (const auto& item : items) {}\n  for (auto&& item : items) {}\n}";
    assert!(p01(src).is_empty());
}

#[test]
fn trivial_elements_are_clean() {
    let src = "void f(const std::vector<int>& v, std::vector<Foo*> ptrs) {\n  for (auto x : v) {}\n  for (int y : v) {}\n  for (auto p : ptrs) {}\n  for (auto* q : ptrs) {}\n}";
    assert!(p01(src).is_empty());
}

#[test]
fn explicit_class_type_by_value() {
    let src = "void f(const std::vector<Widget>& ws) {\n  for (const Widget w : ws) {}\n}";
    let findings = p01(src);
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].suggestion.as_deref(), Some("bind by reference: `const Widget& w`"));
}

#[test]
fn map_iteration_copies_pairs() {
    let src = "void f() {\n  std::map<std::string, int> counts;\n  for (auto [key, n] : counts) {}\n}";
    let findings = p01(src);
    assert_eq!(findings.len(), 1);
    assert!(findings[0].message.contains("std::pair<const std::string, int>"));
}

#[test]
fn unknown_range_is_skipped() {
    let src = "void f() {\n  for (auto item : load()) {}\n  for (auto item : mystery) {}\n}";
    assert!(p01(src).is_empty());
}

#[test]
fn template_parameter_elements_are_skipped() {
    let src = "template <typename T>\nvoid f(const std::vector<T>& v) {\n  for (auto x : v) {}\n}";
    assert!(p01(src).is_empty());
}

#[test]
fn member_containers_resolve_through_class() {
    let src = "class Registry {\n  std::vector<std::string> names;\n  void dump() {\n    for (auto n : names) {}\n    for (auto m : this->names) {}\n  }\n};";
    assert_eq!(lines_of(&p01(src)), vec![4, 5]);
}
