// src/file_class.rs
//! Unit classification: what kind of C++ file a translation unit is.
//!
//! Content patterns are checked first since they are more specific; the path
//! is only consulted when no content pattern matches. The category is carried
//! on each unit report for display and ordering. Rules never depend on it.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Concurrency,
    Allocator,
    Implementation,
    Header,
    Main,
    Template,
    Test,
    Other,
}

impl FileCategory {
    /// Display order: concurrency and allocator code first, tests last.
    #[must_use]
    pub fn priority(self) -> u8 {
        match self {
            Self::Concurrency => 0,
            Self::Allocator => 1,
            Self::Implementation => 2,
            Self::Header => 3,
            Self::Main => 4,
            Self::Template => 5,
            Self::Test => 6,
            Self::Other => 7,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Concurrency => "concurrency",
            Self::Allocator => "allocator",
            Self::Implementation => "implementation",
            Self::Header => "header",
            Self::Main => "main",
            Self::Template => "template",
            Self::Test => "test",
            Self::Other => "other",
        }
    }
}

struct CategoryRule {
    category: FileCategory,
    content: Vec<Regex>,
    path: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

static RULES: LazyLock<Vec<CategoryRule>> = LazyLock::new(|| {
    vec![
        CategoryRule {
            category: FileCategory::Concurrency,
            content: compile(&[
                r"std::thread\b",
                r"std::mutex\b",
                r"std::atomic\b",
                r"std::condition_variable\b",
                r"std::async\b",
                r"std::future\b",
                r"std::shared_mutex\b",
                r"std::lock_guard\b",
                r"std::unique_lock\b",
                r"std::jthread\b",
                r"pthread_",
            ]),
            path: compile(&[r"(?i)thread", r"(?i)concurren", r"(?i)parallel", r"(?i)async"]),
        },
        CategoryRule {
            category: FileCategory::Allocator,
            content: compile(&[
                r"allocator\b",
                r"(?i)memory_pool",
                r"(?i)arena\b",
                r"operator\s+new\b",
                r"operator\s+delete\b",
                r"std::pmr\b",
                r"malloc\b",
                r"\bfree\b",
            ]),
            path: compile(&[r"(?i)alloc", r"(?i)memory", r"(?i)pool", r"(?i)arena"]),
        },
        CategoryRule {
            category: FileCategory::Test,
            content: compile(&[
                r"TEST\s*\(",
                r"TEST_F\s*\(",
                r"TEST_P\s*\(",
                r"EXPECT_",
                r"ASSERT_",
                r"BOOST_AUTO_TEST",
                r"CATCH_TEST_CASE",
                r"TEST_CASE\s*\(",
                r"doctest",
            ]),
            path: compile(&[r"(?i)test", r"(?i)spec", r"(?i)_test\.", r"(?i)_tests\."]),
        },
        CategoryRule {
            category: FileCategory::Main,
            content: compile(&[r"int\s+main\s*\(", r"int\s+wmain\s*\("]),
            path: compile(&[r"(?i)main\.(cpp|cc|cxx|c)$"]),
        },
        CategoryRule {
            category: FileCategory::Template,
            content: compile(&[r"template\s*<[^>]*>\s*class", r"template\s*<[^>]*>\s*struct"]),
            path: compile(&[r"(?i)\.ipp$", r"(?i)\.tpp$", r"(?i)_impl\.h"]),
        },
        CategoryRule {
            category: FileCategory::Header,
            content: Vec::new(),
            path: compile(&[r"(?i)\.(h|hpp|hxx|hh)$"]),
        },
        CategoryRule {
            category: FileCategory::Implementation,
            content: Vec::new(),
            path: compile(&[r"(?i)\.(cpp|cc|cxx|c)$"]),
        },
    ]
});

/// Classifies a unit by its text, then by its file identifier.
#[must_use]
pub fn classify(file: &str, content: &str) -> FileCategory {
    let by_content = RULES
        .iter()
        .find(|rule| rule.content.iter().any(|re| re.is_match(content)));
    let by_path = || RULES.iter().find(|rule| rule.path.iter().any(|re| re.is_match(file)));
    by_content
        .or_else(by_path)
        .map_or(FileCategory::Other, |rule| rule.category)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_beats_path() {
        let src = "#include <thread>\nstd::thread t(run);";
        assert_eq!(classify("src/util.hpp", src), FileCategory::Concurrency);
    }

    #[test]
    fn allocator_patterns() {
        assert_eq!(classify("a.cpp", "void* p = malloc(16);"), FileCategory::Allocator);
        assert_eq!(classify("a.cpp", "void* operator new(size_t n);"), FileCategory::Allocator);
    }

    #[test]
    fn test_macros() {
        assert_eq!(classify("x.cpp", "TEST_F(Fixture, Works) {}"), FileCategory::Test);
    }

    #[test]
    fn main_function() {
        assert_eq!(classify("tool.cpp", "int main() { return 0; }"), FileCategory::Main);
    }

    #[test]
    fn class_template() {
        let src = "template<typename T>\nclass Pool {};";
        assert_eq!(classify("pool.h", src), FileCategory::Template);
    }

    #[test]
    fn falls_back_to_extension() {
        assert_eq!(classify("include/widget.hpp", "struct W {};"), FileCategory::Header);
        assert_eq!(classify("src/widget.cc", "struct W {};"), FileCategory::Implementation);
        assert_eq!(classify("notes.txt", "hello"), FileCategory::Other);
    }

    #[test]
    fn path_patterns_are_case_insensitive() {
        assert_eq!(classify("src/ThreadPool.txt", ""), FileCategory::Concurrency);
    }
}
