// src/symbols/types.rs
//! Textual type classification.
//!
//! Declared types are matched against well-known ownership and
//! synchronization idioms. Nothing here resolves typedefs or templates; an
//! unrecognized class type is a plain `Value`.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeCategory {
    /// Class or otherwise unrecognized type held by value.
    Value,
    /// Builtin arithmetic type or a fixed-width alias.
    Primitive,
    Reference,
    /// Raw pointer. `owning` once the tracker sees a `new` stored into it.
    Pointer { owning: bool },
    SmartPointer,
    /// Mutex-like synchronization primitive (condition variables included).
    Mutex,
    /// RAII lock holder: `lock_guard`, `unique_lock`, `scoped_lock`, `shared_lock`.
    LockGuard,
    Atomic,
    Thread,
    /// Container whose elements are threads.
    ThreadContainer,
    Container,
    /// `auto` or `decltype(...)`; resolved only through the initializer.
    Inferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeDescriptor {
    /// Type as written, declarator operators included.
    pub text: String,
    /// `text` without cv-qualifiers and reference/pointer operators.
    pub base: String,
    pub category: TypeCategory,
}

static SMART_PTR_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(std::|boost::)?(unique_ptr|shared_ptr|weak_ptr|auto_ptr|scoped_ptr|intrusive_ptr)\b|^(Microsoft::WRL::)?ComPtr\b|^QScopedPointer\b").ok()
});
static MUTEX_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(std::|boost::)?((recursive_|timed_|recursive_timed_|shared_|shared_timed_)?mutex|condition_variable(_any)?|once_flag)$|^(pthread_mutex_t|pthread_cond_t|CRITICAL_SECTION|SRWLOCK|QMutex|SpinLock|spinlock)$").ok()
});
static GUARD_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(std::|boost::)?(lock_guard|unique_lock|scoped_lock|shared_lock)\b|^QMutexLocker\b").ok());
static ATOMIC_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(std::)?(atomic\b|atomic_\w+$)").ok());
static THREAD_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(std::)?(thread|jthread)$|^(pthread_t|QThread)$").ok());
static CONTAINER_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^(std::)?(vector|list|forward_list|deque|array|map|multimap|unordered_map|unordered_multimap|set|multiset|unordered_set|unordered_multiset|queue|priority_queue|stack|basic_string|string|wstring|u8string|u16string|u32string|valarray)\b").ok()
});
static PRIMITIVE_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^((unsigned|signed|short|long|int|char|char8_t|char16_t|char32_t|wchar_t|bool|float|double)( |$))+$|^(std::)?(u?int(8|16|32|64|ptr|max)_t|u?int_(fast|least)(8|16|32|64)_t|size_t|ssize_t|ptrdiff_t|byte|nullptr_t)$").ok()
});

fn matches(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|re| re.is_match(text))
}

const QUALIFIERS: &[&str] = &[
    "const", "volatile", "static", "mutable", "inline", "constexpr", "constinit", "thread_local",
    "typename", "struct", "class", "extern", "register",
];

/// Drops qualifiers and declarator operators: `const std::string&` becomes `std::string`.
#[must_use]
pub fn base_type(text: &str) -> String {
    let trimmed = text.trim_end_matches(['&', '*', ' ']).trim_end_matches(" const").trim_end_matches(['&', '*', ' ']);
    trimmed
        .split(' ')
        .filter(|w| !w.is_empty() && !QUALIFIERS.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

impl TypeDescriptor {
    #[must_use]
    pub fn classify(text: &str) -> Self {
        let text = text.trim().to_string();
        let base = base_type(&text);
        let stripped = text.trim_end_matches(" const").trim_end();
        let category = if stripped.ends_with('&') {
            TypeCategory::Reference
        } else if stripped.ends_with('*') || text.ends_with("[]") {
            TypeCategory::Pointer { owning: false }
        } else {
            classify_base(&base)
        };
        Self { text, base, category }
    }

    /// Synchronization machinery, never shared data itself.
    #[must_use]
    pub fn is_sync_primitive(&self) -> bool {
        matches!(
            self.category,
            TypeCategory::Mutex
                | TypeCategory::LockGuard
                | TypeCategory::Atomic
                | TypeCategory::Thread
                | TypeCategory::ThreadContainer
        )
    }

    /// Declared `const` and held by value.
    #[must_use]
    pub fn is_immutable_value(&self) -> bool {
        let words: Vec<&str> = self.text.split(' ').collect();
        words.contains(&"const") && !matches!(self.category, TypeCategory::Pointer { .. } | TypeCategory::Reference)
            || words.contains(&"constexpr")
    }

    /// Element type yielded when iterating over a value of this type, if it
    /// can be read off the declaration.
    #[must_use]
    pub fn element_type(&self) -> Option<String> {
        element_of(&self.base)
    }
}

fn classify_base(base: &str) -> TypeCategory {
    if base == "auto" || base.starts_with("decltype") {
        TypeCategory::Inferred
    } else if matches(&PRIMITIVE_RE, base) {
        TypeCategory::Primitive
    } else if matches(&SMART_PTR_RE, base) {
        TypeCategory::SmartPointer
    } else if matches(&GUARD_RE, base) {
        TypeCategory::LockGuard
    } else if matches(&MUTEX_RE, base) {
        TypeCategory::Mutex
    } else if matches(&ATOMIC_RE, base) {
        TypeCategory::Atomic
    } else if matches(&THREAD_RE, base) {
        TypeCategory::Thread
    } else if matches(&CONTAINER_RE, base) {
        let holds_threads = element_of(base)
            .is_some_and(|e| matches!(classify_base(&e), TypeCategory::Thread));
        if holds_threads {
            TypeCategory::ThreadContainer
        } else {
            TypeCategory::Container
        }
    } else {
        TypeCategory::Value
    }
}

/// Splits the outermost template argument list: `map<K, vector<V>>` gives
/// `["K", "vector<V>"]`.
#[must_use]
pub fn template_args(text: &str) -> Vec<String> {
    let Some(open) = text.find('<') else { return Vec::new() };
    let mut depth = 0usize;
    let mut args = Vec::new();
    let mut current = String::new();
    for c in text[open..].chars() {
        match c {
            '<' => {
                depth += 1;
                if depth == 1 {
                    continue;
                }
            }
            '>' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    break;
                }
            }
            ',' if depth == 1 => {
                args.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    if !current.trim().is_empty() {
        args.push(current.trim().to_string());
    }
    args
}

fn element_of(base: &str) -> Option<String> {
    let head = base.split('<').next().unwrap_or(base);
    let head = head.strip_prefix("std::").unwrap_or(head);
    match head {
        "string" | "basic_string" | "string_view" => Some("char".into()),
        "wstring" => Some("wchar_t".into()),
        "map" | "multimap" | "unordered_map" | "unordered_multimap" => {
            let args = template_args(base);
            let key = args.first()?;
            let value = args.get(1)?;
            Some(format!("std::pair<const {key}, {value}>"))
        }
        "vector" | "list" | "forward_list" | "deque" | "array" | "set" | "multiset" | "unordered_set"
        | "unordered_multiset" | "span" | "valarray" | "initializer_list" => template_args(base).into_iter().next(),
        _ => None,
    }
}

/// Types cheap enough to copy per iteration: builtins, pointers, views.
#[must_use]
pub fn is_small_trivial(ty: &str) -> bool {
    let base = base_type(ty);
    let stripped = ty.trim_end_matches(" const").trim_end();
    if stripped.ends_with('*') {
        return true;
    }
    let head = base.split('<').next().unwrap_or(&base);
    matches(&PRIMITIVE_RE, &base)
        || matches!(
            head.strip_prefix("std::").unwrap_or(head),
            "string_view" | "wstring_view" | "u8string_view" | "span" | "reference_wrapper" | "optional_ref"
        )
        || head.ends_with("iterator")
}

/// Element types that cannot be judged: placeholders and bare template
/// parameters such as `T`.
#[must_use]
pub fn is_unresolved_element(ty: &str) -> bool {
    let base = base_type(ty);
    base.is_empty()
        || base == "auto"
        || base.starts_with("decltype")
        || (base.len() <= 2 && base.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(text: &str) -> TypeCategory {
        TypeDescriptor::classify(text).category
    }

    #[test]
    fn recognizes_sync_primitives() {
        assert_eq!(category("std::mutex"), TypeCategory::Mutex);
        assert_eq!(category("mutable std::shared_mutex"), TypeCategory::Mutex);
        assert_eq!(category("std::lock_guard<std::mutex>"), TypeCategory::LockGuard);
        assert_eq!(category("std::scoped_lock"), TypeCategory::LockGuard);
        assert_eq!(category("std::atomic<bool>"), TypeCategory::Atomic);
        assert_eq!(category("std::atomic_int"), TypeCategory::Atomic);
        assert_eq!(category("std::thread"), TypeCategory::Thread);
        assert_eq!(category("std::vector<std::thread>"), TypeCategory::ThreadContainer);
    }

    #[test]
    fn ownership_and_values() {
        assert_eq!(category("int*"), TypeCategory::Pointer { owning: false });
        assert_eq!(category("const char*"), TypeCategory::Pointer { owning: false });
        assert_eq!(category("const std::string&"), TypeCategory::Reference);
        assert_eq!(category("std::unique_ptr<Foo>"), TypeCategory::SmartPointer);
        assert_eq!(category("unsigned long long"), TypeCategory::Primitive);
        assert_eq!(category("std::size_t"), TypeCategory::Primitive);
        assert_eq!(category("std::map<int, Foo>"), TypeCategory::Container);
        assert_eq!(category("Widget"), TypeCategory::Value);
        assert_eq!(category("auto"), TypeCategory::Inferred);
    }

    #[test]
    fn element_types() {
        let vec = TypeDescriptor::classify("const std::vector<std::string>&");
        assert_eq!(vec.base, "std::vector<std::string>");
        assert_eq!(vec.element_type().as_deref(), Some("std::string"));
        let map = TypeDescriptor::classify("std::unordered_map<std::string, std::vector<int>>");
        assert_eq!(map.element_type().as_deref(), Some("std::pair<const std::string, std::vector<int>>"));
        assert_eq!(TypeDescriptor::classify("Widget").element_type(), None);
    }

    #[test]
    fn template_argument_splitting() {
        assert_eq!(template_args("std::map<int, std::pair<a, b>>"), vec!["int", "std::pair<a, b>"]);
        assert!(template_args("int").is_empty());
    }

    #[test]
    fn small_trivial_types() {
        assert!(is_small_trivial("int"));
        assert!(is_small_trivial("const double"));
        assert!(is_small_trivial("Foo*"));
        assert!(is_small_trivial("std::string_view"));
        assert!(!is_small_trivial("std::string"));
        assert!(!is_small_trivial("Widget"));
        assert!(is_unresolved_element("T"));
        assert!(!is_unresolved_element("std::string"));
    }
}
