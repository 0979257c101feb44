//! Static guidance per rule.

use crate::types::RuleId;

pub(crate) struct RuleGuidance {
    pub(crate) why: &'static str,
    pub(crate) fix: &'static str,
}

pub(crate) fn get_guidance(rule: RuleId) -> RuleGuidance {
    match rule {
        RuleId::RangeForCopy => RuleGuidance {
            why: "A by-value range-for variable copy-constructs every element; for strings and containers that is an allocation per iteration.",
            fix: "Bind by `const auto&`, or `auto&&` when the body moves from the element.",
        },
        RuleId::LoopFlush => RuleGuidance {
            why: "`std::endl` and explicit flushes force a write syscall on every iteration, defeating stream buffering.",
            fix: "Write '\\n' inside the loop and flush once after it, if at all.",
        },
        RuleId::OwningRawPointer => RuleGuidance {
            why: "A raw owning pointer leaks when any path between `new` and `delete` returns early or throws.",
            fix: "Hold the allocation in `std::unique_ptr` (via `std::make_unique`) so release is tied to scope exit.",
        },
        RuleId::UnsynchronizedSharedState => RuleGuidance {
            why: "A member written under a lock but touched without it from another thread is a data race: undefined behaviour, not just a stale read.",
            fix: "Take the same lock at every access, or make the member `std::atomic` when it is a lone flag or counter.",
        },
    }
}
