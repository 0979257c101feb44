// src/analysis/mod.rs
//! Rule engine: per-unit pipeline, rule dispatch, and finding collection.

pub mod collector;
pub mod engine;
pub mod rules;
pub mod worker;

pub use collector::Collector;
pub use engine::{CancelToken, Engine};
pub use rules::{RuleContext, RuleSet};
pub use worker::{analyze_unit, SourceUnit, UnitOptions};
