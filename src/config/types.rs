// src/config/types.rs
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::analysis::rules::RuleSet;
use crate::types::Severity;

/// A rule switch: `true`/`false`, or `"enabled"`/`"disabled"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleToggle {
    Flag(bool),
    Word(String),
}

impl RuleToggle {
    #[must_use]
    pub fn enabled(&self) -> Option<bool> {
        match self {
            Self::Flag(b) => Some(*b),
            Self::Word(w) => match w.to_ascii_lowercase().as_str() {
                "enabled" | "on" | "true" => Some(true),
                "disabled" | "off" | "false" => Some(false),
                _ => None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Share of opaque tokens above which a unit is reported incomplete.
    #[serde(default = "default_max_opaque_ratio")]
    pub max_opaque_ratio: f64,
    #[serde(default = "default_min_severity")]
    pub min_severity: String,
    #[serde(default = "default_max_nesting")]
    pub max_nesting: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_opaque_ratio: default_max_opaque_ratio(),
            min_severity: default_min_severity(),
            max_nesting: default_max_nesting(),
        }
    }
}

const fn default_max_opaque_ratio() -> f64 { 0.5 }
const fn default_max_nesting() -> usize { crate::syntax::DEFAULT_MAX_NESTING }
fn default_min_severity() -> String { "suggestion".to_string() }

/// On-disk shape of `cppsieve.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CppsieveToml {
    #[serde(default)]
    pub rules: BTreeMap<String, RuleToggle>,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Resolved configuration handed to the engine and the report layer.
#[derive(Debug, Clone)]
pub struct Config {
    pub rules: RuleSet,
    pub max_opaque_ratio: f64,
    pub max_nesting: usize,
    pub min_severity: Severity,
}

impl Default for Config {
    fn default() -> Self {
        let analysis = AnalysisConfig::default();
        Self {
            rules: RuleSet::all(),
            max_opaque_ratio: analysis.max_opaque_ratio,
            max_nesting: analysis.max_nesting,
            min_severity: Severity::Suggestion,
        }
    }
}
