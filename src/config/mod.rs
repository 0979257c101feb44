// src/config/mod.rs
pub mod types;

pub use self::types::{AnalysisConfig, Config, CppsieveToml, RuleToggle};

use std::path::Path;

use tracing::debug;

use crate::error::{EngineError, Result};
use crate::types::{RuleId, Severity};

/// Looked up in the working directory when no path is given.
pub const CONFIG_FILE: &str = "cppsieve.toml";

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads `path`, or `cppsieve.toml` from the working directory when
    /// `path` is `None`. A missing default file means defaults.
    ///
    /// # Errors
    /// Returns an error if an explicit file cannot be read or any file is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, required) = match path {
            Some(p) => (p, true),
            None => (Path::new(CONFIG_FILE), false),
        };
        if !required && !path.exists() {
            debug!("no {CONFIG_FILE} found; using defaults");
            return Ok(Self::new());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|source| EngineError::Io { source, path: path.to_path_buf() })?;
        debug!(path = %path.display(), "loading configuration");
        Self::parse_toml(&content)
    }

    /// Parses and validates TOML configuration text.
    ///
    /// # Errors
    /// Returns an error on malformed TOML, unknown rule ids, or out-of-range values.
    pub fn parse_toml(content: &str) -> Result<Self> {
        let raw: CppsieveToml = toml::from_str(content).map_err(|e| EngineError::Config(e.to_string()))?;
        Self::from_toml(raw)
    }

    /// # Errors
    /// Returns an error on unknown rule ids or out-of-range values.
    pub fn from_toml(raw: CppsieveToml) -> Result<Self> {
        let mut config = Self::new();
        for (key, toggle) in &raw.rules {
            let rule = RuleId::parse(key).ok_or_else(|| EngineError::Config(format!("unknown rule `{key}`")))?;
            let enabled = toggle
                .enabled()
                .ok_or_else(|| EngineError::Config(format!("rule `{key}`: expected true/false or enabled/disabled")))?;
            config.rules.set(rule, enabled);
        }
        config.max_opaque_ratio = raw.analysis.max_opaque_ratio;
        config.max_nesting = raw.analysis.max_nesting;
        config.min_severity = Severity::parse(&raw.analysis.min_severity).ok_or_else(|| {
            EngineError::Config(format!("unknown severity `{}`", raw.analysis.min_severity))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Turns a rule off by name or code.
    ///
    /// # Errors
    /// Returns an error if `rule` names no known rule.
    pub fn disable(&mut self, rule: &str) -> Result<()> {
        let id = RuleId::parse(rule).ok_or_else(|| EngineError::Config(format!("unknown rule `{rule}`")))?;
        self.rules.set(id, false);
        Ok(())
    }

    /// # Errors
    /// Returns an error if a numeric setting is out of range.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.max_opaque_ratio) {
            return Err(EngineError::Config(format!(
                "max_opaque_ratio must be within 0.0..=1.0, got {}",
                self.max_opaque_ratio
            )));
        }
        if self.max_nesting == 0 {
            return Err(EngineError::Config("max_nesting must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_means_defaults() {
        let config = Config::parse_toml("").expect("empty config parses");
        assert_eq!(config.rules.len(), 4);
        assert!((config.max_opaque_ratio - 0.5).abs() < f64::EPSILON);
        assert_eq!(config.max_nesting, 256);
        assert_eq!(config.min_severity, Severity::Suggestion);
    }

    #[test]
    fn rules_toggle_by_name_code_or_word() {
        let src = "[rules]\nloop-flush = false\nR01 = \"disabled\"\nrange-for-copy = \"enabled\"\n\n[analysis]\nmin_severity = \"warning\"\n";
        let config = Config::parse_toml(src).expect("valid config");
        assert!(!config.rules.is_enabled(RuleId::LoopFlush));
        assert!(!config.rules.is_enabled(RuleId::OwningRawPointer));
        assert!(config.rules.is_enabled(RuleId::RangeForCopy));
        assert_eq!(config.min_severity, Severity::Warning);
    }

    #[test]
    fn unknown_rule_is_a_config_error() {
        let err = Config::parse_toml("[rules]\nno-such-rule = true\n").expect_err("must reject");
        assert!(matches!(err, EngineError::Config(msg) if msg.contains("no-such-rule")));
    }

    #[test]
    fn out_of_range_ratio_is_rejected() {
        assert!(Config::parse_toml("[analysis]\nmax_opaque_ratio = 1.5\n").is_err());
        assert!(Config::parse_toml("[analysis]\nmax_nesting = 0\n").is_err());
        assert!(Config::parse_toml("[rules]\nloop-flush = \"maybe\"\n").is_err());
    }

    #[test]
    fn explicit_path_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[rules]\nunsynchronized-shared-state = false").expect("write config");
        let config = Config::load(Some(file.path())).expect("loads");
        assert!(!config.rules.is_enabled(RuleId::UnsynchronizedSharedState));
    }

    #[test]
    fn missing_explicit_path_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let err = Config::load(Some(&dir.path().join("absent.toml"))).expect_err("must fail");
        assert!(matches!(err, EngineError::Io { .. }));
    }

    #[test]
    fn disable_by_code() {
        let mut config = Config::new();
        config.disable("p02").expect("known rule");
        assert!(!config.rules.is_enabled(RuleId::LoopFlush));
        assert!(config.disable("bogus").is_err());
    }
}
