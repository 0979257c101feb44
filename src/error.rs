// src/error.rs
use crate::lexer::LexError;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A bug signal. Fatal for the offending unit only.
    #[error("internal invariant violated in {unit}: {detail}")]
    InternalInvariantViolation { unit: String, detail: String },

    #[error("analysis of {unit} cancelled before {stage}")]
    Cancelled { unit: String, stage: &'static str },

    #[error("I/O error: {source} (path: {path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("Config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

// Allow `?` on std::io::Error by converting to EngineError::Io with unknown path.
impl From<std::io::Error> for EngineError {
    fn from(source: std::io::Error) -> Self {
        EngineError::Io {
            source,
            path: PathBuf::from("<unknown>"),
        }
    }
}

impl From<walkdir::Error> for EngineError {
    fn from(e: walkdir::Error) -> Self {
        let path = e.path().map_or_else(|| PathBuf::from("<unknown>"), PathBuf::from);
        match e.into_io_error() {
            Some(source) => EngineError::Io { source, path },
            None => EngineError::Config(format!("directory walk failed at {}", path.display())),
        }
    }
}

/// A construct the parser could not structure; replaced by an opaque node.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[error("could not parse bytes {start}..{end} (line {line}): {reason}")]
pub struct ParseRecoveryWarning {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub reason: String,
}

/// Too much of a unit ended up opaque for its findings to be trusted.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[error("{:.0}% of tokens unparsed (threshold {:.0}%)", .opaque_ratio * 100.0, .threshold * 100.0)]
pub struct AnalysisIncomplete {
    pub opaque_ratio: f64,
    pub threshold: f64,
}

/// Recoverable problems recorded alongside a unit's findings.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "diagnostic", rename_all = "snake_case")]
pub enum UnitDiagnostic {
    Lex(LexError),
    ParseRecovery(ParseRecoveryWarning),
    AnalysisIncomplete(AnalysisIncomplete),
    InternalInvariantViolation { detail: String },
    Cancelled { stage: String },
}

impl UnitDiagnostic {
    /// Line the diagnostic points at, when it has one.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::Lex(e) => Some(e.line),
            Self::ParseRecovery(w) => Some(w.line),
            _ => None,
        }
    }
}

impl std::fmt::Display for UnitDiagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lex(e) => write!(f, "lex error: {e}"),
            Self::ParseRecovery(w) => write!(f, "parse recovery: {w}"),
            Self::AnalysisIncomplete(a) => write!(f, "analysis incomplete: {a}"),
            Self::InternalInvariantViolation { detail } => {
                write!(f, "internal invariant violated: {detail}")
            }
            Self::Cancelled { stage } => write!(f, "cancelled before {stage}"),
        }
    }
}
