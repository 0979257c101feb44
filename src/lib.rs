//! `cppsieve`: a structural C++ antipattern detector.
//!
//! Pipeline per translation unit: [`lexer`] → [`syntax`] → [`symbols`] →
//! [`analysis`] rules → collector. Units are analyzed independently and in
//! parallel; the CLI in [`cli`] is a thin layer over [`analysis::Engine`].

pub mod analysis;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod exit;
pub mod file_class;
pub mod lexer;
pub mod reporting;
pub mod symbols;
pub mod syntax;
pub mod types;
