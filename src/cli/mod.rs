//! Command-line collaborator: argument parsing and the scan/report flow.

pub mod args;
pub mod dispatch;

pub use args::Cli;
