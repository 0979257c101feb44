//! Report rendering: colored console text, plain text, and JSON.

pub mod console;
mod guidance;
pub mod rich;
mod shared;

use anyhow::Result;
use serde::Serialize;

use crate::types::ScanReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    /// Same layout as `text`, without colors.
    Plain,
    /// One finding per line.
    Lines,
    Json,
}

/// Pretty-printed JSON of the whole report.
///
/// # Errors
/// Returns error if serialization fails.
pub fn render_json(report: &ScanReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Writes `report` to stdout in `format`.
///
/// # Errors
/// Returns error if serialization fails.
pub fn emit(report: &ScanReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => console::print_report(report),
        OutputFormat::Plain => print!("{}", rich::build_rich_report(report)?),
        OutputFormat::Lines => print!("{}", rich::format_report_string(report)?),
        OutputFormat::Json => println!("{}", render_json(report)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Engine, SourceUnit};

    #[test]
    fn json_carries_codes_locations_and_summary() {
        let src = "int main() {\n  int* p = new int(1);\n  return 0;\n}";
        let report = Engine::default().analyze_all(&[SourceUnit::new("m.cpp", src)]);
        let json = render_json(&report).expect("serializes");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        let finding = &value["units"][0]["findings"][0];
        assert_eq!(finding["code"], "R01");
        assert_eq!(finding["rule"], "owning-raw-pointer");
        assert_eq!(finding["severity"], "warning");
        assert_eq!(finding["location"]["line"], 2);
        assert_eq!(value["units"][0]["category"], "main");
        assert_eq!(value["summary"]["warning"], 1);
        assert_eq!(value["summary"]["score"], 95);
    }

    #[test]
    fn json_diagnostics_keep_the_lex_error_kind() {
        let src = "void f() {\n  const char* s = \"oops;\n}\n";
        let report = Engine::default().analyze_all(&[SourceUnit::new("bad.cpp", src)]);
        let json = render_json(&report).expect("serializes");
        let value: serde_json::Value = serde_json::from_str(&json).expect("valid json");
        let diagnostic = &value["units"][0]["diagnostics"][0];
        assert_eq!(diagnostic["diagnostic"], "lex");
        assert_eq!(diagnostic["kind"], "UnterminatedString");
        assert_eq!(diagnostic["line"], 2);
        assert_eq!(value["units"][0]["confidence"], "reduced");
    }
}
