use clap::Parser;
use std::path::PathBuf;

use crate::reporting::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "cppsieve", version, about = "Structural C++ antipattern detector")]
pub struct Cli {
    /// Files or directories to scan
    #[arg(default_value = ".")]
    pub paths: Vec<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Lowest severity to report: suggestion, warning, or critical
    #[arg(long, value_name = "LEVEL")]
    pub severity: Option<String>,
    /// Turn a rule off by name or code (repeatable)
    #[arg(long, value_name = "RULE")]
    pub disable: Vec<String>,
    /// Configuration file (default: ./cppsieve.toml if present)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
    /// Exit with code 1 when any finding at or above `warning` remains
    #[arg(long)]
    pub ci: bool,
    #[arg(long, short)]
    pub verbose: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_current_directory() {
        let cli = Cli::parse_from(["cppsieve"]);
        assert_eq!(cli.paths, vec![PathBuf::from(".")]);
        assert_eq!(cli.format, OutputFormat::Text);
        assert!(!cli.ci);
    }

    #[test]
    fn repeatable_disable_and_json() {
        let cli = Cli::parse_from(["cppsieve", "src", "--format", "json", "--disable", "P01", "--disable", "loop-flush", "--ci"]);
        assert_eq!(cli.paths, vec![PathBuf::from("src")]);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.disable, vec!["P01".to_string(), "loop-flush".to_string()]);
        assert!(cli.ci);
    }

    #[test]
    fn plain_text_formats() {
        assert_eq!(Cli::parse_from(["cppsieve", "--format", "plain"]).format, OutputFormat::Plain);
        assert_eq!(Cli::parse_from(["cppsieve", "--format", "lines"]).format, OutputFormat::Lines);
    }

    #[test]
    fn unknown_format_is_rejected() {
        assert!(Cli::try_parse_from(["cppsieve", "--format", "xml"]).is_err());
    }
}
