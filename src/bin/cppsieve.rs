use clap::Parser;
use colored::Colorize;
use cppsieve_core::cli::{self, Cli};
use cppsieve_core::exit::CppsieveExit;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("CPPSIEVE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn main() -> CppsieveExit {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli::dispatch::execute(&cli) {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{} {e}", "Error:".red());
            CppsieveExit::Error
        }
    }
}
