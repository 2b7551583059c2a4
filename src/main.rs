//! todoon CLI entry point.

use clap::Parser;
use todoon::cli::{self, Cli, Commands, OutputLevel, EXIT_ERROR};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(cli.log_level()))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let output = cli.output_level();
    let outcome = match &cli.command {
        Commands::Check(args) => cli::run_check(args, output),
        Commands::Ignore(args) => cli::run_ignore(args, output),
    };

    let exit_code = match outcome {
        Ok(code) => code,
        Err(e) => {
            if output != OutputLevel::Nothing {
                eprintln!("Error: {:#}", e);
            }
            EXIT_ERROR
        }
    };

    std::process::exit(exit_code);
}
