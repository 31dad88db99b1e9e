//! offerlab - salary negotiation simulation harness.

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use offerlab::Result;
use offerlab::app::AppContext;
use offerlab::cli::Cli;
use offerlab::cli::output::{emit_robot, robot_error};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if cli.robot {
                let code = match &e {
                    offerlab::OfferError::Config(_) | offerlab::OfferError::MissingConfig(_) => {
                        "config"
                    }
                    offerlab::OfferError::ValidationFailed(_) => "validation",
                    offerlab::OfferError::NotFound(_) => "not_found",
                    offerlab::OfferError::TrainingFailed(_) => "training_failed",
                    _ => "error",
                };
                if emit_robot(&robot_error(code, e.to_string())).is_err() {
                    eprintln!("Error: {e}");
                }
            } else {
                eprintln!("Error: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut ctx = AppContext::from_cli(cli)?;
    offerlab::cli::commands::run(&mut ctx, &cli.command)
}

fn init_tracing(cli: &Cli) {
    if cli.quiet {
        return;
    }

    let filter = match cli.verbose {
        0 => "warn,offerlab=info",
        1 => "info,offerlab=debug",
        2 => "debug,offerlab=trace",
        _ => "trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if cli.robot {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
