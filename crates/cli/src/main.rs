//! ledger-records command-line binary.
//!
//! Runs one contract operation per process against a snapshot file.
//!
//! # Usage
//!
//! ```bash
//! # Seed the vote tally and cast a vote
//! ledger-records --data votes.ldb vote initLedger
//! ledger-records --data votes.ldb vote castVote Democrats
//!
//! # Create a project, then grant permissions to its PM role
//! ledger-records rbac createProject Acme u1 2025-06-30
//! ledger-records rbac assignPermissions Acme_PM '[{"name":"approve"}]'
//! ledger-records rbac createTask Acme u1 u2 u1 2025-05-31
//!
//! # Environment variables configure the same settings as the TOML file
//! LEDGER_RECORDS__DATA=/var/lib/records.ldb ledger-records registry queryAll
//! ```

use std::{io::IsTerminal, process::ExitCode};

use clap::Parser;
use ledger_records_cli::{
    config::{Cli, CliCommand, Config, ConfigAction, LogFormat, generate_config_schema},
    invoke::Contract,
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> ExitCode {
    // Parse CLI args and env vars (clap handles --help and --version)
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config.with_overrides(&cli),
        Err(e) => {
            eprintln!("{}", e.to_json());
            return ExitCode::from(2);
        },
    };

    let (contract, invocation) = match &cli.command {
        CliCommand::Vote(invocation) => (Contract::Vote, invocation),
        CliCommand::Registry(invocation) => (Contract::Registry, invocation),
        CliCommand::Rbac(invocation) => (Contract::Rbac, invocation),
        CliCommand::Config { action } => {
            let rendered = match action {
                ConfigAction::Schema => generate_config_schema(),
                ConfigAction::Show => config.to_pretty_json(),
            };
            return match rendered {
                Ok(json) => {
                    println!("{json}");
                    ExitCode::SUCCESS
                },
                Err(e) => {
                    eprintln!("{}", e.to_json());
                    ExitCode::from(2)
                },
            };
        },
    };

    init_logging(&config);

    match ledger_records_cli::run(&config, contract, &invocation.operation, &invocation.args) {
        Ok(result) => {
            println!("{result}");
            ExitCode::SUCCESS
        },
        Err(e) => {
            tracing::warn!(
                contract = contract.name(),
                operation = %invocation.operation,
                code = %e.code(),
                error = %e,
                "Invocation failed"
            );
            eprintln!("{}", e.to_json());
            ExitCode::FAILURE
        },
    }
}

/// Initializes the logging system based on configuration.
///
/// Logs go to stderr; stdout carries only the invocation result.
/// Supports three formats:
/// - `Text`: Human-readable format (development)
/// - `Json`: JSON structured logging (log aggregation)
/// - `Auto`: JSON for non-TTY stderr, text otherwise
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let use_json = match config.log_format {
        LogFormat::Json => true,
        LogFormat::Text => false,
        LogFormat::Auto => !std::io::stderr().is_terminal(),
    };

    if use_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(
                fmt::layer()
                    .json()
                    .flatten_event(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
