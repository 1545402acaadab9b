//! # datacert command-line entry point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Initialize logging (console + rolling files)
//!   └─> Execute the subcommand, mapping its outcome to an exit code
//! ```
//!
//! ```bash
//! datacert validate --data survey.csv --schema schema.yaml --summary out/summary.json
//! datacert charts --data survey.csv --specs out/charts
//! datacert manifest --root out --chain
//! datacert run --config certify.yaml
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Allow println! in main binary

mod cli;

use anyhow::Result;
use clap::Parser as _;
use datacert::config::CertConfig;
use datacert::logging;
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = cli::Cli::parse();

    let log_dir = match (&cli.log_dir, &cli.command) {
        (Some(dir), _) => Some(dir.clone()),
        (None, cli::Commands::Run { config, .. }) => {
            CertConfig::load(config).ok().and_then(|c| c.log_dir)
        }
        _ => None,
    };
    logging::init(log_dir.as_deref())?;

    cli::run_command(cli.command)
}
