//! Main entry point for chord application.

// #![deny(clippy::pedantic)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
// #![warn(missing_docs)]

use clap::{Parser, Subcommand};

pub mod classify;
pub mod common;
pub mod contexts;
pub mod features;
pub mod pipeline;
pub mod variants;

/// CLI parser based on clap.
#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "chord - HRD classification",
    long_about = "This tool classifies tumors into homologous recombination deficient or \
                  proficient from the mutation contexts of their somatic variants"
)]
struct Cli {
    /// Commonly used arguments
    #[command(flatten)]
    common: common::Args,

    /// The sub command to run
    #[command(subcommand)]
    command: Commands,
}

/// Enum supporting the parsing of top-level commands.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Subcommand)]
enum Commands {
    /// Extract mutation context counts.
    Extract(contexts::Args),
    /// Predict HRD status from context counts.
    Predict(classify::Args),
    /// Extract and predict in one go.
    Run(pipeline::Args),
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    // Build a tracing subscriber according to the configuration in `cli.common`.
    let collector = tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_max_level(match cli.common.verbose.log_level() {
            Some(level) => match level {
                log::Level::Error => tracing::Level::ERROR,
                log::Level::Warn => tracing::Level::WARN,
                log::Level::Info => tracing::Level::INFO,
                log::Level::Debug => tracing::Level::DEBUG,
                log::Level::Trace => tracing::Level::TRACE,
            },
            None => tracing::Level::INFO,
        })
        .compact()
        .finish();
    tracing::subscriber::set_global_default(collector)?;

    tracing::info!("Starting chord -- looking for scars of HR deficiency...");

    match &cli.command {
        Commands::Extract(args) => contexts::run(&cli.common, args)?,
        Commands::Predict(args) => classify::run(&cli.common, args)?,
        Commands::Run(args) => pipeline::run(&cli.common, args)?,
    }

    tracing::info!("All done. Have a nice day!");

    Ok(())
}

#[cfg(test)]
mod test {
    use clap::CommandFactory as _;

    use super::Cli;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }
}
