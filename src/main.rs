//! gpsr CLI - evolve symbolic regression models from the command line.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod cli;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

/// gpsr - Tree-based genetic programming for symbolic regression
#[derive(Parser, Debug)]
#[command(name = "gpsr")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Evolve an expression that fits a data set
    Evolve {
        /// Run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,

        /// Sample file, overriding the configured one
        #[arg(short, long)]
        data: Option<PathBuf>,

        /// Random seed (default: configured or random)
        #[arg(short, long)]
        seed: Option<u64>,

        /// Cost evaluation budget
        #[arg(short, long)]
        budget: Option<usize>,

        /// Population size
        #[arg(short, long)]
        population: Option<usize>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Show progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Validate a configuration and its data set without evolving
    Check {
        /// Run configuration (JSON)
        #[arg(short, long)]
        config: PathBuf,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let result = match args.command {
        Commands::Evolve {
            config,
            data,
            seed,
            budget,
            population,
            format,
            progress,
        } => cli::evolve::execute(
            &config,
            cli::Overrides {
                data,
                seed,
                budget,
                population,
            },
            format,
            progress,
        ),

        Commands::Check { config } => cli::check::execute(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
