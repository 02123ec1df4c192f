//! Tabula command line
//!
//! Standalone utilities over delimited text files:
//! - `infer`: guess a data type for every column
//! - `convert`: type a file into a table and write it out in another format

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tabula_logging::{init_logging, LogConfig};
use tracing::error;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "tabula", about = "Typed detail tables from delimited text")]
struct Cli {
    /// Enable verbose logging (info/debug to stderr)
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the inferred type of every column
    Infer(cli::infer::InferArgs),

    /// Import a file into a typed table and export it again
    Convert(cli::convert::ConvertArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(LogConfig {
        app_name: "tabula",
        verbose: cli.verbose,
    }) {
        eprintln!("Warning: logging disabled: {:#}", err);
    }

    match run_command(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("{:?}", err);
            ExitCode::FAILURE
        }
    }
}

fn run_command(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Infer(args) => cli::infer::run(args),
        Commands::Convert(args) => cli::convert::run(args),
    }
}
