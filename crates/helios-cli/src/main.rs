mod commands;
mod config;
mod infra;
mod obs;

use clap::{Parser, Subcommand};
use commands::Command;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "helios")]
#[command(about = "Helios strategy research CLI", version, arg_required_else_help = true)]
#[command(
    after_help = "Examples:\n  helios select --config configs/sample.toml --out runs/\n  helios backtest --config configs/sample.toml --strategy sma_10_50\n  helios paper --config configs/sample.toml --out runs/\n  helios validate --config configs/sample.toml\n"
)]
struct Cli {
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Evaluate the strategy roster and pick the best performer.
    Select {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Backtest a single named strategy over the selection window.
    Backtest {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        strategy: String,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Replay recent bars through the simulated exchange.
    Paper {
        #[arg(long)]
        config: PathBuf,
        /// Strategy to trade; defaults to running selection first.
        #[arg(long)]
        strategy: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Check the configured data source and report data quality.
    Validate {
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    let logging = match &cli.command {
        CliCommand::Select { config, .. }
        | CliCommand::Backtest { config, .. }
        | CliCommand::Paper { config, .. }
        | CliCommand::Validate { config } => match config::load_config(config) {
            Ok(loaded) => loaded.logging,
            // Defer config errors to the command itself so they are reported
            // once, after logging is up.
            Err(_) => config::LoggingConfig::default(),
        },
    };
    if let Err(err) = obs::init(&logging) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }

    let command = match cli.command {
        CliCommand::Select { config, out } => Command::Select { config, out },
        CliCommand::Backtest {
            config,
            strategy,
            out,
        } => Command::Backtest {
            config,
            strategy,
            out,
        },
        CliCommand::Paper {
            config,
            strategy,
            out,
        } => Command::Paper {
            config,
            strategy,
            out,
        },
        CliCommand::Validate { config } => Command::Validate { config },
    };

    if let Err(err) = commands::run(command) {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
