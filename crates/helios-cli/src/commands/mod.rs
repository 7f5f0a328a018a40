mod backtest;
mod common;
mod paper;
mod select;
mod validate;

use std::path::PathBuf;

pub enum Command {
    Select {
        config: PathBuf,
        out: Option<PathBuf>,
    },
    Backtest {
        config: PathBuf,
        strategy: String,
        out: Option<PathBuf>,
    },
    Paper {
        config: PathBuf,
        strategy: Option<String>,
        out: Option<PathBuf>,
    },
    Validate {
        config: PathBuf,
    },
}

pub fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Select { config, out } => select::run(config, out),
        Command::Backtest {
            config,
            strategy,
            out,
        } => backtest::run(config, strategy, out),
        Command::Paper {
            config,
            strategy,
            out,
        } => paper::run(config, strategy, out),
        Command::Validate { config } => validate::run(config),
    }
}
