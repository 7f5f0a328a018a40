use crate::config::Config;
use helios_domain::engine_name;
use helios_domain::repositories::artifacts::ArtifactWriter;
use std::path::PathBuf;

/// Resolve the output directory for one command run and make sure it exists.
pub fn run_dir(
    config: &Config,
    out: Option<PathBuf>,
    label: &str,
    artifacts: &dyn ArtifactWriter,
) -> Result<PathBuf, String> {
    let base = out.unwrap_or_else(|| PathBuf::from(&config.run.out_dir));
    let dir = base.join(label);
    artifacts.ensure_dir(&dir)?;
    Ok(dir)
}

pub fn print_config_summary(command: &str, config: &Config) {
    println!(
        "{} cli: {} (symbol={}, source={}, initial_balance={})",
        engine_name(),
        command,
        config.run.symbol,
        config.data.source,
        config.run.initial_balance
    );
}
