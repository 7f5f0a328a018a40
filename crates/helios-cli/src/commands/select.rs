use crate::commands::common::{print_config_summary, run_dir};
use crate::config::load_config;
use crate::infra::build_engine_deps;
use helios_application::selection::Orchestrator;
use std::path::PathBuf;

pub fn run(config_path: PathBuf, out: Option<PathBuf>) -> Result<(), String> {
    let config = load_config(&config_path)?;
    print_config_summary("select", &config);
    let deps = build_engine_deps(&config)?;

    let bars = deps
        .market_data
        .recent_bars(&config.run.symbol, config.selection.window)?;
    let report = Orchestrator::new().select_best_strategy(&config.run.symbol, &bars)?;

    println!(
        "best strategy: {} (sharpe={:.4}, return={:.4}, drawdown={:.4}, trades={})",
        report.best.strategy,
        report.best.sharpe_ratio,
        report.best.total_return,
        report.best.max_drawdown,
        report.best.trades_count
    );
    for metrics in &report.results {
        println!(
            "  {:<28} sharpe={:>8.4} return={:>8.4} drawdown={:>8.4} trades={}",
            metrics.strategy,
            metrics.sharpe_ratio,
            metrics.total_return,
            metrics.max_drawdown,
            metrics.trades_count
        );
    }
    for skip in &report.skipped {
        println!("  {:<28} skipped: {}", skip.strategy, skip.reason);
    }

    let dir = run_dir(&config, out, "select", deps.artifacts.as_ref())?;
    let value = serde_json::to_value(&report)
        .map_err(|err| format!("failed to serialize selection report: {}", err))?;
    deps.artifacts.write_json(&dir.join("selection.json"), &value)?;
    println!("run output: {}", dir.display());
    Ok(())
}
