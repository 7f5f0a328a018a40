use crate::commands::common::{print_config_summary, run_dir};
use crate::config::load_config;
use crate::infra::build_engine_deps;
use helios_application::selection::Orchestrator;
use helios_domain::services::backtest::run_backtest;
use std::path::PathBuf;

pub fn run(config_path: PathBuf, strategy_name: String, out: Option<PathBuf>) -> Result<(), String> {
    let config = load_config(&config_path)?;
    print_config_summary("backtest", &config);
    let deps = build_engine_deps(&config)?;

    let orchestrator = Orchestrator::new();
    let strategy = orchestrator.strategy(&strategy_name).ok_or_else(|| {
        format!(
            "unknown strategy '{}' (available: {})",
            strategy_name,
            orchestrator.strategy_names().join(", ")
        )
    })?;

    let bars = deps
        .market_data
        .recent_bars(&config.run.symbol, config.selection.window)?;
    let metrics = run_backtest(strategy, &bars).map_err(|err| err.to_string())?;

    println!(
        "{}: return={:.4} sharpe={:.4} drawdown={:.4} trades={} win_rate={:.2}",
        metrics.strategy,
        metrics.total_return,
        metrics.sharpe_ratio,
        metrics.max_drawdown,
        metrics.trades_count,
        metrics.win_rate
    );

    let dir = run_dir(&config, out, "backtest", deps.artifacts.as_ref())?;
    let value = serde_json::to_value(&metrics)
        .map_err(|err| format!("failed to serialize backtest metrics: {}", err))?;
    deps.artifacts.write_json(&dir.join("backtest.json"), &value)?;
    println!("run output: {}", dir.display());
    Ok(())
}
