use crate::commands::common::{print_config_summary, run_dir};
use crate::config::load_config;
use crate::infra::build_engine_deps;
use helios_application::paper_trading::PaperTrader;
use helios_application::selection::Orchestrator;
use std::path::PathBuf;

pub fn run(
    config_path: PathBuf,
    strategy_name: Option<String>,
    out: Option<PathBuf>,
) -> Result<(), String> {
    let config = load_config(&config_path)?;
    print_config_summary("paper", &config);
    let deps = build_engine_deps(&config)?;

    let orchestrator = Orchestrator::new();
    let chosen = match strategy_name {
        Some(name) => name,
        None => {
            // No explicit strategy: elect one over the selection window first.
            let bars = deps
                .market_data
                .recent_bars(&config.run.symbol, config.selection.window)?;
            let report = orchestrator.select_best_strategy(&config.run.symbol, &bars)?;
            println!(
                "elected strategy: {} (sharpe={:.4})",
                report.best.strategy, report.best.sharpe_ratio
            );
            report.best.strategy
        }
    };
    let strategy = orchestrator.strategy(&chosen).ok_or_else(|| {
        format!(
            "unknown strategy '{}' (available: {})",
            chosen,
            orchestrator.strategy_names().join(", ")
        )
    })?;

    let trader = PaperTrader::new(
        &config.run.symbol,
        config.paper.trade_quantity,
        config.run.initial_balance,
    );
    let report = trader.run_simulation(strategy, deps.market_data.as_ref(), config.paper.days)?;

    println!(
        "simulation: {} over {} bars -> balance={:.2} equity={:.2} pnl={:.2} ({:+.2}%), {} orders, {} trades",
        report.strategy,
        report.days,
        report.final_balance,
        report.final_equity,
        report.total_pnl,
        report.return_pct,
        report.orders.len(),
        report.trades.len()
    );

    let dir = run_dir(&config, out, "paper", deps.artifacts.as_ref())?;
    let value = serde_json::to_value(&report)
        .map_err(|err| format!("failed to serialize simulation report: {}", err))?;
    deps.artifacts.write_json(&dir.join("simulation.json"), &value)?;
    deps.artifacts
        .write_orders_csv(&dir.join("orders.csv"), &report.orders)?;
    println!("run output: {}", dir.display());
    Ok(())
}
