//! Strategy selection: run every strategy in the roster over the same bar
//! window, rank the survivors, pick the best. A strategy that errors is
//! skipped with a warning; selection only fails when the roster produces no
//! usable result at all.

use std::time::Instant;

use helios_domain::services::backtest::{run_backtest, BacktestMetrics};
use helios_domain::services::strategy::{
    BearMarketMomentum, BreakoutRetest, EmaCrossover, FibonacciRetracement, MeanReversion,
    MeanReversionBear, OrderFlowImbalance, RiskRewardEnhanced, SmaCrossover, Strategy,
};
use helios_domain::value_objects::bar::Bar;
use serde::Serialize;
use tracing::{info_span, warn};

/// One strategy that could not be evaluated, kept for the report.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedStrategy {
    pub strategy: String,
    pub reason: String,
}

/// Full outcome of one selection pass: every ranked result plus the skips.
/// `results` is ordered best-first.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionReport {
    pub symbol: String,
    pub window: usize,
    pub evaluated: usize,
    pub results: Vec<BacktestMetrics>,
    pub skipped: Vec<SkippedStrategy>,
    pub best: BacktestMetrics,
}

pub struct Orchestrator {
    roster: Vec<Box<dyn Strategy>>,
}

impl Orchestrator {
    /// Standard roster. Parameters follow the research defaults; new
    /// candidates are added here.
    pub fn new() -> Self {
        Self::with_roster(vec![
            Box::new(SmaCrossover::new(10, 50)),
            Box::new(EmaCrossover::new(12, 26)),
            Box::new(MeanReversion::new(20, 1.5)),
            Box::new(BreakoutRetest::new(20, 0.01, 1.2)),
            Box::new(FibonacciRetracement::new(50, 20, 14)),
            Box::new(OrderFlowImbalance::new(20, 10)),
            Box::new(RiskRewardEnhanced::new(9, 21, 14, 70.0, 30.0, 0.05)),
            Box::new(BearMarketMomentum::new(10, 20)),
            Box::new(MeanReversionBear::new(20, 1.5)),
        ])
    }

    pub fn with_roster(roster: Vec<Box<dyn Strategy>>) -> Self {
        Self { roster }
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.roster.iter().map(|s| s.name()).collect()
    }

    /// Evaluate the whole roster over `bars` and rank by Sharpe ratio, then
    /// total return, then (least negative) max drawdown. The ordering is
    /// total and deterministic, so identical inputs always elect the same
    /// strategy.
    pub fn select_best_strategy(
        &self,
        symbol: &str,
        bars: &[Bar],
    ) -> Result<SelectionReport, String> {
        let _span = info_span!("select_best_strategy", symbol = %symbol, bars = bars.len()).entered();
        let start = Instant::now();

        let mut results: Vec<BacktestMetrics> = Vec::with_capacity(self.roster.len());
        let mut skipped: Vec<SkippedStrategy> = Vec::new();
        for strategy in &self.roster {
            match run_backtest(strategy.as_ref(), bars) {
                Ok(metrics) => results.push(metrics),
                Err(err) => {
                    warn!(strategy = strategy.name(), error = %err, "strategy skipped");
                    skipped.push(SkippedStrategy {
                        strategy: strategy.name().to_string(),
                        reason: err.to_string(),
                    });
                }
            }
        }
        metrics::histogram!("helios.selection.evaluate_ms")
            .record(start.elapsed().as_millis() as f64);
        metrics::gauge!("helios.selection.skipped").set(skipped.len() as f64);

        if results.is_empty() {
            return Err(format!(
                "no strategy produced a result over {} bars ({} skipped)",
                bars.len(),
                skipped.len()
            ));
        }

        results.sort_by(|a, b| {
            b.sharpe_ratio
                .total_cmp(&a.sharpe_ratio)
                .then(b.total_return.total_cmp(&a.total_return))
                .then(b.max_drawdown.total_cmp(&a.max_drawdown))
        });
        let best = results[0].clone();

        Ok(SelectionReport {
            symbol: symbol.to_string(),
            window: bars.len(),
            evaluated: results.len(),
            results,
            skipped,
            best,
        })
    }

    /// Look up a roster strategy by name, for replaying a prior selection.
    pub fn strategy(&self, name: &str) -> Option<&dyn Strategy> {
        self.roster
            .iter()
            .map(|s| s.as_ref())
            .find(|s| s.name() == name)
    }
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}
