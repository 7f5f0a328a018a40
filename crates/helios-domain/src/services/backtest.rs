//! Vectorised backtest over a bar series: signals are lagged one bar before
//! being applied to returns, so a decision made at bar t earns the move from
//! t to t+1, never the move that produced the decision.

use std::fmt;

use serde::Serialize;

use crate::services::ohlcv::validate_bars;
use crate::services::strategy::Strategy;
use crate::value_objects::bar::Bar;
use crate::value_objects::signal::Signal;

/// Trading periods per year for daily bars, used to annualise the Sharpe
/// ratio.
pub const ANNUALISATION_PERIODS: f64 = 252.0;

#[derive(Debug)]
pub enum BacktestError {
    /// Input series rejected before any strategy ran.
    Validation(String),
    /// The strategy itself failed to produce signals.
    Strategy { strategy: String, message: String },
    /// Signals were produced but the metric math could not complete.
    Calculation { strategy: String, message: String },
}

impl fmt::Display for BacktestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BacktestError::Validation(message) => write!(f, "invalid input data: {message}"),
            BacktestError::Strategy { strategy, message } => {
                write!(f, "strategy '{strategy}' failed: {message}")
            }
            BacktestError::Calculation { strategy, message } => {
                write!(f, "metric calculation for '{strategy}' failed: {message}")
            }
        }
    }
}

impl std::error::Error for BacktestError {}

/// Result of one strategy over one bar series. Serialisable as-is into
/// selection reports.
#[derive(Debug, Clone, Serialize)]
pub struct BacktestMetrics {
    pub strategy: String,
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub trades_count: usize,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub bars: usize,
}

/// Simple returns between consecutive closes; length is one less than the
/// input.
pub fn simple_returns(bars: &[Bar]) -> Vec<f64> {
    bars.windows(2)
        .map(|pair| (pair[1].close - pair[0].close) / pair[0].close)
        .collect()
}

/// Per-period strategy returns: the signal active at the START of each period
/// times the period's market return.
fn strategy_returns(signals: &[Signal], market_returns: &[f64]) -> Vec<f64> {
    market_returns
        .iter()
        .enumerate()
        .map(|(i, ret)| f64::from(signals[i].as_i8()) * ret)
        .collect()
}

/// Transitions into a non-flat state. A series that opens non-flat counts its
/// first row as a trade.
pub fn count_trades(signals: &[Signal]) -> usize {
    let mut trades = 0;
    let mut prev = None;
    for signal in signals {
        if !signal.is_flat() && prev != Some(*signal) {
            trades += 1;
        }
        prev = Some(*signal);
    }
    trades
}

fn sharpe_ratio(returns: &[f64]) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / (n - 1.0);
    let std = variance.sqrt();
    if std == 0.0 {
        return 0.0;
    }
    mean / std * ANNUALISATION_PERIODS.sqrt()
}

/// Worst peak-to-trough drop of the cumulative equity curve, as a
/// non-positive fraction.
fn max_drawdown(returns: &[f64]) -> f64 {
    let mut equity: f64 = 1.0;
    let mut peak: f64 = 1.0;
    let mut worst: f64 = 0.0;
    for ret in returns {
        equity *= 1.0 + ret;
        peak = peak.max(equity);
        worst = worst.min((equity - peak) / peak);
    }
    worst
}

/// Run one strategy over a bar series and compute its performance metrics.
pub fn run_backtest(strategy: &dyn Strategy, bars: &[Bar]) -> Result<BacktestMetrics, BacktestError> {
    validate_bars(bars).map_err(BacktestError::Validation)?;

    let signals = strategy
        .signals(bars)
        .map_err(|message| BacktestError::Strategy {
            strategy: strategy.name().to_string(),
            message,
        })?;
    if signals.len() != bars.len() {
        return Err(BacktestError::Calculation {
            strategy: strategy.name().to_string(),
            message: format!(
                "signal series length {} does not match {} bars",
                signals.len(),
                bars.len()
            ),
        });
    }

    let market_returns = simple_returns(bars);
    let returns = strategy_returns(&signals, &market_returns);
    if returns.iter().any(|r| !r.is_finite()) {
        return Err(BacktestError::Calculation {
            strategy: strategy.name().to_string(),
            message: "non-finite return encountered".to_string(),
        });
    }

    let total_return = returns.iter().fold(1.0, |acc, r| acc * (1.0 + r)) - 1.0;

    let wins: Vec<f64> = returns.iter().copied().filter(|r| *r > 0.0).collect();
    let losses: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let active = wins.len() + losses.len();
    let win_rate = if active > 0 {
        wins.len() as f64 / active as f64
    } else {
        0.0
    };
    let avg_win = if wins.is_empty() {
        0.0
    } else {
        wins.iter().sum::<f64>() / wins.len() as f64
    };
    let avg_loss = if losses.is_empty() {
        0.0
    } else {
        losses.iter().sum::<f64>() / losses.len() as f64
    };

    Ok(BacktestMetrics {
        strategy: strategy.name().to_string(),
        total_return,
        sharpe_ratio: sharpe_ratio(&returns),
        max_drawdown: max_drawdown(&returns),
        trades_count: count_trades(&signals),
        win_rate,
        avg_win,
        avg_loss,
        bars: bars.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::bar::Bar;
    use crate::value_objects::signal::Signal;

    fn bar(ts: i64, close: f64) -> Bar {
        Bar {
            symbol: "BTC-USD".to_string(),
            timestamp: ts,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000.0,
        }
    }

    struct Scripted {
        signals: Vec<Signal>,
    }

    impl Strategy for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        fn signals(&self, _bars: &[Bar]) -> Result<Vec<Signal>, String> {
            Ok(self.signals.clone())
        }
    }

    struct Failing;

    impl Strategy for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn signals(&self, _bars: &[Bar]) -> Result<Vec<Signal>, String> {
            Err("boom".to_string())
        }
    }

    struct Misaligned;

    impl Strategy for Misaligned {
        fn name(&self) -> &str {
            "misaligned"
        }

        fn signals(&self, _bars: &[Bar]) -> Result<Vec<Signal>, String> {
            Ok(vec![Signal::Flat])
        }
    }

    #[test]
    fn two_flat_rows_produce_zero_metrics() {
        let bars = vec![bar(1, 100.0), bar(2, 101.0)];
        let strategy = Scripted {
            signals: vec![Signal::Flat, Signal::Flat],
        };
        let metrics = run_backtest(&strategy, &bars).unwrap();
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.sharpe_ratio, 0.0);
        assert_eq!(metrics.max_drawdown, 0.0);
        assert_eq!(metrics.trades_count, 0);
        assert_eq!(metrics.bars, 2);
    }

    #[test]
    fn long_signal_captures_the_next_bar_move() {
        // Long entered on bar 1 earns the bar1->bar2 move only.
        let bars = vec![bar(1, 100.0), bar(2, 100.0), bar(3, 110.0), bar(4, 110.0)];
        let strategy = Scripted {
            signals: vec![Signal::Flat, Signal::Long, Signal::Flat, Signal::Flat],
        };
        let metrics = run_backtest(&strategy, &bars).unwrap();
        assert!((metrics.total_return - 0.10).abs() < 1e-12);
        assert_eq!(metrics.trades_count, 1);
    }

    #[test]
    fn short_signal_profits_from_a_drop() {
        let bars = vec![bar(1, 100.0), bar(2, 100.0), bar(3, 90.0)];
        let strategy = Scripted {
            signals: vec![Signal::Flat, Signal::Short, Signal::Flat],
        };
        let metrics = run_backtest(&strategy, &bars).unwrap();
        assert!((metrics.total_return - 0.10).abs() < 1e-12);
    }

    #[test]
    fn opening_non_flat_counts_as_a_trade() {
        assert_eq!(count_trades(&[Signal::Long, Signal::Long, Signal::Flat]), 1);
        assert_eq!(count_trades(&[Signal::Flat, Signal::Flat]), 0);
        assert_eq!(
            count_trades(&[Signal::Long, Signal::Short, Signal::Long]),
            3
        );
        assert_eq!(
            count_trades(&[Signal::Flat, Signal::Long, Signal::Flat, Signal::Long]),
            2
        );
    }

    #[test]
    fn drawdown_is_never_positive() {
        let bars: Vec<Bar> = (0..40)
            .map(|i| bar(i + 1, 100.0 + ((i * 7) % 13) as f64))
            .collect();
        let strategy = Scripted {
            signals: (0..40)
                .map(|i| if i % 3 == 0 { Signal::Long } else { Signal::Short })
                .collect(),
        };
        let metrics = run_backtest(&strategy, &bars).unwrap();
        assert!(metrics.max_drawdown <= 0.0);
        assert!(metrics.max_drawdown >= -1.0);
    }

    #[test]
    fn drawdown_tracks_the_running_equity_peak() {
        // Equity: 2.0, 1.0, 0.5, 1.0 — the trough is -0.75 from the 2.0 peak.
        assert_eq!(max_drawdown(&[1.0, -0.5, -0.5, 1.0]), -0.75);
        assert_eq!(max_drawdown(&[0.1, 0.2]), 0.0);
        assert_eq!(max_drawdown(&[]), 0.0);
    }

    #[test]
    fn identical_inputs_give_identical_metrics() {
        let bars: Vec<Bar> = (0..30)
            .map(|i| bar(i + 1, 100.0 + (i as f64 * 0.7).sin() * 5.0))
            .collect();
        let strategy = Scripted {
            signals: (0..30)
                .map(|i| match i % 4 {
                    0 => Signal::Long,
                    2 => Signal::Short,
                    _ => Signal::Flat,
                })
                .collect(),
        };
        let first = run_backtest(&strategy, &bars).unwrap();
        let second = run_backtest(&strategy, &bars).unwrap();
        assert_eq!(first.total_return.to_bits(), second.total_return.to_bits());
        assert_eq!(first.sharpe_ratio.to_bits(), second.sharpe_ratio.to_bits());
        assert_eq!(first.max_drawdown.to_bits(), second.max_drawdown.to_bits());
    }

    #[test]
    fn validation_rejects_short_series() {
        let strategy = Scripted {
            signals: vec![Signal::Flat],
        };
        let err = run_backtest(&strategy, &[bar(1, 100.0)]).unwrap_err();
        assert!(matches!(err, BacktestError::Validation(_)));
    }

    #[test]
    fn strategy_failure_is_attributed() {
        let bars = vec![bar(1, 100.0), bar(2, 101.0)];
        let err = run_backtest(&Failing, &bars).unwrap_err();
        match err {
            BacktestError::Strategy { strategy, message } => {
                assert_eq!(strategy, "failing");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn misaligned_signal_series_is_a_calculation_error() {
        let bars = vec![bar(1, 100.0), bar(2, 101.0), bar(3, 102.0)];
        let err = run_backtest(&Misaligned, &bars).unwrap_err();
        assert!(matches!(err, BacktestError::Calculation { .. }));
    }

    #[test]
    fn sharpe_annualises_with_sqrt_252() {
        // Constant positive return has zero std; perturb one period.
        let returns = vec![0.01, 0.02, 0.01, 0.02];
        let value = super::sharpe_ratio(&returns);
        let mean = 0.015;
        let std = (returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / 3.0).sqrt();
        assert!((value - mean / std * 252.0_f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn win_rate_ignores_flat_periods() {
        let bars = vec![
            bar(1, 100.0),
            bar(2, 110.0),
            bar(3, 110.0),
            bar(4, 99.0),
            bar(5, 100.0),
        ];
        let strategy = Scripted {
            signals: vec![
                Signal::Long,
                Signal::Flat,
                Signal::Long,
                Signal::Long,
                Signal::Flat,
            ],
        };
        let metrics = run_backtest(&strategy, &bars).unwrap();
        // Active periods: +10% win, -10% loss, +1.0101% win; the flat period
        // after bar 2 does not count.
        assert!((metrics.win_rate - 2.0 / 3.0).abs() < 1e-12);
        assert!(metrics.avg_win > 0.0);
        assert!(metrics.avg_loss < 0.0);
    }
}
