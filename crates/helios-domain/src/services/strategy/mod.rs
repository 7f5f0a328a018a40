//! Trading strategies: stateless transformers from a bar series to a signal
//! series of the same length. Warm-up rows (rolling windows without enough
//! history) always resolve to `Signal::Flat`, never an error.

use crate::services::indicators::{
    atr, ema, momentum, rolling_max, rolling_mean, rolling_min, rolling_std, rsi,
};
use crate::value_objects::bar::Bar;
use crate::value_objects::signal::Signal;

pub trait Strategy {
    /// Strategy identity: class plus parameters, e.g. `sma_10_50`. Used for
    /// logging and selection, not persistence.
    fn name(&self) -> &str;

    /// One signal per input bar, aligned 1:1, no row drops. The input is
    /// never mutated.
    fn signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, String>;
}

fn closes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|bar| bar.close).collect()
}

fn volumes(bars: &[Bar]) -> Vec<f64> {
    bars.iter().map(|bar| bar.volume).collect()
}

/// Moving-average crossover: long while the short SMA is above the long SMA,
/// short while below.
pub struct SmaCrossover {
    short: usize,
    long: usize,
    name: String,
}

impl SmaCrossover {
    pub fn new(short: usize, long: usize) -> Self {
        Self {
            short,
            long,
            name: format!("sma_{short}_{long}"),
        }
    }
}

impl Strategy for SmaCrossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, String> {
        let closes = closes(bars);
        let short = rolling_mean(&closes, self.short);
        let long = rolling_mean(&closes, self.long);

        let out = (0..bars.len())
            .map(|i| match (short[i], long[i]) {
                (Some(s), Some(l)) if s > l => Signal::Long,
                (Some(s), Some(l)) if s < l => Signal::Short,
                _ => Signal::Flat,
            })
            .collect();
        Ok(out)
    }
}

/// Exponential moving-average crossover.
pub struct EmaCrossover {
    short: usize,
    long: usize,
    name: String,
}

impl EmaCrossover {
    pub fn new(short: usize, long: usize) -> Self {
        Self {
            short,
            long,
            name: format!("ema_{short}_{long}"),
        }
    }
}

impl Strategy for EmaCrossover {
    fn name(&self) -> &str {
        &self.name
    }

    fn signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, String> {
        let closes = closes(bars);
        let short = ema(&closes, self.short);
        let long = ema(&closes, self.long);

        let out = (0..bars.len())
            .map(|i| {
                if short[i] > long[i] {
                    Signal::Long
                } else if short[i] < long[i] {
                    Signal::Short
                } else {
                    Signal::Flat
                }
            })
            .collect();
        Ok(out)
    }
}

/// Mean reversion on the close z-score: sell stretched prices, buy depressed
/// ones.
pub struct MeanReversion {
    lookback: usize,
    z_thresh: f64,
    name: String,
}

impl MeanReversion {
    pub fn new(lookback: usize, z_thresh: f64) -> Self {
        Self {
            lookback,
            z_thresh,
            name: format!("mean_rev_{lookback}_{z_thresh}"),
        }
    }
}

impl Strategy for MeanReversion {
    fn name(&self) -> &str {
        &self.name
    }

    fn signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, String> {
        let closes = closes(bars);
        let mean = rolling_mean(&closes, self.lookback);
        let std = rolling_std(&closes, self.lookback);

        let out = (0..bars.len())
            .map(|i| match (mean[i], std[i]) {
                (Some(m), Some(s)) if s > 0.0 => {
                    let z = (closes[i] - m) / s;
                    if z > self.z_thresh {
                        Signal::Short
                    } else if z < -self.z_thresh {
                        Signal::Long
                    } else {
                        Signal::Flat
                    }
                }
                _ => Signal::Flat,
            })
            .collect();
        Ok(out)
    }
}

/// Breakout above the recent high (or below the recent low) confirmed by
/// above-average volume. Resistance/support levels are taken over the window
/// ending at the previous bar so the breakout bar itself cannot raise the
/// level it is breaking.
pub struct BreakoutRetest {
    lookback: usize,
    breakout_threshold: f64,
    min_volume_multiplier: f64,
    name: String,
}

impl BreakoutRetest {
    pub fn new(lookback: usize, breakout_threshold: f64, min_volume_multiplier: f64) -> Self {
        Self {
            lookback,
            breakout_threshold,
            min_volume_multiplier,
            name: format!("breakout_retest_{lookback}_{breakout_threshold}"),
        }
    }
}

impl Strategy for BreakoutRetest {
    fn name(&self) -> &str {
        &self.name
    }

    fn signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, String> {
        let highs: Vec<f64> = bars.iter().map(|bar| bar.high).collect();
        let lows: Vec<f64> = bars.iter().map(|bar| bar.low).collect();
        let closes = closes(bars);
        let volumes = volumes(bars);

        let resistance = rolling_max(&highs, self.lookback);
        let support = rolling_min(&lows, self.lookback);
        let avg_volume = rolling_mean(&volumes, self.lookback);
        // ATR is kept alongside for position-sizing research; not part of the
        // entry rule.
        let _atr = atr(bars, self.lookback);

        let mut out = vec![Signal::Flat; bars.len()];
        for i in 1..bars.len() {
            // Levels from the window ending at the previous bar.
            let (Some(res), Some(sup), Some(avg_vol)) =
                (resistance[i - 1], support[i - 1], avg_volume[i])
            else {
                continue;
            };
            if avg_vol <= 0.0 {
                continue;
            }
            let volume_confirmed = volumes[i] > avg_vol * self.min_volume_multiplier;
            if !volume_confirmed {
                continue;
            }
            if closes[i] > res * (1.0 + self.breakout_threshold) && closes[i - 1] <= res {
                out[i] = Signal::Long;
            } else if closes[i] < sup * (1.0 - self.breakout_threshold) && closes[i - 1] >= sup {
                out[i] = Signal::Short;
            }
        }
        Ok(out)
    }
}

/// Fibonacci retracement entries: in an uptrend, buy near the 23.6%/38.2%
/// levels of the recent swing when RSI is oversold; in a downtrend, sell near
/// the 61.8%/38.2% levels when RSI is overbought.
pub struct FibonacciRetracement {
    swing_window: usize,
    trend_period: usize,
    rsi_period: usize,
    name: String,
}

impl FibonacciRetracement {
    pub fn new(swing_window: usize, trend_period: usize, rsi_period: usize) -> Self {
        Self {
            swing_window,
            trend_period,
            rsi_period,
            name: format!("fib_retracement_{swing_window}_{trend_period}"),
        }
    }

    fn near(close: f64, level: f64) -> bool {
        close > 0.0 && ((close - level).abs() / close) < 0.02
    }
}

impl Strategy for FibonacciRetracement {
    fn name(&self) -> &str {
        &self.name
    }

    fn signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, String> {
        let highs: Vec<f64> = bars.iter().map(|bar| bar.high).collect();
        let lows: Vec<f64> = bars.iter().map(|bar| bar.low).collect();
        let closes = closes(bars);

        let trend_sma = rolling_mean(&closes, self.trend_period);
        let swing_high = rolling_max(&highs, self.swing_window);
        let swing_low = rolling_min(&lows, self.swing_window);
        let rsi_values = rsi(&closes, self.rsi_period);

        let mut out = vec![Signal::Flat; bars.len()];
        for i in 0..bars.len() {
            let (Some(sma), Some(high), Some(low), Some(rsi_value)) =
                (trend_sma[i], swing_high[i], swing_low[i], rsi_values[i])
            else {
                continue;
            };
            let diff = high - low;
            let fib_236 = low + diff * 0.236;
            let fib_382 = low + diff * 0.382;
            let fib_618 = low + diff * 0.618;

            let uptrend = closes[i] > sma;
            if uptrend
                && (Self::near(closes[i], fib_236) || Self::near(closes[i], fib_382))
                && rsi_value < 40.0
            {
                out[i] = Signal::Long;
            } else if !uptrend
                && (Self::near(closes[i], fib_618) || Self::near(closes[i], fib_382))
                && rsi_value > 60.0
            {
                out[i] = Signal::Short;
            }
        }
        Ok(out)
    }
}

/// Order-flow imbalance proxy: elevated volume plus directional momentum plus
/// a candle body in the same direction.
pub struct OrderFlowImbalance {
    volume_window: usize,
    momentum_period: usize,
    name: String,
}

impl OrderFlowImbalance {
    pub fn new(volume_window: usize, momentum_period: usize) -> Self {
        Self {
            volume_window,
            momentum_period,
            name: format!("order_flow_{volume_window}_{momentum_period}"),
        }
    }
}

impl Strategy for OrderFlowImbalance {
    fn name(&self) -> &str {
        &self.name
    }

    fn signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, String> {
        let closes = closes(bars);
        let volumes = volumes(bars);
        let avg_volume = rolling_mean(&volumes, self.volume_window);
        let momentum_values = momentum(&closes, self.momentum_period);

        let out = (0..bars.len())
            .map(|i| {
                let (Some(avg_vol), Some(mom)) = (avg_volume[i], momentum_values[i]) else {
                    return Signal::Flat;
                };
                if avg_vol <= 0.0 {
                    return Signal::Flat;
                }
                let volume_ratio = volumes[i] / avg_vol;
                let body = bars[i].close - bars[i].open;
                if volume_ratio > 1.1 && mom > 0.005 && body > 0.0 {
                    Signal::Long
                } else if volume_ratio > 1.1 && mom < -0.005 && body < 0.0 {
                    Signal::Short
                } else {
                    Signal::Flat
                }
            })
            .collect();
        Ok(out)
    }
}

/// MA trend plus RSI extreme plus a running-drawdown filter and a one-bar
/// momentum confirmation.
pub struct RiskRewardEnhanced {
    fast_ma: usize,
    slow_ma: usize,
    rsi_period: usize,
    rsi_overbought: f64,
    rsi_oversold: f64,
    max_drawdown_pct: f64,
    name: String,
}

impl RiskRewardEnhanced {
    pub fn new(
        fast_ma: usize,
        slow_ma: usize,
        rsi_period: usize,
        rsi_overbought: f64,
        rsi_oversold: f64,
        max_drawdown_pct: f64,
    ) -> Self {
        Self {
            fast_ma,
            slow_ma,
            rsi_period,
            rsi_overbought,
            rsi_oversold,
            max_drawdown_pct,
            name: format!("risk_reward_{fast_ma}_{slow_ma}"),
        }
    }
}

impl Strategy for RiskRewardEnhanced {
    fn name(&self) -> &str {
        &self.name
    }

    fn signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, String> {
        let closes = closes(bars);
        let fast = rolling_mean(&closes, self.fast_ma);
        let slow = rolling_mean(&closes, self.slow_ma);
        let rsi_values = rsi(&closes, self.rsi_period);

        let mut out = vec![Signal::Flat; bars.len()];
        let mut running_max = f64::MIN;
        for i in 0..bars.len() {
            running_max = running_max.max(closes[i]);
            let drawdown = (closes[i] - running_max) / running_max;
            if i == 0 {
                continue;
            }
            let (Some(f), Some(s), Some(rsi_value)) = (fast[i], slow[i], rsi_values[i]) else {
                continue;
            };
            let drawdown_ok = drawdown > -self.max_drawdown_pct;
            if f > s && rsi_value < self.rsi_oversold && drawdown_ok && closes[i] > closes[i - 1] {
                out[i] = Signal::Long;
            } else if f < s
                && rsi_value > self.rsi_overbought
                && drawdown_ok
                && closes[i] < closes[i - 1]
            {
                out[i] = Signal::Short;
            }
        }
        Ok(out)
    }
}

/// Bear-biased momentum: short persistent weakness below the trend SMA, only
/// go long on a strong rebound above it.
pub struct BearMarketMomentum {
    momentum_period: usize,
    trend_period: usize,
    name: String,
}

impl BearMarketMomentum {
    pub fn new(momentum_period: usize, trend_period: usize) -> Self {
        Self {
            momentum_period,
            trend_period,
            name: format!("bear_momentum_{momentum_period}_{trend_period}"),
        }
    }
}

impl Strategy for BearMarketMomentum {
    fn name(&self) -> &str {
        &self.name
    }

    fn signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, String> {
        let closes = closes(bars);
        let trend_sma = rolling_mean(&closes, self.trend_period);
        let momentum_values = momentum(&closes, self.momentum_period);

        let out = (0..bars.len())
            .map(|i| {
                let (Some(sma), Some(mom)) = (trend_sma[i], momentum_values[i]) else {
                    return Signal::Flat;
                };
                // Asymmetric thresholds: entry on weakness is easier than the
                // counter-trend rebound.
                if mom < -0.01 && closes[i] < sma {
                    Signal::Short
                } else if mom > 0.02 && closes[i] > sma {
                    Signal::Long
                } else {
                    Signal::Flat
                }
            })
            .collect();
        Ok(out)
    }
}

/// Mean reversion with the long side disabled: sells z-score spikes, sits
/// flat otherwise.
pub struct MeanReversionBear {
    lookback: usize,
    z_thresh: f64,
    name: String,
}

impl MeanReversionBear {
    pub fn new(lookback: usize, z_thresh: f64) -> Self {
        Self {
            lookback,
            z_thresh,
            name: format!("mean_rev_bear_{lookback}_{z_thresh}"),
        }
    }
}

impl Strategy for MeanReversionBear {
    fn name(&self) -> &str {
        &self.name
    }

    fn signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, String> {
        let closes = closes(bars);
        let mean = rolling_mean(&closes, self.lookback);
        let std = rolling_std(&closes, self.lookback);

        let out = (0..bars.len())
            .map(|i| match (mean[i], std[i]) {
                (Some(m), Some(s)) if s > 0.0 && (closes[i] - m) / s > self.z_thresh => {
                    Signal::Short
                }
                _ => Signal::Flat,
            })
            .collect();
        Ok(out)
    }
}
