//! Rolling-window indicator math shared by the strategies. Every transform is
//! backward looking: the value at index `i` uses rows up to and including `i`,
//! and warm-up rows (not enough history yet) are `None`.

use crate::value_objects::bar::Bar;
use std::collections::VecDeque;

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if window == 0 {
        out.resize(values.len(), None);
        return out;
    }

    let mut buf: VecDeque<f64> = VecDeque::new();
    let mut sum = 0.0;
    for &value in values {
        buf.push_back(value);
        sum += value;
        while buf.len() > window {
            if let Some(front) = buf.pop_front() {
                sum -= front;
            }
        }
        out.push(if buf.len() == window {
            Some(sum / window as f64)
        } else {
            None
        });
    }
    out
}

/// Rolling sample standard deviation (ddof = 1). Windows of one element have
/// no sample variance and stay `None`.
pub fn rolling_std(values: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if window < 2 {
        out.resize(values.len(), None);
        return out;
    }

    let mut buf: VecDeque<f64> = VecDeque::new();
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for &value in values {
        buf.push_back(value);
        sum += value;
        sum_sq += value * value;
        while buf.len() > window {
            if let Some(front) = buf.pop_front() {
                sum -= front;
                sum_sq -= front * front;
            }
        }
        out.push(if buf.len() == window {
            let n = window as f64;
            let var = (sum_sq - sum * sum / n) / (n - 1.0);
            Some(var.max(0.0).sqrt())
        } else {
            None
        });
    }
    out
}

pub fn rolling_max(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling_extreme(values, window, f64::max)
}

pub fn rolling_min(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling_extreme(values, window, f64::min)
}

fn rolling_extreme(values: &[f64], window: usize, pick: fn(f64, f64) -> f64) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    if window == 0 {
        out.resize(values.len(), None);
        return out;
    }
    for i in 0..values.len() {
        if i + 1 < window {
            out.push(None);
            continue;
        }
        let slice = &values[i + 1 - window..=i];
        let extreme = slice.iter().copied().reduce(pick);
        out.push(extreme);
    }
    out
}

/// Exponential moving average with `alpha = 2 / (span + 1)`, seeded with the
/// first value, so it is defined from the first row on.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    if values.is_empty() || span == 0 {
        return Vec::new();
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut current = values[0];
    out.push(current);
    for &value in &values[1..] {
        current = alpha * value + (1.0 - alpha) * current;
        out.push(current);
    }
    out
}

/// RSI over simple rolling means of gains and losses:
/// `100 - 100 / (1 + avg_gain / avg_loss)`. When the window holds no losses
/// the ratio is undefined and the value stays `None` (treated as neutral by
/// callers), never a panic.
pub fn rsi(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 || closes.len() < 2 {
        return out;
    }

    let mut gains: VecDeque<f64> = VecDeque::new();
    let mut losses: VecDeque<f64> = VecDeque::new();
    let mut sum_gain = 0.0;
    let mut sum_loss = 0.0;

    for i in 1..closes.len() {
        let delta = closes[i] - closes[i - 1];
        let gain = delta.max(0.0);
        let loss = (-delta).max(0.0);
        gains.push_back(gain);
        losses.push_back(loss);
        sum_gain += gain;
        sum_loss += loss;
        while gains.len() > period {
            if let Some(front) = gains.pop_front() {
                sum_gain -= front;
            }
            if let Some(front) = losses.pop_front() {
                sum_loss -= front;
            }
        }
        if gains.len() == period && sum_loss > 0.0 {
            let rs = sum_gain / sum_loss;
            out[i] = Some(100.0 - 100.0 / (1.0 + rs));
        }
    }
    out
}

/// True range per bar: `max(high - low, |high - prev_close|, |low - prev_close|)`.
/// The first bar has no previous close and falls back to `high - low`.
pub fn true_ranges(bars: &[Bar]) -> Vec<f64> {
    let mut out = Vec::with_capacity(bars.len());
    for (i, bar) in bars.iter().enumerate() {
        let range = bar.high - bar.low;
        let tr = if i == 0 {
            range
        } else {
            let prev_close = bars[i - 1].close;
            range
                .max((bar.high - prev_close).abs())
                .max((bar.low - prev_close).abs())
        };
        out.push(tr);
    }
    out
}

pub fn atr(bars: &[Bar], window: usize) -> Vec<Option<f64>> {
    rolling_mean(&true_ranges(bars), window)
}

/// Rate of change over `period` rows: `(c[t] - c[t-period]) / c[t-period]`.
pub fn momentum(closes: &[f64], period: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; closes.len()];
    if period == 0 {
        return out;
    }
    for i in period..closes.len() {
        let base = closes[i - period];
        if base != 0.0 {
            out[i] = Some((closes[i] - base) / base);
        }
    }
    out
}
