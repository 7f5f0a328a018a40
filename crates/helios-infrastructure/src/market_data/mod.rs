//! Market-data adapters: CSV files on disk and a seeded synthetic generator
//! for offline runs. Both normalise into the domain `Bar` and report data
//! quality instead of failing on dirty rows.

use std::collections::BTreeMap;
use std::fs::File;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use helios_domain::repositories::market_data::MarketDataRepository;
use helios_domain::services::ohlcv::DataQualityReport;
use helios_domain::value_objects::bar::Bar;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Deserialize;
use tracing::debug;

pub const SECONDS_PER_DAY: i64 = 86_400;

#[derive(Debug, Deserialize)]
pub struct OhlcvRecord {
    pub timestamp_utc: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Load an OHLCV CSV, canonicalising to unique ascending timestamps. Rows
/// with a non-positive or non-finite close are dropped and counted rather
/// than aborting the load.
pub fn load_csv(path: &Path, symbol: &str) -> Result<(Vec<Bar>, DataQualityReport), String> {
    let file = File::open(path)
        .map_err(|err| format!("failed to open OHLCV CSV {}: {}", path.display(), err))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut bars_by_ts: BTreeMap<i64, Bar> = BTreeMap::new();
    let mut report = DataQualityReport::default();
    let mut last_seen_ts: Option<i64> = None;

    for result in reader.deserialize::<OhlcvRecord>() {
        let record = result.map_err(|err| format!("failed to parse CSV row: {}", err))?;
        let timestamp = parse_timestamp(&record.timestamp_utc)?;
        report.rows += 1;

        if !record.close.is_finite() || record.close <= 0.0 {
            report.invalid_close += 1;
            if report.first_invalid_close.is_none() {
                report.first_invalid_close = Some(timestamp);
            }
            continue;
        }

        if let Some(prev) = last_seen_ts {
            if timestamp < prev {
                report.out_of_order += 1;
                if report.first_out_of_order.is_none() {
                    report.first_out_of_order = Some(timestamp);
                }
            }
        }
        last_seen_ts = Some(timestamp);

        if bars_by_ts
            .insert(
                timestamp,
                Bar {
                    symbol: symbol.to_string(),
                    timestamp,
                    open: record.open,
                    high: record.high,
                    low: record.low,
                    close: record.close,
                    volume: record.volume,
                },
            )
            .is_some()
        {
            report.duplicates += 1;
            if report.first_duplicate.is_none() {
                report.first_duplicate = Some(timestamp);
            }
        }
    }

    let bars: Vec<Bar> = bars_by_ts.into_values().collect();
    report.first_timestamp = bars.first().map(|b| b.timestamp);
    report.last_timestamp = bars.last().map(|b| b.timestamp);
    debug!(
        path = %path.display(),
        rows = report.rows,
        bars = bars.len(),
        duplicates = report.duplicates,
        "ohlcv csv loaded"
    );
    Ok((bars, report))
}

fn parse_timestamp(value: &str) -> Result<i64, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%z") {
        return Ok(dt.timestamp());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        let dt: DateTime<Utc> = Utc.from_utc_datetime(&naive);
        return Ok(dt.timestamp());
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if let Some(naive) = date.and_hms_opt(0, 0, 0) {
            return Ok(Utc.from_utc_datetime(&naive).timestamp());
        }
    }
    Err(format!("unsupported timestamp format: {}", value))
}

/// File-backed market data: one CSV per repository, re-read on each query.
pub struct CsvMarketDataRepository {
    path: PathBuf,
}

impl CsvMarketDataRepository {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl MarketDataRepository for CsvMarketDataRepository {
    fn recent_bars(&self, symbol: &str, periods: usize) -> Result<Vec<Bar>, String> {
        let (bars, _report) = load_csv(&self.path, symbol)?;
        if bars.is_empty() {
            return Err(format!("no usable bars in {}", self.path.display()));
        }
        let start = bars.len().saturating_sub(periods);
        Ok(bars[start..].to_vec())
    }
}

/// Seeded random-walk generator for offline runs. The same seed, symbol and
/// period count always produce the same series, so runs built on it are
/// reproducible end to end.
pub struct SyntheticMarketDataRepository {
    seed: u64,
    start_price: f64,
    daily_volatility: f64,
    drift: f64,
    /// Fixed last-bar timestamp; `None` uses the current UTC day boundary.
    end_timestamp: Option<i64>,
}

impl SyntheticMarketDataRepository {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            start_price: 50_000.0,
            daily_volatility: 0.02,
            drift: 0.0005,
            end_timestamp: None,
        }
    }

    pub fn with_params(mut self, start_price: f64, daily_volatility: f64, drift: f64) -> Self {
        self.start_price = start_price;
        self.daily_volatility = daily_volatility;
        self.drift = drift;
        self
    }

    pub fn with_end_timestamp(mut self, end_timestamp: i64) -> Self {
        self.end_timestamp = Some(end_timestamp);
        self
    }

    fn symbol_seed(&self, symbol: &str) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        symbol.hash(&mut hasher);
        self.seed ^ hasher.finish()
    }
}

impl MarketDataRepository for SyntheticMarketDataRepository {
    fn recent_bars(&self, symbol: &str, periods: usize) -> Result<Vec<Bar>, String> {
        if periods == 0 {
            return Err("cannot generate an empty bar series".to_string());
        }
        let normal = Normal::new(self.drift, self.daily_volatility)
            .map_err(|err| format!("invalid volatility parameters: {}", err))?;
        let mut rng = StdRng::seed_from_u64(self.symbol_seed(symbol));

        let end = self
            .end_timestamp
            .unwrap_or_else(|| Utc::now().timestamp())
            / SECONDS_PER_DAY
            * SECONDS_PER_DAY;

        let mut bars = Vec::with_capacity(periods);
        let mut close = self.start_price;
        for i in 0..periods {
            // First bar carries no return so every series starts at the
            // configured price.
            let ret = if i == 0 { 0.0 } else { normal.sample(&mut rng) };
            let open = close;
            close = (close * (1.0 + ret)).max(0.01);

            let body_high = open.max(close);
            let body_low = open.min(close);
            let wick: f64 = rng.gen_range(0.0..self.daily_volatility / 2.0);
            let high = body_high * (1.0 + wick);
            let low = (body_low * (1.0 - wick)).max(0.01);
            let volume =
                1_000_000.0 * rng.gen_range(0.5..2.0) * (ret.abs() / self.daily_volatility + 1.0);

            bars.push(Bar {
                symbol: symbol.to_string(),
                timestamp: end - (periods as i64 - 1 - i as i64) * SECONDS_PER_DAY,
                open,
                high,
                low,
                close,
                volume,
            });
        }
        Ok(bars)
    }
}
