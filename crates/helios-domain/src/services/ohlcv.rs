use crate::value_objects::bar::Bar;

#[derive(Debug, Default, Clone)]
pub struct DataQualityReport {
    pub rows: usize,
    pub duplicates: usize,
    pub out_of_order: usize,
    pub invalid_close: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
    pub first_duplicate: Option<i64>,
    pub first_out_of_order: Option<i64>,
    pub first_invalid_close: Option<i64>,
}

pub fn data_quality_from_bars(bars: &[Bar]) -> DataQualityReport {
    let mut report = DataQualityReport {
        rows: bars.len(),
        ..DataQualityReport::default()
    };
    if bars.is_empty() {
        return report;
    }

    report.first_timestamp = Some(bars[0].timestamp);
    report.last_timestamp = Some(bars[bars.len() - 1].timestamp);

    let mut last_ts: Option<i64> = None;
    for bar in bars {
        if !bar.close.is_finite() || bar.close <= 0.0 {
            report.invalid_close += 1;
            if report.first_invalid_close.is_none() {
                report.first_invalid_close = Some(bar.timestamp);
            }
        }

        if let Some(prev) = last_ts {
            if bar.timestamp == prev {
                report.duplicates += 1;
                if report.first_duplicate.is_none() {
                    report.first_duplicate = Some(bar.timestamp);
                }
            } else if bar.timestamp < prev {
                report.out_of_order += 1;
                if report.first_out_of_order.is_none() {
                    report.first_out_of_order = Some(bar.timestamp);
                }
            }
        }
        last_ts = Some(bar.timestamp);
    }

    report
}

/// Checks the invariants every bar series handed to the backtest runner must
/// satisfy: at least two rows, strictly increasing timestamps, finite positive
/// prices, non-negative volume, and `low <= open,close <= high`.
pub fn validate_bars(bars: &[Bar]) -> Result<(), String> {
    if bars.is_empty() {
        return Err("bar series is empty".to_string());
    }
    if bars.len() < 2 {
        return Err(format!(
            "bar series too short: {} rows, minimum 2 required",
            bars.len()
        ));
    }

    let mut last_ts: Option<i64> = None;
    for bar in bars {
        for (field, value) in [
            ("open", bar.open),
            ("high", bar.high),
            ("low", bar.low),
            ("close", bar.close),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!(
                    "non-positive {} price {} at timestamp {}",
                    field, value, bar.timestamp
                ));
            }
        }
        if !bar.volume.is_finite() || bar.volume < 0.0 {
            return Err(format!(
                "negative volume {} at timestamp {}",
                bar.volume, bar.timestamp
            ));
        }
        if bar.low > bar.open.min(bar.close) || bar.high < bar.open.max(bar.close) {
            return Err(format!(
                "OHLC invariant violated at timestamp {}: low={} open={} close={} high={}",
                bar.timestamp, bar.low, bar.open, bar.close, bar.high
            ));
        }
        if let Some(prev) = last_ts {
            if bar.timestamp <= prev {
                return Err(format!(
                    "timestamps not strictly increasing at {} (previous {})",
                    bar.timestamp, prev
                ));
            }
        }
        last_ts = Some(bar.timestamp);
    }

    Ok(())
}
