/// One OHLCV record for a fixed time interval. Invariant: `low <= open,close <= high`,
/// all prices positive, volume non-negative. Enforced by `services::ohlcv::validate_bars`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}
