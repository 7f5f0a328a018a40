use crate::value_objects::bar::Bar;

/// Port for the external market-data provider. Implementations must return a
/// time-ordered bar series satisfying the bar invariants, or an error; the
/// core does no retries or caching on top of this.
pub trait MarketDataRepository {
    fn recent_bars(&self, symbol: &str, periods: usize) -> Result<Vec<Bar>, String>;
}

/// Canned in-memory source, used by tests and anywhere a pre-loaded series
/// needs to stand in for a provider.
pub struct VecBarRepository {
    bars: Vec<Bar>,
}

impl VecBarRepository {
    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }
}

impl MarketDataRepository for VecBarRepository {
    fn recent_bars(&self, _symbol: &str, periods: usize) -> Result<Vec<Bar>, String> {
        if self.bars.is_empty() {
            return Err("no bars loaded".to_string());
        }
        let start = self.bars.len().saturating_sub(periods);
        Ok(self.bars[start..].to_vec())
    }
}
