//! Paper trading: replay recent bars through the simulated exchange, driving
//! position changes from the chosen strategy's latest signal at each step.
//! Position changes happen in two phases, close first, then open, so every
//! order is either a full close or a fresh entry.

use std::time::Instant;

use helios_domain::repositories::market_data::MarketDataRepository;
use helios_domain::services::exchange::SimExchange;
use helios_domain::services::strategy::Strategy;
use helios_domain::value_objects::bar::Bar;
use helios_domain::value_objects::order::Order;
use helios_domain::value_objects::side::Side;
use helios_domain::value_objects::signal::Signal;
use serde::Serialize;
use tracing::{debug, info_span};

/// Minimum history fetched ahead of the replayed span so long-window
/// strategies have warm indicators from the first replayed bar.
pub const MIN_HISTORY_BARS: usize = 60;

/// Trailing bars handed to the strategy at each replay step.
pub const SIGNAL_WINDOW: usize = 50;

/// Snapshot of account state after one replayed bar.
#[derive(Debug, Clone, Serialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub equity: f64,
    pub cash: f64,
    pub position_qty: f64,
    pub unrealized_pnl: f64,
    pub realized_pnl: f64,
}

/// An entry order paired with the order that closed it.
#[derive(Debug, Clone, Serialize)]
pub struct CompletedTrade {
    pub symbol: String,
    pub direction: Side,
    pub quantity: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_timestamp: i64,
    pub exit_timestamp: i64,
    pub pnl: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub strategy: String,
    pub symbol: String,
    /// Bars actually replayed; short requests are extended to the minimum history.
    pub days: usize,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub final_equity: f64,
    pub total_pnl: f64,
    pub return_pct: f64,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    pub avg_trade_pnl: f64,
    pub orders: Vec<Order>,
    pub trades: Vec<CompletedTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

pub struct PaperTrader {
    symbol: String,
    trade_quantity: f64,
    initial_balance: f64,
}

impl PaperTrader {
    pub fn new(symbol: &str, trade_quantity: f64, initial_balance: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            trade_quantity,
            initial_balance,
        }
    }

    /// Replay `max(days, MIN_HISTORY_BARS)` bars through a fresh exchange,
    /// bar by bar. Short requests are extended to the minimum history so
    /// long-window strategies see meaningful context, and the report covers
    /// the whole replayed span.
    pub fn run_simulation(
        &self,
        strategy: &dyn Strategy,
        market_data: &dyn MarketDataRepository,
        days: usize,
    ) -> Result<SimulationReport, String> {
        let _span = info_span!(
            "run_simulation",
            symbol = %self.symbol,
            strategy = strategy.name(),
            days
        )
        .entered();
        let start = Instant::now();

        if days == 0 {
            return Err("simulation span must be at least one bar".to_string());
        }
        if self.trade_quantity <= 0.0 || !self.trade_quantity.is_finite() {
            return Err(format!("invalid trade quantity: {}", self.trade_quantity));
        }

        let history = days.max(MIN_HISTORY_BARS);
        let bars = market_data.recent_bars(&self.symbol, history)?;
        if bars.len() < days {
            return Err(format!(
                "not enough history for a {days}-bar simulation: got {} bars",
                bars.len()
            ));
        }

        let mut exchange = SimExchange::new(self.initial_balance);
        let mut equity_curve = Vec::with_capacity(bars.len());

        for i in 0..bars.len() {
            let bar = &bars[i];
            exchange.set_current_price(&self.symbol, bar.close, bar.timestamp);

            let window_start = (i + 1).saturating_sub(SIGNAL_WINDOW);
            let window = &bars[window_start..=i];
            let desired = latest_signal(strategy, window)?;
            self.apply_signal(&mut exchange, desired, bar)?;

            let position_qty = exchange
                .get_position(&self.symbol)
                .map(|p| p.quantity)
                .unwrap_or(0.0);
            let unrealized = exchange.get_total_pnl() - exchange.realized_pnl();
            equity_curve.push(EquityPoint {
                timestamp: bar.timestamp,
                equity: exchange.get_balance() + position_qty * bar.close,
                cash: exchange.get_balance(),
                position_qty,
                unrealized_pnl: unrealized,
                realized_pnl: exchange.realized_pnl(),
            });
        }

        metrics::histogram!("helios.paper.replay_ms").record(start.elapsed().as_millis() as f64);
        metrics::gauge!("helios.paper.orders").set(exchange.orders().len() as f64);

        let orders = exchange.orders().to_vec();
        let trades = pair_trades(&orders);
        let wins = trades.iter().filter(|t| t.pnl > 0.0).count();
        let losses = trades.len() - wins;
        let win_rate = if trades.is_empty() {
            0.0
        } else {
            wins as f64 / trades.len() as f64
        };
        let avg_trade_pnl = if trades.is_empty() {
            0.0
        } else {
            trades.iter().map(|t| t.pnl).sum::<f64>() / trades.len() as f64
        };
        let final_balance = exchange.get_balance();
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_balance);
        Ok(SimulationReport {
            strategy: strategy.name().to_string(),
            symbol: self.symbol.clone(),
            days: bars.len(),
            initial_balance: self.initial_balance,
            final_balance,
            final_equity,
            total_pnl: exchange.get_total_pnl(),
            return_pct: (final_equity - self.initial_balance) / self.initial_balance * 100.0,
            wins,
            losses,
            win_rate,
            avg_trade_pnl,
            orders,
            trades,
            equity_curve,
        })
    }

    /// Move the exchange position to the desired state: close any position
    /// on the wrong side first, then open the new one.
    fn apply_signal(
        &self,
        exchange: &mut SimExchange,
        desired: Signal,
        bar: &Bar,
    ) -> Result<(), String> {
        let current_qty = exchange
            .get_position(&self.symbol)
            .map(|p| p.quantity)
            .unwrap_or(0.0);
        let current = if current_qty > 0.0 {
            Signal::Long
        } else if current_qty < 0.0 {
            Signal::Short
        } else {
            Signal::Flat
        };
        if desired == current {
            return Ok(());
        }

        if current != Signal::Flat {
            let close_side = if current_qty > 0.0 {
                Side::Sell
            } else {
                Side::Buy
            };
            exchange.place_order(&self.symbol, close_side, current_qty.abs(), None)?;
            debug!(timestamp = bar.timestamp, side = close_side.as_str(), "position closed");
        }
        if desired != Signal::Flat {
            let open_side = if desired == Signal::Long {
                Side::Buy
            } else {
                Side::Sell
            };
            exchange.place_order(&self.symbol, open_side, self.trade_quantity, None)?;
            debug!(timestamp = bar.timestamp, side = open_side.as_str(), "position opened");
        }
        Ok(())
    }
}

fn latest_signal(strategy: &dyn Strategy, window: &[Bar]) -> Result<Signal, String> {
    let signals = strategy.signals(window)?;
    Ok(signals.last().copied().unwrap_or_default())
}

/// Pair the order stream into completed trades. Every order is either a full
/// close of the open lot or a fresh entry, so one open lot suffices.
pub fn pair_trades(orders: &[Order]) -> Vec<CompletedTrade> {
    let mut trades = Vec::new();
    let mut open: Option<&Order> = None;
    for order in orders {
        match open {
            None => open = Some(order),
            Some(entry) if entry.side == order.side => {
                // Same-direction add; treat the first order as the lot.
                open = Some(entry);
            }
            Some(entry) => {
                let sign = match entry.side {
                    Side::Buy => 1.0,
                    Side::Sell => -1.0,
                };
                trades.push(CompletedTrade {
                    symbol: entry.symbol.clone(),
                    direction: entry.side,
                    quantity: entry.quantity,
                    entry_price: entry.price,
                    exit_price: order.price,
                    entry_timestamp: entry.timestamp,
                    exit_timestamp: order.timestamp,
                    pnl: (order.price - entry.price) * entry.quantity * sign,
                });
                open = None;
            }
        }
    }
    trades
}

#[cfg(test)]
mod tests {
    use super::*;
    use helios_domain::repositories::market_data::VecBarRepository;
    use helios_domain::value_objects::order::OrderStatus;

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

    fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(i as i64 + 1, c))
            .collect()
    }

    /// Goes long while the latest close is above the threshold, short below
    /// the lower threshold.
    struct Threshold {
        long_above: f64,
        short_below: f64,
    }

    impl Strategy for Threshold {
        fn name(&self) -> &str {
            "threshold"
        }

        fn signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, String> {
            Ok(bars
                .iter()
                .map(|b| {
                    if b.close > self.long_above {
                        Signal::Long
                    } else if b.close < self.short_below {
                        Signal::Short
                    } else {
                        Signal::Flat
                    }
                })
                .collect())
        }
    }

    #[test]
    fn flat_strategy_places_no_orders() {
        struct AlwaysFlat;
        impl Strategy for AlwaysFlat {
            fn name(&self) -> &str {
                "always_flat"
            }
            fn signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, String> {
                Ok(vec![Signal::Flat; bars.len()])
            }
        }

        let repo = VecBarRepository::new(bars(&vec![100.0; 70]));
        let trader = PaperTrader::new("BTC-USD", 1.0, 10_000.0);
        let report = trader
            .run_simulation(&AlwaysFlat, &repo, 10)
            .unwrap();
        assert!(report.orders.is_empty());
        assert!(report.trades.is_empty());
        assert_eq!(report.final_balance, 10_000.0);
        assert_eq!(report.equity_curve.len(), MIN_HISTORY_BARS);
        assert_eq!(report.days, MIN_HISTORY_BARS);
        assert_eq!(report.total_pnl, 0.0);
    }

    #[test]
    fn short_requests_replay_the_full_extended_span() {
        // The move happens before the last five bars; a replay restricted to
        // the requested span would never trade.
        let mut closes = vec![105.0; 55];
        closes.extend([100.0; 5]);
        let repo = VecBarRepository::new(bars(&closes));
        let trader = PaperTrader::new("BTC-USD", 1.0, 10_000.0);
        let strategy = Threshold {
            long_above: 101.0,
            short_below: 0.0,
        };
        let report = trader.run_simulation(&strategy, &repo, 5).unwrap();

        assert_eq!(report.days, MIN_HISTORY_BARS);
        assert_eq!(report.equity_curve.len(), MIN_HISTORY_BARS);
        assert_eq!(report.orders.len(), 2);
        assert_eq!(report.orders[0].side, Side::Buy);
        assert_eq!(report.orders[1].side, Side::Sell);
        assert_eq!(report.trades.len(), 1);
        // Bought at 105 on the first bar, closed at 100 on the drop.
        assert!((report.trades[0].pnl + 5.0).abs() < 1e-9);
        assert!((report.final_balance - 9_995.0).abs() < 1e-9);
    }

    #[test]
    fn zero_pnl_trades_count_as_losses() {
        // Long until a cutoff timestamp, over a flat tape: entry and exit at
        // the same price, so the single trade has zero pnl.
        struct LongUntil {
            cutoff: i64,
        }
        impl Strategy for LongUntil {
            fn name(&self) -> &str {
                "long_until"
            }
            fn signals(&self, bars: &[Bar]) -> Result<Vec<Signal>, String> {
                Ok(bars
                    .iter()
                    .map(|b| {
                        if b.timestamp < self.cutoff {
                            Signal::Long
                        } else {
                            Signal::Flat
                        }
                    })
                    .collect())
            }
        }

        let repo = VecBarRepository::new(bars(&vec![100.0; 70]));
        let trader = PaperTrader::new("BTC-USD", 1.0, 10_000.0);
        let report = trader
            .run_simulation(&LongUntil { cutoff: 40 }, &repo, 10)
            .unwrap();
        assert_eq!(report.trades.len(), 1);
        assert_eq!(report.trades[0].pnl, 0.0);
        assert_eq!(report.wins, 0);
        assert_eq!(report.losses, 1);
        assert_eq!(report.wins + report.losses, report.trades.len());
        assert_eq!(report.win_rate, 0.0);
    }

    #[test]
    fn long_then_flat_produces_one_completed_trade() {
        // Above 100 for the first half of the replay, back to 100 after.
        let mut closes = vec![100.0; 60];
        closes.extend([105.0, 105.0, 105.0, 110.0, 100.0, 100.0]);
        let repo = VecBarRepository::new(bars(&closes));
        let trader = PaperTrader::new("BTC-USD", 2.0, 10_000.0);
        let strategy = Threshold {
            long_above: 101.0,
            short_below: 0.0,
        };
        let report = trader.run_simulation(&strategy, &repo, 6).unwrap();

        assert_eq!(report.orders.len(), 2);
        assert_eq!(report.orders[0].side, Side::Buy);
        assert_eq!(report.orders[1].side, Side::Sell);
        assert_eq!(report.trades.len(), 1);
        let trade = &report.trades[0];
        assert_eq!(trade.direction, Side::Buy);
        assert!((trade.entry_price - 105.0).abs() < 1e-9);
        assert!((trade.exit_price - 100.0).abs() < 1e-9);
        assert!((trade.pnl + 10.0).abs() < 1e-9);
        assert!((report.final_balance - 9_990.0).abs() < 1e-9);
        assert_eq!(report.wins, 0);
        assert_eq!(report.losses, 1);
        assert_eq!(report.win_rate, 0.0);
        assert!((report.avg_trade_pnl + 10.0).abs() < 1e-9);
    }

    #[test]
    fn reversal_closes_then_opens() {
        let mut closes = vec![100.0; 60];
        closes.extend([105.0, 105.0, 90.0, 90.0]);
        let repo = VecBarRepository::new(bars(&closes));
        let trader = PaperTrader::new("BTC-USD", 1.0, 10_000.0);
        let strategy = Threshold {
            long_above: 101.0,
            short_below: 95.0,
        };
        let report = trader.run_simulation(&strategy, &repo, 4).unwrap();

        // Buy at 105, then on the drop: close (sell) and open short (sell).
        assert_eq!(report.orders.len(), 3);
        assert_eq!(report.orders[0].side, Side::Buy);
        assert_eq!(report.orders[1].side, Side::Sell);
        assert_eq!(report.orders[2].side, Side::Sell);
        assert!(report.orders.iter().all(|o| o.status == OrderStatus::Filled));
        assert_eq!(report.trades.len(), 1);
        assert!((report.trades[0].pnl + 15.0).abs() < 1e-9);

        // Short stays open at the end; equity reflects the open short.
        let last = report.equity_curve.last().unwrap();
        assert!((last.position_qty + 1.0).abs() < 1e-9);
    }

    #[test]
    fn equity_equals_cash_plus_position_value() {
        let mut closes = vec![100.0; 60];
        closes.extend([105.0, 107.0, 109.0]);
        let repo = VecBarRepository::new(bars(&closes));
        let trader = PaperTrader::new("BTC-USD", 1.0, 10_000.0);
        let strategy = Threshold {
            long_above: 101.0,
            short_below: 0.0,
        };
        let report = trader.run_simulation(&strategy, &repo, 3).unwrap();
        for point in &report.equity_curve {
            assert!(
                (point.equity - (point.cash + point.position_qty * closes_at(point.timestamp)))
                    .abs()
                    < 1e-9
            );
        }
        // One buy at 105, marked at 109: 4 of unrealized pnl.
        assert!((report.total_pnl - 4.0).abs() < 1e-9);
        assert!((report.final_equity - 10_004.0).abs() < 1e-9);

        fn closes_at(ts: i64) -> f64 {
            match ts {
                61 => 105.0,
                62 => 107.0,
                _ => 109.0,
            }
        }
    }

    #[test]
    fn zero_days_is_rejected() {
        let repo = VecBarRepository::new(bars(&vec![100.0; 70]));
        let trader = PaperTrader::new("BTC-USD", 1.0, 10_000.0);
        let strategy = Threshold {
            long_above: 101.0,
            short_below: 0.0,
        };
        assert!(trader.run_simulation(&strategy, &repo, 0).is_err());
    }

    #[test]
    fn insufficient_history_is_rejected() {
        let repo = VecBarRepository::new(bars(&vec![100.0; 5]));
        let trader = PaperTrader::new("BTC-USD", 1.0, 10_000.0);
        let strategy = Threshold {
            long_above: 101.0,
            short_below: 0.0,
        };
        let err = trader.run_simulation(&strategy, &repo, 10).unwrap_err();
        assert!(err.contains("not enough history"));
    }

    #[test]
    fn pair_trades_handles_an_unclosed_tail() {
        let order = |id, side, price, ts| Order {
            id,
            symbol: "BTC-USD".to_string(),
            side,
            quantity: 1.0,
            price,
            timestamp: ts,
            status: OrderStatus::Filled,
        };
        let orders = vec![
            order(1, Side::Sell, 100.0, 1),
            order(2, Side::Buy, 90.0, 2),
            order(3, Side::Buy, 95.0, 3),
        ];
        let trades = pair_trades(&orders);
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].direction, Side::Sell);
        assert!((trades[0].pnl - 10.0).abs() < 1e-9);
    }
}
