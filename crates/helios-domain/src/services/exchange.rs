//! In-memory exchange double: instant fills at the current mark price,
//! weighted-average position accounting, spot-style cash balance. No fees,
//! no slippage, no partial fills.

use std::collections::HashMap;

use crate::value_objects::order::{Order, OrderStatus};
use crate::value_objects::position::Position;
use crate::value_objects::side::Side;

/// Simulated exchange holding one cash balance and per-symbol positions.
pub struct SimExchange {
    balance: f64,
    positions: HashMap<String, Position>,
    orders: Vec<Order>,
    prices: HashMap<String, f64>,
    timestamps: HashMap<String, i64>,
    realized_pnl: f64,
    next_order_id: u64,
}

impl SimExchange {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            balance: initial_balance,
            positions: HashMap::new(),
            orders: Vec::new(),
            prices: HashMap::new(),
            timestamps: HashMap::new(),
            realized_pnl: 0.0,
            next_order_id: 1,
        }
    }

    /// Advance the mark price for a symbol and revalue any open position.
    pub fn set_current_price(&mut self, symbol: &str, price: f64, timestamp: i64) {
        self.prices.insert(symbol.to_string(), price);
        self.timestamps.insert(symbol.to_string(), timestamp);
        if let Some(position) = self.positions.get_mut(symbol) {
            position.current_price = price;
            position.pnl = (price - position.avg_price) * position.quantity;
        }
    }

    /// Place a market (price `None`) or limit order. Fills immediately at the
    /// given price or the current mark. Returns the order id.
    pub fn place_order(
        &mut self,
        symbol: &str,
        side: Side,
        quantity: f64,
        price: Option<f64>,
    ) -> Result<u64, String> {
        if quantity <= 0.0 || !quantity.is_finite() {
            return Err(format!("invalid order quantity: {quantity}"));
        }
        let fill_price = match price {
            Some(p) if p > 0.0 && p.is_finite() => p,
            Some(p) => return Err(format!("invalid limit price: {p}")),
            None => *self
                .prices
                .get(symbol)
                .ok_or_else(|| format!("no market price for symbol '{symbol}'"))?,
        };
        if side == Side::Buy {
            let cost = quantity * fill_price;
            if cost > self.balance {
                return Err(format!(
                    "insufficient balance: need {cost:.2}, have {:.2}",
                    self.balance
                ));
            }
        }

        let id = self.next_order_id;
        self.next_order_id += 1;
        let timestamp = self.timestamps.get(symbol).copied().unwrap_or(0);

        self.apply_fill(symbol, side, quantity, fill_price);
        self.orders.push(Order {
            id,
            symbol: symbol.to_string(),
            side,
            quantity,
            price: fill_price,
            timestamp,
            status: OrderStatus::Filled,
        });
        Ok(id)
    }

    fn apply_fill(&mut self, symbol: &str, side: Side, quantity: f64, price: f64) {
        let signed = match side {
            Side::Buy => quantity,
            Side::Sell => -quantity,
        };
        match side {
            Side::Buy => self.balance -= quantity * price,
            Side::Sell => self.balance += quantity * price,
        }

        let position = self
            .positions
            .entry(symbol.to_string())
            .or_insert_with(|| Position::new(symbol.to_string()));
        let old_quantity = position.quantity;
        let new_quantity = old_quantity + signed;

        if old_quantity != 0.0 && old_quantity.signum() != signed.signum() {
            // Fill against the existing position: realise pnl on the closed
            // portion.
            let closed = signed.abs().min(old_quantity.abs());
            self.realized_pnl += (price - position.avg_price) * closed * old_quantity.signum();
            if new_quantity == 0.0 || new_quantity.signum() != old_quantity.signum() {
                // Crossed through flat: the remainder is a fresh position at
                // the fill price.
                position.avg_price = if new_quantity == 0.0 { 0.0 } else { price };
            }
        } else if new_quantity != 0.0 {
            position.avg_price = (position.avg_price * old_quantity.abs()
                + price * quantity)
                / new_quantity.abs();
        }

        position.quantity = new_quantity;
        position.current_price = price;
        position.pnl = if new_quantity == 0.0 {
            0.0
        } else {
            (price - position.avg_price) * new_quantity
        };
        if new_quantity == 0.0 {
            self.positions.remove(symbol);
        }
    }

    pub fn get_balance(&self) -> f64 {
        self.balance
    }

    pub fn get_positions(&self) -> Vec<Position> {
        let mut out: Vec<Position> = self.positions.values().cloned().collect();
        out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
        out
    }

    pub fn get_position(&self, symbol: &str) -> Option<&Position> {
        self.positions.get(symbol)
    }

    pub fn get_ticker(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).copied()
    }

    /// Unrealised pnl across open positions plus pnl realised by closes.
    pub fn get_total_pnl(&self) -> f64 {
        self.realized_pnl + self.positions.values().map(|p| p.pnl).sum::<f64>()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.realized_pnl
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_position_gains_on_price_rise() {
        let mut exchange = SimExchange::new(100_000.0);
        exchange.set_current_price("BTC-USD", 50_000.0, 1);
        exchange
            .place_order("BTC-USD", Side::Buy, 1.0, None)
            .unwrap();
        exchange.set_current_price("BTC-USD", 55_000.0, 2);
        assert!((exchange.get_total_pnl() - 5_000.0).abs() < 1e-9);
        assert!((exchange.get_balance() - 50_000.0).abs() < 1e-9);
    }

    #[test]
    fn short_position_gains_on_price_drop() {
        let mut exchange = SimExchange::new(100_000.0);
        exchange.set_current_price("BTC-USD", 50_000.0, 1);
        exchange
            .place_order("BTC-USD", Side::Sell, 1.0, None)
            .unwrap();
        exchange.set_current_price("BTC-USD", 45_000.0, 2);
        assert!((exchange.get_total_pnl() - 5_000.0).abs() < 1e-9);
        assert!((exchange.get_balance() - 150_000.0).abs() < 1e-9);
    }

    #[test]
    fn buys_average_into_a_weighted_price() {
        let mut exchange = SimExchange::new(1_000_000.0);
        exchange.set_current_price("ETH-USD", 100.0, 1);
        exchange
            .place_order("ETH-USD", Side::Buy, 2.0, None)
            .unwrap();
        exchange.set_current_price("ETH-USD", 130.0, 2);
        exchange
            .place_order("ETH-USD", Side::Buy, 1.0, None)
            .unwrap();
        let position = exchange.get_position("ETH-USD").unwrap();
        assert!((position.avg_price - 110.0).abs() < 1e-9);
        assert!((position.quantity - 3.0).abs() < 1e-9);
    }

    #[test]
    fn closing_realises_pnl_and_removes_the_position() {
        let mut exchange = SimExchange::new(100_000.0);
        exchange.set_current_price("BTC-USD", 100.0, 1);
        exchange
            .place_order("BTC-USD", Side::Buy, 10.0, None)
            .unwrap();
        exchange.set_current_price("BTC-USD", 120.0, 2);
        exchange
            .place_order("BTC-USD", Side::Sell, 10.0, None)
            .unwrap();
        assert!(exchange.get_position("BTC-USD").is_none());
        assert!((exchange.realized_pnl() - 200.0).abs() < 1e-9);
        assert!((exchange.get_balance() - 100_200.0).abs() < 1e-9);
    }

    #[test]
    fn crossing_through_flat_resets_the_average_price() {
        let mut exchange = SimExchange::new(1_000_000.0);
        exchange.set_current_price("BTC-USD", 100.0, 1);
        exchange
            .place_order("BTC-USD", Side::Buy, 1.0, None)
            .unwrap();
        exchange.set_current_price("BTC-USD", 110.0, 2);
        // Sell 3: closes the 1-lot long, leaves a 2-lot short at 110.
        exchange
            .place_order("BTC-USD", Side::Sell, 3.0, None)
            .unwrap();
        let position = exchange.get_position("BTC-USD").unwrap();
        assert!((position.quantity + 2.0).abs() < 1e-9);
        assert!((position.avg_price - 110.0).abs() < 1e-9);
        assert!((exchange.realized_pnl() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn buy_beyond_balance_is_rejected() {
        let mut exchange = SimExchange::new(1_000.0);
        exchange.set_current_price("BTC-USD", 50_000.0, 1);
        let err = exchange
            .place_order("BTC-USD", Side::Buy, 1.0, None)
            .unwrap_err();
        assert!(err.contains("insufficient balance"));
        assert!(exchange.orders().is_empty());
    }

    #[test]
    fn market_order_without_a_price_feed_fails() {
        let mut exchange = SimExchange::new(1_000.0);
        let err = exchange
            .place_order("BTC-USD", Side::Buy, 1.0, None)
            .unwrap_err();
        assert!(err.contains("no market price"));
    }

    #[test]
    fn invalid_quantities_and_prices_are_rejected() {
        let mut exchange = SimExchange::new(1_000.0);
        exchange.set_current_price("BTC-USD", 100.0, 1);
        assert!(exchange
            .place_order("BTC-USD", Side::Buy, 0.0, None)
            .is_err());
        assert!(exchange
            .place_order("BTC-USD", Side::Buy, -1.0, None)
            .is_err());
        assert!(exchange
            .place_order("BTC-USD", Side::Buy, 1.0, Some(0.0))
            .is_err());
    }

    #[test]
    fn order_ids_are_sequential_and_orders_are_recorded() {
        let mut exchange = SimExchange::new(100_000.0);
        exchange.set_current_price("BTC-USD", 100.0, 5);
        let first = exchange
            .place_order("BTC-USD", Side::Buy, 1.0, None)
            .unwrap();
        let second = exchange
            .place_order("BTC-USD", Side::Sell, 1.0, None)
            .unwrap();
        assert_eq!(first, 1);
        assert_eq!(second, 2);
        let orders = exchange.orders();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].status, OrderStatus::Filled);
        assert_eq!(orders[0].timestamp, 5);
        assert_eq!(orders[1].side, Side::Sell);
    }
}
