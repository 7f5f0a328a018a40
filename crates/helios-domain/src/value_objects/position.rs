use serde::Serialize;

/// Per-symbol position held by the simulated exchange. `quantity` is signed
/// (positive long, negative short); `pnl` is the unrealized mark against
/// `current_price`, zero while the position is flat.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: f64,
    pub avg_price: f64,
    pub current_price: f64,
    pub pnl: f64,
}

impl Position {
    pub fn new(symbol: String) -> Self {
        Self {
            symbol,
            quantity: 0.0,
            avg_price: 0.0,
            current_price: 0.0,
            pnl: 0.0,
        }
    }

    pub fn is_flat(&self) -> bool {
        self.quantity == 0.0
    }
}
