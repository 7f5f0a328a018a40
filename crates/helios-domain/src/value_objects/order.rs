use crate::value_objects::side::Side;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderStatus {
    Pending,
    Filled,
    Cancelled,
}

/// Immutable record of an accepted order. Appended once to the simulated
/// exchange's order log and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Order {
    pub id: u64,
    pub symbol: String,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
    pub timestamp: i64,
    pub status: OrderStatus,
}
