pub mod backtest;
pub mod exchange;
pub mod indicators;
pub mod ohlcv;
pub mod strategy;
