pub mod paper_trading;
pub mod selection;
