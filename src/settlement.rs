pub mod changes;
pub mod lookback;
pub mod overnight;
pub mod series;
pub mod volatility;
