//! Per-contract exogenous series derived from the settlement tables.

use strum::IntoEnumIterator;

use crate::{
    data::series::{ExogenousSeries, JoinKey, SeriesKey},
    settlement::{
        changes::SettlementChange,
        lookback::LookbackInterval,
        overnight::{GapReference, OvernightGap},
        volatility::{VolatilityMetric, VolatilityRow},
    },
};

/// Open-vs-settlement gaps keyed by contract and trading date.
pub fn change_series(
    interval: LookbackInterval,
    changes: &[SettlementChange],
) -> ExogenousSeries {
    ExogenousSeries::new(
        format!("{interval} settlement change"),
        JoinKey::ContractTradingDate,
        changes
            .iter()
            .map(|c| (SeriesKey::contract(&c.symbol, c.date), c.price_difference)),
    )
}

/// One series per volatility metric.
pub fn volatility_series(rows: &[VolatilityRow]) -> Vec<ExogenousSeries> {
    VolatilityMetric::iter()
        .map(|metric| {
            ExogenousSeries::new(
                metric.to_string(),
                JoinKey::ContractTradingDate,
                rows.iter()
                    .map(|r| (SeriesKey::contract(&r.symbol, r.date), metric.value(r))),
            )
        })
        .collect()
}

/// One series per gap reference, in the order `references` lists them.
pub fn overnight_gap_series(
    references: &[GapReference],
    gaps: &[OvernightGap],
) -> Vec<ExogenousSeries> {
    references
        .iter()
        .map(|reference| {
            ExogenousSeries::new(
                format!("{reference} overnight gap"),
                JoinKey::ContractTradingDate,
                gaps.iter()
                    .filter(|g| g.reference == *reference)
                    .map(|g| (SeriesKey::contract(&g.symbol, g.date), g.change)),
            )
        })
        .collect()
}
