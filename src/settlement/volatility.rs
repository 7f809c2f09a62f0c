use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    data::settlement::{SettlementHistory, SettlementRecord},
    math::{
        rounding::round_price,
        stats::{close_to_close_std, range},
    },
};

pub const WEEK_DAYS: i64 = 7;
pub const MONTH_DAYS: i64 = 30;
pub const YEAR_DAYS: i64 = 365;

/// Trailing settlement statistics of one contract on one date.
///
/// Every window is `[date - N days, date)`; the current row never counts towards its own window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolatilityRow {
    pub date: NaiveDate,
    pub symbol: String,
    pub count_7d: u32,
    pub count_30d: u32,
    pub count_365d: u32,
    pub range_7d: Option<f64>,
    pub range_30d: Option<f64>,
    pub range_365d: Option<f64>,
    /// Close-to-close dispersion over the 30-day window.
    pub csd_30d: Option<f64>,
}

/// Numeric columns of a [`VolatilityRow`], named as they appear in the volatility table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
pub enum VolatilityMetric {
    #[strum(serialize = "7D Count")]
    Count7d,
    #[strum(serialize = "30D Count")]
    Count30d,
    #[strum(serialize = "365D Count")]
    Count365d,
    #[strum(serialize = "7D Range")]
    Range7d,
    #[strum(serialize = "30D Range")]
    Range30d,
    #[strum(serialize = "365D Range")]
    Range365d,
    #[strum(serialize = "30D CSD")]
    Csd30d,
}

impl VolatilityMetric {
    pub fn value(&self, row: &VolatilityRow) -> Option<f64> {
        match self {
            VolatilityMetric::Count7d => Some(f64::from(row.count_7d)),
            VolatilityMetric::Count30d => Some(f64::from(row.count_30d)),
            VolatilityMetric::Count365d => Some(f64::from(row.count_365d)),
            VolatilityMetric::Range7d => row.range_7d,
            VolatilityMetric::Range30d => row.range_30d,
            VolatilityMetric::Range365d => row.range_365d,
            VolatilityMetric::Csd30d => row.csd_30d,
        }
    }
}

/// Trailing window of a settlement history ending right before a given row.
struct TrailingWindow<'a> {
    records: &'a [SettlementRecord],
    /// Index of the first row inside the window.
    start: usize,
    /// Index of the row the window trails (exclusive end).
    end: usize,
    /// Whether the contract has `N` days of history behind the row.
    mature: bool,
}

impl<'a> TrailingWindow<'a> {
    fn new(records: &'a [SettlementRecord], end: usize, days: i64, first: NaiveDate) -> Self {
        let date = records[end].date;
        let lower = date - Duration::days(days);
        let start = records[..end].partition_point(|r| r.date < lower);
        Self {
            records,
            start,
            end,
            mature: (date - first).num_days() >= days,
        }
    }

    fn settles(&self) -> Vec<f64> {
        self.records[self.start..self.end]
            .iter()
            .map(|r| r.settle)
            .collect()
    }

    fn count(&self) -> u32 {
        u32::try_from(self.end - self.start).unwrap_or(u32::MAX)
    }

    fn range(&self) -> Option<f64> {
        if !self.mature {
            return None;
        }
        range(&self.settles()).map(round_price)
    }

    /// Dispersion of consecutive settle differences, seeded with the row before the window.
    fn close_to_close(&self) -> Option<f64> {
        if !self.mature || self.start == self.end {
            return None;
        }
        let seed = self.start.checked_sub(1).map(|i| self.records[i].settle);
        let series: Vec<f64> = seed.into_iter().chain(self.settles()).collect();
        close_to_close_std(&series).map(round_price)
    }
}

/// Volatility rows of one contract in date order.
pub fn settlement_volatility(history: &SettlementHistory, symbol: &str) -> Vec<VolatilityRow> {
    let records: Vec<SettlementRecord> = history.records().copied().collect();
    let Some(first) = records.first().map(|r| r.date) else {
        return Vec::new();
    };

    (0..records.len())
        .map(|i| {
            let week = TrailingWindow::new(&records, i, WEEK_DAYS, first);
            let month = TrailingWindow::new(&records, i, MONTH_DAYS, first);
            let year = TrailingWindow::new(&records, i, YEAR_DAYS, first);
            VolatilityRow {
                date: records[i].date,
                symbol: symbol.to_string(),
                count_7d: week.count(),
                count_30d: month.count(),
                count_365d: year.count(),
                range_7d: week.range(),
                range_30d: month.range(),
                range_365d: year.range(),
                csd_30d: month.close_to_close(),
            }
        })
        .collect()
}
