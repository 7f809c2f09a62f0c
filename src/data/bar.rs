use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// One minute of trading activity as delivered by the data vendor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl RawBar {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }
}

/// A raw minute bar aligned to its trading day's canonical open.
///
/// Produced by the open-window enricher and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub timestamp: NaiveDateTime,
    pub open_minutes_offset: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
    /// `close` minus the open-reference bar's `open`, rounded to three decimals.
    /// `None` when no reference could be resolved for the day.
    pub price_change_from_open: Option<f64>,
    pub expiration_date: Option<NaiveDate>,
    pub days_to_expiration: Option<i64>,
}

impl Bar {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date()
    }

    /// Whether the bar's days-to-expiration falls inside `[low, high]`.
    /// Bars without a known expiration never match.
    pub fn dte_within(&self, low: i64, high: i64) -> bool {
        self.days_to_expiration
            .is_some_and(|dte| (low..=high).contains(&dte))
    }
}
