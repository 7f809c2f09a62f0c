use chrono::{Datelike, Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::data::{
    calendar::TradingCalendar,
    settlement::{SettlementHistory, SettlementRecord},
};

/// Horizon a day's open is compared against.
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
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LookbackInterval {
    /// Previous entry of the global trading calendar.
    Overnight,
    /// Seven days back, walking further back to the nearest settlement day.
    Weekly,
    /// Thirty days back, walking further back to the nearest settlement day.
    Monthly,
    /// Mean settle of the same calendar month one year earlier.
    #[serde(rename = "annualy")]
    #[strum(serialize = "annualy")]
    Annual,
}

impl LookbackInterval {
    fn fixed_days(&self) -> Option<i64> {
        match self {
            LookbackInterval::Weekly => Some(7),
            LookbackInterval::Monthly => Some(30),
            LookbackInterval::Overnight | LookbackInterval::Annual => None,
        }
    }
}

/// What a day's open is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SettlementReference {
    /// A single settlement row.
    Day(SettlementRecord),
    /// The mean settle of a whole calendar month.
    MonthlyMean { year: i32, month: u32, settle: f64 },
}

impl SettlementReference {
    pub fn settle(&self) -> f64 {
        match self {
            SettlementReference::Day(record) => record.settle,
            SettlementReference::MonthlyMean { settle, .. } => *settle,
        }
    }
}

/// Result of a lookback: both fields are `None` when no reference exists.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Lookback {
    pub reference: Option<SettlementReference>,
    /// Calendar days between the date and the reference actually used.
    pub days_back: Option<i64>,
}

impl Lookback {
    pub fn none() -> Self {
        Self::default()
    }

    fn found(reference: SettlementReference, days_back: i64) -> Self {
        Self {
            reference: Some(reference),
            days_back: Some(days_back),
        }
    }
}

/// Resolves settlement references for one contract.
#[derive(Debug, Clone, Copy)]
pub struct SettlementLookback<'a> {
    history: &'a SettlementHistory,
    calendar: &'a TradingCalendar,
}

impl<'a> SettlementLookback<'a> {
    pub fn new(history: &'a SettlementHistory, calendar: &'a TradingCalendar) -> Self {
        Self { history, calendar }
    }

    pub fn resolve(&self, date: NaiveDate, interval: LookbackInterval) -> Lookback {
        match interval {
            LookbackInterval::Overnight => self.overnight(date),
            LookbackInterval::Weekly | LookbackInterval::Monthly => {
                let days = interval.fixed_days().unwrap_or_default();
                self.walk_back(date, date - Duration::days(days))
            }
            LookbackInterval::Annual => self.same_month_last_year(date),
        }
    }

    fn overnight(&self, date: NaiveDate) -> Lookback {
        let Some(prior) = self.calendar.previous(date) else {
            return Lookback::none();
        };
        match self.history.get(prior) {
            Some(record) => Lookback::found(SettlementReference::Day(*record), (date - prior).num_days()),
            None => Lookback::none(),
        }
    }

    fn walk_back(&self, date: NaiveDate, start: NaiveDate) -> Lookback {
        let Some(first) = self.history.first_date() else {
            return Lookback::none();
        };

        let mut day = start;
        while day >= first {
            if let Some(record) = self.history.get(day) {
                return Lookback::found(SettlementReference::Day(*record), (date - day).num_days());
            }
            match day.pred_opt() {
                Some(prev) => day = prev,
                None => break,
            }
        }
        Lookback::none()
    }

    fn same_month_last_year(&self, date: NaiveDate) -> Lookback {
        let Some(prior) = date.checked_sub_months(Months::new(12)) else {
            return Lookback::none();
        };
        match self.history.monthly_mean(prior.year(), prior.month()) {
            Some(settle) => Lookback::found(
                SettlementReference::MonthlyMean {
                    year: prior.year(),
                    month: prior.month(),
                    settle,
                },
                (date - prior).num_days(),
            ),
            None => Lookback::none(),
        }
    }
}
