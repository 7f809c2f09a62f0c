use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::bar::RawBar;

/// Sorted, de-duplicated trading dates observed across every contract.
///
/// "Previous trading day" lookups go through this calendar rather than calendar arithmetic, so
/// weekends, holidays and days where only other contracts traded are handled uniformly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingCalendar {
    dates: Vec<NaiveDate>,
}

impl TradingCalendar {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let mut dates: Vec<NaiveDate> = dates.into_iter().collect();
        dates.sort_unstable();
        dates.dedup();
        Self { dates }
    }

    /// Builds the calendar from the raw bar history of every contract.
    pub fn from_bars<'a>(contracts: impl IntoIterator<Item = &'a [RawBar]>) -> Self {
        Self::new(
            contracts
                .into_iter()
                .flat_map(|bars| bars.iter().map(RawBar::date)),
        )
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.dates.binary_search(&date).is_ok()
    }

    /// The trading date immediately before `date`.
    ///
    /// Returns `None` if `date` is not itself a trading date or is the first one.
    pub fn previous(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self.dates.binary_search(&date) {
            Ok(i) if i > 0 => Some(self.dates[i - 1]),
            _ => None,
        }
    }
}
