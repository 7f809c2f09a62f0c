use std::{
    collections::{BTreeMap, BTreeSet, btree_map::Entry},
    fmt,
};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::warn;

use crate::{data::bar::Bar, math::stats};

// ================================================================================================
// Join Keys
// ================================================================================================

/// How a bar is mapped onto the key space of an exogenous series.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum JoinKey {
    /// The bar's own calendar date.
    #[default]
    TradingDate,
    /// The reporting Tuesday a weekly report published before the bar's week refers to.
    PrecedingTuesday,
    /// The bar's symbol together with its calendar date, for per-contract series.
    ContractTradingDate,
}

impl JoinKey {
    pub fn key_for(&self, bar: &Bar) -> SeriesKey {
        match self {
            JoinKey::TradingDate => SeriesKey::date(bar.date()),
            JoinKey::PrecedingTuesday => SeriesKey::date(preceding_tuesday(bar.date())),
            JoinKey::ContractTradingDate => SeriesKey::contract(&bar.symbol, bar.date()),
        }
    }
}

/// Maps a date to its reporting Tuesday.
///
/// Mon -> 6, Tue -> 7, Wed -> 8, Thu -> 9, Fri -> 10, Sat -> 11, Sun -> 12 days back, i.e. the
/// Tuesday of the previous Monday-based week.
pub fn preceding_tuesday(date: NaiveDate) -> NaiveDate {
    let days_back = i64::from(date.weekday().num_days_from_monday()) + 6;
    date - Duration::days(days_back)
}

/// Key of one observation in an [`ExogenousSeries`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesKey {
    pub symbol: Option<String>,
    pub date: NaiveDate,
}

impl SeriesKey {
    pub fn date(date: NaiveDate) -> Self {
        Self { symbol: None, date }
    }

    pub fn contract(symbol: &str, date: NaiveDate) -> Self {
        Self {
            symbol: Some(symbol.to_string()),
            date,
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.symbol {
            Some(symbol) => write!(f, "{symbol}@{}", self.date),
            None => write!(f, "{}", self.date),
        }
    }
}

// ================================================================================================
// Exogenous Series
// ================================================================================================

/// A named numeric signal keyed by date (or contract and date).
///
/// Every key maps to exactly one value. Missing observations are dropped on construction.
/// A repeated key keeps its last observation; a repeat with a different value is logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExogenousSeries {
    name: String,
    join: JoinKey,
    values: BTreeMap<SeriesKey, f64>,
}

impl ExogenousSeries {
    pub fn new(
        name: impl Into<String>,
        join: JoinKey,
        observations: impl IntoIterator<Item = (SeriesKey, Option<f64>)>,
    ) -> Self {
        let name = name.into();
        let mut values = BTreeMap::new();

        for (key, value) in observations {
            let Some(value) = value.filter(|v| v.is_finite()) else {
                continue;
            };
            match values.entry(key) {
                Entry::Vacant(slot) => {
                    slot.insert(value);
                }
                Entry::Occupied(mut slot) => {
                    let previous = slot.insert(value);
                    if previous != value {
                        warn!(
                            series = %name,
                            key = %slot.key(),
                            previous,
                            kept = value,
                            "Conflicting observations for series key; keeping the last"
                        );
                    }
                }
            }
        }

        Self { name, join, values }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn join_key(&self) -> JoinKey {
        self.join
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, key: &SeriesKey) -> Option<f64> {
        self.values.get(key).copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.values.keys()
    }

    pub fn median(&self) -> Option<f64> {
        let values: Vec<f64> = self.values.values().copied().collect();
        stats::median(&values)
    }

    /// Partitions the key set at the median: `>=` goes above, `<` goes below.
    pub fn split(&self) -> MedianSplit {
        let median = self.median();
        let mut above = BTreeSet::new();
        let mut below = BTreeSet::new();

        if let Some(m) = median {
            for (key, value) in &self.values {
                if *value >= m {
                    above.insert(key.clone());
                } else {
                    below.insert(key.clone());
                }
            }
        }

        MedianSplit {
            median,
            above,
            below,
        }
    }
}

// ================================================================================================
// Median Split
// ================================================================================================

/// Side of a [`MedianSplit`].
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum SplitSide {
    Above,
    Below,
}

/// The key set of a series partitioned at its median.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedianSplit {
    median: Option<f64>,
    above: BTreeSet<SeriesKey>,
    below: BTreeSet<SeriesKey>,
}

impl MedianSplit {
    pub fn median(&self) -> Option<f64> {
        self.median
    }

    pub fn above(&self) -> &BTreeSet<SeriesKey> {
        &self.above
    }

    pub fn below(&self) -> &BTreeSet<SeriesKey> {
        &self.below
    }

    pub fn side_of(&self, key: &SeriesKey) -> Option<SplitSide> {
        if self.above.contains(key) {
            Some(SplitSide::Above)
        } else if self.below.contains(key) {
            Some(SplitSide::Below)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    fn series(values: &[(NaiveDate, f64)]) -> ExogenousSeries {
        ExogenousSeries::new(
            "field",
            JoinKey::PrecedingTuesday,
            values.iter().map(|(date, v)| (SeriesKey::date(*date), Some(*v))),
        )
    }

    // ============================================================================================
    // Preceding Tuesday
    // ============================================================================================

    #[test]
    fn test_preceding_tuesday_offsets_per_weekday() {
        // Week of Monday 2020-01-20; the previous week's Tuesday is 2020-01-14.
        let expected = d(2020, 1, 14);
        for (day, back) in (20..=26).zip(6..=12) {
            let date = d(2020, 1, day);
            assert_eq!(preceding_tuesday(date), expected, "weekday {}", date.weekday());
            assert_eq!((date - expected).num_days(), back);
        }
    }

    #[test]
    fn test_preceding_tuesday_always_lands_on_tuesday() {
        let mut date = d(2019, 12, 1);
        while date < d(2020, 3, 1) {
            let tuesday = preceding_tuesday(date);
            assert_eq!(tuesday.weekday(), chrono::Weekday::Tue);
            assert!(tuesday < date);
            date = date.succ_opt().expect("next day");
        }
    }

    // ============================================================================================
    // Median Split
    // ============================================================================================

    #[test]
    fn test_split_sends_ties_above() {
        let s = series(&[
            (d(2020, 1, 7), 10.0),
            (d(2020, 1, 14), 20.0),
            (d(2020, 1, 21), 30.0),
        ]);
        let split = s.split();

        assert_eq!(split.median(), Some(20.0));
        assert_eq!(
            split.above().iter().map(|k| k.date).collect::<Vec<_>>(),
            vec![d(2020, 1, 14), d(2020, 1, 21)]
        );
        assert_eq!(
            split.below().iter().map(|k| k.date).collect::<Vec<_>>(),
            vec![d(2020, 1, 7)]
        );
    }

    #[test]
    fn test_split_is_disjoint_and_covers_key_set() {
        let cases: Vec<Vec<f64>> = vec![
            vec![1.0],
            vec![1.0, 2.0],
            vec![5.0, 5.0, 5.0, 5.0],
            vec![3.0, 1.0, 2.0, 2.0, 2.0, 9.0],
            vec![-1.5, 0.0, 0.0, 7.25, 7.25],
        ];

        for values in cases {
            let obs: Vec<(NaiveDate, f64)> = values
                .iter()
                .enumerate()
                .map(|(i, v)| (d(2020, 1, 1) + Duration::days(i as i64), *v))
                .collect();
            let s = series(&obs);
            let split = s.split();

            assert!(split.above().is_disjoint(split.below()), "{values:?}");
            let union: BTreeSet<SeriesKey> =
                split.above().union(split.below()).cloned().collect();
            let keys: BTreeSet<SeriesKey> = s.keys().cloned().collect();
            assert_eq!(union, keys, "{values:?}");
            assert!(!split.above().is_empty(), "{values:?}");
        }
    }

    #[test]
    fn test_empty_series_has_no_median_and_empty_split() {
        let s = ExogenousSeries::new(
            "empty",
            JoinKey::TradingDate,
            [(SeriesKey::date(d(2020, 1, 1)), None)],
        );
        let split = s.split();

        assert!(s.is_empty());
        assert_eq!(split.median(), None);
        assert!(split.above().is_empty() && split.below().is_empty());
    }

    #[test]
    fn test_repeated_keys_keep_last_observation() {
        let key = SeriesKey::date(d(2020, 1, 7));
        let same = ExogenousSeries::new(
            "dup",
            JoinKey::TradingDate,
            [(key.clone(), Some(1.0)), (key.clone(), Some(1.0))],
        );
        assert_eq!(same.len(), 1);
        assert_eq!(same.get(&key), Some(1.0));

        let conflict = ExogenousSeries::new(
            "dup",
            JoinKey::TradingDate,
            [
                (key.clone(), Some(1.0)),
                (SeriesKey::date(d(2020, 1, 14)), Some(5.0)),
                (key.clone(), Some(2.0)),
                (key.clone(), None),
            ],
        );
        assert_eq!(conflict.len(), 2);
        assert_eq!(conflict.get(&key), Some(2.0));
    }
}
