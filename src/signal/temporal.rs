use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{
    data::bar::Bar,
    open::policy::OpenPolicyKind,
    signal::trajectory::{BarPopulation, TrajectoryAxis, TrajectorySummary},
};

/// Calendar dimension bars are bucketed by.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TemporalInterval {
    /// Monday = 0 .. Sunday = 6.
    DayOfWeek,
    /// 1 .. 12.
    Month,
    /// Calendar years present in the data.
    Year,
}

impl TemporalInterval {
    pub fn bucket_of(&self, date: NaiveDate) -> i32 {
        match self {
            TemporalInterval::DayOfWeek => date.weekday().num_days_from_monday() as i32,
            TemporalInterval::Month => date.month() as i32,
            TemporalInterval::Year => date.year(),
        }
    }

    /// Buckets to report. Weekdays and months are always complete; years are those present.
    fn buckets(&self, present: impl Iterator<Item = i32>) -> Vec<i32> {
        match self {
            TemporalInterval::DayOfWeek => (0..=6).collect(),
            TemporalInterval::Month => (1..=12).collect(),
            TemporalInterval::Year => {
                let mut years: Vec<i32> = present.collect();
                years.sort_unstable();
                years.dedup();
                years
            }
        }
    }
}

/// Trajectory summary of one calendar bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalRow {
    pub interval: TemporalInterval,
    pub bucket: i32,
    pub open_type: OpenPolicyKind,
    pub summary: TrajectorySummary,
}

/// Applies the trajectory statistics to calendar buckets of a bar population.
///
/// Every bucket is measured against the population's global reference median.
#[derive(Debug, Clone)]
pub struct TemporalPartitioner<'a> {
    population: BarPopulation<'a>,
    axis: TrajectoryAxis,
    open_type: OpenPolicyKind,
}

impl<'a> TemporalPartitioner<'a> {
    pub fn new(population: BarPopulation<'a>, axis: TrajectoryAxis, open_type: OpenPolicyKind) -> Self {
        Self {
            population,
            axis,
            open_type,
        }
    }

    /// One row per bucket in ascending order; empty buckets carry null statistics.
    pub fn aggregate(&self, interval: TemporalInterval) -> Vec<TemporalRow> {
        let mut partitions: BTreeMap<i32, Vec<&Bar>> = BTreeMap::new();
        for &bar in self.population.bars() {
            partitions
                .entry(interval.bucket_of(bar.date()))
                .or_default()
                .push(bar);
        }

        let reference = self.population.reference_median();
        interval
            .buckets(partitions.keys().copied())
            .into_iter()
            .map(|bucket| {
                let bars = partitions.get(&bucket).map(Vec::as_slice).unwrap_or_default();
                TemporalRow {
                    interval,
                    bucket,
                    open_type: self.open_type,
                    summary: self.axis.summarize(bars, reference),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use std::str::FromStr;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    fn bar(date: NaiveDate, offset: i64, change: f64) -> Bar {
        Bar {
            symbol: "LEM20".into(),
            timestamp: date.and_hms_opt(9, 30, 0).expect("valid time") + Duration::minutes(offset),
            open_minutes_offset: offset,
            open: 100.0,
            high: 100.0,
            low: 100.0,
            close: 100.0 + change,
            volume: 1,
            price_change_from_open: Some(change),
            expiration_date: None,
            days_to_expiration: Some(40),
        }
    }

    fn partitioner(bars: &[Bar]) -> TemporalPartitioner<'_> {
        let axis = TrajectoryAxis::default();
        TemporalPartitioner::new(
            BarPopulation::new(bars, None, &axis),
            axis,
            OpenPolicyKind::TrueOpen,
        )
    }

    #[test]
    fn test_day_of_week_emits_all_seven_buckets() {
        // Mon 2020-01-13 and Wed 2020-01-15 only.
        let bars = vec![
            bar(d(2020, 1, 13), 59, 1.0),
            bar(d(2020, 1, 15), 59, 3.0),
            bar(d(2020, 1, 15), 29, 0.5),
        ];
        let rows = partitioner(&bars).aggregate(TemporalInterval::DayOfWeek);

        assert_eq!(rows.len(), 7);
        assert_eq!(
            rows.iter().map(|r| r.bucket).collect::<Vec<_>>(),
            (0..=6).collect::<Vec<_>>()
        );
        assert_eq!(rows[0].summary.acfo_t60, Some(1.0));
        assert_eq!(rows[2].summary.acfo_t30, Some(0.5));
        assert_eq!(rows[2].summary.acfo_t60, Some(3.0));
        assert_eq!(rows[1].summary, TrajectorySummary::default());

        // both populated buckets use the global median (2.0)
        assert_eq!(rows[0].summary.reference_median, Some(2.0));
        assert_eq!(rows[0].summary.percent_gte_median, Some(0.0));
        assert_eq!(rows[2].summary.percent_gte_median, Some(100.0));
    }

    #[test]
    fn test_month_and_year_buckets() {
        let bars = vec![
            bar(d(2019, 3, 4), 59, 1.0),
            bar(d(2021, 3, 5), 59, 2.0),
            bar(d(2021, 11, 1), 59, 3.0),
        ];
        let p = partitioner(&bars);

        let months = p.aggregate(TemporalInterval::Month);
        assert_eq!(months.len(), 12);
        assert_eq!(months[2].bucket, 3);
        assert_eq!(months[2].summary.acfo_t60, Some(1.5));
        assert_eq!(months[10].summary.acfo_t60, Some(3.0));

        let years = p.aggregate(TemporalInterval::Year);
        assert_eq!(
            years.iter().map(|r| r.bucket).collect::<Vec<_>>(),
            vec![2019, 2021]
        );
        assert_eq!(years[1].summary.acfo_t60, Some(2.5));
    }

    #[test]
    fn test_interval_names() {
        assert_eq!(
            TemporalInterval::from_str("day_of_week").ok(),
            Some(TemporalInterval::DayOfWeek)
        );
        assert_eq!(TemporalInterval::Year.to_string(), "year");
        assert!(TemporalInterval::from_str("quarter").is_err());
    }
}
