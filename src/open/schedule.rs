use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Scheduled session open, which changed once in the exchange's history.
///
/// Days on or after `regime_change` open at `after`, earlier days open at `before`. Every
/// minute-offset calculation in the crate goes through [`OpenSchedule::scheduled_open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSchedule {
    pub regime_change: NaiveDate,
    pub before: NaiveTime,
    pub after: NaiveTime,
}

impl Default for OpenSchedule {
    fn default() -> Self {
        Self {
            regime_change: NaiveDate::from_ymd_opt(2015, 7, 2).unwrap_or_default(),
            before: NaiveTime::from_hms_opt(10, 5, 0).unwrap_or_default(),
            after: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or_default(),
        }
    }
}

impl OpenSchedule {
    /// The scheduled open on the calendar date of `ts`.
    pub fn scheduled_open(&self, ts: NaiveDateTime) -> NaiveDateTime {
        let date = ts.date();
        let time = if date >= self.regime_change {
            self.after
        } else {
            self.before
        };
        date.and_time(time)
    }

    /// Signed whole minutes from the scheduled open to `ts`, truncated toward zero.
    /// Negative when `ts` precedes the open.
    pub fn minutes_from_open(&self, ts: NaiveDateTime) -> i64 {
        (ts - self.scheduled_open(ts)).num_minutes()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").expect("valid timestamp")
    }

    #[test]
    fn test_open_before_and_after_regime_change() {
        let schedule = OpenSchedule::default();

        assert_eq!(
            schedule.scheduled_open(ts("2015-07-01 13:45:12")),
            ts("2015-07-01 10:05:00")
        );
        assert_eq!(
            schedule.scheduled_open(ts("2015-07-02 00:00:00")),
            ts("2015-07-02 09:30:00")
        );
        assert_eq!(
            schedule.scheduled_open(ts("2021-03-15 23:59:59")),
            ts("2021-03-15 09:30:00")
        );
    }

    #[test]
    fn test_regime_boundary_holds_for_every_day_around_change() {
        let schedule = OpenSchedule::default();
        let mut day = ts("2015-06-01 11:00:00");
        while day < ts("2015-08-01 00:00:00") {
            let open = schedule.scheduled_open(day);
            assert_eq!(open.date(), day.date());
            let expected = if day.date() < schedule.regime_change {
                schedule.before
            } else {
                schedule.after
            };
            assert_eq!(open.time(), expected);
            day += Duration::days(1);
        }
    }

    #[test]
    fn test_minutes_from_open_is_signed_and_truncated() {
        let schedule = OpenSchedule::default();

        assert_eq!(schedule.minutes_from_open(ts("2020-01-16 09:30:00")), 0);
        assert_eq!(schedule.minutes_from_open(ts("2020-01-16 10:29:59")), 59);
        assert_eq!(schedule.minutes_from_open(ts("2020-01-16 10:30:00")), 60);
        assert_eq!(schedule.minutes_from_open(ts("2020-01-16 09:29:00")), -1);
        assert_eq!(schedule.minutes_from_open(ts("2010-01-15 10:00:00")), -5);
    }
}
