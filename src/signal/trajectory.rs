use serde::{Deserialize, Serialize};

use crate::{
    config::{DteRange, EnrichmentConfig, SignalConfig},
    data::bar::Bar,
    math::{
        rounding::round_percent,
        stats::{first_max, first_min, median, sample_std},
    },
};

// ================================================================================================
// Trajectory Axis
// ================================================================================================

/// The minute axis statistics are computed on.
///
/// The trajectory covers offsets `0..width`; the bar at offset `width` is retained by the
/// enricher but sits outside the averaged trajectory. `mid_minute` and `key_minute` are
/// 0-based indices reported under the 1-based labels "t+30" and "t+60".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrajectoryAxis {
    pub width: usize,
    pub mid_minute: usize,
    pub key_minute: usize,
}

impl Default for TrajectoryAxis {
    fn default() -> Self {
        Self {
            width: 60,
            mid_minute: 29,
            key_minute: 59,
        }
    }
}

impl TrajectoryAxis {
    pub fn from_config(enrichment: &EnrichmentConfig, signal: &SignalConfig) -> Self {
        Self {
            width: usize::try_from(enrichment.window_width_minutes).unwrap_or_default(),
            mid_minute: signal.mid_minute,
            key_minute: signal.key_minute,
        }
    }

    fn minute_of(&self, bar: &Bar) -> Option<usize> {
        usize::try_from(bar.open_minutes_offset)
            .ok()
            .filter(|m| *m < self.width)
    }

    /// Raw price changes at the key minute.
    fn key_values<'a>(&self, bars: impl IntoIterator<Item = &'a Bar>) -> Vec<f64> {
        let key = self.key_minute as i64;
        bars.into_iter()
            .filter(|b| b.open_minutes_offset == key)
            .filter_map(|b| b.price_change_from_open)
            .collect()
    }

    /// Median price change at the key minute over `population`.
    pub fn reference_median<'a>(&self, population: impl IntoIterator<Item = &'a Bar>) -> Option<f64> {
        median(&self.key_values(population))
    }

    /// Mean price change per minute offset over `0..width`. Minutes without data are `None`.
    pub fn trajectory(&self, partition: &[&Bar]) -> Vec<Option<f64>> {
        let mut sums = vec![(0.0_f64, 0usize); self.width];
        for bar in partition {
            if let (Some(minute), Some(change)) = (self.minute_of(bar), bar.price_change_from_open)
            {
                let (sum, count) = &mut sums[minute];
                *sum += change;
                *count += 1;
            }
        }
        sums.into_iter()
            .map(|(sum, count)| (count > 0).then(|| sum / count as f64))
            .collect()
    }

    /// Summary statistics of one partition against the population's fixed reference median.
    ///
    /// An empty partition yields [`TrajectorySummary::default`], every field null.
    pub fn summarize(&self, partition: &[&Bar], reference_median: Option<f64>) -> TrajectorySummary {
        if partition.is_empty() {
            return TrajectorySummary::default();
        }

        let trajectory = self.trajectory(partition);
        let at = |minute: usize| trajectory.get(minute).copied().flatten();
        let (acfo_t30, acfo_t60) = (at(self.mid_minute), at(self.key_minute));

        let key_values = self.key_values(partition.iter().copied());
        let max = first_max(&trajectory);
        let min = first_min(&trajectory);

        let percent_gte_median = reference_median
            .filter(|_| !key_values.is_empty())
            .map(|reference| {
                let gte = key_values.iter().filter(|v| **v >= reference).count();
                round_percent(100.0 * gte as f64 / key_values.len() as f64)
            });

        TrajectorySummary {
            acfo_t30,
            acfo_t60,
            std_t60: sample_std(&key_values),
            max_acfo: max.map(|(_, v)| v),
            min_acfo: min.map(|(_, v)| v),
            minute_of_max: max.and_then(|(m, _)| u32::try_from(m).ok()),
            minute_of_min: min.and_then(|(m, _)| u32::try_from(m).ok()),
            reference_median,
            percent_gte_median,
            trajectory,
        }
    }
}

/// Descriptive statistics of a bar partition along the open-minute axis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrajectorySummary {
    /// Mean change from open per minute offset.
    pub trajectory: Vec<Option<f64>>,
    /// Trajectory at the mid minute ("t+30").
    pub acfo_t30: Option<f64>,
    /// Trajectory at the key minute ("t+60").
    pub acfo_t60: Option<f64>,
    /// Sample standard deviation of raw changes at the key minute.
    pub std_t60: Option<f64>,
    pub max_acfo: Option<f64>,
    pub min_acfo: Option<f64>,
    pub minute_of_max: Option<u32>,
    pub minute_of_min: Option<u32>,
    /// Median change at the key minute over the whole unsplit population.
    pub reference_median: Option<f64>,
    /// Share of the partition's key-minute rows at or above `reference_median`, in percent.
    pub percent_gte_median: Option<f64>,
}

// ================================================================================================
// Bar Population
// ================================================================================================

/// The DTE-filtered bars a set of partitions is drawn from, with its fixed reference median.
#[derive(Debug, Clone)]
pub struct BarPopulation<'a> {
    bars: Vec<&'a Bar>,
    reference_median: Option<f64>,
}

impl<'a> BarPopulation<'a> {
    pub fn new(bars: &'a [Bar], dte_filter: Option<DteRange>, axis: &TrajectoryAxis) -> Self {
        let bars: Vec<&Bar> = match dte_filter {
            Some(range) => bars
                .iter()
                .filter(|b| b.dte_within(range.low, range.high))
                .collect(),
            None => bars.iter().collect(),
        };
        let reference_median = axis.reference_median(bars.iter().copied());
        Self {
            bars,
            reference_median,
        }
    }

    pub fn bars(&self) -> &[&'a Bar] {
        &self.bars
    }

    pub fn reference_median(&self) -> Option<f64> {
        self.reference_median
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }
}
