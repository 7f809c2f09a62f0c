use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    data::{
        bar::Bar,
        series::{ExogenousSeries, SplitSide},
    },
    open::policy::OpenPolicyKind,
    signal::trajectory::{BarPopulation, TrajectoryAxis, TrajectorySummary},
};

/// One output row: the trajectory summary of one side of one field's median split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalRow {
    pub report_name: String,
    pub field_name: String,
    pub side: SplitSide,
    pub open_type: OpenPolicyKind,
    /// Median of the exogenous series the split was made at.
    pub series_median: Option<f64>,
    pub summary: TrajectorySummary,
}

/// The above- and below-median rows of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalPair {
    pub above: SignalRow,
    pub below: SignalRow,
}

impl SignalPair {
    pub fn into_rows(self) -> [SignalRow; 2] {
        [self.above, self.below]
    }
}

/// Correlates exogenous series with the open-window trajectory of a bar population.
///
/// The population (and therefore its reference median) is fixed at construction, so every
/// series correlated through the same correlator is measured against the same reference.
#[derive(Debug, Clone)]
pub struct MedianSplitCorrelator<'a> {
    population: BarPopulation<'a>,
    axis: TrajectoryAxis,
    open_type: OpenPolicyKind,
}

impl<'a> MedianSplitCorrelator<'a> {
    pub fn new(population: BarPopulation<'a>, axis: TrajectoryAxis, open_type: OpenPolicyKind) -> Self {
        Self {
            population,
            axis,
            open_type,
        }
    }

    pub fn population(&self) -> &BarPopulation<'a> {
        &self.population
    }

    /// Splits `series` at its median, routes every bar to a side through the series' join key
    /// and summarizes both sides. Bars whose key the series does not cover join neither side.
    pub fn correlate(&self, report_name: &str, series: &ExogenousSeries) -> SignalPair {
        let split = series.split();
        let join = series.join_key();

        let mut above: Vec<&Bar> = Vec::new();
        let mut below: Vec<&Bar> = Vec::new();
        for &bar in self.population.bars() {
            match split.side_of(&join.key_for(bar)) {
                Some(SplitSide::Above) => above.push(bar),
                Some(SplitSide::Below) => below.push(bar),
                None => {}
            }
        }

        debug!(
            report = report_name,
            field = series.name(),
            above = above.len(),
            below = below.len(),
            "Joined bars to median split"
        );

        let reference = self.population.reference_median();
        let row = |side: SplitSide, bars: &[&Bar]| SignalRow {
            report_name: report_name.to_string(),
            field_name: series.name().to_string(),
            side,
            open_type: self.open_type,
            series_median: split.median(),
            summary: self.axis.summarize(bars, reference),
        };

        SignalPair {
            above: row(SplitSide::Above, above.as_slice()),
            below: row(SplitSide::Below, below.as_slice()),
        }
    }
}
