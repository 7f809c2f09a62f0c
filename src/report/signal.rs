use std::sync::Arc;

use polars::{
    frame::DataFrame,
    prelude::{Column, DataType, Field, PlSmallStr, Schema, SchemaRef},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    error::AcfoResult,
    report::{
        io::{Report, ReportName, ToSchema},
        polars_ext::polars_to_acfo_error,
    },
    signal::{
        correlator::SignalRow,
        temporal::{TemporalInterval, TemporalRow},
        trajectory::TrajectorySummary,
    },
};

// ================================================================================================
// Signal Correlation
// ================================================================================================

/// Trajectory summaries of every (open type, report, field, side) combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalCorrelation {
    pub df: DataFrame,
}

impl Default for SignalCorrelation {
    fn default() -> Self {
        let df = DataFrame::empty_with_schema(&SignalCorrelation::to_schema());
        Self { df }
    }
}

impl ReportName for SignalCorrelation {
    fn base_name(&self) -> String {
        "intraday_open_signals_correlation".to_string()
    }
}

impl Report for SignalCorrelation {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }
}

impl ToSchema for SignalCorrelation {
    fn to_schema() -> SchemaRef {
        let keys = SignalCol::iter().map(|col| {
            let dtype = match col {
                SignalCol::MedianValue => DataType::Float64,
                _ => DataType::String,
            };
            Field::new(col.into(), dtype)
        });
        Arc::new(Schema::from_iter(keys.chain(summary_fields())))
    }
}

impl SignalCorrelation {
    /// Rows keep the order they are given in.
    pub fn from_rows(rows: &[SignalRow]) -> AcfoResult<Self> {
        if rows.is_empty() {
            return Ok(Self::default());
        }

        let mut columns = vec![
            Column::new(
                SignalCol::ReportName.name(),
                rows.iter().map(|r| r.report_name.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                SignalCol::FieldName.name(),
                rows.iter().map(|r| r.field_name.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                SignalCol::Side.name(),
                rows.iter().map(|r| r.side.to_string()).collect::<Vec<_>>(),
            ),
            Column::new(
                SignalCol::OpenType.name(),
                rows.iter().map(|r| r.open_type.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                SignalCol::MedianValue.name(),
                rows.iter().map(|r| r.series_median).collect::<Vec<_>>(),
            ),
        ];
        let summaries: Vec<&TrajectorySummary> = rows.iter().map(|r| &r.summary).collect();
        columns.extend(summary_columns(&summaries));

        let df = DataFrame::new(columns).map_err(|e| polars_to_acfo_error("signal correlation", e))?;
        Ok(Self { df })
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
    EnumCount,
)]
pub enum SignalCol {
    #[strum(serialize = "Report Name")]
    ReportName,
    #[strum(serialize = "Field Name")]
    FieldName,
    #[strum(serialize = "Above/Below Median")]
    Side,
    #[strum(serialize = "Open Type")]
    OpenType,
    /// Median of the exogenous series the split was made at.
    #[strum(serialize = "Median Value")]
    MedianValue,
}

impl From<SignalCol> for PlSmallStr {
    fn from(value: SignalCol) -> Self {
        value.as_str().into()
    }
}

impl SignalCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

// ================================================================================================
// Temporal Analytics
// ================================================================================================

/// Trajectory summaries per calendar bucket of one temporal interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemporalAnalytics {
    pub interval: TemporalInterval,
    pub df: DataFrame,
}

impl ReportName for TemporalAnalytics {
    fn base_name(&self) -> String {
        format!("temporal_analytics_{}", self.interval)
    }
}

impl Report for TemporalAnalytics {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }
}

impl ToSchema for TemporalAnalytics {
    fn to_schema() -> SchemaRef {
        let keys = TemporalCol::iter().map(|col| {
            let dtype = match col {
                TemporalCol::Bucket => DataType::Int32,
                _ => DataType::String,
            };
            Field::new(col.into(), dtype)
        });
        Arc::new(Schema::from_iter(keys.chain(summary_fields())))
    }
}

impl TemporalAnalytics {
    pub fn from_rows(interval: TemporalInterval, rows: &[TemporalRow]) -> AcfoResult<Self> {
        if rows.is_empty() {
            return Ok(Self {
                interval,
                df: DataFrame::empty_with_schema(&Self::to_schema()),
            });
        }

        let mut columns = vec![
            Column::new(
                TemporalCol::Interval.name(),
                rows.iter().map(|r| r.interval.to_string()).collect::<Vec<_>>(),
            ),
            Column::new(
                TemporalCol::Bucket.name(),
                rows.iter().map(|r| r.bucket).collect::<Vec<_>>(),
            ),
            Column::new(
                TemporalCol::OpenType.name(),
                rows.iter().map(|r| r.open_type.as_str()).collect::<Vec<_>>(),
            ),
        ];
        let summaries: Vec<&TrajectorySummary> = rows.iter().map(|r| &r.summary).collect();
        columns.extend(summary_columns(&summaries));

        let df =
            DataFrame::new(columns).map_err(|e| polars_to_acfo_error("temporal analytics", e))?;
        Ok(Self { interval, df })
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
    EnumCount,
)]
pub enum TemporalCol {
    #[strum(serialize = "Interval")]
    Interval,
    /// Weekday (Monday = 0), month (1..12) or year.
    #[strum(serialize = "Bucket")]
    Bucket,
    #[strum(serialize = "Open Type")]
    OpenType,
}

impl From<TemporalCol> for PlSmallStr {
    fn from(value: TemporalCol) -> Self {
        value.as_str().into()
    }
}

impl TemporalCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

// ================================================================================================
// Trajectory Statistics
// ================================================================================================

/// Statistic columns shared by the signal and temporal tables.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
    EnumCount,
)]
pub enum SummaryCol {
    #[strum(serialize = "ACFO t+30")]
    AcfoT30,
    #[strum(serialize = "ACFO t+60")]
    AcfoT60,
    #[strum(serialize = "Std Deviation t+60")]
    StdT60,
    #[strum(serialize = "Max ACFO")]
    MaxAcfo,
    #[strum(serialize = "Min ACFO")]
    MinAcfo,
    #[strum(serialize = "Minute of Max ACFO")]
    MinuteOfMax,
    #[strum(serialize = "Minute of Min ACFO")]
    MinuteOfMin,
    /// Reference median of the whole population at the key minute.
    #[strum(serialize = "Median Intraday CFO t+60")]
    ReferenceMedian,
    #[strum(serialize = "Percent GTE Median CFO t+60")]
    PercentGteMedian,
}

impl From<SummaryCol> for PlSmallStr {
    fn from(value: SummaryCol) -> Self {
        value.as_str().into()
    }
}

impl SummaryCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }

    fn dtype(&self) -> DataType {
        match self {
            SummaryCol::MinuteOfMax | SummaryCol::MinuteOfMin => DataType::UInt32,
            _ => DataType::Float64,
        }
    }
}

fn summary_fields() -> impl Iterator<Item = Field> {
    SummaryCol::iter().map(|col| Field::new(col.into(), col.dtype()))
}

fn summary_columns(summaries: &[&TrajectorySummary]) -> Vec<Column> {
    SummaryCol::iter()
        .map(|col| {
            let name = col.name();
            match col {
                SummaryCol::MinuteOfMax => Column::new(
                    name,
                    summaries.iter().map(|s| s.minute_of_max).collect::<Vec<_>>(),
                ),
                SummaryCol::MinuteOfMin => Column::new(
                    name,
                    summaries.iter().map(|s| s.minute_of_min).collect::<Vec<_>>(),
                ),
                _ => {
                    let value = |s: &TrajectorySummary| match col {
                        SummaryCol::AcfoT30 => s.acfo_t30,
                        SummaryCol::AcfoT60 => s.acfo_t60,
                        SummaryCol::StdT60 => s.std_t60,
                        SummaryCol::MaxAcfo => s.max_acfo,
                        SummaryCol::MinAcfo => s.min_acfo,
                        SummaryCol::ReferenceMedian => s.reference_median,
                        SummaryCol::PercentGteMedian => s.percent_gte_median,
                        SummaryCol::MinuteOfMax | SummaryCol::MinuteOfMin => None,
                    };
                    Column::new(
                        name,
                        summaries.iter().map(|s| value(*s)).collect::<Vec<_>>(),
                    )
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{data::series::SplitSide, open::policy::OpenPolicyKind};

    fn summary() -> TrajectorySummary {
        TrajectorySummary {
            trajectory: vec![Some(0.0), Some(1.5)],
            acfo_t30: Some(0.5),
            acfo_t60: Some(1.5),
            std_t60: None,
            max_acfo: Some(1.5),
            min_acfo: Some(0.0),
            minute_of_max: Some(1),
            minute_of_min: Some(0),
            reference_median: Some(1.0),
            percent_gte_median: Some(100.0),
        }
    }

    #[test]
    fn test_signal_header_and_values() {
        let rows = vec![
            SignalRow {
                report_name: "cot_legacy".into(),
                field_name: "Noncommercial Long".into(),
                side: SplitSide::Above,
                open_type: OpenPolicyKind::TrueOpen,
                series_median: Some(20.0),
                summary: summary(),
            },
            SignalRow {
                report_name: "cot_legacy".into(),
                field_name: "Noncommercial Long".into(),
                side: SplitSide::Below,
                open_type: OpenPolicyKind::TrueOpen,
                series_median: Some(20.0),
                summary: TrajectorySummary::default(),
            },
        ];
        let report = SignalCorrelation::from_rows(&rows).expect("report");

        assert_eq!(
            report.df.get_column_names_str(),
            SignalCorrelation::default().df.get_column_names_str()
        );
        assert_eq!(report.df.width(), SignalCol::COUNT + SummaryCol::COUNT);
        assert_eq!(
            report.df.get_column_names_str()[..5],
            [
                "Report Name",
                "Field Name",
                "Above/Below Median",
                "Open Type",
                "Median Value"
            ]
        );

        let sides = report
            .df
            .column(SignalCol::Side.as_str())
            .expect("side column")
            .str()
            .expect("string column")
            .into_no_null_iter()
            .collect::<Vec<_>>();
        assert_eq!(sides, vec!["above", "below"]);

        let minutes = report
            .df
            .column(SummaryCol::MinuteOfMax.as_str())
            .expect("minute column")
            .u32()
            .expect("u32 column")
            .into_iter()
            .collect::<Vec<_>>();
        assert_eq!(minutes, vec![Some(1), None]);
    }

    #[test]
    fn test_temporal_report_name_and_header() {
        let report = TemporalAnalytics::from_rows(TemporalInterval::DayOfWeek, &[]).expect("report");
        assert_eq!(report.base_name(), "temporal_analytics_day_of_week");
        assert_eq!(
            report.df.get_column_names_str()[..4],
            ["Interval", "Bucket", "Open Type", "ACFO t+30"]
        );
    }
}
