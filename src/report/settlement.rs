use std::sync::Arc;

use polars::{
    frame::DataFrame,
    prelude::{Column, DataType, Field, PlSmallStr, Schema, SchemaRef},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    error::AcfoResult,
    open::policy::OpenPolicyKind,
    report::{
        io::{Report, ReportName, ToSchema},
        polars_ext::{DATE_FORMAT, DataFrameExt, polars_to_acfo_error},
    },
    settlement::{
        changes::SettlementChange,
        lookback::LookbackInterval,
        overnight::OvernightGap,
        volatility::{VolatilityMetric, VolatilityRow},
    },
};

macro_rules! impl_report {
    ($report:ty) => {
        impl Report for $report {
            fn as_df(&self) -> &DataFrame {
                &self.df
            }
        }
    };
}

macro_rules! impl_col {
    ($col:ty) => {
        impl From<$col> for PlSmallStr {
            fn from(value: $col) -> Self {
                value.as_str().into()
            }
        }

        impl $col {
            pub fn name(&self) -> PlSmallStr {
                (*self).into()
            }

            pub fn as_str(&self) -> &'static str {
                self.into()
            }
        }
    };
}

// ================================================================================================
// Settlement Changes
// ================================================================================================

/// Open-vs-settlement differences for one lookback interval and open policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementChanges {
    pub interval: LookbackInterval,
    pub policy: OpenPolicyKind,
    pub df: DataFrame,
}

impl_report!(SettlementChanges);

impl ReportName for SettlementChanges {
    fn base_name(&self) -> String {
        format!("changes_from_settlement_{}_{}", self.policy, self.interval)
    }
}

impl ToSchema for SettlementChanges {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = SettlementChangeCol::iter()
            .map(|col| {
                let dtype = match col {
                    SettlementChangeCol::Date | SettlementChangeCol::Symbol => DataType::String,
                    SettlementChangeCol::PriceDifference => DataType::Float64,
                    SettlementChangeCol::DaysLookingBack => DataType::Int64,
                };
                Field::new(col.into(), dtype)
            })
            .collect();
        Arc::new(Schema::from_iter(fields))
    }
}

impl SettlementChanges {
    /// Rows are written sorted by (symbol, date).
    pub fn from_rows(
        interval: LookbackInterval,
        policy: OpenPolicyKind,
        rows: &[SettlementChange],
    ) -> AcfoResult<Self> {
        let mut rows: Vec<&SettlementChange> = rows.iter().collect();
        rows.sort_by(|a, b| (&a.symbol, a.date).cmp(&(&b.symbol, b.date)));

        let df = if rows.is_empty() {
            DataFrame::empty_with_schema(&Self::to_schema())
        } else {
            DataFrame::new(vec![
                Column::new(
                    SettlementChangeCol::Date.name(),
                    rows.iter()
                        .map(|r| r.date.format(DATE_FORMAT).to_string())
                        .collect::<Vec<_>>(),
                ),
                Column::new(
                    SettlementChangeCol::Symbol.name(),
                    rows.iter().map(|r| r.symbol.as_str()).collect::<Vec<_>>(),
                ),
                Column::new(
                    SettlementChangeCol::PriceDifference.name(),
                    rows.iter().map(|r| r.price_difference).collect::<Vec<_>>(),
                ),
                Column::new(
                    SettlementChangeCol::DaysLookingBack.name(),
                    rows.iter().map(|r| r.days_back).collect::<Vec<_>>(),
                ),
            ])
            .map_err(|e| polars_to_acfo_error("settlement changes", e))?
        };

        Ok(Self {
            interval,
            policy,
            df,
        })
    }

    pub fn to_rows(&self) -> AcfoResult<Vec<SettlementChange>> {
        let dates = self.df.required_dates(SettlementChangeCol::Date.as_str())?;
        let symbols = self.df.required_str(SettlementChangeCol::Symbol.as_str())?;
        let diffs = self
            .df
            .f64_values(SettlementChangeCol::PriceDifference.as_str())?;
        let days = self
            .df
            .i64_values(SettlementChangeCol::DaysLookingBack.as_str())?;

        Ok(dates
            .into_iter()
            .zip(symbols)
            .zip(diffs.into_iter().zip(days))
            .map(|((date, symbol), (price_difference, days_back))| SettlementChange {
                date,
                symbol,
                price_difference,
                days_back,
            })
            .collect())
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
pub enum SettlementChangeCol {
    #[strum(serialize = "Date")]
    Date,
    #[strum(serialize = "Symbol")]
    Symbol,
    #[strum(serialize = "Price Difference b/w Open And Prior Day Settlement")]
    PriceDifference,
    #[strum(serialize = "Days Looking Back")]
    DaysLookingBack,
}

impl_col!(SettlementChangeCol);

// ================================================================================================
// Settlement Volatility
// ================================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementVolatility {
    pub df: DataFrame,
}

impl_report!(SettlementVolatility);

impl Default for SettlementVolatility {
    fn default() -> Self {
        let df = DataFrame::empty_with_schema(&SettlementVolatility::to_schema());
        Self { df }
    }
}

impl ReportName for SettlementVolatility {
    fn base_name(&self) -> String {
        "settlement_volatility".to_string()
    }
}

impl ToSchema for SettlementVolatility {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = VolatilityCol::iter()
            .map(|col| {
                let dtype = match col {
                    VolatilityCol::Date | VolatilityCol::Symbol => DataType::String,
                    VolatilityCol::Metric(VolatilityMetric::Count7d)
                    | VolatilityCol::Metric(VolatilityMetric::Count30d)
                    | VolatilityCol::Metric(VolatilityMetric::Count365d) => DataType::UInt32,
                    VolatilityCol::Metric(_) => DataType::Float64,
                };
                Field::new(col.name(), dtype)
            })
            .collect();
        Arc::new(Schema::from_iter(fields))
    }
}

impl SettlementVolatility {
    /// Rows are written sorted by (symbol, date).
    pub fn from_rows(rows: &[VolatilityRow]) -> AcfoResult<Self> {
        if rows.is_empty() {
            return Ok(Self::default());
        }
        let mut rows: Vec<&VolatilityRow> = rows.iter().collect();
        rows.sort_by(|a, b| (&a.symbol, a.date).cmp(&(&b.symbol, b.date)));

        let mut columns = vec![
            Column::new(
                VolatilityCol::Date.name(),
                rows.iter()
                    .map(|r| r.date.format(DATE_FORMAT).to_string())
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                VolatilityCol::Symbol.name(),
                rows.iter().map(|r| r.symbol.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                VolatilityMetric::Count7d.to_string().into(),
                rows.iter().map(|r| r.count_7d).collect::<Vec<_>>(),
            ),
            Column::new(
                VolatilityMetric::Count30d.to_string().into(),
                rows.iter().map(|r| r.count_30d).collect::<Vec<_>>(),
            ),
            Column::new(
                VolatilityMetric::Count365d.to_string().into(),
                rows.iter().map(|r| r.count_365d).collect::<Vec<_>>(),
            ),
        ];
        for metric in [
            VolatilityMetric::Range7d,
            VolatilityMetric::Range30d,
            VolatilityMetric::Range365d,
            VolatilityMetric::Csd30d,
        ] {
            columns.push(Column::new(
                metric.to_string().into(),
                rows.iter().map(|r| metric.value(r)).collect::<Vec<_>>(),
            ));
        }

        let df =
            DataFrame::new(columns).map_err(|e| polars_to_acfo_error("settlement volatility", e))?;
        Ok(Self { df })
    }
}

/// Columns of the volatility table: the row key followed by every [`VolatilityMetric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VolatilityCol {
    Date,
    Symbol,
    Metric(VolatilityMetric),
}

impl VolatilityCol {
    pub fn iter() -> impl Iterator<Item = VolatilityCol> {
        [VolatilityCol::Date, VolatilityCol::Symbol]
            .into_iter()
            .chain(VolatilityMetric::iter().map(VolatilityCol::Metric))
    }

    pub fn name(&self) -> PlSmallStr {
        match self {
            VolatilityCol::Date => "Date".into(),
            VolatilityCol::Symbol => "Symbol".into(),
            VolatilityCol::Metric(metric) => metric.to_string().into(),
        }
    }
}

// ================================================================================================
// Bar Overnight Gaps
// ================================================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OvernightGaps {
    pub df: DataFrame,
}

impl_report!(OvernightGaps);

impl Default for OvernightGaps {
    fn default() -> Self {
        let df = DataFrame::empty_with_schema(&OvernightGaps::to_schema());
        Self { df }
    }
}

impl ReportName for OvernightGaps {
    fn base_name(&self) -> String {
        "overnight_bar_changes".to_string()
    }
}

impl ToSchema for OvernightGaps {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = OvernightGapCol::iter()
            .map(|col| {
                let dtype = match col {
                    OvernightGapCol::Change => DataType::Float64,
                    _ => DataType::String,
                };
                Field::new(col.into(), dtype)
            })
            .collect();
        Arc::new(Schema::from_iter(fields))
    }
}

impl OvernightGaps {
    /// Rows keep the calculator's (symbol, date, reference) order.
    pub fn from_rows(rows: &[OvernightGap]) -> AcfoResult<Self> {
        if rows.is_empty() {
            return Ok(Self::default());
        }
        let df = DataFrame::new(vec![
            Column::new(
                OvernightGapCol::Symbol.name(),
                rows.iter().map(|r| r.symbol.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                OvernightGapCol::Date.name(),
                rows.iter()
                    .map(|r| r.date.format(DATE_FORMAT).to_string())
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                OvernightGapCol::Reference.name(),
                rows.iter().map(|r| r.reference.to_string()).collect::<Vec<_>>(),
            ),
            Column::new(
                OvernightGapCol::Change.name(),
                rows.iter().map(|r| r.change).collect::<Vec<_>>(),
            ),
        ])
        .map_err(|e| polars_to_acfo_error("overnight gaps", e))?;
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
pub enum OvernightGapCol {
    #[strum(serialize = "Symbol")]
    Symbol,
    #[strum(serialize = "Date")]
    Date,
    /// `HH:MM` anchor of the prior day, or `last_bar`.
    #[strum(serialize = "Reference")]
    Reference,
    #[strum(serialize = "Change")]
    Change,
}

impl_col!(OvernightGapCol);
