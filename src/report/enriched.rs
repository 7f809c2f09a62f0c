use std::sync::Arc;

use polars::{
    frame::DataFrame,
    prelude::{Column, DataType, Field, PlSmallStr, Schema, SchemaRef},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    data::bar::Bar,
    error::{AcfoError, AcfoResult},
    open::policy::OpenPolicyKind,
    report::{
        io::{Report, ReportName, ToSchema},
        polars_ext::{DATE_FORMAT, DATETIME_FORMAT, DataFrameExt, polars_to_acfo_error},
    },
};

/// Open-window bars of every contract under one open policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedBars {
    pub policy: OpenPolicyKind,
    pub df: DataFrame,
}

impl EnrichedBars {
    pub fn empty(policy: OpenPolicyKind) -> Self {
        Self {
            policy,
            df: DataFrame::empty_with_schema(&Self::to_schema()),
        }
    }

    pub fn from_bars(policy: OpenPolicyKind, bars: &[Bar]) -> AcfoResult<Self> {
        if bars.is_empty() {
            return Ok(Self::empty(policy));
        }

        let columns = vec![
            Column::new(
                EnrichedBarCol::Symbol.name(),
                bars.iter().map(|b| b.symbol.as_str()).collect::<Vec<_>>(),
            ),
            Column::new(
                EnrichedBarCol::DateTime.name(),
                bars.iter()
                    .map(|b| b.timestamp.format(DATETIME_FORMAT).to_string())
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                EnrichedBarCol::OpenMinutesOffset.name(),
                bars.iter().map(|b| b.open_minutes_offset).collect::<Vec<_>>(),
            ),
            Column::new(
                EnrichedBarCol::Open.name(),
                bars.iter().map(|b| b.open).collect::<Vec<_>>(),
            ),
            Column::new(
                EnrichedBarCol::High.name(),
                bars.iter().map(|b| b.high).collect::<Vec<_>>(),
            ),
            Column::new(
                EnrichedBarCol::Low.name(),
                bars.iter().map(|b| b.low).collect::<Vec<_>>(),
            ),
            Column::new(
                EnrichedBarCol::Close.name(),
                bars.iter().map(|b| b.close).collect::<Vec<_>>(),
            ),
            Column::new(
                EnrichedBarCol::Volume.name(),
                bars.iter().map(|b| b.volume).collect::<Vec<_>>(),
            ),
            Column::new(
                EnrichedBarCol::PriceChangeFromOpen.name(),
                bars.iter()
                    .map(|b| b.price_change_from_open)
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                EnrichedBarCol::ExpirationDate.name(),
                bars.iter()
                    .map(|b| b.expiration_date.map(|d| d.format(DATE_FORMAT).to_string()))
                    .collect::<Vec<_>>(),
            ),
            Column::new(
                EnrichedBarCol::DaysToExpiration.name(),
                bars.iter().map(|b| b.days_to_expiration).collect::<Vec<_>>(),
            ),
        ];

        let df = DataFrame::new(columns).map_err(|e| polars_to_acfo_error("enriched bars", e))?;
        Ok(Self { policy, df })
    }

    /// Reads the typed bars back, in table order.
    pub fn to_bars(&self) -> AcfoResult<Vec<Bar>> {
        let df = &self.df;
        let symbols = df.required_str(EnrichedBarCol::Symbol.as_str())?;
        let timestamps = df.required_datetimes(EnrichedBarCol::DateTime.as_str())?;
        let offsets = df.required_i64(EnrichedBarCol::OpenMinutesOffset.as_str())?;
        let opens = df.required_f64(EnrichedBarCol::Open.as_str())?;
        let highs = df.required_f64(EnrichedBarCol::High.as_str())?;
        let lows = df.required_f64(EnrichedBarCol::Low.as_str())?;
        let closes = df.required_f64(EnrichedBarCol::Close.as_str())?;
        let volumes = df.required_i64(EnrichedBarCol::Volume.as_str())?;
        let changes = df.f64_values(EnrichedBarCol::PriceChangeFromOpen.as_str())?;
        let expirations = df.date_values(EnrichedBarCol::ExpirationDate.as_str())?;
        let dtes = df.i64_values(EnrichedBarCol::DaysToExpiration.as_str())?;

        Ok((0..df.height())
            .map(|i| Bar {
                symbol: symbols[i].clone(),
                timestamp: timestamps[i],
                open_minutes_offset: offsets[i],
                open: opens[i],
                high: highs[i],
                low: lows[i],
                close: closes[i],
                volume: volumes[i],
                price_change_from_open: changes[i],
                expiration_date: expirations[i],
                days_to_expiration: dtes[i],
            })
            .collect())
    }
}

impl ReportName for EnrichedBars {
    fn base_name(&self) -> String {
        format!("contract_open_enriched_{}", self.policy)
    }
}

impl Report for EnrichedBars {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }
}

impl ToSchema for EnrichedBars {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = EnrichedBarCol::iter()
            .map(|col| {
                let dtype = match col {
                    EnrichedBarCol::Symbol
                    | EnrichedBarCol::DateTime
                    | EnrichedBarCol::ExpirationDate => DataType::String,

                    EnrichedBarCol::OpenMinutesOffset
                    | EnrichedBarCol::Volume
                    | EnrichedBarCol::DaysToExpiration => DataType::Int64,

                    EnrichedBarCol::Open
                    | EnrichedBarCol::High
                    | EnrichedBarCol::Low
                    | EnrichedBarCol::Close
                    | EnrichedBarCol::PriceChangeFromOpen => DataType::Float64,
                };
                Field::new(col.into(), dtype)
            })
            .collect();

        Arc::new(Schema::from_iter(fields))
    }
}

impl TryFrom<&EnrichedBars> for Vec<Bar> {
    type Error = AcfoError;

    fn try_from(report: &EnrichedBars) -> AcfoResult<Self> {
        report.to_bars()
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
pub enum EnrichedBarCol {
    #[strum(serialize = "Symbol")]
    Symbol,
    #[strum(serialize = "DateTime")]
    DateTime,
    /// Signed whole minutes from the day's scheduled open.
    #[strum(serialize = "Open Minutes Offset")]
    OpenMinutesOffset,
    #[strum(serialize = "Open")]
    Open,
    #[strum(serialize = "High")]
    High,
    #[strum(serialize = "Low")]
    Low,
    #[strum(serialize = "Close")]
    Close,
    #[strum(serialize = "Volume")]
    Volume,
    /// Close minus the open of the day's reference bar.
    #[strum(serialize = "Price Change From Intraday Open")]
    PriceChangeFromOpen,
    #[strum(serialize = "Expiration Date")]
    ExpirationDate,
    #[strum(serialize = "DTE")]
    DaysToExpiration,
}

impl From<EnrichedBarCol> for PlSmallStr {
    fn from(value: EnrichedBarCol) -> Self {
        value.as_str().into()
    }
}

impl EnrichedBarCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, NaiveDateTime};

    use super::*;

    fn bar(ts: &str, change: Option<f64>, dte: Option<i64>) -> Bar {
        Bar {
            symbol: "LEH20".into(),
            timestamp: NaiveDateTime::parse_from_str(ts, DATETIME_FORMAT)
                .expect("valid timestamp"),
            open_minutes_offset: 59,
            open: 101.0,
            high: 101.5,
            low: 101.0,
            close: 101.5,
            volume: 12,
            price_change_from_open: change,
            expiration_date: dte.map(|_| NaiveDate::from_ymd_opt(2020, 2, 28).expect("valid date")),
            days_to_expiration: dte,
        }
    }

    #[test]
    fn test_header_matches_table_layout() {
        let report = EnrichedBars::empty(OpenPolicyKind::TrueOpen);
        assert_eq!(
            report.df.get_column_names_str(),
            vec![
                "Symbol",
                "DateTime",
                "Open Minutes Offset",
                "Open",
                "High",
                "Low",
                "Close",
                "Volume",
                "Price Change From Intraday Open",
                "Expiration Date",
                "DTE",
            ]
        );
        assert_eq!(report.df.width(), EnrichedBarCol::COUNT);
        assert_eq!(report.base_name(), "contract_open_enriched_true_open");
    }

    #[test]
    fn test_bars_survive_the_frame() {
        let bars = vec![
            bar("2020-01-16 10:29:00", Some(1.5), Some(43)),
            bar("2020-01-17 10:29:00", None, None),
        ];
        let report = EnrichedBars::from_bars(OpenPolicyKind::SlidingOpen, &bars).expect("report");

        assert_eq!(report.df.height(), 2);
        assert_eq!(Vec::<Bar>::try_from(&report).expect("bars"), bars);
    }
}
