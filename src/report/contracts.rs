use std::sync::Arc;

use polars::{
    df,
    frame::DataFrame,
    prelude::{DataType, Field, PlSmallStr, Schema, SchemaRef},
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumCount, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::{
    data::{calendar::TradingCalendar, contract::ContractMetadata},
    error::AcfoResult,
    report::{
        io::{Report, ReportName, ToSchema},
        polars_ext::{DATE_FORMAT, DataFrameExt, polars_to_acfo_error},
    },
};

// ================================================================================================
// Contract Expirations
// ================================================================================================

/// One row per contract: its symbol and expiration date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractExpirations {
    pub df: DataFrame,
}

impl Default for ContractExpirations {
    fn default() -> Self {
        let df = DataFrame::empty_with_schema(&ContractExpirations::to_schema());
        Self { df }
    }
}

impl ReportName for ContractExpirations {
    fn base_name(&self) -> String {
        "expiration_date_by_contract".to_string()
    }
}

impl Report for ContractExpirations {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }
}

impl ToSchema for ContractExpirations {
    fn to_schema() -> SchemaRef {
        let fields: Vec<Field> = ExpirationCol::iter()
            .map(|col| Field::new(col.into(), DataType::String))
            .collect();
        Arc::new(Schema::from_iter(fields))
    }
}

impl ContractExpirations {
    /// Rows sorted by symbol.
    pub fn from_metadata(metadata: &[ContractMetadata]) -> AcfoResult<Self> {
        if metadata.is_empty() {
            return Ok(Self::default());
        }
        let mut rows: Vec<&ContractMetadata> = metadata.iter().collect();
        rows.sort();

        let df = df![
            ExpirationCol::Symbol.as_str() => rows.iter().map(|m| m.symbol.as_str()).collect::<Vec<_>>(),
            ExpirationCol::ExpirationDate.as_str() => rows
                .iter()
                .map(|m| m.expiration_date.format(DATE_FORMAT).to_string())
                .collect::<Vec<_>>()
        ]
        .map_err(|e| polars_to_acfo_error("contract expirations", e))?;
        Ok(Self { df })
    }

    pub fn to_metadata(&self) -> AcfoResult<Vec<ContractMetadata>> {
        let symbols = self.df.required_str(ExpirationCol::Symbol.as_str())?;
        let dates = self.df.required_dates(ExpirationCol::ExpirationDate.as_str())?;
        Ok(symbols
            .into_iter()
            .zip(dates)
            .map(|(symbol, expiration_date)| ContractMetadata {
                symbol,
                expiration_date,
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
pub enum ExpirationCol {
    #[strum(serialize = "Symbol")]
    Symbol,
    #[strum(serialize = "Expiration Date")]
    ExpirationDate,
}

impl From<ExpirationCol> for PlSmallStr {
    fn from(value: ExpirationCol) -> Self {
        value.as_str().into()
    }
}

impl ExpirationCol {
    pub fn name(&self) -> PlSmallStr {
        (*self).into()
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

// ================================================================================================
// Trading Calendar
// ================================================================================================

/// The unique trading dates across all contracts, ascending.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingDays {
    pub df: DataFrame,
}

impl Default for TradingDays {
    fn default() -> Self {
        let df = DataFrame::empty_with_schema(&TradingDays::to_schema());
        Self { df }
    }
}

impl ReportName for TradingDays {
    fn base_name(&self) -> String {
        "unique_trading_days".to_string()
    }
}

impl Report for TradingDays {
    fn as_df(&self) -> &DataFrame {
        &self.df
    }
}

impl ToSchema for TradingDays {
    fn to_schema() -> SchemaRef {
        Arc::new(Schema::from_iter([Field::new(
            CalendarCol::Date.into(),
            DataType::String,
        )]))
    }
}

impl TryFrom<&TradingCalendar> for TradingDays {
    type Error = crate::error::AcfoError;

    fn try_from(calendar: &TradingCalendar) -> AcfoResult<Self> {
        if calendar.is_empty() {
            return Ok(Self::default());
        }
        let df = df![
            CalendarCol::Date.as_str() => calendar
                .dates()
                .iter()
                .map(|d| d.format(DATE_FORMAT).to_string())
                .collect::<Vec<_>>()
        ]
        .map_err(|e| polars_to_acfo_error("trading days", e))?;
        Ok(Self { df })
    }
}

impl TradingDays {
    pub fn to_calendar(&self) -> AcfoResult<TradingCalendar> {
        Ok(TradingCalendar::new(
            self.df.required_dates(CalendarCol::Date.as_str())?,
        ))
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
pub enum CalendarCol {
    #[strum(serialize = "Date")]
    Date,
}

impl From<CalendarCol> for PlSmallStr {
    fn from(value: CalendarCol) -> Self {
        value.as_str().into()
    }
}

impl CalendarCol {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    #[test]
    fn test_expirations_sorted_by_symbol() {
        let metadata = vec![
            ContractMetadata {
                symbol: "LEQ20".into(),
                expiration_date: d(2020, 8, 31),
            },
            ContractMetadata {
                symbol: "LEM20".into(),
                expiration_date: d(2020, 6, 30),
            },
        ];
        let report = ContractExpirations::from_metadata(&metadata).expect("report");

        assert_eq!(report.base_name(), "expiration_date_by_contract");
        assert_eq!(
            report.df.get_column_names_str(),
            vec!["Symbol", "Expiration Date"]
        );
        let back = report.to_metadata().expect("read back");
        assert_eq!(back[0].symbol, "LEM20");
        assert_eq!(back[1].expiration_date, d(2020, 8, 31));
    }

    #[test]
    fn test_empty_reports_carry_schema() {
        let report = ContractExpirations::from_metadata(&[]).expect("report");
        assert_eq!(report.df.height(), 0);
        assert_eq!(report.df.width(), ExpirationCol::COUNT);

        let days = TradingDays::try_from(&TradingCalendar::default()).expect("report");
        assert_eq!(days.df.get_column_names_str(), vec!["Date"]);
    }

    #[test]
    fn test_trading_days_round_trip_calendar() {
        let calendar = TradingCalendar::new([d(2020, 1, 15), d(2020, 1, 14)]);
        let days = TradingDays::try_from(&calendar).expect("report");
        assert_eq!(days.to_calendar().expect("calendar"), calendar);
    }
}
