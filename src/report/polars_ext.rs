use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::{Column, DataFrame, DataType, PolarsError};

use crate::error::{AcfoError, AcfoResult, DataError};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn polars_to_acfo_error(report: &str, e: PolarsError) -> AcfoError {
    AcfoError::Data(DataError::DataFrame(format!(
        "Error while building {report} DataFrame: {e}"
    )))
}

/// Typed, null-preserving column extraction.
///
/// Every accessor casts the column first, so integer columns read as floats and numeric
/// columns read as strings without a dedicated schema.
pub trait DataFrameExt {
    fn typed_column(&self, name: &str, dtype: DataType) -> AcfoResult<Column>;

    fn f64_values(&self, name: &str) -> AcfoResult<Vec<Option<f64>>> {
        let column = self.typed_column(name, DataType::Float64)?;
        let values = column.f64().map_err(|e| cast_error(name, e))?;
        Ok(values.into_iter().collect())
    }

    fn i64_values(&self, name: &str) -> AcfoResult<Vec<Option<i64>>> {
        let column = self.typed_column(name, DataType::Int64)?;
        let values = column.i64().map_err(|e| cast_error(name, e))?;
        Ok(values.into_iter().collect())
    }

    fn str_values(&self, name: &str) -> AcfoResult<Vec<Option<String>>> {
        let column = self.typed_column(name, DataType::String)?;
        let values = column.str().map_err(|e| cast_error(name, e))?;
        Ok(values.into_iter().map(|v| v.map(str::to_string)).collect())
    }

    /// Like [`DataFrameExt::f64_values`], but a null anywhere is an error.
    fn required_f64(&self, name: &str) -> AcfoResult<Vec<f64>> {
        require(name, self.f64_values(name)?)
    }

    fn required_i64(&self, name: &str) -> AcfoResult<Vec<i64>> {
        require(name, self.i64_values(name)?)
    }

    fn required_str(&self, name: &str) -> AcfoResult<Vec<String>> {
        require(name, self.str_values(name)?)
    }

    fn date_values(&self, name: &str) -> AcfoResult<Vec<Option<NaiveDate>>> {
        self.str_values(name)?
            .into_iter()
            .map(|v| v.map(|s| parse_date(&s)).transpose())
            .collect()
    }

    fn required_dates(&self, name: &str) -> AcfoResult<Vec<NaiveDate>> {
        self.required_str(name)?
            .iter()
            .map(|s| parse_date(s))
            .collect()
    }

    fn required_datetimes(&self, name: &str) -> AcfoResult<Vec<NaiveDateTime>> {
        self.required_str(name)?
            .iter()
            .map(|s| parse_datetime(s))
            .collect()
    }
}

impl DataFrameExt for DataFrame {
    fn typed_column(&self, name: &str, dtype: DataType) -> AcfoResult<Column> {
        let column = self.column(name).map_err(|_| DataError::MissingColumn {
            table: format!("{:?}", self.get_column_names()),
            column: name.to_string(),
        })?;
        column.cast(&dtype).map_err(|e| cast_error(name, e))
    }
}

fn cast_error(name: &str, e: PolarsError) -> AcfoError {
    DataError::DataFrame(format!("Column '{name}' has an unexpected type: {e}")).into()
}

fn require<T>(name: &str, values: Vec<Option<T>>) -> AcfoResult<Vec<T>> {
    values
        .into_iter()
        .enumerate()
        .map(|(row, v)| {
            v.ok_or_else(|| {
                DataError::MissingValue {
                    column: name.to_string(),
                    row,
                }
                .into()
            })
        })
        .collect()
}

/// Parses `YYYY-MM-DD`, also accepting a trailing time part.
pub fn parse_date(value: &str) -> AcfoResult<NaiveDate> {
    let trimmed = value.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, DATE_FORMAT)
        .map_err(|e| DataError::TimestampConversion(format!("'{value}': {e}")).into())
}

/// Parses `YYYY-MM-DD HH:MM:SS`, also accepting an ISO `T` separator and fractional seconds.
pub fn parse_datetime(value: &str) -> AcfoResult<NaiveDateTime> {
    let normalized = value.trim().replacen('T', " ", 1);
    NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%d %H:%M:%S%.f")
        .map_err(|e| DataError::TimestampConversion(format!("'{value}': {e}")).into())
}

#[cfg(test)]
mod tests {
    use polars::df;

    use super::*;

    #[test]
    fn test_typed_extraction_preserves_nulls() {
        let df = df![
            "Date" => &["2020-01-15", "2020-01-16"],
            "Settle" => &[Some(117), None],
        ]
        .expect("Failed to create DF");

        assert_eq!(
            df.f64_values("Settle").expect("cast to f64"),
            vec![Some(117.0), None]
        );
        assert!(matches!(
            df.required_f64("Settle"),
            Err(AcfoError::Data(DataError::MissingValue { row: 1, .. }))
        ));
        assert_eq!(
            df.required_dates("Date").expect("dates"),
            vec![
                NaiveDate::from_ymd_opt(2020, 1, 15).expect("valid date"),
                NaiveDate::from_ymd_opt(2020, 1, 16).expect("valid date"),
            ]
        );
        assert!(matches!(
            df.f64_values("Volume"),
            Err(AcfoError::Data(DataError::MissingColumn { .. }))
        ));
    }

    #[test]
    fn test_parse_timestamps() {
        let ts = parse_datetime("2020-01-16T09:30:00").expect("iso timestamp");
        assert_eq!(ts.format(DATETIME_FORMAT).to_string(), "2020-01-16 09:30:00");
        assert!(parse_datetime("2020-01-16 09:30:00.000").is_ok());
        assert_eq!(
            parse_date("2020-01-16 00:00:00").expect("date with time"),
            NaiveDate::from_ymd_opt(2020, 1, 16).expect("valid date")
        );
        assert!(matches!(
            parse_date("16/01/2020"),
            Err(AcfoError::Data(DataError::TimestampConversion(_)))
        ));
    }
}
