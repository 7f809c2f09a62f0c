use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    data::series::{ExogenousSeries, JoinKey, SeriesKey},
    error::{AcfoResult, DataError},
};

/// Column names of a COT report that are identifiers or ratios rather than tracked fields.
pub const DEFAULT_NON_REPORTABLE_COLUMNS: [&str; 3] = [
    "Date",
    "% OF Open Interest (OI) All NoCIT",
    "Open Interest - % of OI",
];

/// A weekly Commitment-of-Traders report: one row per report date, one column per field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CotReport {
    name: String,
    dates: Vec<NaiveDate>,
    fields: Vec<CotField>,
}

/// One numeric column of a [`CotReport`], aligned with the report's dates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CotField {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl CotReport {
    pub fn new(
        name: impl Into<String>,
        dates: Vec<NaiveDate>,
        fields: Vec<CotField>,
    ) -> AcfoResult<Self> {
        let name = name.into();
        if let Some(bad) = fields.iter().find(|f| f.values.len() != dates.len()) {
            return Err(DataError::DataFrame(format!(
                "COT report '{name}': field '{}' has {} values for {} dates",
                bad.name,
                bad.values.len(),
                dates.len()
            ))
            .into());
        }
        Ok(Self {
            name,
            dates,
            fields,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[CotField] {
        &self.fields
    }

    /// One series per reportable field, keyed by report date and joined on the preceding
    /// Tuesday of each bar. A date reported twice keeps its last row.
    pub fn series<S: AsRef<str>>(&self, non_reportable: &[S]) -> Vec<ExogenousSeries> {
        self.fields
            .iter()
            .filter(|f| !non_reportable.iter().any(|n| n.as_ref() == f.name))
            .map(|f| {
                ExogenousSeries::new(
                    f.name.clone(),
                    JoinKey::PrecedingTuesday,
                    self.dates
                        .iter()
                        .zip(&f.values)
                        .map(|(date, v)| (SeriesKey::date(*date), *v)),
                )
            })
            .collect()
    }
}
