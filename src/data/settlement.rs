use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::{
    data::domain::ContractCode,
    error::{AcfoResult, DataError},
    math::stats,
};

/// One daily settlement row of a contract.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub date: NaiveDate,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub settle: f64,
    pub volume: Option<f64>,
    pub prev_day_open_interest: Option<f64>,
}

/// Date-indexed settlement history of a single contract.
///
/// Each date maps to exactly one record; a second row for the same date is a data-integrity
/// failure upstream and is rejected at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementHistory {
    contract: ContractCode,
    records: BTreeMap<NaiveDate, SettlementRecord>,
    /// Mean settle per (year, month).
    monthly_means: BTreeMap<(i32, u32), f64>,
}

impl SettlementHistory {
    pub fn new(
        contract: ContractCode,
        rows: impl IntoIterator<Item = SettlementRecord>,
    ) -> AcfoResult<Self> {
        let mut records = BTreeMap::new();
        for row in rows {
            if records.insert(row.date, row).is_some() {
                return Err(DataError::AmbiguousJoin {
                    contract: contract.to_string(),
                    date: row.date,
                }
                .into());
            }
        }

        let mut by_month: BTreeMap<(i32, u32), Vec<f64>> = BTreeMap::new();
        for r in records.values() {
            by_month
                .entry((r.date.year(), r.date.month()))
                .or_default()
                .push(r.settle);
        }
        let monthly_means = by_month
            .into_iter()
            .filter_map(|(k, v)| stats::mean(&v).map(|m| (k, m)))
            .collect();

        Ok(Self {
            contract,
            records,
            monthly_means,
        })
    }

    pub fn contract(&self) -> ContractCode {
        self.contract
    }

    pub fn get(&self, date: NaiveDate) -> Option<&SettlementRecord> {
        self.records.get(&date)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.keys().next().copied()
    }

    pub fn monthly_mean(&self, year: i32, month: u32) -> Option<f64> {
        self.monthly_means.get(&(year, month)).copied()
    }

    /// Records in ascending date order.
    pub fn records(&self) -> impl Iterator<Item = &SettlementRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
