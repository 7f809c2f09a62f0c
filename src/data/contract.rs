use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::bar::RawBar;

/// The raw minute-bar history of one contract, named by its symbol (e.g. `LEM21`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractBars {
    pub symbol: String,
    pub bars: Vec<RawBar>,
}

impl ContractBars {
    pub fn new(symbol: impl Into<String>, bars: Vec<RawBar>) -> Self {
        Self {
            symbol: symbol.into(),
            bars,
        }
    }

    /// Calendar date of the latest bar, taken as the contract's expiration.
    pub fn expiration_date(&self) -> Option<NaiveDate> {
        self.bars.iter().map(|b| b.timestamp).max().map(|ts| ts.date())
    }

    pub fn metadata(&self) -> Option<ContractMetadata> {
        self.expiration_date().map(|expiration_date| ContractMetadata {
            symbol: self.symbol.clone(),
            expiration_date,
        })
    }
}

/// Per-contract facts derived from the raw bar history.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractMetadata {
    pub symbol: String,
    pub expiration_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDateTime;

    use super::*;

    fn raw(ts: &str) -> RawBar {
        RawBar {
            timestamp: NaiveDateTime::parse_from_str(ts, "%Y-%m-%d %H:%M:%S")
                .expect("valid timestamp"),
            open: 1.0,
            high: 1.0,
            low: 1.0,
            close: 1.0,
            volume: 1,
        }
    }

    #[test]
    fn test_expiration_is_date_of_latest_bar() {
        let contract = ContractBars::new(
            "LEM21",
            vec![
                raw("2021-06-30 13:00:00"),
                raw("2021-01-04 09:30:00"),
                raw("2021-06-29 09:30:00"),
            ],
        );
        let meta = contract.metadata().expect("non-empty contract");

        assert_eq!(meta.symbol, "LEM21");
        assert_eq!(
            meta.expiration_date,
            NaiveDate::from_ymd_opt(2021, 6, 30).expect("valid date")
        );
    }

    #[test]
    fn test_empty_contract_has_no_metadata() {
        assert!(ContractBars::new("LEM21", Vec::new()).metadata().is_none());
    }
}
