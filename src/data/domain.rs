use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::error::{AcfoError, DataError};

// ================================================================================================
// Contract Codes
// ================================================================================================

/// Standard CME/Industry single-letter month codes.
#[derive(
    Clone,
    Copy,
    Debug,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    PartialOrd,
    Ord,
)]
#[strum(ascii_case_insensitive)]
pub enum ContractMonth {
    #[strum(serialize = "F")]
    January = 1,
    #[strum(serialize = "G")]
    February = 2,
    #[strum(serialize = "H")]
    March = 3,
    #[strum(serialize = "J")]
    April = 4,
    #[strum(serialize = "K")]
    May = 5,
    #[strum(serialize = "M")]
    June = 6,
    #[strum(serialize = "N")]
    July = 7,
    #[strum(serialize = "Q")]
    August = 8,
    #[strum(serialize = "U")]
    September = 9,
    #[strum(serialize = "V")]
    October = 10,
    #[strum(serialize = "X")]
    November = 11,
    #[strum(serialize = "Z")]
    December = 12,
}

/// Delivery month and two-digit year of a contract, e.g. `M21` for June 2021.
///
/// This is the part of a symbol (`LEM21`) that links intraday bar files to settlement files,
/// whose names end in the month letter and a four-digit year (`..._M2021`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContractCode {
    pub year: u8,
    pub month: ContractMonth,
}

impl ContractCode {
    /// Decodes the trailing `<month letter><yy>` of a symbol such as `LEM21`.
    pub fn from_symbol(symbol: &str) -> Result<Self, AcfoError> {
        let tail = symbol
            .len()
            .checked_sub(3)
            .and_then(|start| symbol.get(start..))
            .ok_or_else(|| DataError::InvalidSymbol(symbol.to_string()))?;
        tail.parse()
    }

    /// Decodes the trailing `<month letter><yyyy>` of a settlement file stem such as `LE_M2021`.
    pub fn from_settlement_stem(stem: &str) -> Result<Self, AcfoError> {
        let tail = stem
            .len()
            .checked_sub(5)
            .and_then(|start| stem.get(start..))
            .ok_or_else(|| DataError::InvalidSymbol(stem.to_string()))?;
        let (month, year) = tail.split_at(1);
        let short_year = year.get(2..).ok_or_else(|| DataError::InvalidSymbol(stem.into()))?;
        format!("{month}{short_year}").parse()
    }

    /// Joins a product root (e.g. `LE`) with this code.
    pub fn symbol(&self, root: &str) -> String {
        format!("{root}{self}")
    }
}

impl fmt::Display for ContractCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.month, self.year)
    }
}

impl FromStr for ContractCode {
    type Err = AcfoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Expected format: month letter + two-digit year, e.g. "M21"
        if s.len() != 3 || !s.is_ascii() {
            return Err(DataError::InvalidSymbol(format!("Invalid contract code: {s}")).into());
        }

        let month = ContractMonth::from_str(&s[..1]).map_err(DataError::ParseEnum)?;
        let year = s[1..].parse::<u8>().map_err(DataError::ParseInt)?;

        Ok(ContractCode { year, month })
    }
}
