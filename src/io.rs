//! CSV loaders: file discovery, file-stem naming and typed decoding of every input table.

use std::{
    fs,
    path::{Path, PathBuf},
};

use polars::prelude::{DataFrame, LazyCsvReader, LazyFileListReader, PlPath};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, warn};

use crate::{
    data::{
        bar::{Bar, RawBar},
        calendar::TradingCalendar,
        contract::{ContractBars, ContractMetadata},
        cot::{CotField, CotReport},
        domain::ContractCode,
        settlement::{SettlementHistory, SettlementRecord},
    },
    error::{AcfoResult, IoError},
    open::policy::OpenPolicyKind,
    report::{
        contracts::{ContractExpirations, TradingDays},
        enriched::EnrichedBars,
        polars_ext::DataFrameExt,
    },
};

/// Column names of the vendor minute-bar files.
pub mod raw_bar_col {
    pub const DATE_TIME: &str = "DateTime";
    pub const OPEN: &str = "Open";
    pub const HIGH: &str = "High";
    pub const LOW: &str = "Low";
    pub const CLOSE: &str = "Close";
    pub const VOLUME: &str = "Volume";
}

/// Column names of the exchange settlement files.
pub mod settlement_col {
    pub const DATE: &str = "Date";
    pub const OPEN: &str = "Open";
    pub const HIGH: &str = "High";
    pub const LOW: &str = "Low";
    pub const SETTLE: &str = "Settle";
    pub const VOLUME: &str = "Volume";
    pub const PREV_DAY_OPEN_INTEREST: &str = "Prev. Day Open Interest";
}

// ================================================================================================
// Files
// ================================================================================================

/// Reads a CSV with a header row, inferring column types over the whole file.
pub fn read_csv(path: impl AsRef<Path>) -> AcfoResult<DataFrame> {
    let path = path.as_ref();
    let uri = path.to_str().ok_or_else(|| {
        IoError::FileSystem(format!(
            "Path contains invalid UTF-8 characters: {}",
            path.display()
        ))
    })?;

    let reader_error = |e: polars::error::PolarsError| IoError::ReaderCreation {
        path: path.display().to_string(),
        msg: e.to_string(),
    };

    let df = LazyCsvReader::new(PlPath::new(uri))
        .with_has_header(true)
        .with_infer_schema_length(None)
        .finish()
        .map_err(reader_error)?
        .collect()
        .map_err(reader_error)?;
    Ok(df)
}

/// The file name without directory and extension, e.g. `LEM21` for `raw/LEM21.csv`.
pub fn file_stem(path: impl AsRef<Path>) -> AcfoResult<String> {
    let path = path.as_ref();
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| IoError::InvalidFileName(path.display().to_string()).into())
}

/// CSV files in `dir` whose name starts with `prefix`, sorted by path.
pub fn discover(dir: impl AsRef<Path>, prefix: &str) -> AcfoResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let entries = fs::read_dir(dir).map_err(|e| {
        IoError::FileSystem(format!("Failed to list directory {}: {}", dir.display(), e))
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let path = entry.map_err(IoError::Io)?.path();
        let is_csv = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(prefix));
        if path.is_file() && is_csv && matches {
            paths.push(path);
        }
    }
    paths.sort();

    debug!(dir = %dir.display(), prefix, files = paths.len(), "Discovered input files");
    Ok(paths)
}

// ================================================================================================
// Raw Bars & Contract Metadata
// ================================================================================================

pub fn load_raw_bars(path: impl AsRef<Path>) -> AcfoResult<Vec<RawBar>> {
    let df = read_csv(path)?;
    let timestamps = df.required_datetimes(raw_bar_col::DATE_TIME)?;
    let opens = df.required_f64(raw_bar_col::OPEN)?;
    let highs = df.required_f64(raw_bar_col::HIGH)?;
    let lows = df.required_f64(raw_bar_col::LOW)?;
    let closes = df.required_f64(raw_bar_col::CLOSE)?;
    let volumes = df.required_i64(raw_bar_col::VOLUME)?;

    Ok((0..df.height())
        .map(|i| RawBar {
            timestamp: timestamps[i],
            open: opens[i],
            high: highs[i],
            low: lows[i],
            close: closes[i],
            volume: volumes[i],
        })
        .collect())
}

/// One contract's bars, named by the file stem.
pub fn load_contract(path: impl AsRef<Path>) -> AcfoResult<ContractBars> {
    let path = path.as_ref();
    Ok(ContractBars::new(file_stem(path)?, load_raw_bars(path)?))
}

/// Every contract file in `dir` starting with `prefix`, in symbol order.
pub fn load_contracts(dir: impl AsRef<Path>, prefix: &str) -> AcfoResult<Vec<ContractBars>> {
    let paths = discover(dir, prefix)?;
    let mut contracts = paths
        .par_iter()
        .map(load_contract)
        .collect::<AcfoResult<Vec<_>>>()?;
    contracts.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(contracts)
}

pub fn load_expirations(path: impl AsRef<Path>) -> AcfoResult<Vec<ContractMetadata>> {
    ContractExpirations { df: read_csv(path)? }.to_metadata()
}

pub fn load_trading_calendar(path: impl AsRef<Path>) -> AcfoResult<TradingCalendar> {
    TradingDays { df: read_csv(path)? }.to_calendar()
}

pub fn load_enriched(path: impl AsRef<Path>, policy: OpenPolicyKind) -> AcfoResult<Vec<Bar>> {
    EnrichedBars {
        policy,
        df: read_csv(path)?,
    }
    .to_bars()
}

// ================================================================================================
// Exogenous Reports
// ================================================================================================

/// A COT report named by its file stem. Every column other than `Date` becomes a field;
/// non-numeric cells read as missing.
pub fn load_cot_report(path: impl AsRef<Path>) -> AcfoResult<CotReport> {
    let path = path.as_ref();
    let df = read_csv(path)?;
    let dates = df.required_dates(settlement_col::DATE)?;

    let fields = df
        .get_column_names_str()
        .into_iter()
        .filter(|name| *name != settlement_col::DATE)
        .map(|name| {
            Ok(CotField {
                name: name.to_string(),
                values: df.f64_values(name)?,
            })
        })
        .collect::<AcfoResult<Vec<_>>>()?;

    CotReport::new(file_stem(path)?, dates, fields)
}

// ================================================================================================
// Settlements
// ================================================================================================

/// A settlement file; the contract is decoded from the `<month><yyyy>` suffix of its stem.
pub fn load_settlement_history(path: impl AsRef<Path>) -> AcfoResult<SettlementHistory> {
    let path = path.as_ref();
    let contract = ContractCode::from_settlement_stem(&file_stem(path)?)?;
    let df = read_csv(path)?;

    let dates = df.required_dates(settlement_col::DATE)?;
    let settles = df.required_f64(settlement_col::SETTLE)?;
    let opens = df.f64_values(settlement_col::OPEN)?;
    let highs = df.f64_values(settlement_col::HIGH)?;
    let lows = df.f64_values(settlement_col::LOW)?;
    let volumes = df.f64_values(settlement_col::VOLUME)?;
    let open_interest = df.f64_values(settlement_col::PREV_DAY_OPEN_INTEREST)?;

    SettlementHistory::new(
        contract,
        (0..df.height()).map(|i| SettlementRecord {
            date: dates[i],
            open: opens[i],
            high: highs[i],
            low: lows[i],
            settle: settles[i],
            volume: volumes[i],
            prev_day_open_interest: open_interest[i],
        }),
    )
}

/// Every settlement file in `dir` starting with `prefix`, in contract order. Files whose stem
/// carries no contract code are skipped with a warning.
pub fn load_settlement_histories(
    dir: impl AsRef<Path>,
    prefix: &str,
) -> AcfoResult<Vec<SettlementHistory>> {
    let paths: Vec<PathBuf> = discover(dir, prefix)?
        .into_iter()
        .filter(|path| {
            let decodable = file_stem(path)
                .and_then(|stem| ContractCode::from_settlement_stem(&stem))
                .is_ok();
            if !decodable {
                warn!(file = %path.display(), "Skipping settlement file without contract code");
            }
            decodable
        })
        .collect();

    let mut histories = paths
        .par_iter()
        .map(load_settlement_history)
        .collect::<AcfoResult<Vec<_>>>()?;
    histories.sort_by_key(|h| h.contract());
    Ok(histories)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::error::{AcfoError, DataError};

    fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, body).expect("failed to write fixture");
        path
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).expect("valid date")
    }

    #[test]
    fn test_discover_filters_prefix_and_extension() {
        let tmp = tempfile::tempdir().expect("temp dir");
        write(tmp.path(), "LEQ20.csv", "DateTime\n");
        write(tmp.path(), "LEM20.csv", "DateTime\n");
        write(tmp.path(), "GFM20.csv", "DateTime\n");
        write(tmp.path(), "LEM20.txt", "DateTime\n");

        let names: Vec<String> = discover(tmp.path(), "LE")
            .expect("listing")
            .iter()
            .map(|p| file_stem(p).expect("stem"))
            .collect();
        assert_eq!(names, vec!["LEM20", "LEQ20"]);
    }

    #[test]
    fn test_load_contract_names_by_stem() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = write(
            tmp.path(),
            "LEH20.csv",
            "DateTime,Open,High,Low,Close,Volume\n\
             2020-01-16 09:30:00,100,100.5,99.75,100.25,12\n\
             2020-01-16 09:31:00,100.25,100.5,100,100.5,3\n",
        );
        let contract = load_contract(&path).expect("contract");

        assert_eq!(contract.symbol, "LEH20");
        assert_eq!(contract.bars.len(), 2);
        assert_eq!(contract.bars[0].open, 100.0);
        assert_eq!(contract.bars[1].volume, 3);
        assert_eq!(contract.expiration_date(), Some(d(2020, 1, 16)));
    }

    #[test]
    fn test_load_settlement_history_decodes_stem() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = write(
            tmp.path(),
            "LE_M2021.csv",
            "Date,Open,High,Low,Settle,Volume,Prev. Day Open Interest\n\
             2021-01-14,,,,117.125,,\n\
             2021-01-15,117.5,118,117,117.9,1500,20000\n",
        );
        let history = load_settlement_history(&path).expect("history");

        assert_eq!(history.contract().to_string(), "M21");
        assert_eq!(history.len(), 2);
        assert_eq!(history.get(d(2021, 1, 14)).map(|r| r.open), Some(None));
        assert_eq!(history.get(d(2021, 1, 15)).and_then(|r| r.volume), Some(1500.0));
    }

    #[test]
    fn test_duplicate_settlement_date_is_ambiguous() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = write(
            tmp.path(),
            "LE_Q2020.csv",
            "Date,Open,High,Low,Settle,Volume,Prev. Day Open Interest\n\
             2020-03-02,,,,110,,\n\
             2020-03-02,,,,111,,\n",
        );
        assert!(matches!(
            load_settlement_history(&path),
            Err(AcfoError::Data(DataError::AmbiguousJoin { .. }))
        ));
    }

    #[test]
    fn test_settlement_histories_skip_undecodable_stems() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let body = "Date,Open,High,Low,Settle,Volume,Prev. Day Open Interest\n2020-03-02,,,,110,,\n";
        write(tmp.path(), "LE_Q2020.csv", body);
        write(tmp.path(), "LE_M2020.csv", body);
        write(tmp.path(), "LE_notes.csv", body);

        let histories = load_settlement_histories(tmp.path(), "LE_").expect("histories");
        let codes: Vec<String> = histories.iter().map(|h| h.contract().to_string()).collect();
        assert_eq!(codes, vec!["M20", "Q20"]);
    }

    #[test]
    fn test_load_cot_report_fields() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = write(
            tmp.path(),
            "cot_legacy.csv",
            "Date,Noncommercial Long,Open Interest - % of OI\n\
             2020-01-07,10,100\n\
             2020-01-14,,100\n",
        );
        let report = load_cot_report(&path).expect("report");

        assert_eq!(report.name(), "cot_legacy");
        assert_eq!(report.fields().len(), 2);
        assert_eq!(report.fields()[0].values, vec![Some(10.0), None]);
    }
}
