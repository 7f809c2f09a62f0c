use std::{fmt::Display, fs, path::Path, str::FromStr};

use chrono::NaiveTime;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use strum::IntoEnumIterator;

use crate::{
    data::cot::DEFAULT_NON_REPORTABLE_COLUMNS,
    error::{AcfoResult, ConfigError, IoError},
    open::{policy::OpenPolicyKind, schedule::OpenSchedule},
};

/// Parses one of the crate's named behavioural switches (open policy, lookback interval,
/// temporal interval), rejecting unknown names with the list of accepted ones.
pub fn parse_switch<T>(kind: &'static str, value: &str) -> AcfoResult<T>
where
    T: FromStr + IntoEnumIterator + Display,
{
    T::from_str(value).map_err(|_| {
        ConfigError::Unsupported {
            kind,
            value: value.to_string(),
            expected: T::iter().map(|v| v.to_string()).join("|"),
        }
        .into()
    })
}

// ================================================================================================
// Pipeline Configuration
// ================================================================================================

/// Configuration shared by every pipeline stage.
///
/// Every field has a default, so a JSON file only needs to name what it overrides:
/// ```json
/// { "signal": { "dte_filter": { "low": 30, "high": 120 } } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Scheduled session open and its regime change.
    pub schedule: OpenSchedule,
    pub enrichment: EnrichmentConfig,
    pub signal: SignalConfig,
    pub settlement: SettlementConfig,
}

impl PipelineConfig {
    /// Loads and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> AcfoResult<Self> {
        let raw = fs::read_to_string(path.as_ref()).map_err(IoError::Io)?;
        let config: Self = serde_json::from_str(&raw).map_err(IoError::Json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AcfoResult<()> {
        let width = self.enrichment.window_width_minutes;
        if width <= 0 {
            return Err(ConfigError::InvalidWindowWidth(width).into());
        }

        if let Some(range) = &self.signal.dte_filter {
            DteRange::new(range.low, range.high)?;
        }

        let width = width as usize;
        for minute in [self.signal.mid_minute, self.signal.key_minute] {
            if minute >= width {
                return Err(ConfigError::InvalidTrajectoryMinute { minute, width }.into());
            }
        }

        if self.signal.open_policies.is_empty() {
            return Err(ConfigError::Invalid("no open policy selected".to_string()).into());
        }
        Ok(())
    }
}

/// Open-window enrichment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Width of the open window; bars with offsets in `[0, width]` are retained.
    pub window_width_minutes: i64,

    /// What to do with a day whose open reference cannot be resolved.
    ///
    /// - `false` (default): keep the day's bars with a null price change.
    /// - `true`: drop the whole day.
    pub drop_day_if_open_missing: bool,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self {
            window_width_minutes: 60,
            drop_day_if_open_missing: false,
        }
    }
}

/// Inclusive days-to-expiration bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DteRange {
    pub low: i64,
    pub high: i64,
}

impl DteRange {
    pub fn new(low: i64, high: i64) -> AcfoResult<Self> {
        if low > high {
            return Err(ConfigError::InvalidDteRange { low, high }.into());
        }
        Ok(Self { low, high })
    }
}

impl Default for DteRange {
    fn default() -> Self {
        Self { low: 25, high: 140 }
    }
}

/// Signal-correlation and temporal-aggregation settings.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    /// Bars outside this range are excluded before correlating.
    ///
    /// - `None`: no filter.
    /// - `Some(range)`: bars without a known DTE are excluded as well.
    pub dte_filter: Option<DteRange>,

    /// Trajectory index reported as "t+30".
    pub mid_minute: usize,

    /// Trajectory index reported as "t+60"; also the minute of the dispersion and
    /// percent-above-median statistics.
    pub key_minute: usize,

    /// Report columns that are not tracked fields.
    pub non_reportable_columns: Vec<String>,

    /// Enriched datasets processed by the signal stages, in output order.
    #[serde_as(as = "Vec<DisplayFromStr>")]
    pub open_policies: Vec<OpenPolicyKind>,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            dte_filter: Some(DteRange::default()),
            mid_minute: 29,
            key_minute: 59,
            non_reportable_columns: DEFAULT_NON_REPORTABLE_COLUMNS
                .iter()
                .map(|c| c.to_string())
                .collect(),
            open_policies: vec![OpenPolicyKind::SlidingOpen, OpenPolicyKind::TrueOpen],
        }
    }
}

/// Settlement-derived stage settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementConfig {
    /// Product root prefixed to contract codes in output symbols (e.g. `LE` + `M21`).
    pub contract_root: String,

    /// Prior-day bar times the bar overnight gap is measured against, besides the last bar.
    pub overnight_anchor_times: Vec<NaiveTime>,
}

impl Default for SettlementConfig {
    fn default() -> Self {
        Self {
            contract_root: "LE".to_string(),
            overnight_anchor_times: [(11, 59), (12, 4)]
                .into_iter()
                .filter_map(|(h, m)| NaiveTime::from_hms_opt(h, m, 0))
                .collect(),
        }
    }
}
