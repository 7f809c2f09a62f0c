// 1. Traits
pub use crate::open::policy::OpenReference;
pub use crate::report::io::{Report, ReportName, ToCsv, ToSchema};
pub use crate::report::polars_ext::DataFrameExt;

// 2. Pipeline Stages
pub use crate::pipeline::{
    SignalRun, SignalSource, build_calendar, build_metadata, enrich, overnight_gaps,
    settlement_changes, signal_correlation, temporal, volatility,
};

// 3. Domain Types
pub use crate::data::{
    bar::{Bar, RawBar},
    calendar::TradingCalendar,
    contract::{ContractBars, ContractMetadata},
    cot::{CotField, CotReport},
    domain::{ContractCode, ContractMonth},
    series::{ExogenousSeries, JoinKey, SeriesKey, SplitSide},
    settlement::{SettlementHistory, SettlementRecord},
};
pub use crate::open::{policy::OpenPolicyKind, schedule::OpenSchedule};
pub use crate::settlement::lookback::LookbackInterval;
pub use crate::signal::temporal::TemporalInterval;

// 4. Configuration
pub use crate::config::{
    DteRange, EnrichmentConfig, PipelineConfig, SettlementConfig, SignalConfig, parse_switch,
};

// 5. Errors
pub use crate::error::{AcfoError, AcfoResult, ConfigError, DataError, IoError};
