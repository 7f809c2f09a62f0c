use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Instant,
};

use acfo::{
    config::{PipelineConfig, parse_switch},
    data::bar::Bar,
    io,
    open::policy::OpenPolicyKind,
    pipeline::{self, SignalRun, SignalSource},
    report::{
        enriched::EnrichedBars,
        io::{ReportName, ToCsv},
    },
    settlement::lookback::LookbackInterval,
    signal::temporal::TemporalInterval,
};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use time::macros::format_description;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Path to a JSON pipeline configuration; defaults apply to every missing field
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the stage writes its table to
    #[arg(short, long, default_value = "reports")]
    out_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RawBarArgs {
    /// Directory of per-contract minute-bar CSV files
    #[arg(long)]
    raw_dir: PathBuf,

    /// File name prefix of the contract files (e.g. "LE")
    #[arg(long, default_value = "")]
    raw_prefix: String,
}

#[derive(Args)]
struct SettlementArgs {
    /// Directory of per-contract settlement CSV files
    #[arg(long)]
    settlement_dir: PathBuf,

    /// File name prefix of the settlement files
    #[arg(long, default_value = "")]
    settlement_prefix: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the contract expiration table and the trading calendar
    Metadata {
        #[command(flatten)]
        raw: RawBarArgs,
    },

    /// Align raw bars to each day's open under one open policy
    Enrich {
        #[command(flatten)]
        raw: RawBarArgs,

        /// Contract expiration table written by `metadata`
        #[arg(long)]
        expirations: PathBuf,

        /// Open policy: true_open | sliding_open
        #[arg(long)]
        policy: String,
    },

    /// Compare each day's open with a prior settlement
    SettlementChanges {
        #[command(flatten)]
        settlements: SettlementArgs,

        /// Directory holding the enriched tables written by `enrich`
        #[arg(long)]
        enriched_dir: PathBuf,

        /// Trading calendar written by `metadata`
        #[arg(long)]
        calendar: PathBuf,

        /// Open policy: true_open | sliding_open
        #[arg(long)]
        policy: String,

        /// Lookback interval: overnight | weekly | monthly | annualy
        #[arg(long)]
        interval: String,
    },

    /// Trailing settlement counts, ranges and close-to-close dispersion
    Volatility {
        #[command(flatten)]
        settlements: SettlementArgs,
    },

    /// Change between each day's first bar and prior-day reference bars
    OvernightGaps {
        #[command(flatten)]
        raw: RawBarArgs,

        /// Trading calendar written by `metadata`
        #[arg(long)]
        calendar: PathBuf,
    },

    /// Split every exogenous series at its median and summarize both sides
    Signals {
        /// Directory holding the enriched tables written by `enrich`
        #[arg(long)]
        enriched_dir: PathBuf,

        /// Directory of COT report CSV files
        #[arg(long)]
        report_dir: PathBuf,

        /// File name prefix of the COT report files
        #[arg(long, default_value = "")]
        report_prefix: String,

        /// Also correlate settlement changes and volatility from this directory
        #[arg(long)]
        settlement_dir: Option<PathBuf>,

        #[arg(long, default_value = "")]
        settlement_prefix: String,

        /// Also correlate bar overnight gaps of the contracts in this directory
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        #[arg(long, default_value = "")]
        raw_prefix: String,

        /// Trading calendar, required with --settlement-dir or --raw-dir
        #[arg(long)]
        calendar: Option<PathBuf>,
    },

    /// Summarize trajectories per calendar bucket
    Temporal {
        /// Directory holding the enriched tables written by `enrich`
        #[arg(long)]
        enriched_dir: PathBuf,

        /// Temporal interval: day_of_week | month | year
        #[arg(long)]
        interval: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = init_tracing()?;

    let config = match &cli.config {
        Some(path) => PipelineConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    config.validate()?;

    let start = Instant::now();
    run(cli.command, &config, &cli.out_dir)?;
    info!(elapsed = ?start.elapsed(), out_dir = %cli.out_dir.display(), "Stage finished");

    // The WorkerGuard ensures all buffered logs are flushed when dropped.
    drop(_guard);

    Ok(())
}

fn run(command: Commands, config: &PipelineConfig, out_dir: &Path) -> Result<()> {
    match command {
        Commands::Metadata { raw } => {
            let contracts = io::load_contracts(&raw.raw_dir, &raw.raw_prefix)?;
            pipeline::build_metadata(&contracts)?.to_csv(out_dir, None, None)?;
            pipeline::build_calendar(&contracts)?.to_csv(out_dir, None, None)?;
        }

        Commands::Enrich {
            raw,
            expirations,
            policy,
        } => {
            let policy = parse_switch::<OpenPolicyKind>("open policy", &policy)?;
            let expirations = io::load_expirations(&expirations)?;
            let contracts = io::load_contracts(&raw.raw_dir, &raw.raw_prefix)?;
            pipeline::enrich(&contracts, &expirations, config, policy)?.to_csv(out_dir, None, None)?;
        }

        Commands::SettlementChanges {
            settlements,
            enriched_dir,
            calendar,
            policy,
            interval,
        } => {
            let policy = parse_switch::<OpenPolicyKind>("open policy", &policy)?;
            let interval = parse_switch::<LookbackInterval>("lookback interval", &interval)?;
            let calendar = io::load_trading_calendar(&calendar)?;
            let bars = load_enriched(&enriched_dir, policy)?;
            let histories =
                io::load_settlement_histories(&settlements.settlement_dir, &settlements.settlement_prefix)?;
            pipeline::settlement_changes(&bars, &histories, &calendar, config, policy, interval)?
                .to_csv(out_dir, None, None)?;
        }

        Commands::Volatility { settlements } => {
            let histories =
                io::load_settlement_histories(&settlements.settlement_dir, &settlements.settlement_prefix)?;
            pipeline::volatility(&histories, config)?.to_csv(out_dir, None, None)?;
        }

        Commands::OvernightGaps { raw, calendar } => {
            let calendar = io::load_trading_calendar(&calendar)?;
            let contracts = io::load_contracts(&raw.raw_dir, &raw.raw_prefix)?;
            pipeline::overnight_gaps(&contracts, &calendar, config)?.to_csv(out_dir, None, None)?;
        }

        Commands::Signals {
            enriched_dir,
            report_dir,
            report_prefix,
            settlement_dir,
            settlement_prefix,
            raw_dir,
            raw_prefix,
            calendar,
        } => {
            let calendar = match (&calendar, settlement_dir.is_some() || raw_dir.is_some()) {
                (Some(path), _) => Some(io::load_trading_calendar(path)?),
                (None, true) => anyhow::bail!("--calendar is required with --settlement-dir or --raw-dir"),
                (None, false) => None,
            };

            let mut shared = Vec::new();
            for path in io::discover(&report_dir, &report_prefix)? {
                let report = io::load_cot_report(&path)?;
                shared.push(SignalSource::from_cot(&report, config));
            }

            let histories = match &settlement_dir {
                Some(dir) => io::load_settlement_histories(dir, &settlement_prefix)?,
                None => Vec::new(),
            };
            if settlement_dir.is_some() {
                shared.push(SignalSource::settlement_volatility(&histories, config));
            }
            if let (Some(dir), Some(calendar)) = (&raw_dir, &calendar) {
                let contracts = io::load_contracts(dir, &raw_prefix)?;
                shared.push(SignalSource::overnight_gaps(&contracts, calendar, config)?);
            }

            let policy_bars = load_policy_bars(&enriched_dir, config)?;
            let mut sources = Vec::with_capacity(policy_bars.len());
            for (policy, bars) in &policy_bars {
                let mut policy_sources = shared.clone();
                if let (true, Some(calendar)) = (settlement_dir.is_some(), &calendar) {
                    policy_sources.push(SignalSource::settlement_changes(
                        bars, &histories, calendar, config, *policy,
                    ));
                }
                sources.push(policy_sources);
            }

            let runs: Vec<SignalRun<'_>> = policy_bars
                .iter()
                .zip(&sources)
                .map(|((policy, bars), sources)| SignalRun {
                    policy: *policy,
                    bars,
                    sources,
                })
                .collect();
            pipeline::signal_correlation(&runs, config)?.to_csv(out_dir, None, None)?;
        }

        Commands::Temporal {
            enriched_dir,
            interval,
        } => {
            let interval = parse_switch::<TemporalInterval>("temporal interval", &interval)?;
            let policy_bars = load_policy_bars(&enriched_dir, config)?;
            let borrowed: Vec<(OpenPolicyKind, &[Bar])> = policy_bars
                .iter()
                .map(|(policy, bars)| (*policy, bars.as_slice()))
                .collect();
            pipeline::temporal(&borrowed, interval, config)?.to_csv(out_dir, None, None)?;
        }
    }
    Ok(())
}

// ================================================================================================
// Helper Functions
// ================================================================================================

fn load_enriched(dir: &Path, policy: OpenPolicyKind) -> Result<Vec<Bar>> {
    let path = dir.join(EnrichedBars::empty(policy).filename());
    io::load_enriched(&path, policy)
        .with_context(|| format!("Failed to load enriched bars {}", path.display()))
}

fn load_policy_bars(dir: &Path, config: &PipelineConfig) -> Result<Vec<(OpenPolicyKind, Vec<Bar>)>> {
    config
        .signal
        .open_policies
        .iter()
        .map(|policy| Ok((*policy, load_enriched(dir, *policy)?)))
        .collect()
}

// ================================================================================================
// Tracing Configuration
// ================================================================================================

fn init_tracing() -> Result<Option<WorkerGuard>> {
    let app_name = "acfo";

    // Detect if running in container
    let in_container = env::var("CONTAINER").is_ok() || Path::new("/.dockerenv").exists();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if in_container {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_current_span(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
            .init();

        info!("Logging to stdout (container mode)");
        return Ok(None);
    }

    let log_dir = match dirs::state_dir() {
        Some(dir) => dir.join(app_name).join("logs"),
        None => dirs::home_dir()
            .context("Failed to find home directory")?
            .join(format!(".local/state/{app_name}/logs")),
    };
    fs::create_dir_all(&log_dir)?;

    let timestamp = time::OffsetDateTime::now_utc()
        .format(&format_description!(
            "[year][month][day]-[hour][minute][second]"
        ))
        .context("Failed to format timestamp")?;
    let file_name = format!("{app_name}-{timestamp}.log");
    let file_path = log_dir.join(&file_name);

    let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_current_span(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    info!(log_file = %file_path.display(), "Logging to file (local mode)");
    Ok(Some(guard))
}
