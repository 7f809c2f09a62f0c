//! Pipeline stages. Each stage takes its inputs as parameters and returns one report table.

use std::collections::{BTreeMap, HashMap};

use indicatif::{ProgressBar, ProgressStyle};
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use strum::IntoEnumIterator;
use tracing::{info, warn};

use crate::{
    config::PipelineConfig,
    data::{
        bar::Bar,
        calendar::TradingCalendar,
        contract::{ContractBars, ContractMetadata},
        cot::CotReport,
        series::ExogenousSeries,
        settlement::SettlementHistory,
    },
    error::{AcfoResult, ConfigError},
    open::{enricher::OpenWindowEnricher, policy::OpenPolicyKind},
    report::{
        contracts::{ContractExpirations, TradingDays},
        enriched::EnrichedBars,
        settlement::{OvernightGaps, SettlementChanges, SettlementVolatility},
        signal::{SignalCorrelation, TemporalAnalytics},
    },
    settlement::{
        changes::{SettlementChange, SettlementChangeCalculator},
        lookback::LookbackInterval,
        overnight::{GapReference, OvernightGap, bar_overnight_gaps},
        series::{change_series, overnight_gap_series, volatility_series},
        volatility::{VolatilityRow, settlement_volatility},
    },
    signal::{
        correlator::{MedianSplitCorrelator, SignalRow},
        temporal::{TemporalInterval, TemporalPartitioner},
        trajectory::{BarPopulation, TrajectoryAxis},
    },
};

/// Report name of the settlement change series in the correlation table.
pub const SETTLEMENT_CHANGE_REPORT: &str = "settlement_change";
/// Report name of the settlement volatility series in the correlation table.
pub const SETTLEMENT_VOLATILITY_REPORT: &str = "settlement_volatility";
/// Report name of the bar overnight gap series in the correlation table.
pub const OVERNIGHT_GAP_REPORT: &str = "overnight_bar_changes";

// ================================================================================================
// Contract Metadata & Calendar
// ================================================================================================

#[tracing::instrument(skip_all, fields(contracts = contracts.len()))]
pub fn build_metadata(contracts: &[ContractBars]) -> AcfoResult<ContractExpirations> {
    let metadata: Vec<ContractMetadata> = contracts.iter().filter_map(|c| c.metadata()).collect();
    let skipped = contracts.len() - metadata.len();
    if skipped > 0 {
        warn!(skipped, "Contracts without bars have no expiration");
    }
    info!(contracts = metadata.len(), "Built contract metadata");
    ContractExpirations::from_metadata(&metadata)
}

#[tracing::instrument(skip_all, fields(contracts = contracts.len()))]
pub fn build_calendar(contracts: &[ContractBars]) -> AcfoResult<TradingDays> {
    let calendar = TradingCalendar::from_bars(contracts.iter().map(|c| c.bars.as_slice()));
    info!(days = calendar.len(), "Built trading calendar");
    TradingDays::try_from(&calendar)
}

// ================================================================================================
// Open-Window Enrichment
// ================================================================================================

/// Enriched bars of every contract under `policy`, ordered by symbol then timestamp.
///
/// Contracts missing from `expirations` keep null expiration and DTE columns.
#[tracing::instrument(skip_all, fields(policy = %policy, contracts = contracts.len()))]
pub fn enrich(
    contracts: &[ContractBars],
    expirations: &[ContractMetadata],
    config: &PipelineConfig,
    policy: OpenPolicyKind,
) -> AcfoResult<EnrichedBars> {
    let expiration_by_symbol: HashMap<&str, _> = expirations
        .iter()
        .map(|m| (m.symbol.as_str(), m.expiration_date))
        .collect();

    let reference = policy.policy();
    let enricher = OpenWindowEnricher::new(config.schedule, &config.enrichment, reference.as_ref());

    let mut ordered: Vec<&ContractBars> = contracts.iter().collect();
    ordered.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    let progress = progress_bar(ordered.len() as u64)?;
    let per_contract: Vec<Vec<Bar>> = ordered
        .par_iter()
        .map(|contract| {
            let expiration = expiration_by_symbol.get(contract.symbol.as_str()).copied();
            if expiration.is_none() {
                warn!(symbol = %contract.symbol, "No expiration date for contract");
            }
            let bars = enricher.enrich(&contract.symbol, &contract.bars, expiration);
            progress.inc(1);
            bars
        })
        .collect();
    progress.finish_and_clear();

    let bars: Vec<Bar> = per_contract.into_iter().flatten().collect();
    info!(bars = bars.len(), "Enriched open windows");
    EnrichedBars::from_bars(policy, &bars)
}

// ================================================================================================
// Settlement Stages
// ================================================================================================

/// Settlement changes of every contract with both a settlement history and enriched bars.
#[tracing::instrument(skip_all, fields(policy = %policy, interval = %interval))]
pub fn settlement_changes(
    bars: &[Bar],
    histories: &[SettlementHistory],
    calendar: &TradingCalendar,
    config: &PipelineConfig,
    policy: OpenPolicyKind,
    interval: LookbackInterval,
) -> AcfoResult<SettlementChanges> {
    let rows = change_rows(bars, histories, calendar, config, policy, interval);
    info!(rows = rows.len(), "Computed settlement changes");
    SettlementChanges::from_rows(interval, policy, &rows)
}

#[tracing::instrument(skip_all, fields(histories = histories.len()))]
pub fn volatility(
    histories: &[SettlementHistory],
    config: &PipelineConfig,
) -> AcfoResult<SettlementVolatility> {
    let rows = volatility_rows(histories, config);
    info!(rows = rows.len(), "Computed settlement volatility");
    SettlementVolatility::from_rows(&rows)
}

#[tracing::instrument(skip_all, fields(contracts = contracts.len()))]
pub fn overnight_gaps(
    contracts: &[ContractBars],
    calendar: &TradingCalendar,
    config: &PipelineConfig,
) -> AcfoResult<OvernightGaps> {
    let rows = gap_rows(contracts, calendar, config)?;
    info!(rows = rows.len(), "Computed bar overnight gaps");
    OvernightGaps::from_rows(&rows)
}

fn change_rows(
    bars: &[Bar],
    histories: &[SettlementHistory],
    calendar: &TradingCalendar,
    config: &PipelineConfig,
    policy: OpenPolicyKind,
    interval: LookbackInterval,
) -> Vec<SettlementChange> {
    let root = config.settlement.contract_root.as_str();

    let mut by_symbol: BTreeMap<&str, Vec<Bar>> = BTreeMap::new();
    for bar in bars {
        by_symbol.entry(bar.symbol.as_str()).or_default().push(bar.clone());
    }
    for contract_bars in by_symbol.values_mut() {
        contract_bars.sort_by_key(|b| b.timestamp);
    }

    let reference = policy.policy();
    let calculator = SettlementChangeCalculator::new(
        config.schedule,
        reference.as_ref(),
        interval,
        calendar,
        root,
    );

    let matched: Vec<(&SettlementHistory, &Vec<Bar>)> = histories
        .iter()
        .filter_map(|history| {
            let symbol = history.contract().symbol(root);
            let found = by_symbol.get(symbol.as_str());
            if found.is_none() {
                warn!(%symbol, "Settlement history has no enriched bars");
            }
            found.map(|contract_bars| (history, contract_bars))
        })
        .collect();

    matched
        .par_iter()
        .map(|(history, contract_bars)| calculator.changes(history, contract_bars))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

fn volatility_rows(histories: &[SettlementHistory], config: &PipelineConfig) -> Vec<VolatilityRow> {
    let root = config.settlement.contract_root.as_str();
    histories
        .par_iter()
        .map(|history| settlement_volatility(history, &history.contract().symbol(root)))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect()
}

fn gap_rows(
    contracts: &[ContractBars],
    calendar: &TradingCalendar,
    config: &PipelineConfig,
) -> AcfoResult<Vec<OvernightGap>> {
    let anchors = &config.settlement.overnight_anchor_times;
    let progress = progress_bar(contracts.len() as u64)?;
    let rows = contracts
        .par_iter()
        .map(|contract| {
            let gaps = bar_overnight_gaps(contract, calendar, anchors);
            progress.inc(1);
            gaps
        })
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();
    progress.finish_and_clear();
    Ok(rows)
}

// ================================================================================================
// Signal Correlation
// ================================================================================================

/// A named group of exogenous series, e.g. one COT report with a series per field.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSource {
    pub report_name: String,
    pub series: Vec<ExogenousSeries>,
}

impl SignalSource {
    pub fn from_cot(report: &CotReport, config: &PipelineConfig) -> Self {
        Self {
            report_name: report.name().to_string(),
            series: report.series(&config.signal.non_reportable_columns),
        }
    }

    /// One series per lookback interval, computed from `bars` enriched under `policy`.
    pub fn settlement_changes(
        bars: &[Bar],
        histories: &[SettlementHistory],
        calendar: &TradingCalendar,
        config: &PipelineConfig,
        policy: OpenPolicyKind,
    ) -> Self {
        let series = LookbackInterval::iter()
            .map(|interval| {
                let rows = change_rows(bars, histories, calendar, config, policy, interval);
                change_series(interval, &rows)
            })
            .collect();
        Self {
            report_name: SETTLEMENT_CHANGE_REPORT.to_string(),
            series,
        }
    }

    pub fn settlement_volatility(histories: &[SettlementHistory], config: &PipelineConfig) -> Self {
        Self {
            report_name: SETTLEMENT_VOLATILITY_REPORT.to_string(),
            series: volatility_series(&volatility_rows(histories, config)),
        }
    }

    pub fn overnight_gaps(
        contracts: &[ContractBars],
        calendar: &TradingCalendar,
        config: &PipelineConfig,
    ) -> AcfoResult<Self> {
        let references: Vec<GapReference> = config
            .settlement
            .overnight_anchor_times
            .iter()
            .copied()
            .map(GapReference::Anchor)
            .chain([GapReference::LastBar])
            .collect();
        Ok(Self {
            report_name: OVERNIGHT_GAP_REPORT.to_string(),
            series: overnight_gap_series(&references, &gap_rows(contracts, calendar, config)?),
        })
    }
}

/// Enriched bars of one open policy and the sources to correlate them with.
#[derive(Debug, Clone, Copy)]
pub struct SignalRun<'a> {
    pub policy: OpenPolicyKind,
    pub bars: &'a [Bar],
    pub sources: &'a [SignalSource],
}

/// Above/below-median summaries for every (policy, report, field), in the order given.
///
/// Each run's reference median is computed once from its DTE-filtered population and shared by
/// every series correlated against it.
#[tracing::instrument(skip_all, fields(runs = runs.len()))]
pub fn signal_correlation(
    runs: &[SignalRun<'_>],
    config: &PipelineConfig,
) -> AcfoResult<SignalCorrelation> {
    let axis = TrajectoryAxis::from_config(&config.enrichment, &config.signal);

    let mut rows: Vec<SignalRow> = Vec::new();
    for run in runs {
        let population = BarPopulation::new(run.bars, config.signal.dte_filter, &axis);
        info!(
            policy = %run.policy,
            bars = population.len(),
            reference_median = ?population.reference_median(),
            "Correlating signals"
        );
        let correlator = MedianSplitCorrelator::new(population, axis, run.policy);

        let jobs: Vec<(&str, &ExogenousSeries)> = run
            .sources
            .iter()
            .flat_map(|source| {
                source
                    .series
                    .iter()
                    .map(move |series| (source.report_name.as_str(), series))
            })
            .collect();

        let progress = progress_bar(jobs.len() as u64)?;
        let pairs: Vec<_> = jobs
            .par_iter()
            .map(|(report_name, series)| {
                let pair = correlator.correlate(report_name, series);
                progress.inc(1);
                pair
            })
            .collect();
        progress.finish_and_clear();

        rows.extend(pairs.into_iter().flat_map(|pair| pair.into_rows()));
    }

    info!(rows = rows.len(), "Correlated signals");
    SignalCorrelation::from_rows(&rows)
}

// ================================================================================================
// Temporal Aggregation
// ================================================================================================

/// Per-bucket summaries of every policy's bars, policies in the order given.
#[tracing::instrument(skip_all, fields(interval = %interval))]
pub fn temporal(
    policy_bars: &[(OpenPolicyKind, &[Bar])],
    interval: TemporalInterval,
    config: &PipelineConfig,
) -> AcfoResult<TemporalAnalytics> {
    let axis = TrajectoryAxis::from_config(&config.enrichment, &config.signal);

    let rows: Vec<_> = policy_bars
        .iter()
        .flat_map(|(policy, bars)| {
            let population = BarPopulation::new(bars, config.signal.dte_filter, &axis);
            TemporalPartitioner::new(population, axis, *policy).aggregate(interval)
        })
        .collect();

    info!(rows = rows.len(), "Aggregated temporal buckets");
    TemporalAnalytics::from_rows(interval, &rows)
}

// ================================================================================================
// Helper Functions
// ================================================================================================

fn progress_bar(capacity: u64) -> AcfoResult<ProgressBar> {
    let bar = ProgressBar::new(capacity);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta_precise}) {msg}")
            .map_err(ConfigError::ProgressBar)?
            .progress_chars("#>-"));
    Ok(bar)
}
