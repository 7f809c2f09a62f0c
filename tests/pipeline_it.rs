use std::fs;

use acfo::{
    config::parse_switch,
    error::{AcfoError, ConfigError},
    io,
    open::policy::OpenPolicyKind,
    pipeline::{self, SignalRun, SignalSource},
    report::{
        enriched::EnrichedBars,
        io::{Report, ReportName, ToCsv},
        polars_ext::DataFrameExt,
    },
    settlement::lookback::LookbackInterval,
    signal::temporal::TemporalInterval,
};

mod common;

use common::{fixtures, setup_config, setup_contracts, setup_enriched};

/**
 * Fixture layout (tests/fixtures):
 *  - raw/LEM20.csv: 2020-01-06, 2020-01-07, 2020-01-13, bars 09:25..10:31
 *  - raw/LEQ20.csv: 2020-01-07, 2020-01-13 (first window bar 09:31), 2020-01-14
 *  - every day closes on a straight line from its 09:30 open, so the change at minute
 *    offset 59 is 59 x the day's slope:
 *      LEM20: +0.59, -0.59, +1.18    LEQ20: +0.295, -1.18 (sliding only), +0.59
 *  - settlements/LE_M2020.csv: settles for LEM20
 *  - reports/cot_legacy.csv: 2019-12-31 = 10, 2020-01-07 = 20
 */

// ================================================================================================
// Metadata
// ================================================================================================

#[test]
fn metadata_tables_are_written_sorted() {
    let contracts = setup_contracts();
    let out = tempfile::tempdir().expect("temp dir");

    pipeline::build_metadata(&contracts)
        .expect("metadata")
        .to_csv(out.path(), None, None)
        .expect("write metadata");
    pipeline::build_calendar(&contracts)
        .expect("calendar")
        .to_csv(out.path(), None, None)
        .expect("write calendar");

    let expirations =
        fs::read_to_string(out.path().join("expiration_date_by_contract.csv")).expect("read");
    assert_eq!(
        expirations,
        "Symbol,Expiration Date\nLEM20,2020-01-13\nLEQ20,2020-01-14\n"
    );

    let calendar = fs::read_to_string(out.path().join("unique_trading_days.csv")).expect("read");
    assert_eq!(
        calendar,
        "Date\n2020-01-06\n2020-01-07\n2020-01-13\n2020-01-14\n"
    );
}

// ================================================================================================
// Enrichment
// ================================================================================================

#[test]
fn enriched_table_rerun_is_byte_identical() {
    let config = setup_config();
    let contracts = setup_contracts();
    let expirations = pipeline::build_metadata(&contracts)
        .and_then(|r| r.to_metadata())
        .expect("metadata");

    let first = tempfile::tempdir().expect("temp dir");
    let second = tempfile::tempdir().expect("temp dir");
    for dir in [first.path(), second.path()] {
        pipeline::enrich(&contracts, &expirations, &config, OpenPolicyKind::SlidingOpen)
            .expect("enriched")
            .to_csv(dir, None, None)
            .expect("write enriched");
    }

    let name = EnrichedBars::empty(OpenPolicyKind::SlidingOpen).filename();
    assert_eq!(name, "contract_open_enriched_sliding_open.csv");
    let a = fs::read(first.path().join(&name)).expect("first run");
    let b = fs::read(second.path().join(&name)).expect("second run");
    assert_eq!(a, b);

    let reloaded =
        io::load_enriched(first.path().join(&name), OpenPolicyKind::SlidingOpen).expect("reload");
    assert_eq!(reloaded, setup_enriched(&config, OpenPolicyKind::SlidingOpen));
}

#[test]
fn true_open_nulls_or_drops_days_without_open_bar() {
    let mut config = setup_config();
    let true_open = setup_enriched(&config, OpenPolicyKind::TrueOpen);
    let sliding = setup_enriched(&config, OpenPolicyKind::SlidingOpen);

    // 3 x 61 window bars for LEM20, 61 + 60 + 61 for LEQ20
    assert_eq!(true_open.len(), 365);
    assert_eq!(sliding.len(), 365);

    let missing_open = |bars: &[acfo::data::bar::Bar]| {
        bars.iter()
            .filter(|b| b.symbol == "LEQ20" && b.timestamp.format("%Y-%m-%d").to_string() == "2020-01-13")
            .filter(|b| b.price_change_from_open.is_none())
            .count()
    };
    assert_eq!(missing_open(&true_open), 60);
    assert_eq!(missing_open(&sliding), 0);

    config.enrichment.drop_day_if_open_missing = true;
    assert_eq!(setup_enriched(&config, OpenPolicyKind::TrueOpen).len(), 305);
}

// ================================================================================================
// Settlement Stages
// ================================================================================================

#[test]
fn overnight_settlement_changes_table() {
    let config = setup_config();
    let bars = setup_enriched(&config, OpenPolicyKind::TrueOpen);
    let calendar = pipeline::build_calendar(&setup_contracts())
        .and_then(|r| r.to_calendar())
        .expect("calendar");
    let histories =
        io::load_settlement_histories(fixtures().join("settlements"), "LE_").expect("settlements");

    let report = pipeline::settlement_changes(
        &bars,
        &histories,
        &calendar,
        &config,
        OpenPolicyKind::TrueOpen,
        LookbackInterval::Overnight,
    )
    .expect("changes");

    let out = tempfile::tempdir().expect("temp dir");
    report.to_csv(out.path(), None, None).expect("write changes");
    let written = fs::read_to_string(
        out.path()
            .join("changes_from_settlement_true_open_overnight.csv"),
    )
    .expect("read");

    assert_eq!(
        written,
        "Date,Symbol,Price Difference b/w Open And Prior Day Settlement,Days Looking Back\n\
         2020-01-06,LEM20,,\n\
         2020-01-07,LEM20,0.75,1\n\
         2020-01-13,LEM20,-1.75,6\n"
    );
}

#[test]
fn weekly_lookback_walks_back_to_a_settlement_day() {
    let config = setup_config();
    let bars = setup_enriched(&config, OpenPolicyKind::TrueOpen);
    let calendar = pipeline::build_calendar(&setup_contracts())
        .and_then(|r| r.to_calendar())
        .expect("calendar");
    let histories =
        io::load_settlement_histories(fixtures().join("settlements"), "LE_").expect("settlements");

    let rows = pipeline::settlement_changes(
        &bars,
        &histories,
        &calendar,
        &config,
        OpenPolicyKind::TrueOpen,
        LookbackInterval::Weekly,
    )
    .and_then(|r| r.to_rows())
    .expect("changes");

    let last = rows.last().expect("rows");
    assert_eq!(last.price_difference, Some(-1.25));
    assert_eq!(last.days_back, Some(7));
    assert!(rows[0].price_difference.is_none());
}

#[test]
fn volatility_and_gap_tables_cover_every_contract_day() {
    let config = setup_config();
    let contracts = setup_contracts();
    let calendar = pipeline::build_calendar(&contracts)
        .and_then(|r| r.to_calendar())
        .expect("calendar");
    let histories =
        io::load_settlement_histories(fixtures().join("settlements"), "LE_").expect("settlements");

    let volatility = pipeline::volatility(&histories, &config).expect("volatility");
    assert_eq!(volatility.as_df().height(), 5);

    let gaps = pipeline::overnight_gaps(&contracts, &calendar, &config).expect("gaps");
    // 6 contract days x (11:59, 12:04, last_bar)
    assert_eq!(gaps.as_df().height(), 18);
    assert_eq!(gaps.filename(), "overnight_bar_changes.csv");
}

// ================================================================================================
// Signal Correlation
// ================================================================================================

#[test]
fn cot_median_split_summaries() {
    let config = setup_config();
    let bars = setup_enriched(&config, OpenPolicyKind::TrueOpen);
    let report = io::load_cot_report(fixtures().join("reports/cot_legacy.csv")).expect("cot");
    let sources = vec![SignalSource::from_cot(&report, &config)];

    let correlation = pipeline::signal_correlation(
        &[SignalRun {
            policy: OpenPolicyKind::TrueOpen,
            bars: &bars,
            sources: &sources,
        }],
        &config,
    )
    .expect("correlation");
    let df = correlation.as_df();

    // the "% of OI" column is non-reportable
    assert_eq!(df.height(), 2);
    assert_eq!(
        df.required_str("Field Name").expect("fields"),
        vec!["Noncommercial Long", "Noncommercial Long"]
    );
    assert_eq!(
        df.required_str("Above/Below Median").expect("sides"),
        vec!["above", "below"]
    );
    assert_eq!(
        df.required_f64("Median Value").expect("medians"),
        vec![15.0, 15.0]
    );
    assert_eq!(
        df.required_f64("Median Intraday CFO t+60").expect("reference"),
        vec![0.59, 0.59]
    );

    // above: bars of 2020-01-13/14 (reporting Tuesday 2020-01-07) -> 1.18, 0.59
    // below: bars of 2020-01-06/07 (reporting Tuesday 2019-12-31) -> 0.59, -0.59, 0.295
    let acfo = df.required_f64("ACFO t+60").expect("acfo");
    assert!((acfo[0] - 0.885).abs() < 1e-9);
    assert!((acfo[1] - 0.295 / 3.0).abs() < 1e-9);

    let percent = df.required_f64("Percent GTE Median CFO t+60").expect("percent");
    assert_eq!(percent, vec![100.0, 33.3333]);
}

#[test]
fn settlement_sources_join_per_contract() {
    let config = setup_config();
    let contracts = setup_contracts();
    let bars = setup_enriched(&config, OpenPolicyKind::TrueOpen);
    let calendar = pipeline::build_calendar(&contracts)
        .and_then(|r| r.to_calendar())
        .expect("calendar");
    let histories =
        io::load_settlement_histories(fixtures().join("settlements"), "LE_").expect("settlements");

    let sources = vec![
        SignalSource::settlement_changes(
            &bars,
            &histories,
            &calendar,
            &config,
            OpenPolicyKind::TrueOpen,
        ),
        SignalSource::settlement_volatility(&histories, &config),
        SignalSource::overnight_gaps(&contracts, &calendar, &config).expect("gaps"),
    ];
    assert_eq!(sources[0].series.len(), 4);
    assert_eq!(sources[1].series.len(), 7);
    assert_eq!(sources[2].series.len(), 3);

    let correlation = pipeline::signal_correlation(
        &[SignalRun {
            policy: OpenPolicyKind::TrueOpen,
            bars: &bars,
            sources: &sources,
        }],
        &config,
    )
    .expect("correlation");
    assert_eq!(correlation.as_df().height(), 2 * (4 + 7 + 3));
}

// ================================================================================================
// Temporal & Configuration
// ================================================================================================

#[test]
fn temporal_year_buckets_per_policy() {
    let config = setup_config();
    let true_open = setup_enriched(&config, OpenPolicyKind::TrueOpen);
    let sliding = setup_enriched(&config, OpenPolicyKind::SlidingOpen);

    let report = pipeline::temporal(
        &[
            (OpenPolicyKind::TrueOpen, true_open.as_slice()),
            (OpenPolicyKind::SlidingOpen, sliding.as_slice()),
        ],
        TemporalInterval::Year,
        &config,
    )
    .expect("temporal");

    assert_eq!(report.filename(), "temporal_analytics_year.csv");
    assert_eq!(
        report.as_df().required_str("Open Type").expect("open types"),
        vec!["true_open", "sliding_open"]
    );
}

#[test]
fn unsupported_switch_names_are_rejected() {
    assert!(parse_switch::<LookbackInterval>("lookback interval", "annualy").is_ok());
    assert!(matches!(
        parse_switch::<LookbackInterval>("lookback interval", "yearly"),
        Err(AcfoError::Config(ConfigError::Unsupported { .. }))
    ));
    assert!(matches!(
        parse_switch::<TemporalInterval>("temporal interval", "quarter"),
        Err(AcfoError::Config(ConfigError::Unsupported { .. }))
    ));
}
