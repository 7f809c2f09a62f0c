use std::path::PathBuf;

use acfo::{
    config::PipelineConfig,
    data::{bar::Bar, contract::ContractBars},
    io,
    open::policy::OpenPolicyKind,
    pipeline,
};

pub fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

/// Defaults without the DTE filter; the fixture contracts expire within days.
pub fn setup_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.signal.dte_filter = None;
    config
}

pub fn setup_contracts() -> Vec<ContractBars> {
    io::load_contracts(fixtures().join("raw"), "LE").expect("fixture contracts")
}

pub fn setup_enriched(config: &PipelineConfig, policy: OpenPolicyKind) -> Vec<Bar> {
    let contracts = setup_contracts();
    let expirations = pipeline::build_metadata(&contracts)
        .and_then(|report| report.to_metadata())
        .expect("fixture metadata");
    pipeline::enrich(&contracts, &expirations, config, policy)
        .and_then(|report| report.to_bars())
        .expect("fixture enrichment")
}
