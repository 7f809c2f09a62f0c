use std::{collections::BTreeMap, fmt};

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::{
    data::{bar::RawBar, calendar::TradingCalendar, contract::ContractBars},
    math::rounding::round_price,
};

/// Prior-day bar a day's open is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GapReference {
    /// The prior day's bar stamped exactly at this time.
    Anchor(NaiveTime),
    /// The prior day's last bar.
    LastBar,
}

impl fmt::Display for GapReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapReference::Anchor(time) => write!(f, "{}", time.format("%H:%M")),
            GapReference::LastBar => f.write_str("last_bar"),
        }
    }
}

/// Change between a day's first bar and one prior-day reference bar of the same contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OvernightGap {
    pub symbol: String,
    pub date: NaiveDate,
    pub reference: GapReference,
    /// `open - close`, rounded to three decimals.
    pub change: Option<f64>,
}

/// Overnight gaps of one contract, one row per (date, reference) in ascending date order.
///
/// References are the `anchors` in the given order followed by the last bar. A day without a
/// prior trading date, or whose prior trading date has no bars of this contract, gets null
/// changes.
pub fn bar_overnight_gaps(
    contract: &ContractBars,
    calendar: &TradingCalendar,
    anchors: &[NaiveTime],
) -> Vec<OvernightGap> {
    let mut days: BTreeMap<NaiveDate, Vec<&RawBar>> = BTreeMap::new();
    for bar in &contract.bars {
        days.entry(bar.date()).or_default().push(bar);
    }
    for bars in days.values_mut() {
        bars.sort_by_key(|b| b.timestamp);
    }

    let references: Vec<GapReference> = anchors
        .iter()
        .copied()
        .map(GapReference::Anchor)
        .chain(std::iter::once(GapReference::LastBar))
        .collect();

    let mut gaps = Vec::with_capacity(days.len() * references.len());
    for (date, bars) in &days {
        let open = bars.first().map(|b| b.open);
        let prior_bars = calendar
            .previous(*date)
            .and_then(|prior| days.get(&prior));

        for reference in &references {
            let close = prior_bars.and_then(|prior| reference_close(prior, *reference));
            gaps.push(OvernightGap {
                symbol: contract.symbol.clone(),
                date: *date,
                reference: *reference,
                change: open
                    .zip(close)
                    .map(|(open, close)| round_price(open - close)),
            });
        }
    }
    gaps
}

fn reference_close(prior: &[&RawBar], reference: GapReference) -> Option<f64> {
    match reference {
        GapReference::Anchor(time) => prior
            .iter()
            .find(|b| b.timestamp.time() == time)
            .map(|b| b.close),
        GapReference::LastBar => prior.last().map(|b| b.close),
    }
}
