use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    data::{bar::Bar, calendar::TradingCalendar, settlement::SettlementHistory},
    math::rounding::round_price,
    open::{
        policy::{OpenReference, TradingSession},
        schedule::OpenSchedule,
    },
    settlement::lookback::{LookbackInterval, SettlementLookback},
};

/// Open of one trading day against a settlement reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementChange {
    pub date: NaiveDate,
    pub symbol: String,
    /// `open - settle`, rounded to three decimals.
    pub price_difference: Option<f64>,
    pub days_back: Option<i64>,
}

#[derive(Debug, Clone, Copy)]
pub struct SettlementChangeCalculator<'a> {
    schedule: OpenSchedule,
    policy: &'a dyn OpenReference,
    interval: LookbackInterval,
    calendar: &'a TradingCalendar,
    contract_root: &'a str,
}

impl<'a> SettlementChangeCalculator<'a> {
    pub fn new(
        schedule: OpenSchedule,
        policy: &'a dyn OpenReference,
        interval: LookbackInterval,
        calendar: &'a TradingCalendar,
        contract_root: &'a str,
    ) -> Self {
        Self {
            schedule,
            policy,
            interval,
            calendar,
            contract_root,
        }
    }

    pub fn interval(&self) -> LookbackInterval {
        self.interval
    }

    /// Changes for one contract. `bars` are that contract's enriched bars in timestamp order.
    ///
    /// Days whose open the policy cannot resolve are left out; days without a settlement
    /// reference are kept with null values.
    pub fn changes(&self, history: &SettlementHistory, bars: &[Bar]) -> Vec<SettlementChange> {
        let symbol = history.contract().symbol(self.contract_root);
        let lookback = SettlementLookback::new(history, self.calendar);

        let mut missing_open = 0usize;
        let rows: Vec<SettlementChange> = TradingSession::split(bars, self.schedule)
            .filter_map(|session| {
                let Some(open_bar) = self.policy.resolve(&session) else {
                    missing_open += 1;
                    return None;
                };
                let found = lookback.resolve(session.date, self.interval);
                Some(SettlementChange {
                    date: session.date,
                    symbol: symbol.clone(),
                    price_difference: found
                        .reference
                        .map(|r| round_price(open_bar.open - r.settle())),
                    days_back: found.days_back,
                })
            })
            .collect();

        debug!(
            %symbol,
            interval = %self.interval,
            rows = rows.len(),
            missing_open,
            "Computed settlement changes"
        );
        rows
    }
}
