use chrono::NaiveDate;
use tracing::debug;

use crate::{
    config::EnrichmentConfig,
    data::bar::{Bar, RawBar},
    math::rounding::round_price,
    open::{
        policy::{OpenReference, TradingSession},
        schedule::OpenSchedule,
    },
};

/// Aligns one contract's raw minute bars to each day's open under a single open policy.
#[derive(Debug, Clone, Copy)]
pub struct OpenWindowEnricher<'a> {
    schedule: OpenSchedule,
    window_width: i64,
    drop_day_if_open_missing: bool,
    policy: &'a dyn OpenReference,
}

impl<'a> OpenWindowEnricher<'a> {
    pub fn new(
        schedule: OpenSchedule,
        config: &EnrichmentConfig,
        policy: &'a dyn OpenReference,
    ) -> Self {
        Self {
            schedule,
            window_width: config.window_width_minutes,
            drop_day_if_open_missing: config.drop_day_if_open_missing,
            policy,
        }
    }

    pub fn policy(&self) -> &'a dyn OpenReference {
        self.policy
    }

    /// Produces the enriched bars of `symbol`.
    ///
    /// 1. offset every bar from its day's scheduled open,
    /// 2. keep offsets in `[0, window_width]`,
    /// 3. resolve each day's open reference with the policy,
    /// 4. price change = close - reference open, rounded to three decimals,
    /// 5. days to expiration from the bar's calendar date.
    ///
    /// Output is in timestamp order regardless of input order.
    pub fn enrich(&self, symbol: &str, raw: &[RawBar], expiration: Option<NaiveDate>) -> Vec<Bar> {
        let mut ordered: Vec<&RawBar> = raw.iter().collect();
        ordered.sort_by_key(|b| b.timestamp);

        let retained: Vec<Bar> = ordered
            .into_iter()
            .filter_map(|raw_bar| {
                let offset = self.schedule.minutes_from_open(raw_bar.timestamp);
                (0..=self.window_width)
                    .contains(&offset)
                    .then(|| self.aligned(symbol, raw_bar, offset, expiration))
            })
            .collect();

        let mut enriched = Vec::with_capacity(retained.len());
        let mut dropped_days = 0usize;
        let mut nulled_days = 0usize;

        for session in TradingSession::split(&retained, self.schedule) {
            let reference_open = self.policy.resolve(&session).map(|b| b.open);

            if reference_open.is_none() {
                if self.drop_day_if_open_missing {
                    dropped_days += 1;
                    continue;
                }
                nulled_days += 1;
            }

            enriched.extend(session.bars.iter().map(|bar| Bar {
                price_change_from_open: reference_open.map(|open| round_price(bar.close - open)),
                ..bar.clone()
            }));
        }

        debug!(
            symbol,
            policy = %self.policy.kind(),
            bars = enriched.len(),
            dropped_days,
            nulled_days,
            "Enriched contract open window"
        );
        enriched
    }

    fn aligned(
        &self,
        symbol: &str,
        raw: &RawBar,
        offset: i64,
        expiration: Option<NaiveDate>,
    ) -> Bar {
        Bar {
            symbol: symbol.to_string(),
            timestamp: raw.timestamp,
            open_minutes_offset: offset,
            open: raw.open,
            high: raw.high,
            low: raw.low,
            close: raw.close,
            volume: raw.volume,
            price_change_from_open: None,
            expiration_date: expiration,
            days_to_expiration: expiration.map(|exp| (exp - raw.date()).num_days()),
        }
    }
}
