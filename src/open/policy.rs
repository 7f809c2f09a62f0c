use std::fmt::Debug;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

use crate::{data::bar::Bar, open::schedule::OpenSchedule};

/// External name of an open policy, as it appears in configuration and output tables.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    EnumIter,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OpenPolicyKind {
    /// The open bar must sit exactly at the scheduled open.
    TrueOpen,
    /// The earliest bar inside the open window stands in for the open.
    SlidingOpen,
}

impl OpenPolicyKind {
    pub fn policy(&self) -> Box<dyn OpenReference> {
        match self {
            OpenPolicyKind::TrueOpen => Box::new(TrueOpen),
            OpenPolicyKind::SlidingOpen => Box::new(SlidingOpen),
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// All retained bars of one symbol on one trading date, in timestamp order.
#[derive(Debug, Clone, Copy)]
pub struct TradingSession<'a> {
    pub date: NaiveDate,
    pub scheduled_open: NaiveDateTime,
    pub bars: &'a [Bar],
}

impl<'a> TradingSession<'a> {
    /// Splits timestamp-sorted bars of a single symbol into per-date sessions.
    pub fn split(
        bars: &'a [Bar],
        schedule: OpenSchedule,
    ) -> impl Iterator<Item = TradingSession<'a>> + 'a {
        bars.chunk_by(|a, b| a.date() == b.date())
            .filter_map(move |day| {
                let first = day.first()?;
                Some(TradingSession {
                    date: first.date(),
                    scheduled_open: schedule.scheduled_open(first.timestamp),
                    bars: day,
                })
            })
    }
}

/// Resolves the bar that stands in as a trading day's open.
///
/// Callers only depend on this capability; which rule applies is decided once, from
/// configuration, through [`OpenPolicyKind::policy`].
pub trait OpenReference: Debug + Send + Sync {
    fn kind(&self) -> OpenPolicyKind;

    /// The reference bar of `session`, or `None` if the policy cannot resolve one.
    fn resolve<'a>(&self, session: &TradingSession<'a>) -> Option<&'a Bar>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TrueOpen;

impl OpenReference for TrueOpen {
    fn kind(&self) -> OpenPolicyKind {
        OpenPolicyKind::TrueOpen
    }

    fn resolve<'a>(&self, session: &TradingSession<'a>) -> Option<&'a Bar> {
        session
            .bars
            .iter()
            .find(|b| b.timestamp == session.scheduled_open)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlidingOpen;

impl OpenReference for SlidingOpen {
    fn kind(&self) -> OpenPolicyKind {
        OpenPolicyKind::SlidingOpen
    }

    fn resolve<'a>(&self, session: &TradingSession<'a>) -> Option<&'a Bar> {
        // min_by_key keeps the first of equal offsets, i.e. the earliest timestamp.
        session.bars.iter().min_by_key(|b| b.open_minutes_offset)
    }
}
