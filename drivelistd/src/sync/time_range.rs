use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use time::{Duration, OffsetDateTime};

use drivelist_core::MAX_PAGE_SIZE;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("unsupported time range: {0}")]
    TimeRange(String),
    #[error("invalid item limit: {0}")]
    ItemCap(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Days(u16),
    All,
}

impl TimeRange {
    pub const CHOICES: [TimeRange; 7] = [
        TimeRange::Days(7),
        TimeRange::Days(14),
        TimeRange::Days(30),
        TimeRange::Days(90),
        TimeRange::Days(180),
        TimeRange::Days(365),
        TimeRange::All,
    ];

    /// Lower bound relative to `now`. Computed once per selection so the
    /// bound stays identical across continuation fetches.
    pub fn lower_bound(self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        match self {
            TimeRange::Days(days) => Some(now - Duration::days(i64::from(days))),
            TimeRange::All => None,
        }
    }

    pub fn days(self) -> Option<u16> {
        match self {
            TimeRange::Days(days) => Some(days),
            TimeRange::All => None,
        }
    }
}

impl Default for TimeRange {
    fn default() -> Self {
        TimeRange::Days(14)
    }
}

impl FromStr for TimeRange {
    type Err = SelectionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("all") {
            return Ok(TimeRange::All);
        }
        value
            .parse::<u16>()
            .ok()
            .map(TimeRange::Days)
            .filter(|range| Self::CHOICES.contains(range))
            .ok_or_else(|| SelectionError::TimeRange(value.to_string()))
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeRange::Days(days) => write!(f, "{days}d"),
            TimeRange::All => f.write_str("all"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCap {
    Limited(usize),
    Unlimited,
}

impl ItemCap {
    pub fn limit(self) -> Option<usize> {
        match self {
            ItemCap::Limited(limit) => Some(limit),
            ItemCap::Unlimited => None,
        }
    }

    pub fn is_reached(self, emitted: usize) -> bool {
        self.limit().is_some_and(|limit| emitted >= limit)
    }

    pub fn remaining(self, emitted: usize) -> usize {
        self.limit()
            .map_or(usize::MAX, |limit| limit.saturating_sub(emitted))
    }

    pub fn page_size_hint(self) -> u32 {
        match self {
            ItemCap::Limited(limit) => {
                u32::try_from(limit).map_or(MAX_PAGE_SIZE, |limit| limit.min(MAX_PAGE_SIZE))
            }
            ItemCap::Unlimited => MAX_PAGE_SIZE,
        }
    }
}

impl Default for ItemCap {
    fn default() -> Self {
        ItemCap::Limited(1000)
    }
}

impl FromStr for ItemCap {
    type Err = SelectionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("all") {
            return Ok(ItemCap::Unlimited);
        }
        value
            .parse::<usize>()
            .ok()
            .filter(|limit| *limit > 0)
            .map(ItemCap::Limited)
            .ok_or_else(|| SelectionError::ItemCap(value.to_string()))
    }
}
