//! Quarter calendar built from the liquidity anchors
//!
//! Historical quarters end on the anchor dates. Forecast quarters are appended
//! after the last anchor, each exactly `quarter_days` long.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::dates::{add_days, days_inclusive, sub_days};
use crate::error::{ModelError, Result};

/// Default quarter length (13 weeks)
pub const DEFAULT_QUARTER_DAYS: u32 = 91;

/// One quarter of the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Quarter {
    /// Position in the frame (1-indexed)
    pub index: usize,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Inclusive number of calendar days
    pub days: u32,
}

impl Quarter {
    /// Fiscal quarter number of the quarter end
    pub fn fiscal_quarter(&self) -> u32 {
        fiscal_quarter(self.end)
    }
}

/// Fiscal quarter for a fiscal year ending in March:
/// Apr-Jun = 1, Jul-Sep = 2, Oct-Dec = 3, Jan-Mar = 4
pub fn fiscal_quarter(date: NaiveDate) -> u32 {
    ((date.month() + 8) % 12) / 3 + 1
}

/// Ordered, gap-free sequence of quarters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuarterFrame {
    quarters: Vec<Quarter>,
}

impl QuarterFrame {
    /// Build the frame from anchor quarter-end dates and append
    /// `forecast_quarters` synthetic quarters of `quarter_days` each.
    ///
    /// The first quarter's start is back-computed from its end; every later
    /// quarter starts the day after the previous one ends.
    pub fn build<I>(anchor_ends: I, forecast_quarters: u32, quarter_days: u32) -> Result<Self>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        if quarter_days == 0 {
            return Err(ModelError::InvalidQuarterLength);
        }

        let mut ends: Vec<NaiveDate> = anchor_ends.into_iter().collect();
        ends.sort_unstable();
        ends.dedup();

        let Some(&last_anchor) = ends.last() else {
            return Err(ModelError::EmptyAnchors);
        };

        let mut next_end = last_anchor;
        for _ in 0..forecast_quarters {
            next_end = add_days(next_end, u64::from(quarter_days));
            ends.push(next_end);
        }

        let mut quarters = Vec::with_capacity(ends.len());
        let mut prev_end: Option<NaiveDate> = None;
        for (i, end) in ends.into_iter().enumerate() {
            let start = match prev_end {
                Some(prev) => add_days(prev, 1),
                None => sub_days(end, u64::from(quarter_days - 1)),
            };
            quarters.push(Quarter {
                index: i + 1,
                start,
                end,
                days: days_inclusive(start, end),
            });
            prev_end = Some(end);
        }

        Ok(Self { quarters })
    }

    pub fn quarters(&self) -> &[Quarter] {
        &self.quarters
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Quarter> {
        self.quarters.iter()
    }

    pub fn len(&self) -> usize {
        self.quarters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quarters.is_empty()
    }

    /// First start and last end of the frame
    pub fn span(&self) -> Option<(NaiveDate, NaiveDate)> {
        Some((self.quarters.first()?.start, self.quarters.last()?.end))
    }

    /// All quarter-end dates in order
    pub fn ends(&self) -> Vec<NaiveDate> {
        self.quarters.iter().map(|q| q.end).collect()
    }
}
