//! In-memory market data source

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::{DailyBar, MarketData};
use crate::error::{ModelError, Result};

/// Market data held in memory.
///
/// An empty instance behaves like an unreachable provider: every fetch fails,
/// so every fallback engages. Used for offline runs and deterministic tests.
#[derive(Debug, Clone, Default)]
pub struct StaticMarketData {
    rates: BTreeMap<NaiveDate, f64>,
    bars: BTreeMap<NaiveDate, DailyBar>,
}

impl StaticMarketData {
    pub fn offline() -> Self {
        Self::default()
    }

    pub fn with_rates<I>(mut self, rates: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        self.rates.extend(rates);
        self
    }

    pub fn with_bars<I>(mut self, bars: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, DailyBar)>,
    {
        self.bars.extend(bars);
        self
    }

    pub fn with_closes<I>(self, closes: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        self.with_bars(closes.into_iter().map(|(d, c)| (d, DailyBar::from_close(c))))
    }
}

impl MarketData for StaticMarketData {
    fn fetch_rate_series(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>> {
        if self.rates.is_empty() {
            return Err(ModelError::MarketData(format!("{series_id}: no rates loaded")));
        }
        Ok(self.rates.range(start..=end).map(|(d, r)| (*d, *r)).collect())
    }

    fn fetch_price_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, DailyBar>> {
        if self.bars.is_empty() {
            return Err(ModelError::MarketData(format!("{symbol}: no prices loaded")));
        }
        Ok(self.bars.range(start..=end).map(|(d, b)| (*d, *b)).collect())
    }
}
