//! Market data: short-rate and asset price series
//!
//! Sources implement [`MarketData`]. The `load_*` functions are the adapter
//! boundary: they absorb every source failure, log it, and hand back a
//! fallback so the reconciler always sees fully defined inputs.

mod fixed;
mod http;
mod prices;
mod rates;
mod snapshot;

pub use fixed::StaticMarketData;
pub use http::HttpMarketData;
pub use prices::{DailyBar, PriceBasis, PriceSeries};
pub use rates::{
    daily_rate_act365, RateAdjustment, RatePoint, RateSeries, DAYS_PER_YEAR, DEFAULT_OFFLINE_RATE_PCT,
    DEFAULT_RATE_SERIES,
};
pub use snapshot::MarketSnapshot;

use std::collections::BTreeMap;

use chrono::NaiveDate;
use log::{debug, warn};

use crate::dates::{add_days, sub_days};
use crate::error::{ModelError, Result};

/// Capability interface over external market data providers
pub trait MarketData {
    /// Raw daily observations (annual rate, percent) for `series_id`
    fn fetch_rate_series(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>>;

    /// Raw daily bars for `symbol`
    fn fetch_price_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, DailyBar>>;

    /// Closing price at each target date, forward-filled from the last
    /// observation at or before it.
    ///
    /// Fetches one superset range covering all targets.
    fn fetch_prices_at_dates(
        &self,
        symbol: &str,
        targets: &[NaiveDate],
    ) -> Result<BTreeMap<NaiveDate, Option<f64>>> {
        let (Some(&first), Some(&last)) = (targets.iter().min(), targets.iter().max()) else {
            return Ok(BTreeMap::new());
        };

        let bars = self.fetch_price_series(symbol, sub_days(first, 5), add_days(last, 1))?;
        let closes = PriceSeries::from_bars(&bars, PriceBasis::Close).forward_filled();
        if closes.is_empty() {
            return Err(ModelError::MarketData(format!("no {symbol} closes returned")));
        }

        Ok(targets
            .iter()
            .map(|t| (*t, closes.price_at_or_before(*t)))
            .collect())
    }
}

/// Dense rate series for `[start, end]`, never failing.
///
/// A failed or empty fetch falls back to `default_pct` for every day.
pub fn load_rate_series(
    source: &dyn MarketData,
    series_id: &str,
    start: NaiveDate,
    end: NaiveDate,
    default_pct: f64,
) -> RateSeries {
    let observations = match source.fetch_rate_series(series_id, start, end) {
        Ok(obs) if !obs.is_empty() => {
            debug!("{series_id}: {} observations for {start}..{end}", obs.len());
            obs
        }
        Ok(_) => {
            warn!("{series_id}: empty response for {start}..{end}, using {default_pct:.2}% fallback");
            BTreeMap::new()
        }
        Err(err) => {
            warn!("{series_id}: fetch failed ({err}), using {default_pct:.2}% fallback");
            BTreeMap::new()
        }
    };

    RateSeries::densify(&observations, start, end, default_pct)
}

/// Price series for `[start, end]`, or `None` when the source has nothing
pub fn load_price_series(
    source: &dyn MarketData,
    symbol: &str,
    start: NaiveDate,
    end: NaiveDate,
    basis: PriceBasis,
) -> Option<PriceSeries> {
    match source.fetch_price_series(symbol, start, end) {
        Ok(bars) => {
            let series = PriceSeries::from_bars(&bars, basis).forward_filled();
            if series.is_empty() {
                warn!("{symbol}: empty price response for {start}..{end}");
                None
            } else {
                Some(series)
            }
        }
        Err(err) => {
            warn!("{symbol}: price fetch failed ({err})");
            None
        }
    }
}

/// Quarter-end prices; every target is `None` when the lookup fails
pub fn load_prices_at_dates(
    source: &dyn MarketData,
    symbol: &str,
    targets: &[NaiveDate],
) -> BTreeMap<NaiveDate, Option<f64>> {
    match source.fetch_prices_at_dates(symbol, targets) {
        Ok(prices) => prices,
        Err(err) => {
            warn!("{symbol}: quarter-end price lookup failed ({err})");
            targets.iter().map(|t| (*t, None)).collect()
        }
    }
}
