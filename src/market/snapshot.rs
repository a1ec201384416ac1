//! Market data fetched once for a whole run

use std::collections::BTreeMap;

use chrono::NaiveDate;

use super::{PriceSeries, RateSeries};

/// Everything the quarter loop reads from the market.
///
/// Built once up front; the simulation itself never touches a provider.
#[derive(Debug, Clone)]
pub struct MarketSnapshot {
    /// Dense, adjusted daily rate series covering every quarter
    pub rates: RateSeries,
    /// Forward-filled prices over the purchase window, `None` when the
    /// provider failed and the cash fallback applies
    pub purchase_prices: Option<PriceSeries>,
    /// Asset price at each quarter end, `None` when unknown
    pub quarter_end_prices: BTreeMap<NaiveDate, Option<f64>>,
}

impl MarketSnapshot {
    pub fn new(
        rates: RateSeries,
        purchase_prices: Option<PriceSeries>,
        quarter_end_prices: BTreeMap<NaiveDate, Option<f64>>,
    ) -> Self {
        Self {
            rates,
            purchase_prices,
            quarter_end_prices,
        }
    }

    /// Snapshot with a flat rate and no price data
    pub fn offline(rates: RateSeries) -> Self {
        Self::new(rates, None, BTreeMap::new())
    }

    pub fn quarter_end_price(&self, date: NaiveDate) -> Option<f64> {
        self.quarter_end_prices.get(&date).copied().flatten()
    }

    /// Same snapshot with the whole rate curve moved by `bps`
    pub fn with_rate_shift(&self, bps: f64) -> Self {
        Self {
            rates: self.rates.shifted(bps),
            ..self.clone()
        }
    }
}
