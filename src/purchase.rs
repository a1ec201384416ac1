//! Asset purchase program spread evenly over a fixed window
//!
//! The program buys `total_units` in equal daily slices. Each day's cash
//! outflow is `units_per_day * price * fee_multiplier`, converted to USD
//! millions. Days before the first observed price execute at that price.
//! Without any price, every day falls back to an even slice of a fixed USD
//! total and the days' units and prices stay undefined.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{day_range, days_inclusive};
use crate::error::{ModelError, Result};
use crate::market::{PriceBasis, PriceSeries};

/// Execution uplift on spend, basis points
pub const DEFAULT_FEE_BPS: f64 = 150.0;

/// Fallback total spend when prices are unavailable, USD millions
pub const DEFAULT_FALLBACK_TOTAL_MM: f64 = 510.0;

/// Checked at compile time
const DEFAULT_WINDOW_START: NaiveDate = match NaiveDate::from_ymd_opt(2025, 5, 4) {
    Some(date) => date,
    None => panic!("invalid purchase window start"),
};

const DEFAULT_WINDOW_END: NaiveDate = match NaiveDate::from_ymd_opt(2025, 6, 10) {
    Some(date) => date,
    None => panic!("invalid purchase window end"),
};

/// Purchase program configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseProgram {
    pub symbol: String,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    pub total_units: f64,
    pub fee_bps: f64,
    pub price_basis: PriceBasis,
    pub fallback_total_mm: f64,
}

impl Default for PurchaseProgram {
    fn default() -> Self {
        Self::default_program()
    }
}

impl PurchaseProgram {
    /// The 4,710 BTC program executed 2025-05-04 through 2025-06-10
    pub fn default_program() -> Self {
        Self {
            symbol: "BTC-USD".to_string(),
            window_start: DEFAULT_WINDOW_START,
            window_end: DEFAULT_WINDOW_END,
            total_units: 4710.0,
            fee_bps: DEFAULT_FEE_BPS,
            price_basis: PriceBasis::Close,
            fallback_total_mm: DEFAULT_FALLBACK_TOTAL_MM,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_end < self.window_start {
            return Err(ModelError::InvalidPurchaseWindow {
                start: self.window_start,
                end: self.window_end,
            });
        }
        Ok(())
    }

    pub fn window_days(&self) -> u32 {
        days_inclusive(self.window_start, self.window_end)
    }

    /// Units bought each day of the full window
    pub fn units_per_day(&self) -> f64 {
        match self.window_days() {
            0 => 0.0,
            n => self.total_units / f64::from(n),
        }
    }

    /// Fallback spend per day before fees, USD millions
    pub fn fallback_per_day_mm(&self) -> f64 {
        match self.window_days() {
            0 => 0.0,
            n => self.fallback_total_mm / f64::from(n),
        }
    }

    pub fn fee_multiplier(&self) -> f64 {
        1.0 + self.fee_bps / 10_000.0
    }

    /// Intersection of the purchase window with `[start, end]`
    pub fn overlap(&self, start: NaiveDate, end: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
        let from = start.max(self.window_start);
        let to = end.min(self.window_end);
        (from <= to).then_some((from, to))
    }

    /// Daily purchase flows for the part of the window inside `[start, end]`.
    ///
    /// Units per day and the fallback spend per day come from the whole
    /// window, so splitting the window across quarters does not change the
    /// daily amounts.
    pub fn schedule(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        prices: Option<&PriceSeries>,
    ) -> PurchaseSchedule {
        let Some((from, to)) = self.overlap(start, end) else {
            return PurchaseSchedule::default();
        };

        let units_per_day = self.units_per_day();
        let fee_multiplier = self.fee_multiplier();

        // Priced or fallback for the whole schedule, never mixed
        let days = match prices.filter(|p| !p.is_empty()) {
            Some(prices) => day_range(from, to)
                .filter_map(|date| {
                    let price = prices.nearest_price(date)?;
                    Some(PurchaseDay {
                        date,
                        cash_flow: -(price * units_per_day * fee_multiplier / 1_000_000.0),
                        units: Some(units_per_day),
                        price_usd: Some(price),
                        fee_multiplier,
                    })
                })
                .collect(),
            None => {
                let fallback_mm = -(self.fallback_per_day_mm() * fee_multiplier);
                day_range(from, to)
                    .map(|date| PurchaseDay {
                        date,
                        cash_flow: fallback_mm,
                        units: None,
                        price_usd: None,
                        fee_multiplier,
                    })
                    .collect()
            }
        };

        PurchaseSchedule { days }
    }
}

/// One day of purchases
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PurchaseDay {
    pub date: NaiveDate,
    /// USD millions, negative
    pub cash_flow: f64,
    /// Units bought, undefined on fallback days
    pub units: Option<f64>,
    /// Execution price in USD, undefined on fallback days
    pub price_usd: Option<f64>,
    pub fee_multiplier: f64,
}

/// Daily purchases within one quarter, in date order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PurchaseSchedule {
    days: Vec<PurchaseDay>,
}

impl PurchaseSchedule {
    pub fn days(&self) -> &[PurchaseDay] {
        &self.days
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn cash_flow_on(&self, date: NaiveDate) -> f64 {
        self.days
            .binary_search_by_key(&date, |d| d.date)
            .map(|i| self.days[i].cash_flow)
            .unwrap_or(0.0)
    }

    /// Net purchase flow, USD millions (negative)
    pub fn total_cash_flow(&self) -> f64 {
        self.days.iter().map(|d| d.cash_flow).sum()
    }

    /// Cash spent, USD millions (positive)
    pub fn cash_spent(&self) -> f64 {
        -self.total_cash_flow()
    }

    /// Units with a known execution; fallback days count as zero
    pub fn units_executed(&self) -> f64 {
        self.days.iter().filter_map(|d| d.units).sum()
    }

    /// Average all-in price in USD per unit, when any units are known
    pub fn average_price_usd(&self) -> Option<f64> {
        let units = self.units_executed();
        (units > 0.0).then(|| self.cash_spent() * 1_000_000.0 / units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;
    use approx::assert_relative_eq;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn program() -> PurchaseProgram {
        PurchaseProgram::default_program()
    }

    #[test]
    fn test_window_constants() {
        let p = program();
        assert_eq!(p.window_start, d("2025-05-04"));
        assert_eq!(p.window_end, d("2025-06-10"));
        assert_eq!(p.window_days(), 38);
        assert_relative_eq!(p.units_per_day(), 4710.0 / 38.0);
        assert_relative_eq!(p.fee_multiplier(), 1.015);
    }

    #[test]
    fn test_priced_schedule() {
        let p = program();
        let prices = PriceSeries::from_prices(vec![(d("2025-05-01"), 100_000.0)]);
        let schedule = p.schedule(d("2025-05-04"), d("2025-05-10"), Some(&prices));

        assert_eq!(schedule.days().len(), 7);
        let expected = -(100_000.0 * p.units_per_day() * 1.015 / 1_000_000.0);
        assert_relative_eq!(schedule.cash_flow_on(d("2025-05-05")), expected);
        assert_relative_eq!(schedule.units_executed(), 7.0 * p.units_per_day(), max_relative = 1e-12);
        assert_relative_eq!(schedule.average_price_usd().unwrap(), 101_500.0, max_relative = 1e-12);
    }

    #[test]
    fn test_fallback_keeps_cash_but_not_units() {
        let p = program();
        let schedule = p.schedule(d("2025-05-01"), d("2025-07-31"), None);

        assert_eq!(schedule.days().len(), 38);
        assert_relative_eq!(schedule.cash_spent(), 510.0 * 1.015, max_relative = 1e-12);
        assert_eq!(schedule.units_executed(), 0.0);
        assert!(schedule.average_price_usd().is_none());
        assert!(schedule.days().iter().all(|day| day.units.is_none() && day.price_usd.is_none()));
    }

    #[test]
    fn test_late_price_feed_prices_every_day() {
        let p = program();
        let prices = PriceSeries::from_prices(vec![(d("2025-05-06"), 100_000.0)]).forward_filled();
        let schedule = p.schedule(d("2025-05-04"), d("2025-06-10"), Some(&prices));

        assert_eq!(schedule.days().len(), 38);
        assert!(schedule.days().iter().all(|day| day.units.is_some() && day.price_usd == Some(100_000.0)));
        assert_relative_eq!(schedule.units_executed(), 4710.0, max_relative = 1e-12);
        assert_relative_eq!(schedule.cash_spent(), 4710.0 * 101_500.0 / 1e6, max_relative = 1e-12);
        assert_relative_eq!(schedule.average_price_usd().unwrap(), 101_500.0, max_relative = 1e-12);
    }

    #[test]
    fn test_empty_price_series_falls_back() {
        let p = program();
        let schedule = p.schedule(d("2025-05-04"), d("2025-05-10"), Some(&PriceSeries::default()));

        assert_eq!(schedule.days().len(), 7);
        assert_eq!(schedule.units_executed(), 0.0);
        assert!(schedule.average_price_usd().is_none());
    }

    #[test]
    fn test_window_split_across_quarters() {
        let p = program();
        let first = p.schedule(d("2025-02-02"), d("2025-05-03"), None);
        let second = p.schedule(d("2025-05-04"), d("2025-06-01"), None);
        let third = p.schedule(d("2025-06-02"), d("2025-08-31"), None);

        assert!(first.is_empty());
        assert_eq!(second.days().len() + third.days().len(), 38);
        assert_relative_eq!(
            second.cash_spent() + third.cash_spent(),
            510.0 * 1.015,
            max_relative = 1e-12
        );
        assert_eq!(second.cash_flow_on(d("2025-06-05")), 0.0);
    }

    #[test]
    fn test_inverted_window_rejected() {
        let mut p = program();
        p.window_end = d("2025-05-01");
        assert!(matches!(p.validate(), Err(ModelError::InvalidPurchaseWindow { .. })));
    }
}
