//! Daily asset price series

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::day_range;

/// Which daily price a purchase is assumed to execute at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceBasis {
    /// Daily close
    #[default]
    Close,
    /// Average of high, low and close, approximating intraday execution
    Hlc3,
}

impl FromStr for PriceBasis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "close" => Ok(PriceBasis::Close),
            "hlc3" => Ok(PriceBasis::Hlc3),
            other => Err(format!("unknown price basis '{other}', expected close or hlc3")),
        }
    }
}

impl fmt::Display for PriceBasis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PriceBasis::Close => write!(f, "close"),
            PriceBasis::Hlc3 => write!(f, "hlc3"),
        }
    }
}

/// One daily observation from a price source
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub close: f64,
    pub high: Option<f64>,
    pub low: Option<f64>,
}

impl DailyBar {
    pub fn from_close(close: f64) -> Self {
        Self { close, high: None, low: None }
    }

    /// Price under `basis`. HLC3 falls back to the close when high or low
    /// is missing.
    pub fn price(&self, basis: PriceBasis) -> f64 {
        match (basis, self.high, self.low) {
            (PriceBasis::Hlc3, Some(high), Some(low)) => (high + low + self.close) / 3.0,
            _ => self.close,
        }
    }
}

/// Sparse or dense daily USD price series
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    prices: BTreeMap<NaiveDate, f64>,
}

impl PriceSeries {
    pub fn from_bars(bars: &BTreeMap<NaiveDate, DailyBar>, basis: PriceBasis) -> Self {
        let prices = bars
            .iter()
            .map(|(date, bar)| (*date, bar.price(basis)))
            .filter(|(_, price)| price.is_finite())
            .collect();
        Self { prices }
    }

    pub fn from_prices<I>(prices: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDate, f64)>,
    {
        Self {
            prices: prices.into_iter().filter(|(_, p)| p.is_finite()).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.prices.get(&date).copied()
    }

    /// Reindex onto the complete calendar between the first and last
    /// observation, carrying each price forward over gaps
    pub fn forward_filled(&self) -> Self {
        let (Some((&first, _)), Some((&last, _))) =
            (self.prices.first_key_value(), self.prices.last_key_value())
        else {
            return Self::default();
        };

        let mut prices = BTreeMap::new();
        let mut carried = None;
        for day in day_range(first, last) {
            if let Some(p) = self.get(day) {
                carried = Some(p);
            }
            if let Some(p) = carried {
                prices.insert(day, p);
            }
        }
        Self { prices }
    }

    /// Last known price at or before `date`
    pub fn price_at_or_before(&self, date: NaiveDate) -> Option<f64> {
        self.prices.range(..=date).next_back().map(|(_, p)| *p)
    }

    /// Last known price at or before `date`, else the first one after it.
    /// `None` only for an empty series.
    pub fn nearest_price(&self, date: NaiveDate) -> Option<f64> {
        self.price_at_or_before(date)
            .or_else(|| self.prices.range(date..).next().map(|(_, p)| *p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_hlc3_basis() {
        let bar = DailyBar { close: 100.0, high: Some(110.0), low: Some(90.0) };
        assert_eq!(bar.price(PriceBasis::Hlc3), 100.0);
        assert_eq!(DailyBar { close: 99.0, high: Some(120.0), low: Some(90.0) }.price(PriceBasis::Hlc3), 103.0);
        assert_eq!(DailyBar::from_close(99.0).price(PriceBasis::Hlc3), 99.0);
        assert_eq!("HLC3".parse::<PriceBasis>().unwrap(), PriceBasis::Hlc3);
        assert!("vwap".parse::<PriceBasis>().is_err());
    }

    #[test]
    fn test_forward_fill_and_lookup() {
        let series = PriceSeries::from_prices(vec![
            (d("2025-05-01"), 96_000.0),
            (d("2025-05-04"), 95_000.0),
        ]);
        let filled = series.forward_filled();

        assert_eq!(filled.len(), 4);
        assert_eq!(filled.get(d("2025-05-03")), Some(96_000.0));
        assert_eq!(filled.price_at_or_before(d("2025-05-10")), Some(95_000.0));
        assert_eq!(filled.price_at_or_before(d("2025-04-30")), None);
        assert_eq!(filled.nearest_price(d("2025-04-30")), Some(96_000.0));
        assert_eq!(PriceSeries::default().nearest_price(d("2025-04-30")), None);
    }
}
