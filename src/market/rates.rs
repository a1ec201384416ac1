//! Dense daily short-rate series and scheduled policy adjustments

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::day_range;
use crate::error::{ModelError, Result};

/// Series identifier for the 3-month Treasury constant maturity yield
pub const DEFAULT_RATE_SERIES: &str = "DGS3MO";

/// Fallback annual rate (percent) when no observation is available
pub const DEFAULT_OFFLINE_RATE_PCT: f64 = 5.0;

/// ACT/365 fixed: annual rate / 365 regardless of the calendar year
pub const DAYS_PER_YEAR: f64 = 365.0;

/// Daily decimal rate from an annual percentage
pub fn daily_rate_act365(rate_pct: f64) -> f64 {
    rate_pct / 100.0 / DAYS_PER_YEAR
}

/// Rate for a single day
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatePoint {
    /// Annualized rate in percent
    pub rate_pct: f64,
    /// Daily decimal rate under ACT/365
    pub daily_rate: f64,
}

/// Gap-free daily rate series over a closed date range.
///
/// Every day between `start` and `end()` has a defined rate.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSeries {
    start: NaiveDate,
    points: Vec<RatePoint>,
}

impl RateSeries {
    /// Reindex raw observations onto the full `[start, end]` calendar.
    ///
    /// Gaps are filled forward, then backward, then with `default_pct`.
    /// Observations outside the range are ignored, as are non-finite values.
    pub fn densify(
        observations: &BTreeMap<NaiveDate, f64>,
        start: NaiveDate,
        end: NaiveDate,
        default_pct: f64,
    ) -> Self {
        let mut values: Vec<Option<f64>> = day_range(start, end)
            .map(|day| observations.get(&day).copied().filter(|v| v.is_finite()))
            .collect();

        let mut last = None;
        for value in values.iter_mut() {
            match value {
                Some(v) => last = Some(*v),
                None => *value = last,
            }
        }

        let mut next = None;
        for value in values.iter_mut().rev() {
            match value {
                Some(v) => next = Some(*v),
                None => *value = next,
            }
        }

        let points = values
            .into_iter()
            .map(|v| {
                let rate_pct = v.unwrap_or(default_pct);
                RatePoint {
                    rate_pct,
                    daily_rate: daily_rate_act365(rate_pct),
                }
            })
            .collect();

        Self { start, points }
    }

    /// Constant rate over the range
    pub fn flat(start: NaiveDate, end: NaiveDate, rate_pct: f64) -> Self {
        Self::densify(&BTreeMap::new(), start, end, rate_pct)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.date_at(self.points.len().saturating_sub(1))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    fn date_at(&self, offset: usize) -> NaiveDate {
        crate::dates::add_days(self.start, offset as u64)
    }

    fn offset_of(&self, date: NaiveDate) -> Option<usize> {
        let offset = (date - self.start).num_days();
        if offset < 0 {
            return None;
        }
        let offset = offset as usize;
        (offset < self.points.len()).then_some(offset)
    }

    pub fn get(&self, date: NaiveDate) -> Option<RatePoint> {
        self.offset_of(date).map(|i| self.points[i])
    }

    pub fn daily_rate(&self, date: NaiveDate) -> Option<f64> {
        self.get(date).map(|p| p.daily_rate)
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, RatePoint)> + '_ {
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| (self.date_at(i), *p))
    }

    /// Mean annual rate (percent) over the days of `[start, end]` the series covers
    pub fn mean_rate_pct(&self, start: NaiveDate, end: NaiveDate) -> Option<f64> {
        let (sum, count) = day_range(start, end)
            .filter_map(|day| self.get(day))
            .fold((0.0, 0usize), |(s, n), p| (s + p.rate_pct, n + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// Apply scheduled policy moves in chronological order.
    ///
    /// Moves accumulate: a delta applies on top of whatever level earlier
    /// moves left in place. Moves dated after the series end have no effect.
    pub fn with_adjustments(&self, adjustments: &[RateAdjustment]) -> Result<Self> {
        let mut ordered = adjustments
            .iter()
            .map(|adj| adj.kind().map(|kind| (adj.date, kind)))
            .collect::<Result<Vec<_>>>()?;
        ordered.sort_by_key(|(date, _)| *date);

        let mut out = self.clone();
        for (date, kind) in ordered {
            let from = if date <= out.start {
                0
            } else {
                match out.offset_of(date) {
                    Some(i) => i,
                    None => continue,
                }
            };
            for point in &mut out.points[from..] {
                point.rate_pct = match kind {
                    AdjustmentKind::Level(pct) => pct,
                    AdjustmentKind::DeltaBps(bps) => point.rate_pct + bps / 100.0,
                };
            }
        }
        out.refresh_daily_rates();
        Ok(out)
    }

    /// Parallel shift of the whole series by `bps` basis points
    pub fn shifted(&self, bps: f64) -> Self {
        let mut out = self.clone();
        for point in &mut out.points {
            point.rate_pct += bps / 100.0;
        }
        out.refresh_daily_rates();
        out
    }

    fn refresh_daily_rates(&mut self) {
        for point in &mut self.points {
            point.daily_rate = daily_rate_act365(point.rate_pct);
        }
    }

}

/// A scheduled move in the short rate, effective from `date` onward.
///
/// Exactly one of `to_pct` (absolute level) or `delta_bps` (relative move)
/// must be set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateAdjustment {
    pub date: NaiveDate,
    #[serde(default)]
    pub delta_bps: Option<f64>,
    #[serde(default)]
    pub to_pct: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AdjustmentKind {
    Level(f64),
    DeltaBps(f64),
}

impl RateAdjustment {
    pub fn delta(date: NaiveDate, bps: f64) -> Self {
        Self { date, delta_bps: Some(bps), to_pct: None }
    }

    pub fn level(date: NaiveDate, pct: f64) -> Self {
        Self { date, delta_bps: None, to_pct: Some(pct) }
    }

    fn kind(&self) -> Result<AdjustmentKind> {
        match (self.to_pct, self.delta_bps) {
            (Some(_), Some(_)) => Err(ModelError::ConflictingRateAdjustment { date: self.date }),
            (Some(pct), None) => Ok(AdjustmentKind::Level(pct)),
            (None, Some(bps)) => Ok(AdjustmentKind::DeltaBps(bps)),
            (None, None) => Err(ModelError::EmptyRateAdjustment { date: self.date }),
        }
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

    #[test]
    fn test_densify_fills_forward_then_backward() {
        let mut obs = BTreeMap::new();
        obs.insert(d("2025-01-03"), 4.0);
        obs.insert(d("2025-01-06"), 4.2);
        obs.insert(d("2025-01-07"), f64::NAN);

        let series = RateSeries::densify(&obs, d("2025-01-01"), d("2025-01-08"), 5.0);

        assert_eq!(series.len(), 8);
        // leading gap is back-filled
        assert_eq!(series.get(d("2025-01-01")).unwrap().rate_pct, 4.0);
        // weekend is forward-filled
        assert_eq!(series.get(d("2025-01-05")).unwrap().rate_pct, 4.0);
        assert_eq!(series.get(d("2025-01-08")).unwrap().rate_pct, 4.2);
        assert_relative_eq!(series.daily_rate(d("2025-01-06")).unwrap(), 0.042 / 365.0);
    }

    #[test]
    fn test_empty_source_uses_default_everywhere() {
        let series = RateSeries::densify(&BTreeMap::new(), d("2025-01-01"), d("2025-03-31"), 5.0);

        assert_eq!(series.len(), 90);
        for (_, point) in series.iter() {
            assert!(point.rate_pct.is_finite());
            assert_eq!(point.rate_pct, 5.0);
            assert_relative_eq!(point.daily_rate, 0.05 / 365.0);
        }
    }

    #[test]
    fn test_adjustments_are_cumulative_and_ordered() {
        let series = RateSeries::flat(d("2025-09-01"), d("2025-12-31"), 4.0);
        let adjustments = vec![
            RateAdjustment::delta(d("2025-10-29"), -25.0),
            RateAdjustment::delta(d("2025-09-17"), -25.0),
            RateAdjustment::level(d("2025-12-10"), 3.0),
            RateAdjustment::delta(d("2025-12-20"), 50.0),
        ];

        let adjusted = series.with_adjustments(&adjustments).unwrap();

        assert_relative_eq!(adjusted.get(d("2025-09-16")).unwrap().rate_pct, 4.0);
        assert_relative_eq!(adjusted.get(d("2025-09-17")).unwrap().rate_pct, 3.75);
        assert_relative_eq!(adjusted.get(d("2025-11-01")).unwrap().rate_pct, 3.5);
        assert_relative_eq!(adjusted.get(d("2025-12-15")).unwrap().rate_pct, 3.0);
        assert_relative_eq!(adjusted.get(d("2025-12-31")).unwrap().rate_pct, 3.5);
        assert_relative_eq!(adjusted.daily_rate(d("2025-12-31")).unwrap(), 0.035 / 365.0);
    }

    #[test]
    fn test_adjustment_past_series_end_is_ignored() {
        let series = RateSeries::flat(d("2025-01-01"), d("2025-01-31"), 4.0);
        let adjusted = series
            .with_adjustments(&[RateAdjustment::delta(d("2026-01-01"), -100.0)])
            .unwrap();
        assert_eq!(adjusted, series);
    }

    #[test]
    fn test_conflicting_adjustment_is_fatal() {
        let series = RateSeries::flat(d("2025-01-01"), d("2025-01-31"), 4.0);
        let bad = RateAdjustment {
            date: d("2025-01-15"),
            delta_bps: Some(-25.0),
            to_pct: Some(3.5),
        };

        let result = series.with_adjustments(&[bad]);
        assert!(matches!(result, Err(ModelError::ConflictingRateAdjustment { .. })));
    }

    #[test]
    fn test_shift_moves_every_day() {
        let series = RateSeries::flat(d("2025-01-01"), d("2025-01-10"), 4.0);
        let shifted = series.shifted(100.0);
        assert!(shifted.iter().all(|(_, p)| (p.rate_pct - 5.0).abs() < 1e-12));
    }

    #[test]
    fn test_mean_rate() {
        let mut obs = BTreeMap::new();
        obs.insert(d("2025-01-01"), 4.0);
        obs.insert(d("2025-01-03"), 5.0);
        let series = RateSeries::densify(&obs, d("2025-01-01"), d("2025-01-04"), 5.0);

        // 4, 4, 5, 5
        assert_relative_eq!(series.mean_rate_pct(d("2025-01-01"), d("2025-01-04")).unwrap(), 4.5);
    }
}
