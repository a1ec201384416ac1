//! Daily balance path for one quarter
//!
//! The path starts at the opening liquidity, applies dated events and
//! purchase flows on their exact days, and adds a constant residual drift so
//! the last day lands on the target liquidity. Interest accrues daily on the
//! ending balance at the ACT/365 daily rate.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::dates::{day_range, days_inclusive};
use crate::error::{ModelError, Result};
use crate::market::RateSeries;
use crate::purchase::PurchaseSchedule;
use crate::reference::DatedEvent;

/// How the quarter's ending liquidity is determined
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiquidityTarget {
    /// Reported quarter: the path must land on the anchor
    Anchored(f64),
    /// Forecast quarter: end = start + modeled flows, no drift
    Forecast,
}

impl LiquidityTarget {
    pub fn is_forecast(&self) -> bool {
        matches!(self, LiquidityTarget::Forecast)
    }
}

/// Inputs for one quarter, built fresh by the quarter loop
#[derive(Debug, Clone)]
pub struct QuarterInputs {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub start_liquidity: f64,
    pub target: LiquidityTarget,
    /// Events dated inside the quarter
    pub events: Vec<DatedEvent>,
    /// Purchase flows inside the quarter
    pub purchases: PurchaseSchedule,
}

/// One day of the balance path
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DailyRow {
    pub date: NaiveDate,
    pub event_flow: f64,
    pub purchase_flow: f64,
    pub drift: f64,
    pub ending_balance: f64,
    pub rate_pct: f64,
    pub daily_rate: f64,
    pub interest: f64,
}

/// Reconciled daily path and the quarter's accrued interest
#[derive(Debug, Clone, PartialEq)]
pub struct DailyPath {
    pub rows: Vec<DailyRow>,
    pub start_liquidity: f64,
    pub end_liquidity: f64,
    pub drift_per_day: f64,
    /// Sum of daily interest, USD millions
    pub interest: f64,
}

impl DailyPath {
    pub fn days(&self) -> usize {
        self.rows.len()
    }

    pub fn total_drift(&self) -> f64 {
        self.rows.iter().map(|r| r.drift).sum()
    }

    pub fn event_total(&self) -> f64 {
        self.rows.iter().map(|r| r.event_flow).sum()
    }

    pub fn purchase_total(&self) -> f64 {
        self.rows.iter().map(|r| r.purchase_flow).sum()
    }

    pub fn average_balance(&self) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        self.rows.iter().map(|r| r.ending_balance).sum::<f64>() / self.rows.len() as f64
    }

    pub fn final_balance(&self) -> Option<f64> {
        self.rows.last().map(|r| r.ending_balance)
    }
}

/// Build the reconciled daily path for one quarter.
///
/// Every day from start to end (inclusive) gets one row. Fails if the rate
/// series does not cover a day of the quarter.
pub fn build_daily_path(inputs: &QuarterInputs, rates: &RateSeries) -> Result<DailyPath> {
    let day_count = days_inclusive(inputs.start, inputs.end);
    if day_count == 0 {
        return Err(ModelError::InvalidQuarterRange {
            start: inputs.start,
            end: inputs.end,
        });
    }

    let mut events_by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for event in inputs.events.iter().filter(|e| inputs.start <= e.date && e.date <= inputs.end) {
        *events_by_day.entry(event.date).or_insert(0.0) += event.amount;
    }

    let flows: Vec<(NaiveDate, f64, f64)> = day_range(inputs.start, inputs.end)
        .map(|day| {
            let event_flow = events_by_day.get(&day).copied().unwrap_or(0.0);
            (day, event_flow, inputs.purchases.cash_flow_on(day))
        })
        .collect();
    let mechanical_total: f64 = flows.iter().map(|(_, e, p)| e + p).sum();

    let (end_liquidity, drift_per_day) = match inputs.target {
        LiquidityTarget::Anchored(end) => {
            let drift = (end - inputs.start_liquidity - mechanical_total) / f64::from(day_count);
            (end, drift)
        }
        LiquidityTarget::Forecast => (inputs.start_liquidity + mechanical_total, 0.0),
    };

    let mut rows = Vec::with_capacity(flows.len());
    let mut balance = inputs.start_liquidity;
    let mut interest = 0.0;
    for (date, event_flow, purchase_flow) in flows {
        balance += event_flow + purchase_flow + drift_per_day;

        let rate = rates.get(date).ok_or(ModelError::MissingRate { date })?;
        let day_interest = balance * rate.daily_rate;
        interest += day_interest;

        rows.push(DailyRow {
            date,
            event_flow,
            purchase_flow,
            drift: drift_per_day,
            ending_balance: balance,
            rate_pct: rate.rate_pct,
            daily_rate: rate.daily_rate,
            interest: day_interest,
        });
    }

    Ok(DailyPath {
        rows,
        start_liquidity: inputs.start_liquidity,
        end_liquidity,
        drift_per_day,
        interest,
    })
}
