//! Per-quarter result rows and run-level summaries

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use super::path::DailyPath;
use super::state::CarryState;

/// Reported interest below this (USD millions) is too small for a
/// meaningful percentage error
pub const MATERIAL_INTEREST_MM: f64 = 5.0;

/// One row per quarter. Values are kept at full precision and rounded only
/// when serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultRow {
    pub quarter_end: NaiveDate,
    pub fiscal_quarter: u32,
    pub is_forecast: bool,
    pub days: u32,

    #[serde(serialize_with = "round2")]
    pub modeled_interest_mm: f64,
    pub reported_interest_mm: Option<f64>,
    #[serde(serialize_with = "round2_opt")]
    pub abs_error_mm: Option<f64>,
    #[serde(serialize_with = "round4_opt")]
    pub pct_error: Option<f64>,

    #[serde(serialize_with = "round2")]
    pub start_liq_mm: f64,
    #[serde(serialize_with = "round2")]
    pub end_liq_mm: f64,
    #[serde(serialize_with = "round2")]
    pub events_mm: f64,

    // Purchase program
    pub purchase_units_window: f64,
    #[serde(serialize_with = "round2")]
    pub purchase_spent_mm: f64,
    #[serde(serialize_with = "round6")]
    pub purchase_units_executed: f64,
    #[serde(serialize_with = "round2_opt")]
    pub purchase_avg_price_usd: Option<f64>,

    // Asset position
    #[serde(serialize_with = "round2_opt")]
    pub asset_px_qbeg_usd: Option<f64>,
    #[serde(serialize_with = "round2_opt")]
    pub asset_px_qend_usd: Option<f64>,
    #[serde(serialize_with = "round6")]
    pub asset_units_holdings: f64,
    #[serde(serialize_with = "round2")]
    pub asset_fair_value_mm: f64,
    #[serde(serialize_with = "round2")]
    pub asset_earnings_mm: f64,

    // Carry
    #[serde(serialize_with = "round2")]
    pub end_liq_carry_mm: f64,
    #[serde(serialize_with = "round2")]
    pub total_end_liq_mm: f64,

    // Yield diagnostics
    #[serde(serialize_with = "round2")]
    pub avg_balance_mm: f64,
    #[serde(serialize_with = "round2_opt")]
    pub implied_ann_yield_modeled_pct: Option<f64>,
    #[serde(serialize_with = "round2_opt")]
    pub implied_ann_yield_reported_pct: Option<f64>,
    #[serde(serialize_with = "round2_opt")]
    pub ref_ann_yield_pct: Option<f64>,
    #[serde(serialize_with = "round0_opt")]
    pub modeled_minus_ref_bps: Option<f64>,
    #[serde(serialize_with = "round0_opt")]
    pub reported_minus_ref_bps: Option<f64>,

    // Drift
    #[serde(serialize_with = "round6")]
    pub drift_per_day_mm: f64,
    #[serde(serialize_with = "round2")]
    pub total_drift_mm: f64,
    /// Non-interest plug; undefined for forecasts
    #[serde(serialize_with = "round2_opt")]
    pub operating_drift_mm: Option<f64>,

    // Error metrics
    #[serde(serialize_with = "round4_opt")]
    pub ape: Option<f64>,
    #[serde(serialize_with = "round4_opt")]
    pub smape: Option<f64>,
}

/// Backtest accuracy over reported quarters
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ErrorMetrics {
    /// Mean absolute percentage error over quarters with material
    /// reported interest
    pub mape_material: Option<f64>,
    /// Symmetric MAPE over every quarter with reported interest
    pub smape: Option<f64>,
    pub material_quarters: usize,
    pub compared_quarters: usize,
}

/// Full run output
#[derive(Debug, Clone)]
pub struct SimulationResult {
    pub rows: Vec<ResultRow>,
    /// Daily path per quarter, aligned with `rows`
    pub daily_paths: Vec<DailyPath>,
    /// State after the last quarter
    pub final_state: CarryState,
}

impl SimulationResult {
    pub fn reported_rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter().filter(|r| r.reported_interest_mm.is_some())
    }

    pub fn forecast_rows(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter().filter(|r| r.is_forecast)
    }

    /// Modeled interest summed over forecast quarters
    pub fn forecast_interest_mm(&self) -> f64 {
        self.forecast_rows().map(|r| r.modeled_interest_mm).sum()
    }

    pub fn error_metrics(&self, material_threshold_mm: f64) -> ErrorMetrics {
        let material: Vec<f64> = self
            .rows
            .iter()
            .filter(|r| r.reported_interest_mm.is_some_and(|v| v.abs() >= material_threshold_mm))
            .filter_map(|r| r.ape)
            .filter(|v| v.is_finite())
            .collect();
        let symmetric: Vec<f64> = self
            .rows
            .iter()
            .filter_map(|r| r.smape)
            .filter(|v| v.is_finite())
            .collect();

        ErrorMetrics {
            mape_material: mean(&material),
            smape: mean(&symmetric),
            material_quarters: material.len(),
            compared_quarters: symmetric.len(),
        }
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

pub(crate) fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

fn round_opt<S: Serializer>(value: &Option<f64>, places: i32, s: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) if v.is_finite() => s.serialize_some(&round_to(*v, places)),
        _ => s.serialize_none(),
    }
}

fn round2<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round_to(*value, 2))
}

fn round6<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(round_to(*value, 6))
}

fn round0_opt<S: Serializer>(value: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    round_opt(value, 0, s)
}

fn round2_opt<S: Serializer>(value: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    round_opt(value, 2, s)
}

fn round4_opt<S: Serializer>(value: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    round_opt(value, 4, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 2), 1.23);
        assert_eq!(round_to(-7.5, 0), -8.0);
        assert_eq!(round_to(0.1234567, 6), 0.123457);
    }
}
