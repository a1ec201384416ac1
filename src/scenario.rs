//! Scenario runner for rate sweeps
//!
//! Fetches market data once, then re-runs the quarter fold under parallel
//! rate shifts without touching a provider again.

use rayon::prelude::*;
use serde::Serialize;

use crate::error::Result;
use crate::market::{MarketData, MarketSnapshot};
use crate::projection::{ErrorMetrics, InterestModel, SimulationResult, MATERIAL_INTEREST_MM};
use crate::quarters::QuarterFrame;

/// Pre-loaded scenario runner
///
/// # Example
/// ```ignore
/// let runner = ScenarioRunner::new(model, &HttpMarketData::new(timeout)?)?;
/// for scenario in runner.run_rate_shocks(&[-100.0, 0.0, 100.0])? {
///     println!("{:+} bps: {:.2}", scenario.shock_bps, scenario.forecast_interest_mm);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct ScenarioRunner {
    model: InterestModel,
    frame: QuarterFrame,
    market: MarketSnapshot,
}

/// Headline numbers for one rate shock
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioResult {
    pub shock_bps: f64,
    /// Modeled interest over every quarter
    pub total_interest_mm: f64,
    /// Modeled interest over forecast quarters only
    pub forecast_interest_mm: f64,
    /// Liquidity carried out of the last quarter
    pub final_liquidity_mm: f64,
    pub metrics: ErrorMetrics,
}

impl ScenarioRunner {
    /// Build the frame and fetch market data from `source`
    pub fn new(model: InterestModel, source: &dyn MarketData) -> Result<Self> {
        let frame = model.quarter_frame()?;
        let market = model.load_market(source, &frame)?;
        Ok(Self { model, frame, market })
    }

    /// Run with unshifted rates
    pub fn run_base(&self) -> Result<SimulationResult> {
        self.model.simulate(&self.frame, &self.market)
    }

    /// Run with the whole rate curve shifted by `bps`
    pub fn run_shock(&self, bps: f64) -> Result<SimulationResult> {
        let shocked = self.market.with_rate_shift(bps);
        self.model.simulate(&self.frame, &shocked)
    }

    /// Run each shock in parallel, results in input order
    pub fn run_rate_shocks(&self, shocks_bps: &[f64]) -> Result<Vec<ScenarioResult>> {
        shocks_bps
            .par_iter()
            .map(|&bps| {
                let result = self.run_shock(bps)?;
                Ok(ScenarioResult {
                    shock_bps: bps,
                    total_interest_mm: result.rows.iter().map(|r| r.modeled_interest_mm).sum(),
                    forecast_interest_mm: result.forecast_interest_mm(),
                    final_liquidity_mm: result.final_state.liquidity.unwrap_or(0.0),
                    metrics: result.error_metrics(MATERIAL_INTEREST_MM),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::StaticMarketData;
    use crate::projection::ModelConfig;
    use crate::reference::{ReferenceTables, ATM_NET_TO_GROSS};

    fn runner() -> ScenarioRunner {
        let tables = ReferenceTables::default_tables(ATM_NET_TO_GROSS).unwrap();
        let model = InterestModel::new(tables, ModelConfig::default()).unwrap();
        ScenarioRunner::new(model, &StaticMarketData::offline()).unwrap()
    }

    #[test]
    fn test_higher_rates_earn_more_forecast_interest() {
        let runner = runner();
        let results = runner.run_rate_shocks(&[-100.0, 0.0, 100.0]).unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].shock_bps, -100.0);
        assert!(results[0].forecast_interest_mm < results[1].forecast_interest_mm);
        assert!(results[1].forecast_interest_mm < results[2].forecast_interest_mm);
        assert!(results[0].final_liquidity_mm < results[2].final_liquidity_mm);
    }

    #[test]
    fn test_zero_shock_matches_base_run() {
        let runner = runner();
        let base = runner.run_base().unwrap();
        let shocked = runner.run_rate_shocks(&[0.0]).unwrap();

        assert!((shocked[0].forecast_interest_mm - base.forecast_interest_mm()).abs() < 1e-12);
    }
}
