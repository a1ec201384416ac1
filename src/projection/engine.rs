//! Quarter-by-quarter interest model
//!
//! Fetches market data once, then folds a [`CarryState`] through the quarter
//! frame. Reported quarters land on their liquidity anchor; forecast quarters
//! roll liquidity forward from modeled flows and compound their interest into
//! the next quarter.

use log::{debug, info};

use super::path::{build_daily_path, DailyPath, LiquidityTarget, QuarterInputs};
use super::results::{ResultRow, SimulationResult};
use super::state::CarryState;
use crate::dates::{add_days, sub_days};
use crate::error::{ModelError, Result};
use crate::market::{
    load_price_series, load_prices_at_dates, load_rate_series, MarketData, MarketSnapshot,
    DAYS_PER_YEAR, DEFAULT_OFFLINE_RATE_PCT, DEFAULT_RATE_SERIES,
};
use crate::purchase::{PurchaseProgram, PurchaseSchedule};
use crate::quarters::{Quarter, QuarterFrame, DEFAULT_QUARTER_DAYS};
use crate::reference::ReferenceTables;

/// Days of rate history fetched on each side of the quarter frame
pub const RATE_PADDING_DAYS: u64 = 5;

/// Days of price history fetched on each side of the purchase window
pub const PRICE_PADDING_DAYS: u64 = 3;

/// Configuration for a model run
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Synthetic quarters appended after the last anchor
    pub forecast_quarters: u32,

    /// Length of the first quarter and of every forecast quarter
    pub quarter_days: u32,

    /// Short-rate series requested from the rate provider
    pub rate_series_id: String,

    /// Annual rate (percent) used when the provider has nothing
    pub default_rate_pct: f64,

    /// Asset purchase program, if any
    pub purchase: Option<PurchaseProgram>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            forecast_quarters: 3,
            quarter_days: DEFAULT_QUARTER_DAYS,
            rate_series_id: DEFAULT_RATE_SERIES.to_string(),
            default_rate_pct: DEFAULT_OFFLINE_RATE_PCT,
            purchase: Some(PurchaseProgram::default_program()),
        }
    }
}

/// One quarter's row together with its daily path
#[derive(Debug, Clone)]
pub struct QuarterOutcome {
    pub row: ResultRow,
    pub path: DailyPath,
}

/// Main model
#[derive(Debug, Clone)]
pub struct InterestModel {
    tables: ReferenceTables,
    config: ModelConfig,
}

impl InterestModel {
    /// Create a model, rejecting configurations that can never run
    pub fn new(tables: ReferenceTables, config: ModelConfig) -> Result<Self> {
        if tables.liquidity_anchors.is_empty() {
            return Err(ModelError::EmptyAnchors);
        }
        if config.quarter_days == 0 {
            return Err(ModelError::InvalidQuarterLength);
        }
        if let Some(program) = &config.purchase {
            program.validate()?;
        }
        Ok(Self { tables, config })
    }

    pub fn tables(&self) -> &ReferenceTables {
        &self.tables
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn quarter_frame(&self) -> Result<QuarterFrame> {
        QuarterFrame::build(
            self.tables.anchor_dates(),
            self.config.forecast_quarters,
            self.config.quarter_days,
        )
    }

    /// Fetch everything the frame needs from `source`.
    ///
    /// Provider failures fall back inside the adapters. Scheduled rate moves
    /// are applied here, so an invalid move fails before any quarter runs.
    pub fn load_market(&self, source: &dyn MarketData, frame: &QuarterFrame) -> Result<MarketSnapshot> {
        let (first_start, last_end) = frame.span().ok_or(ModelError::EmptyAnchors)?;

        let rates = load_rate_series(
            source,
            &self.config.rate_series_id,
            sub_days(first_start, RATE_PADDING_DAYS),
            add_days(last_end, RATE_PADDING_DAYS),
            self.config.default_rate_pct,
        )
        .with_adjustments(&self.tables.rate_adjustments)?;

        let (purchase_prices, quarter_end_prices) = match &self.config.purchase {
            Some(program) => (
                load_price_series(
                    source,
                    &program.symbol,
                    sub_days(program.window_start, PRICE_PADDING_DAYS),
                    add_days(program.window_end, PRICE_PADDING_DAYS),
                    program.price_basis,
                ),
                load_prices_at_dates(source, &program.symbol, &frame.ends()),
            ),
            None => (None, Default::default()),
        };

        Ok(MarketSnapshot::new(rates, purchase_prices, quarter_end_prices))
    }

    /// Build the frame, fetch market data and simulate every quarter
    pub fn run(&self, source: &dyn MarketData) -> Result<SimulationResult> {
        let frame = self.quarter_frame()?;
        let market = self.load_market(source, &frame)?;
        self.simulate(&frame, &market)
    }

    /// Fold the carry state through every quarter of `frame`
    pub fn simulate(&self, frame: &QuarterFrame, market: &MarketSnapshot) -> Result<SimulationResult> {
        let (final_state, outcomes) = frame.iter().try_fold(
            (CarryState::default(), Vec::with_capacity(frame.len())),
            |(state, mut outcomes), quarter| {
                let (next, outcome) = self.project_quarter(&state, quarter, market)?;
                outcomes.push(outcome);
                Ok::<_, ModelError>((next, outcomes))
            },
        )?;

        let (rows, daily_paths) = outcomes.into_iter().map(|o| (o.row, o.path)).unzip();
        let result = SimulationResult { rows, daily_paths, final_state };

        info!(
            "simulated {} quarters ({} forecast), forecast interest {:.2}mm",
            result.rows.len(),
            result.forecast_rows().count(),
            result.forecast_interest_mm()
        );
        Ok(result)
    }

    /// Run one quarter from `state`, returning the state for the next one
    pub fn project_quarter(
        &self,
        state: &CarryState,
        quarter: &Quarter,
        market: &MarketSnapshot,
    ) -> Result<(CarryState, QuarterOutcome)> {
        let anchor = self.tables.anchor(quarter.end);
        let target = match anchor {
            Some(value) => LiquidityTarget::Anchored(value),
            None => LiquidityTarget::Forecast,
        };
        let is_forecast = target.is_forecast();

        let purchases = match &self.config.purchase {
            Some(program) => program.schedule(quarter.start, quarter.end, market.purchase_prices.as_ref()),
            None => PurchaseSchedule::default(),
        };

        let inputs = QuarterInputs {
            start: quarter.start,
            end: quarter.end,
            start_liquidity: state.opening_liquidity(anchor),
            target,
            events: self.tables.events_between(quarter.start, quarter.end),
            purchases,
        };
        let path = build_daily_path(&inputs, &market.rates)?;

        let modeled = path.interest;
        let carry = if is_forecast { path.end_liquidity + modeled } else { path.end_liquidity };

        let cash_spent = inputs.purchases.cash_spent();
        let units_executed = inputs.purchases.units_executed();
        let price_begin = state.prev_quarter_end.and_then(|d| market.quarter_end_price(d));
        let price_end = market.quarter_end_price(quarter.end);
        let roll = state.roll_asset(units_executed, cash_spent, price_begin, price_end);

        let days = path.days() as f64;
        let avg_balance = path.average_balance();
        let annualize = |interest: f64| {
            (avg_balance > 0.0 && days > 0.0).then(|| interest / (avg_balance * days) * DAYS_PER_YEAR * 100.0)
        };
        let reported = self.tables.reported(quarter.end);
        let ref_rate = market.rates.mean_rate_pct(quarter.start, quarter.end);
        let modeled_yield = annualize(modeled);
        let reported_yield = reported.and_then(annualize);
        let spread_bps = |y: Option<f64>| y.zip(ref_rate).map(|(y, r)| ((y - r) * 100.0).round());

        let total_drift = path.total_drift();
        let purchase_units_window = match &self.config.purchase {
            Some(program) if program.overlap(quarter.start, quarter.end).is_some() => program.total_units,
            _ => 0.0,
        };

        let row = ResultRow {
            quarter_end: quarter.end,
            fiscal_quarter: quarter.fiscal_quarter(),
            is_forecast,
            days: quarter.days,
            modeled_interest_mm: modeled,
            reported_interest_mm: reported,
            abs_error_mm: reported.map(|r| modeled - r),
            pct_error: reported.filter(|r| *r != 0.0).map(|r| (modeled - r) / r),
            start_liq_mm: path.start_liquidity,
            end_liq_mm: path.end_liquidity,
            events_mm: path.event_total(),
            purchase_units_window,
            purchase_spent_mm: cash_spent,
            purchase_units_executed: units_executed,
            purchase_avg_price_usd: inputs.purchases.average_price_usd(),
            asset_px_qbeg_usd: price_begin,
            asset_px_qend_usd: price_end,
            asset_units_holdings: roll.units_end,
            asset_fair_value_mm: roll.fair_value_end,
            asset_earnings_mm: roll.earnings,
            end_liq_carry_mm: carry,
            total_end_liq_mm: carry + roll.fair_value_end,
            avg_balance_mm: avg_balance,
            implied_ann_yield_modeled_pct: modeled_yield,
            implied_ann_yield_reported_pct: reported_yield,
            ref_ann_yield_pct: ref_rate,
            modeled_minus_ref_bps: spread_bps(modeled_yield),
            reported_minus_ref_bps: spread_bps(reported_yield),
            drift_per_day_mm: path.drift_per_day,
            total_drift_mm: total_drift,
            operating_drift_mm: (!is_forecast).then(|| total_drift - modeled),
            ape: reported.filter(|r| *r != 0.0).map(|r| (modeled - r).abs() / r.abs()),
            smape: reported.and_then(|r| {
                let denom = (modeled.abs() + r.abs()) / 2.0;
                (denom > 0.0).then(|| (modeled - r).abs() / denom)
            }),
        };

        debug!(
            "{} {}: start {:.1} end {:.1} drift/day {:.4} interest {:.2}",
            quarter.end,
            if is_forecast { "forecast" } else { "reported" },
            path.start_liquidity,
            path.end_liquidity,
            path.drift_per_day,
            modeled
        );

        let next = state.advance(carry, &roll, cash_spent, quarter.end);
        Ok((next, QuarterOutcome { row, path }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::{days_inclusive, parse_date};
    use crate::market::StaticMarketData;
    use crate::reference::ATM_NET_TO_GROSS;
    use approx::assert_abs_diff_eq;
    use chrono::NaiveDate;

    fn d(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn model(config: ModelConfig) -> InterestModel {
        let tables = ReferenceTables::default_tables(ATM_NET_TO_GROSS).unwrap();
        InterestModel::new(tables, config).unwrap()
    }

    fn offline_run() -> (InterestModel, SimulationResult) {
        let model = model(ModelConfig::default());
        let result = model.run(&StaticMarketData::offline()).unwrap();
        (model, result)
    }

    #[test]
    fn test_frame_covers_anchors_and_forecasts() {
        let (_, result) = offline_run();
        assert_eq!(result.rows.len(), 16);
        assert_eq!(result.forecast_rows().count(), 3);
        assert_eq!(result.reported_rows().count(), 13);
        assert_eq!(result.rows.len(), result.daily_paths.len());
    }

    #[test]
    fn test_first_quarter_opens_at_its_anchor() {
        let (_, result) = offline_run();
        let first = &result.rows[0];
        assert_eq!(first.start_liq_mm, 1035.0);
        assert_eq!(first.end_liq_mm, 1035.0);
    }

    #[test]
    fn test_reported_quarters_land_on_anchor() {
        let (model, result) = offline_run();
        for (row, path) in result.rows.iter().zip(&result.daily_paths) {
            if let Some(anchor) = model.tables().anchor(row.quarter_end) {
                assert_eq!(row.end_liq_mm, anchor);
                assert_abs_diff_eq!(path.final_balance().unwrap(), anchor, epsilon = 1e-6);
                assert_eq!(row.end_liq_carry_mm, anchor);
            }
        }
    }

    #[test]
    fn test_carry_continuity() {
        let (_, result) = offline_run();
        for pair in result.rows.windows(2) {
            assert_eq!(pair[1].start_liq_mm, pair[0].end_liq_carry_mm);
        }
        let last = result.rows.last().unwrap();
        assert_eq!(result.final_state.liquidity, Some(last.end_liq_carry_mm));
    }

    #[test]
    fn test_forecast_quarters_have_zero_drift_and_compound() {
        let (_, result) = offline_run();
        for (row, path) in result.rows.iter().zip(&result.daily_paths) {
            if !row.is_forecast {
                assert!(row.operating_drift_mm.is_some());
                continue;
            }
            assert_eq!(path.drift_per_day, 0.0);
            assert!(path.rows.iter().all(|r| r.drift == 0.0));
            assert!(row.operating_drift_mm.is_none());
            assert!(row.reported_interest_mm.is_none());

            let flows: f64 = path.rows.iter().map(|r| r.event_flow + r.purchase_flow).sum();
            assert_eq!(row.end_liq_mm, row.start_liq_mm + flows);
            assert_eq!(row.end_liq_carry_mm, row.end_liq_mm + row.modeled_interest_mm);
        }
    }

    #[test]
    fn test_day_count_invariant() {
        let (model, result) = offline_run();
        let frame = model.quarter_frame().unwrap();
        for ((row, path), q) in result.rows.iter().zip(&result.daily_paths).zip(frame.iter()) {
            assert_eq!(path.days() as u32, days_inclusive(q.start, q.end));
            assert_eq!(row.days, q.days);
        }
    }

    #[test]
    fn test_offline_purchases_use_cash_fallback() {
        let (_, result) = offline_run();
        let purchase_quarter = result.rows.iter().find(|r| r.quarter_end == d("2025-08-02")).unwrap();

        assert_eq!(purchase_quarter.purchase_units_window, 4710.0);
        assert_abs_diff_eq!(purchase_quarter.purchase_spent_mm, 510.0 * 1.015, epsilon = 1e-9);
        assert_eq!(purchase_quarter.purchase_units_executed, 0.0);
        assert!(purchase_quarter.purchase_avg_price_usd.is_none());
        assert_eq!(purchase_quarter.asset_fair_value_mm, 0.0);
        assert_abs_diff_eq!(purchase_quarter.events_mm, 2230.0 + 446.6, epsilon = 1e-9);
    }

    #[test]
    fn test_priced_purchases_build_asset_position() {
        let model = model(ModelConfig::default());
        let source = StaticMarketData::offline().with_closes(vec![
            (d("2025-04-25"), 95_000.0),
            (d("2025-05-01"), 100_000.0),
            (d("2025-07-31"), 110_000.0),
            (d("2025-10-30"), 120_000.0),
        ]);
        let result = model.run(&source).unwrap();

        let q = result.rows.iter().find(|r| r.quarter_end == d("2025-08-02")).unwrap();
        assert_abs_diff_eq!(q.purchase_units_executed, 4710.0, epsilon = 1e-6);
        assert_abs_diff_eq!(q.purchase_avg_price_usd.unwrap(), 101_500.0, epsilon = 1e-6);
        assert_eq!(q.asset_px_qend_usd, Some(110_000.0));
        assert_abs_diff_eq!(q.asset_fair_value_mm, 518.1, epsilon = 1e-6);
        assert_abs_diff_eq!(q.asset_earnings_mm, 518.1 - 4710.0 * 101_500.0 / 1e6, epsilon = 1e-6);
        assert_abs_diff_eq!(q.total_end_liq_mm, q.end_liq_carry_mm + q.asset_fair_value_mm, epsilon = 1e-9);

        let next = result.rows.iter().find(|r| r.quarter_end == d("2025-11-01")).unwrap();
        assert_eq!(next.asset_px_qbeg_usd, Some(110_000.0));
        assert_abs_diff_eq!(next.asset_earnings_mm, 4710.0 * 10_000.0 / 1e6, epsilon = 1e-6);
        assert_abs_diff_eq!(result.final_state.asset_cost_basis_mm, 4710.0 * 101_500.0 / 1e6, epsilon = 1e-6);
    }

    #[test]
    fn test_late_price_feed_keeps_earnings_consistent() {
        let model = model(ModelConfig::default());
        let source = StaticMarketData::offline().with_closes(vec![
            (d("2025-05-06"), 100_000.0),
            (d("2025-07-31"), 110_000.0),
        ]);
        let result = model.run(&source).unwrap();

        let q = result.rows.iter().find(|r| r.quarter_end == d("2025-08-02")).unwrap();
        let spent = 4710.0 * 101_500.0 / 1e6;
        assert_abs_diff_eq!(q.purchase_units_executed, 4710.0, epsilon = 1e-6);
        assert_abs_diff_eq!(q.purchase_spent_mm, spent, epsilon = 1e-6);
        assert_abs_diff_eq!(q.purchase_avg_price_usd.unwrap(), 101_500.0, epsilon = 1e-6);
        assert_abs_diff_eq!(q.asset_earnings_mm, 518.1 - spent, epsilon = 1e-6);
    }

    #[test]
    fn test_scheduled_cuts_lower_forecast_rates() {
        let (_, result) = offline_run();
        let path = result.daily_paths.last().unwrap();
        assert!(path.rows.iter().all(|r| (r.rate_pct - 4.5).abs() < 1e-12));
    }

    #[test]
    fn test_conflicting_rate_move_is_fatal() {
        let mut tables = ReferenceTables::default_tables(ATM_NET_TO_GROSS).unwrap();
        tables.rate_adjustments.push(crate::market::RateAdjustment {
            date: d("2025-12-10"),
            delta_bps: Some(-25.0),
            to_pct: Some(3.5),
        });
        let model = InterestModel::new(tables, ModelConfig::default()).unwrap();

        let result = model.run(&StaticMarketData::offline());
        assert!(matches!(result, Err(ModelError::ConflictingRateAdjustment { .. })));
    }

    #[test]
    fn test_empty_anchor_table_is_fatal() {
        let result = InterestModel::new(ReferenceTables::default(), ModelConfig::default());
        assert!(matches!(result, Err(ModelError::EmptyAnchors)));
    }

    #[test]
    fn test_error_metrics_exclude_immaterial_quarters() {
        let (_, result) = offline_run();
        let metrics = result.error_metrics(crate::projection::MATERIAL_INTEREST_MM);

        assert_eq!(metrics.compared_quarters, 13);
        // 0.7, 0.3, 3.7 and 4.8 fall below the 5mm threshold
        assert_eq!(metrics.material_quarters, 9);
        assert!(metrics.mape_material.unwrap() >= 0.0);
    }
}
