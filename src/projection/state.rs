//! Carry state threaded from one quarter to the next

use chrono::NaiveDate;

/// Values carried across the quarter boundary.
///
/// This is the only state that crosses quarters; the quarter loop folds it
/// forward one quarter at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CarryState {
    /// Liquidity carried into the next quarter, USD millions.
    /// `None` before the first quarter has been processed.
    pub liquidity: Option<f64>,

    /// Purchased asset units held at the end of the prior quarter
    pub asset_units: f64,

    /// Cumulative cash spent on asset purchases, USD millions
    pub asset_cost_basis_mm: f64,

    /// End date of the prior quarter
    pub prev_quarter_end: Option<NaiveDate>,
}

impl CarryState {
    /// Opening liquidity for the next quarter.
    ///
    /// The very first quarter opens at its own anchor when one exists,
    /// otherwise at zero.
    pub fn opening_liquidity(&self, first_quarter_anchor: Option<f64>) -> f64 {
        self.liquidity.unwrap_or_else(|| first_quarter_anchor.unwrap_or(0.0))
    }

    /// Mark-to-market roll of the asset position over one quarter
    pub fn roll_asset(
        &self,
        units_bought: f64,
        cash_spent_mm: f64,
        price_begin: Option<f64>,
        price_end: Option<f64>,
    ) -> AssetRoll {
        let units_begin = self.asset_units;
        let units_end = units_begin + units_bought;
        let fair_value_begin = fair_value_mm(units_begin, price_begin);
        let fair_value_end = fair_value_mm(units_end, price_end);

        AssetRoll {
            units_begin,
            units_end,
            fair_value_begin,
            fair_value_end,
            earnings: fair_value_end - (fair_value_begin + cash_spent_mm),
        }
    }

    /// State handed to the next quarter
    pub fn advance(&self, carry: f64, roll: &AssetRoll, cash_spent_mm: f64, quarter_end: NaiveDate) -> Self {
        Self {
            liquidity: Some(carry),
            asset_units: roll.units_end,
            asset_cost_basis_mm: self.asset_cost_basis_mm + cash_spent_mm,
            prev_quarter_end: Some(quarter_end),
        }
    }
}

/// Asset position over one quarter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssetRoll {
    pub units_begin: f64,
    pub units_end: f64,
    /// USD millions, zero when no units or no price
    pub fair_value_begin: f64,
    pub fair_value_end: f64,
    /// Fair value change net of new capital deployed, USD millions
    pub earnings: f64,
}

fn fair_value_mm(units: f64, price: Option<f64>) -> f64 {
    match price {
        Some(px) if units > 0.0 && px.is_finite() => units * px / 1_000_000.0,
        _ => 0.0,
    }
}
