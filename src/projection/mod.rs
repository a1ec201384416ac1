//! Quarterly interest projection: daily path reconciliation and the quarter fold

mod engine;
mod path;
mod results;
mod state;

pub use engine::{InterestModel, ModelConfig, QuarterOutcome, PRICE_PADDING_DAYS, RATE_PADDING_DAYS};
pub use path::{build_daily_path, DailyPath, DailyRow, LiquidityTarget, QuarterInputs};
pub use results::{ErrorMetrics, ResultRow, SimulationResult, MATERIAL_INTEREST_MM};
pub use state::{AssetRoll, CarryState};
