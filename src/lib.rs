//! Interest Model - Quarterly interest income reconciliation and forecast
//!
//! This library provides:
//! - Quarter frames built from reported liquidity anchors plus forecast quarters
//! - Daily ACT/365 accrual on a balance path reconciled to each anchor
//! - Compounding carry through forecast quarters
//! - An asset purchase program with mark-to-market roll-forward
//! - Short-rate and price adapters with offline fallbacks
//! - Rate-shock scenario sweeps

pub mod dates;
pub mod error;
pub mod market;
pub mod projection;
pub mod purchase;
pub mod quarters;
pub mod reference;
pub mod report;
pub mod scenario;

// Re-export commonly used types
pub use error::{ModelError, Result};
pub use market::{HttpMarketData, MarketData, MarketSnapshot, StaticMarketData};
pub use projection::{InterestModel, ModelConfig, ResultRow, SimulationResult};
pub use purchase::PurchaseProgram;
pub use quarters::{Quarter, QuarterFrame};
pub use reference::ReferenceTables;
pub use scenario::ScenarioRunner;
