//! Error type shared by the library

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised by the interest model.
///
/// Configuration variants are fatal and abort a run. Market data failures are
/// normally absorbed at the adapter boundary and only surface from the raw
/// [`MarketData`](crate::market::MarketData) implementations.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("liquidity anchor table is empty, cannot place the first quarter")]
    EmptyAnchors,

    #[error("quarter length must be at least one day")]
    InvalidQuarterLength,

    #[error("quarter ends {end} before it starts {start}")]
    InvalidQuarterRange { start: NaiveDate, end: NaiveDate },

    #[error("rate adjustment on {date} sets both an absolute level and a bps delta")]
    ConflictingRateAdjustment { date: NaiveDate },

    #[error("rate adjustment on {date} sets neither an absolute level nor a bps delta")]
    EmptyRateAdjustment { date: NaiveDate },

    #[error("purchase window ends {end} before it starts {start}")]
    InvalidPurchaseWindow { start: NaiveDate, end: NaiveDate },

    #[error("no rate available for {date}")]
    MissingRate { date: NaiveDate },

    #[error("invalid date '{value}': {source}")]
    DateParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("invalid reference data: {0}")]
    InvalidReference(String),

    #[error("market data unavailable: {0}")]
    MarketData(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
