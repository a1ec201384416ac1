//! Reference tables: liquidity anchors, reported interest, dated capital flows
//! and scheduled rate moves
//!
//! Values are USD millions. Anchors are cash & cash equivalents plus
//! marketable securities at each reported quarter end.

pub mod loader;

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::parse_date;
use crate::error::Result;
use crate::market::RateAdjustment;

pub use loader::DEFAULT_REFERENCE_PATH;

/// Scale applied to gross ATM proceeds to approximate net proceeds
pub const ATM_NET_TO_GROSS: f64 = 0.995;

/// A one-day capital flow. Positive = cash in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatedEvent {
    pub date: NaiveDate,
    pub amount: f64,
    pub label: String,
}

impl DatedEvent {
    pub fn new(date: NaiveDate, amount: f64, label: impl Into<String>) -> Self {
        Self { date, amount, label: label.into() }
    }
}

/// Injectable reference data for a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceTables {
    /// Quarter end -> known liquidity total. A quarter end without an entry
    /// is a forecast quarter.
    pub liquidity_anchors: BTreeMap<NaiveDate, f64>,
    /// Quarter end -> reported interest income (positive = income)
    pub reported_interest: BTreeMap<NaiveDate, f64>,
    /// Dated capital flows, sorted by date
    pub dated_events: Vec<DatedEvent>,
    /// Scheduled future policy moves
    pub rate_adjustments: Vec<RateAdjustment>,
}

impl ReferenceTables {
    pub fn new(
        liquidity_anchors: BTreeMap<NaiveDate, f64>,
        reported_interest: BTreeMap<NaiveDate, f64>,
        mut dated_events: Vec<DatedEvent>,
        rate_adjustments: Vec<RateAdjustment>,
    ) -> Self {
        dated_events.sort_by_key(|e| e.date);
        Self {
            liquidity_anchors,
            reported_interest,
            dated_events,
            rate_adjustments,
        }
    }

    /// Built-in tables from filings through the quarter ended 2025-05-03.
    ///
    /// Gross ATM proceeds are scaled by `net_to_gross`.
    pub fn default_tables(net_to_gross: f64) -> Result<Self> {
        let anchors = [
            ("2022-04-30", 1035.0),
            ("2022-07-30", 908.9),
            ("2022-10-29", 1042.1),
            ("2023-01-28", 1390.6),
            ("2023-04-29", 1310.1),
            ("2023-07-29", 1194.7),
            ("2023-10-28", 1209.5),
            ("2024-02-03", 1199.3),
            ("2024-05-04", 1082.9),
            ("2024-08-03", 4204.2),
            ("2024-11-02", 4616.2),
            ("2025-02-01", 4774.9),
            ("2025-05-03", 6385.8),
        ];

        let reported = [
            ("2022-04-30", 0.7),
            ("2022-07-30", 0.3),
            ("2022-10-29", 3.7),
            // FY22 total 9.5 less Q1-Q3
            ("2023-01-28", 4.8),
            ("2023-04-29", 9.7),
            ("2023-07-29", 11.6),
            ("2023-10-28", 12.9),
            // 14-week quarter
            ("2024-02-03", 15.3),
            ("2024-05-04", 14.9),
            ("2024-08-03", 39.5),
            ("2024-11-02", 54.2),
            ("2025-02-01", 54.8),
            ("2025-05-03", 56.9),
        ];

        let events = [
            ("2024-05-24", 933.4 * net_to_gross, "ATM (45M shares) gross~net"),
            ("2024-06-11", 2137.0 * net_to_gross, "ATM (75M shares) gross~net"),
            ("2024-09-23", 398.1, "ATM (20M shares) net per 10-Q"),
            ("2025-04-01", 1480.7, "Convertible notes 2030 (net)"),
            ("2025-06-17", 2230.0, "Convertible notes 2032 (net est.)"),
            ("2025-06-24", 446.6, "Convertible notes 2032 greenshoe (net per 8-K)"),
        ];

        let adjustments = vec![
            RateAdjustment::delta(parse_date("2025-09-17")?, -25.0),
            RateAdjustment::delta(parse_date("2025-10-29")?, -25.0),
        ];

        Ok(Self::new(
            parse_table(&anchors)?,
            parse_table(&reported)?,
            events
                .iter()
                .map(|(date, amount, label)| Ok(DatedEvent::new(parse_date(date)?, *amount, *label)))
                .collect::<Result<Vec<_>>>()?,
            adjustments,
        ))
    }

    /// Load tables from CSV files in `path`
    pub fn from_csv_path(path: &Path, net_to_gross: f64) -> Result<Self> {
        let loaded = loader::LoadedReference::load_from(path, net_to_gross)?;
        Ok(Self::new(
            loaded.liquidity_anchors,
            loaded.reported_interest,
            loaded.dated_events,
            loaded.rate_adjustments,
        ))
    }

    pub fn anchor(&self, quarter_end: NaiveDate) -> Option<f64> {
        self.liquidity_anchors.get(&quarter_end).copied()
    }

    pub fn reported(&self, quarter_end: NaiveDate) -> Option<f64> {
        self.reported_interest.get(&quarter_end).copied()
    }

    pub fn anchor_dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.liquidity_anchors.keys().copied()
    }

    /// Events dated within `[start, end]`
    pub fn events_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<DatedEvent> {
        self.dated_events
            .iter()
            .filter(|e| start <= e.date && e.date <= end)
            .cloned()
            .collect()
    }
}

fn parse_table(rows: &[(&str, f64)]) -> Result<BTreeMap<NaiveDate, f64>> {
    rows.iter()
        .map(|(date, value)| Ok((parse_date(date)?, *value)))
        .collect()
}
