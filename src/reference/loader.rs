//! CSV-based reference table loader
//!
//! Loads reference data from CSV files in data/reference/

use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use chrono::NaiveDate;
use log::info;
use serde::Deserialize;

use super::DatedEvent;
use crate::error::{ModelError, Result};
use crate::market::RateAdjustment;

/// Default path to the reference directory
pub const DEFAULT_REFERENCE_PATH: &str = "data/reference";

#[derive(Debug, Deserialize)]
struct AnchorRow {
    quarter_end: NaiveDate,
    liquidity_mm: f64,
}

#[derive(Debug, Deserialize)]
struct ReportedRow {
    quarter_end: NaiveDate,
    interest_mm: f64,
}

#[derive(Debug, Deserialize)]
struct EventRow {
    date: NaiveDate,
    amount_mm: f64,
    label: String,
    /// `gross` amounts are scaled to net; anything else is taken as net
    #[serde(default)]
    basis: Option<String>,
}

/// Load quarter-end liquidity anchors
/// Returns BTreeMap<quarter_end, liquidity_mm>
pub fn load_liquidity_anchors(path: &Path) -> Result<BTreeMap<NaiveDate, f64>> {
    let file = File::open(path.join("liquidity_anchors.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut anchors = BTreeMap::new();
    for result in reader.deserialize() {
        let row: AnchorRow = result?;
        if anchors.insert(row.quarter_end, row.liquidity_mm).is_some() {
            return Err(ModelError::InvalidReference(format!(
                "duplicate liquidity anchor for {}",
                row.quarter_end
            )));
        }
    }

    Ok(anchors)
}

/// Load reported quarterly interest income
pub fn load_reported_interest(path: &Path) -> Result<BTreeMap<NaiveDate, f64>> {
    let file = File::open(path.join("reported_interest.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut reported = BTreeMap::new();
    for result in reader.deserialize() {
        let row: ReportedRow = result?;
        reported.insert(row.quarter_end, row.interest_mm);
    }

    Ok(reported)
}

/// Load dated capital flows, scaling gross amounts by `net_to_gross`
pub fn load_dated_events(path: &Path, net_to_gross: f64) -> Result<Vec<DatedEvent>> {
    let file = File::open(path.join("dated_events.csv"))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut events = Vec::new();
    for result in reader.deserialize() {
        let row: EventRow = result?;
        let is_gross = row
            .basis
            .as_deref()
            .is_some_and(|b| b.trim().eq_ignore_ascii_case("gross"));
        let amount = if is_gross { row.amount_mm * net_to_gross } else { row.amount_mm };
        events.push(DatedEvent::new(row.date, amount, row.label));
    }

    Ok(events)
}

/// Load scheduled rate moves. A missing file means no moves.
pub fn load_rate_adjustments(path: &Path) -> Result<Vec<RateAdjustment>> {
    let file_path = path.join("rate_events.csv");
    if !file_path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = csv::Reader::from_path(file_path)?;
    let mut adjustments = Vec::new();
    for result in reader.deserialize() {
        let row: RateAdjustment = result?;
        adjustments.push(row);
    }

    Ok(adjustments)
}

/// All reference tables from one directory
pub struct LoadedReference {
    pub liquidity_anchors: BTreeMap<NaiveDate, f64>,
    pub reported_interest: BTreeMap<NaiveDate, f64>,
    pub dated_events: Vec<DatedEvent>,
    pub rate_adjustments: Vec<RateAdjustment>,
}

impl LoadedReference {
    /// Load all tables from the default path
    pub fn load_default(net_to_gross: f64) -> Result<Self> {
        Self::load_from(Path::new(DEFAULT_REFERENCE_PATH), net_to_gross)
    }

    /// Load all tables from a specific path
    pub fn load_from(path: &Path, net_to_gross: f64) -> Result<Self> {
        let loaded = Self {
            liquidity_anchors: load_liquidity_anchors(path)?,
            reported_interest: load_reported_interest(path)?,
            dated_events: load_dated_events(path, net_to_gross)?,
            rate_adjustments: load_rate_adjustments(path)?,
        };
        info!(
            "loaded {} anchors, {} reported quarters, {} events, {} rate moves from {}",
            loaded.liquidity_anchors.len(),
            loaded.reported_interest.len(),
            loaded.dated_events.len(),
            loaded.rate_adjustments.len(),
            path.display()
        );
        Ok(loaded)
    }
}
