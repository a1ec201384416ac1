//! Output artifacts: results CSV, per-quarter daily CSVs and console tables

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::info;

use crate::error::Result;
use crate::projection::{DailyPath, ResultRow, SimulationResult, MATERIAL_INTEREST_MM};

/// Results file written to the output directory
pub const RESULTS_FILE: &str = "interest_backtest_results.csv";

/// Reported quarters shown in the console yield table
pub const RECENT_REPORTED_QUARTERS: usize = 8;

/// Write one row per quarter to `out_dir/interest_backtest_results.csv`
pub fn write_results_csv(out_dir: &Path, rows: &[ResultRow]) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let path = out_dir.join(RESULTS_FILE);

    let mut writer = csv::Writer::from_path(&path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!("wrote {} quarters to {}", rows.len(), path.display());
    Ok(path)
}

pub fn daily_file_name(quarter_end: NaiveDate) -> String {
    format!("quarter_{quarter_end}_daily.csv")
}

/// Write the daily path of one quarter
pub fn write_daily_csv(out_dir: &Path, quarter_end: NaiveDate, path: &DailyPath) -> Result<PathBuf> {
    fs::create_dir_all(out_dir)?;
    let file = out_dir.join(daily_file_name(quarter_end));

    let mut writer = csv::Writer::from_path(&file)?;
    for row in &path.rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(file)
}

/// Write every quarter's daily path, returning the files written
pub fn write_daily_detail(out_dir: &Path, result: &SimulationResult) -> Result<Vec<PathBuf>> {
    result
        .rows
        .iter()
        .zip(&result.daily_paths)
        .map(|(row, path)| write_daily_csv(out_dir, row.quarter_end, path))
        .collect()
}

/// Print error metrics and yield tables to stdout
pub fn print_summary(result: &SimulationResult) {
    let metrics = result.error_metrics(MATERIAL_INTEREST_MM);

    println!("Backtest Summary");
    println!("================");
    match metrics.mape_material {
        Some(mape) => println!(
            "  MAPE (|reported| >= {:.0}mm, {} quarters): {:.2}%",
            MATERIAL_INTEREST_MM,
            metrics.material_quarters,
            mape * 100.0
        ),
        None => println!("  MAPE: n/a (no material reported quarters)"),
    }
    match metrics.smape {
        Some(smape) => println!("  sMAPE ({} quarters): {:.2}%", metrics.compared_quarters, smape * 100.0),
        None => println!("  sMAPE: n/a"),
    }

    let reported: Vec<&ResultRow> = result.reported_rows().collect();
    let recent = &reported[reported.len().saturating_sub(RECENT_REPORTED_QUARTERS)..];
    println!("\nImplied yields, last {} reported quarters:", recent.len());
    print_yield_header(true);
    for row in recent {
        print_yield_row(row, true);
    }

    let forecasts: Vec<&ResultRow> = result.forecast_rows().collect();
    if !forecasts.is_empty() {
        println!("\nForecast quarters:");
        print_yield_header(false);
        for row in &forecasts {
            print_yield_row(row, false);
        }
        println!(
            "  Forecast interest total: {:.2}mm, ending liquidity {:.2}mm",
            result.forecast_interest_mm(),
            forecasts.last().map(|r| r.total_end_liq_mm).unwrap_or(0.0)
        );
    }
}

fn print_yield_header(with_reported: bool) {
    if with_reported {
        println!(
            "{:>10} {:>3} {:>10} {:>10} {:>9} {:>9} {:>8} {:>8} {:>8}",
            "QtrEnd", "FQ", "AvgBal", "Modeled", "Reported", "ModYld%", "RepYld%", "Ref%", "Rep-Ref"
        );
        println!("{}", "-".repeat(86));
    } else {
        println!(
            "{:>10} {:>3} {:>10} {:>10} {:>9} {:>8} {:>8} {:>10}",
            "QtrEnd", "FQ", "AvgBal", "Modeled", "ModYld%", "Ref%", "Mod-Ref", "Carry"
        );
        println!("{}", "-".repeat(78));
    }
}

fn print_yield_row(row: &ResultRow, with_reported: bool) {
    if with_reported {
        println!(
            "{:>10} {:>3} {:>10.1} {:>10.2} {:>9} {:>9} {:>8} {:>8} {:>8}",
            row.quarter_end,
            row.fiscal_quarter,
            row.avg_balance_mm,
            row.modeled_interest_mm,
            fmt_opt(row.reported_interest_mm, 2),
            fmt_opt(row.implied_ann_yield_modeled_pct, 2),
            fmt_opt(row.implied_ann_yield_reported_pct, 2),
            fmt_opt(row.ref_ann_yield_pct, 2),
            fmt_opt(row.reported_minus_ref_bps, 0),
        );
    } else {
        println!(
            "{:>10} {:>3} {:>10.1} {:>10.2} {:>9} {:>8} {:>8} {:>10.1}",
            row.quarter_end,
            row.fiscal_quarter,
            row.avg_balance_mm,
            row.modeled_interest_mm,
            fmt_opt(row.implied_ann_yield_modeled_pct, 2),
            fmt_opt(row.ref_ann_yield_pct, 2),
            fmt_opt(row.modeled_minus_ref_bps, 0),
            row.end_liq_carry_mm,
        );
    }
}

fn fmt_opt(value: Option<f64>, places: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format!("{v:.places$}"),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::StaticMarketData;
    use crate::projection::{InterestModel, ModelConfig};
    use crate::reference::{ReferenceTables, ATM_NET_TO_GROSS};

    fn offline_result() -> SimulationResult {
        let tables = ReferenceTables::default_tables(ATM_NET_TO_GROSS).unwrap();
        let model = InterestModel::new(tables, ModelConfig::default()).unwrap();
        model.run(&StaticMarketData::offline()).unwrap()
    }

    #[test]
    fn test_results_csv_has_one_row_per_quarter() {
        let result = offline_result();
        let dir = tempfile::tempdir().unwrap();

        let path = write_results_csv(dir.path(), &result.rows).unwrap();
        assert!(path.ends_with(RESULTS_FILE));

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "quarter_end");
        assert!(headers.iter().any(|h| h == "operating_drift_mm"));

        let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(records.len(), result.rows.len());

        let drift_col = headers.iter().position(|h| h == "operating_drift_mm").unwrap();
        let reported_col = headers.iter().position(|h| h == "reported_interest_mm").unwrap();
        let last = records.last().unwrap();
        assert_eq!(&last[drift_col], "");
        assert_eq!(&last[reported_col], "");
        assert_eq!(&records[0][reported_col], "0.7");
    }

    #[test]
    fn test_money_columns_are_rounded() {
        let result = offline_result();
        let dir = tempfile::tempdir().unwrap();
        let path = write_results_csv(dir.path(), &result.rows).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        let col = headers.iter().position(|h| h == "modeled_interest_mm").unwrap();
        for record in reader.records() {
            let record = record.unwrap();
            let decimals = record[col].split('.').nth(1).map(str::len).unwrap_or(0);
            assert!(decimals <= 2, "unrounded value {}", &record[col]);
        }
    }

    #[test]
    fn test_daily_detail_files() {
        let result = offline_result();
        let dir = tempfile::tempdir().unwrap();

        let files = write_daily_detail(dir.path(), &result).unwrap();
        assert_eq!(files.len(), result.rows.len());

        let last_row = result.rows.last().unwrap();
        let expected = dir.path().join(daily_file_name(last_row.quarter_end));
        let mut reader = csv::Reader::from_path(expected).unwrap();
        assert_eq!(reader.records().count(), last_row.days as usize);
    }

    #[test]
    fn test_daily_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 2).unwrap();
        assert_eq!(daily_file_name(date), "quarter_2025-08-02_daily.csv");
    }
}
