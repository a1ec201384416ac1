//! Rate sweep: forecast interest under parallel shifts of the short rate
//!
//! Market data is fetched once; each shock re-runs the quarter fold in
//! parallel on the shared snapshot.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;

use interest_model::reference::ATM_NET_TO_GROSS;
use interest_model::{
    HttpMarketData, InterestModel, MarketData, ModelConfig, ReferenceTables, ScenarioRunner,
    StaticMarketData,
};

#[derive(Debug, Parser)]
#[command(name = "rate_sweep", about = "Forecast interest under rate shocks")]
struct Args {
    /// Parallel shifts in basis points
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_value = "-200,-100,-50,0,50,100,200")]
    shocks: Vec<f64>,

    /// Forecast quarters appended after the last anchor
    #[arg(long, default_value_t = 4)]
    forecast_quarters: u32,

    /// Skip network providers
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 20)]
    timeout_secs: u64,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = ModelConfig {
        forecast_quarters: args.forecast_quarters,
        ..ModelConfig::default()
    };
    let tables = ReferenceTables::default_tables(ATM_NET_TO_GROSS)?;
    let model = InterestModel::new(tables, config)?;

    let source: Box<dyn MarketData> = if args.offline {
        Box::new(StaticMarketData::offline())
    } else {
        Box::new(HttpMarketData::new(Duration::from_secs(args.timeout_secs))?)
    };

    let start = Instant::now();
    let runner = ScenarioRunner::new(model, source.as_ref()).context("loading market data")?;
    println!("Market data loaded in {:?}", start.elapsed());

    let sweep_start = Instant::now();
    let results = runner.run_rate_shocks(&args.shocks)?;
    println!("{} scenarios complete in {:?}\n", results.len(), sweep_start.elapsed());

    println!(
        "{:>8} {:>14} {:>14} {:>14} {:>10}",
        "Shock", "FcstInterest", "TotalInterest", "FinalLiq", "sMAPE%"
    );
    println!("{}", "-".repeat(64));
    for r in &results {
        println!(
            "{:>+8.0} {:>14.2} {:>14.2} {:>14.2} {:>10}",
            r.shock_bps,
            r.forecast_interest_mm,
            r.total_interest_mm,
            r.final_liquidity_mm,
            r.metrics
                .smape
                .map(|v| format!("{:.2}", v * 100.0))
                .unwrap_or_else(|| "-".to_string()),
        );
    }

    Ok(())
}
