//! Interest Model CLI
//!
//! Backtests modeled interest income against reported quarters and
//! forecasts the quarters after the last liquidity anchor

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Parser;
use log::info;

use interest_model::market::{PriceBasis, DEFAULT_OFFLINE_RATE_PCT, DEFAULT_RATE_SERIES};
use interest_model::purchase::{DEFAULT_FALLBACK_TOTAL_MM, DEFAULT_FEE_BPS};
use interest_model::quarters::DEFAULT_QUARTER_DAYS;
use interest_model::reference::ATM_NET_TO_GROSS;
use interest_model::report;
use interest_model::{
    HttpMarketData, InterestModel, MarketData, ModelConfig, PurchaseProgram, ReferenceTables,
    StaticMarketData,
};

/// Quarterly interest income backtest and forecast
#[derive(Debug, Parser)]
#[command(name = "interest_model", version, about)]
struct Cli {
    /// Forecast quarters appended after the last anchor
    #[arg(long, default_value_t = 3)]
    forecast_quarters: u32,

    /// Length of forecast quarters in days
    #[arg(long, default_value_t = DEFAULT_QUARTER_DAYS)]
    quarter_days: u32,

    /// Skip network providers; flat default rate, cash fallback for purchases
    #[arg(long, default_value_t = false)]
    offline: bool,

    /// Directory with reference CSVs (built-in tables when omitted)
    #[arg(long)]
    reference_dir: Option<PathBuf>,

    /// Directory for output files
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Also write one daily CSV per quarter
    #[arg(long, default_value_t = false)]
    daily_detail: bool,

    /// Print result rows as JSON instead of console tables
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Scale applied to gross ATM proceeds
    #[arg(long, default_value_t = ATM_NET_TO_GROSS)]
    atm_net_to_gross: f64,

    /// Short-rate series id
    #[arg(long, default_value = DEFAULT_RATE_SERIES)]
    rate_series: String,

    /// Annual rate (percent) used when no rate data is available
    #[arg(long, default_value_t = DEFAULT_OFFLINE_RATE_PCT)]
    default_rate: f64,

    /// HTTP timeout in seconds
    #[arg(long, default_value_t = 20)]
    timeout_secs: u64,

    /// Disable the asset purchase program
    #[arg(long, default_value_t = false)]
    no_purchases: bool,

    /// Purchase window start (YYYY-MM-DD)
    #[arg(long)]
    purchase_start: Option<NaiveDate>,

    /// Purchase window end (YYYY-MM-DD)
    #[arg(long)]
    purchase_end: Option<NaiveDate>,

    /// Units bought over the whole window
    #[arg(long)]
    purchase_units: Option<f64>,

    /// Execution fee in basis points
    #[arg(long, default_value_t = DEFAULT_FEE_BPS)]
    fee_bps: f64,

    /// Execution price basis: close or hlc3
    #[arg(long, default_value_t = PriceBasis::Close)]
    price_basis: PriceBasis,

    /// Total spend (USD mm) assumed when prices are unavailable
    #[arg(long, default_value_t = DEFAULT_FALLBACK_TOTAL_MM)]
    fallback_total: f64,
}

impl Cli {
    fn purchase_program(&self) -> Option<PurchaseProgram> {
        if self.no_purchases {
            return None;
        }
        let defaults = PurchaseProgram::default_program();
        Some(PurchaseProgram {
            window_start: self.purchase_start.unwrap_or(defaults.window_start),
            window_end: self.purchase_end.unwrap_or(defaults.window_end),
            total_units: self.purchase_units.unwrap_or(defaults.total_units),
            fee_bps: self.fee_bps,
            price_basis: self.price_basis,
            fallback_total_mm: self.fallback_total,
            ..defaults
        })
    }

    fn model_config(&self) -> ModelConfig {
        ModelConfig {
            forecast_quarters: self.forecast_quarters,
            quarter_days: self.quarter_days,
            rate_series_id: self.rate_series.clone(),
            default_rate_pct: self.default_rate,
            purchase: self.purchase_program(),
        }
    }

    fn reference_tables(&self) -> Result<ReferenceTables> {
        match &self.reference_dir {
            Some(dir) => ReferenceTables::from_csv_path(dir, self.atm_net_to_gross)
                .with_context(|| format!("loading reference tables from {}", dir.display())),
            None => ReferenceTables::default_tables(self.atm_net_to_gross)
                .context("building built-in reference tables"),
        }
    }

    fn market_source(&self) -> Result<Box<dyn MarketData>> {
        if self.offline {
            info!("offline mode: no market data providers");
            return Ok(Box::new(StaticMarketData::offline()));
        }
        let client = HttpMarketData::new(Duration::from_secs(self.timeout_secs))
            .context("creating HTTP client")?;
        Ok(Box::new(client))
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let model = InterestModel::new(cli.reference_tables()?, cli.model_config())
        .context("invalid model configuration")?;
    let source = cli.market_source()?;
    let result = model.run(source.as_ref()).context("running interest model")?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result.rows)?);
    } else {
        println!("Interest Model v{}", env!("CARGO_PKG_VERSION"));
        println!("=====================\n");
        report::print_summary(&result);
    }

    let path = report::write_results_csv(&cli.out_dir, &result.rows)
        .with_context(|| format!("writing results to {}", cli.out_dir.display()))?;
    if cli.daily_detail {
        let files = report::write_daily_detail(&cli.out_dir, &result)
            .context("writing daily detail")?;
        info!("wrote {} daily files", files.len());
    }

    if !cli.json {
        println!("\nFull results written to: {}", path.display());
    }
    Ok(())
}
