//! HTTP market data: FRED for rates, Yahoo chart API for prices

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, NaiveDate};
use log::debug;
use reqwest::blocking::Client;
use serde::Deserialize;

use super::{DailyBar, MarketData};
use crate::dates::add_days;
use crate::error::{ModelError, Result};

const FRED_GRAPH_URL: &str = "https://fred.stlouisfed.org/graph/fredgraph.csv";
const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const USER_AGENT: &str = "Mozilla/5.0 (compatible; interest_model/0.1)";

/// Live provider over blocking HTTP.
///
/// One request per fetch, no retries.
#[derive(Debug, Clone)]
pub struct HttpMarketData {
    client: Client,
    fred_url: String,
    yahoo_url: String,
}

impl HttpMarketData {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            fred_url: FRED_GRAPH_URL.to_string(),
            yahoo_url: YAHOO_CHART_URL.to_string(),
        })
    }

    fn get_text(&self, url: &str, query: &[(&str, String)]) -> Result<String> {
        debug!("GET {url} {query:?}");
        let response = self.client.get(url).query(query).send()?.error_for_status()?;
        Ok(response.text()?)
    }
}

impl MarketData for HttpMarketData {
    fn fetch_rate_series(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, f64>> {
        let body = self.get_text(
            &self.fred_url,
            &[
                ("id", series_id.to_string()),
                ("cosd", start.to_string()),
                ("coed", end.to_string()),
            ],
        )?;
        let observations = parse_fred_csv(&body)?;
        Ok(observations.into_iter().filter(|(d, _)| *d >= start && *d <= end).collect())
    }

    fn fetch_price_series(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<BTreeMap<NaiveDate, DailyBar>> {
        let period1 = start.and_hms_opt(0, 0, 0).map(|t| t.and_utc().timestamp()).unwrap_or_default();
        let period2 = add_days(end, 1)
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc().timestamp())
            .unwrap_or_default();

        let body = self.get_text(
            &format!("{}/{symbol}", self.yahoo_url),
            &[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
            ],
        )?;
        let bars = parse_yahoo_chart(&body)?;
        Ok(bars.into_iter().filter(|(d, _)| *d >= start && *d <= end).collect())
    }
}

/// Parse a FRED graph CSV (`date,value` with `.` for missing values)
pub(crate) fn parse_fred_csv(body: &str) -> Result<BTreeMap<NaiveDate, f64>> {
    let mut reader = csv::Reader::from_reader(body.as_bytes());
    let mut observations = BTreeMap::new();

    for record in reader.records() {
        let record = record?;
        let (Some(date), Some(value)) = (record.get(0), record.get(1)) else {
            continue;
        };
        let Ok(date) = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d") else {
            continue;
        };
        if let Ok(value) = value.trim().parse::<f64>() {
            observations.insert(date, value);
        }
    }

    Ok(observations)
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteColumns>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteColumns {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
}

/// Parse a Yahoo v8 chart response into daily bars keyed by UTC date.
/// Days without a close are skipped.
pub(crate) fn parse_yahoo_chart(body: &str) -> Result<BTreeMap<NaiveDate, DailyBar>> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;

    if let Some(err) = envelope.chart.error {
        return Err(ModelError::MarketData(format!("{}: {}", err.code, err.description)));
    }

    let result = envelope
        .chart
        .result
        .and_then(|mut r| if r.is_empty() { None } else { Some(r.swap_remove(0)) })
        .ok_or_else(|| ModelError::MarketData("chart response has no result".to_string()))?;
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();

    let mut bars = BTreeMap::new();
    for (i, ts) in result.timestamp.iter().enumerate() {
        let Some(date) = DateTime::from_timestamp(*ts, 0).map(|t| t.date_naive()) else {
            continue;
        };
        let Some(close) = quote.close.get(i).copied().flatten() else {
            continue;
        };
        bars.insert(
            date,
            DailyBar {
                close,
                high: quote.high.get(i).copied().flatten(),
                low: quote.low.get(i).copied().flatten(),
            },
        );
    }

    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dates::parse_date;

    #[test]
    fn test_parse_fred_csv_skips_missing() {
        let body = "observation_date,DGS3MO\n2025-01-02,4.34\n2025-01-03,.\n2025-01-06,4.33\n";
        let obs = parse_fred_csv(body).unwrap();

        assert_eq!(obs.len(), 2);
        assert_eq!(obs[&parse_date("2025-01-06").unwrap()], 4.33);
    }

    #[test]
    fn test_parse_yahoo_chart() {
        let body = r#"{"chart":{"result":[{"timestamp":[1746316800,1746403200,1746489600],
            "indicators":{"quote":[{"close":[95000.0,null,94000.0],
            "high":[96000.0,null,95000.0],"low":[94000.0,null,93000.0]}]}}],"error":null}}"#;
        let bars = parse_yahoo_chart(body).unwrap();

        assert_eq!(bars.len(), 2);
        let first = bars[&parse_date("2025-05-04").unwrap()];
        assert_eq!(first.close, 95000.0);
        assert_eq!(first.high, Some(96000.0));
        assert!(!bars.contains_key(&parse_date("2025-05-05").unwrap()));
    }

    #[test]
    fn test_parse_yahoo_error() {
        let body = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        assert!(matches!(parse_yahoo_chart(body), Err(ModelError::MarketData(_))));
    }
}
