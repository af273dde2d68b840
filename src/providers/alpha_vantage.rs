use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::util::{build_client, get_text, parse_json};
use crate::core::error::PriceError;
use crate::core::price::{PriceProvider, PriceQuote, PriceSource, ProviderKind, latest_on_or_before};
use crate::core::ticker::Ticker;

pub const DEFAULT_BASE_URL: &str = "https://www.alphavantage.co";
pub const API_KEY_ENV: &str = "ALPHA_VANTAGE_API_KEY";

/// Global-quote and daily-series source. Requires an API key.
pub struct AlphaVantageProvider {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

/// Fields every Alpha Vantage payload may carry instead of data.
#[derive(Deserialize, Debug, Default)]
struct Envelope {
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
    #[serde(rename = "Error Message")]
    error_message: Option<String>,
}

#[derive(Deserialize, Debug)]
struct GlobalQuoteResponse {
    #[serde(flatten)]
    envelope: Envelope,
    #[serde(rename = "Global Quote")]
    global_quote: Option<GlobalQuote>,
}

#[derive(Deserialize, Debug)]
struct GlobalQuote {
    #[serde(rename = "05. price")]
    price: Option<String>,
}

#[derive(Deserialize, Debug)]
struct DailySeriesResponse {
    #[serde(flatten)]
    envelope: Envelope,
    #[serde(rename = "Time Series (Daily)")]
    series: Option<HashMap<String, DailyBar>>,
}

#[derive(Deserialize, Debug)]
struct DailyBar {
    #[serde(rename = "4. close")]
    close: String,
}

impl Envelope {
    fn check(&self, ticker: &Ticker) -> Result<(), PriceError> {
        if let Some(message) = self.note.as_ref().or(self.information.as_ref()) {
            warn!("Alpha Vantage rate limit: {}", message);
            return Err(PriceError::RateLimited {
                provider: ProviderKind::AlphaVantage.to_string(),
                ticker: ticker.to_string(),
            });
        }
        if let Some(message) = &self.error_message {
            debug!("Alpha Vantage error for {}: {}", ticker, message);
            return Err(PriceError::UnknownSymbol(ticker.to_string()));
        }
        Ok(())
    }
}

fn parse_price(ticker: &Ticker, raw: &str) -> Result<f64, PriceError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|e| PriceError::upstream(ticker.as_str(), format!("Invalid price '{raw}': {e}")))
}

impl AlphaVantageProvider {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> Result<Self, PriceError> {
        Ok(AlphaVantageProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            client: build_client(timeout)?,
        })
    }

    fn api_key(&self) -> Result<&str, PriceError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| PriceError::NotConfigured("API key not configured".to_string()))
    }

    async fn query(&self, function: &str, ticker: &Ticker) -> Result<String, PriceError> {
        let url = format!(
            "{}/query?function={}&symbol={}&apikey={}",
            self.base_url,
            function,
            ticker.as_str(),
            self.api_key()?
        );
        debug!("Requesting {} for {}", function, ticker);
        get_text(&self.client, &url, ProviderKind::AlphaVantage, ticker).await
    }
}

#[async_trait]
impl PriceProvider for AlphaVantageProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::AlphaVantage
    }

    #[instrument(name = "AlphaVantageCurrentPrice", skip(self, ticker), fields(symbol = %ticker))]
    async fn current_price(&self, ticker: &Ticker) -> Result<PriceQuote, PriceError> {
        let text = self.query("GLOBAL_QUOTE", ticker).await?;
        let data: GlobalQuoteResponse = parse_json(&text, ticker)?;
        data.envelope.check(ticker)?;

        // An unknown symbol comes back as an empty "Global Quote" object
        let raw = data
            .global_quote
            .and_then(|q| q.price)
            .ok_or_else(|| PriceError::UnknownSymbol(ticker.to_string()))?;

        Ok(PriceQuote {
            price: parse_price(ticker, &raw)?,
            as_of: None,
            source: PriceSource::Provider(ProviderKind::AlphaVantage),
        })
    }

    #[instrument(name = "AlphaVantageHistoricalPrice", skip(self, ticker), fields(symbol = %ticker))]
    async fn price_on_or_before(
        &self,
        ticker: &Ticker,
        date: NaiveDate,
    ) -> Result<PriceQuote, PriceError> {
        let text = self.query("TIME_SERIES_DAILY", ticker).await?;
        let data: DailySeriesResponse = parse_json(&text, ticker)?;
        data.envelope.check(ticker)?;

        let series = data.series.ok_or_else(|| {
            PriceError::upstream(ticker.as_str(), "No time series in response")
        })?;

        let mut points = Vec::with_capacity(series.len());
        for (day, bar) in &series {
            let Ok(day) = NaiveDate::parse_from_str(day, "%Y-%m-%d") else {
                warn!("Skipping unparsable date '{}' for {}", day, ticker);
                continue;
            };
            points.push((day, parse_price(ticker, &bar.close)?));
        }

        let (as_of, price) =
            latest_on_or_before(points, date).ok_or_else(|| PriceError::NoDataForDate {
                ticker: ticker.to_string(),
                date,
            })?;

        Ok(PriceQuote {
            price,
            as_of: Some(as_of),
            source: PriceSource::Provider(ProviderKind::AlphaVantage),
        })
    }
}
