use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::util::{get_text, lookback_window, parse_json, utc_date};
use crate::core::error::PriceError;
use crate::core::price::{PriceProvider, PriceQuote, PriceSource, ProviderKind, latest_on_or_before};
use crate::core::ticker::Ticker;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Daily-bar chart source. Not throttled.
pub struct YahooFinanceProvider {
    base_url: String,
    client: Client,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PriceError> {
        Ok(YahooFinanceProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: super::util::build_client(timeout)?,
        })
    }

    async fn fetch_chart(&self, ticker: &Ticker, query: &str) -> Result<PriceChartItem, PriceError> {
        let url = format!(
            "{}/v8/finance/chart/{}?{}",
            self.base_url,
            ticker.as_str(),
            query
        );
        debug!("Requesting price data from {}", url);

        let text = get_text(&self.client, &url, ProviderKind::YahooFinance, ticker).await?;
        let data: YahooPriceResponse = parse_json(&text, ticker)?;

        if let Some(error) = data.chart.error {
            return Err(match error.code.as_str() {
                "Not Found" => PriceError::UnknownSymbol(ticker.to_string()),
                _ => PriceError::upstream(
                    ticker.as_str(),
                    format!("{}: {}", error.code, error.description.unwrap_or_default()),
                ),
            });
        }

        data.chart
            .result
            .and_then(|items| items.into_iter().next())
            .ok_or_else(|| PriceError::UnknownSymbol(ticker.to_string()))
    }
}

#[derive(Deserialize, Debug)]
struct YahooPriceResponse {
    chart: PriceChartResult,
}

#[derive(Deserialize, Debug)]
struct PriceChartResult {
    result: Option<Vec<PriceChartItem>>,
    error: Option<ChartError>,
}

#[derive(Deserialize, Debug)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

#[derive(Deserialize, Debug)]
struct PriceChartItem {
    meta: Option<PriceChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct PriceChartMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: Option<f64>,
}

impl PriceChartItem {
    /// Dated closes, skipping bars without a close.
    fn daily_closes(&self) -> Vec<(NaiveDate, f64)> {
        let (Some(timestamps), Some(closes)) = (
            self.timestamp.as_ref(),
            self.indicators
                .as_ref()
                .and_then(|inds| inds.quote.first())
                .and_then(|q| q.close.as_ref()),
        ) else {
            return Vec::new();
        };

        timestamps
            .iter()
            .zip(closes)
            .filter_map(|(ts, close)| Some((utc_date(*ts)?, (*close)?)))
            .collect()
    }
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::YahooFinance
    }

    #[instrument(name = "YahooCurrentPrice", skip(self, ticker), fields(symbol = %ticker))]
    async fn current_price(&self, ticker: &Ticker) -> Result<PriceQuote, PriceError> {
        let item = self.fetch_chart(ticker, "interval=1d&range=1d").await?;

        let price = item
            .daily_closes()
            .last()
            .map(|(_, close)| *close)
            .or_else(|| item.meta.as_ref().and_then(|m| m.regular_market_price))
            .ok_or_else(|| PriceError::upstream(ticker.as_str(), "No price data in response"))?;

        Ok(PriceQuote {
            price,
            as_of: None,
            source: PriceSource::Provider(ProviderKind::YahooFinance),
        })
    }

    #[instrument(name = "YahooHistoricalPrice", skip(self, ticker), fields(symbol = %ticker))]
    async fn price_on_or_before(
        &self,
        ticker: &Ticker,
        date: NaiveDate,
    ) -> Result<PriceQuote, PriceError> {
        let (period1, period2) = lookback_window(date);
        let query = format!("interval=1d&period1={period1}&period2={period2}");
        let item = self.fetch_chart(ticker, &query).await?;

        let (as_of, price) = latest_on_or_before(item.daily_closes(), date).ok_or_else(|| {
            PriceError::NoDataForDate {
                ticker: ticker.to_string(),
                date,
            }
        })?;
        debug!("Found close {} on {} for {}", price, as_of, ticker);

        Ok(PriceQuote {
            price,
            as_of: Some(as_of),
            source: PriceSource::Provider(ProviderKind::YahooFinance),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone, Utc};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn t(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    // Market close, 21:00 UTC
    fn close_ts(date: NaiveDate) -> i64 {
        Utc.from_utc_datetime(&date.and_time(NaiveTime::from_hms_opt(21, 0, 0).unwrap()))
            .timestamp()
    }

    fn chart_body(bars: &[(NaiveDate, Option<f64>)], market_price: f64) -> String {
        let timestamps: Vec<String> = bars.iter().map(|(d, _)| close_ts(*d).to_string()).collect();
        let closes: Vec<String> = bars
            .iter()
            .map(|(_, c)| c.map_or("null".to_string(), |v| v.to_string()))
            .collect();
        format!(
            r#"{{
                "chart": {{
                    "result": [{{
                        "meta": {{ "regularMarketPrice": {market_price}, "currency": "USD" }},
                        "timestamp": [{}],
                        "indicators": {{ "quote": [{{ "close": [{}] }}] }}
                    }}],
                    "error": null
                }}
            }}"#,
            timestamps.join(","),
            closes.join(",")
        )
    }

    pub async fn create_mock_server(symbol: &str, mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v8/finance/chart/{symbol}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn provider(mock_server: &MockServer) -> YahooFinanceProvider {
        YahooFinanceProvider::new(&mock_server.uri(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_current_price_is_last_non_null_close() {
        let body = chart_body(&[(d(3, 2), Some(187.5)), (d(3, 3), None)], 190.0);
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("range", "1d"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let quote = provider(&mock_server).current_price(&t("aapl")).await.unwrap();
        assert_eq!(quote.price, 187.5);
        assert_eq!(quote.as_of, None);
        assert_eq!(
            quote.source,
            PriceSource::Provider(ProviderKind::YahooFinance)
        );
    }

    #[tokio::test]
    async fn test_current_price_falls_back_to_market_price() {
        let body = r#"{"chart": {"result": [{"meta": {"regularMarketPrice": 150.65}}], "error": null}}"#;
        let mock_server = create_mock_server("AAPL", body).await;

        let quote = provider(&mock_server).current_price(&t("AAPL")).await.unwrap();
        assert_eq!(quote.price, 150.65);
    }

    #[tokio::test]
    async fn test_price_on_or_before_picks_latest_bar() {
        let body = chart_body(
            &[
                (d(1, 2), Some(100.0)),
                (d(1, 9), Some(110.0)),
                (d(1, 12), None),
                (d(2, 2), Some(120.0)),
            ],
            120.0,
        );
        let mock_server = MockServer::start().await;
        let (period1, period2) = lookback_window(d(1, 15));
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .and(query_param("period1", period1.to_string()))
            .and(query_param("period2", period2.to_string()))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;

        let quote = provider(&mock_server)
            .price_on_or_before(&t("AAPL"), d(1, 15))
            .await
            .unwrap();
        assert_eq!(quote.price, 110.0);
        assert_eq!(quote.as_of, Some(d(1, 9)));
    }

    #[tokio::test]
    async fn test_target_day_bar_is_included() {
        let body = chart_body(&[(d(1, 14), Some(99.0)), (d(1, 15), Some(101.0))], 101.0);
        let mock_server = create_mock_server("MSFT", &body).await;

        let quote = provider(&mock_server)
            .price_on_or_before(&t("MSFT"), d(1, 15))
            .await
            .unwrap();
        assert_eq!(quote.price, 101.0);
        assert_eq!(quote.as_of, Some(d(1, 15)));
    }

    #[tokio::test]
    async fn test_no_bar_on_or_before_date() {
        let body = chart_body(&[(d(2, 2), Some(120.0))], 120.0);
        let mock_server = create_mock_server("AAPL", &body).await;

        let err = provider(&mock_server)
            .price_on_or_before(&t("AAPL"), d(1, 15))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "No price data available for AAPL on or before 2026-01-15"
        );
    }

    #[tokio::test]
    async fn test_unknown_symbol() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#;
        let mock_server = create_mock_server("NOPE", body).await;

        let err = provider(&mock_server).current_price(&t("NOPE")).await.unwrap_err();
        assert_eq!(err, PriceError::UnknownSymbol("NOPE".to_string()));

        let mock_server = create_mock_server("GONE", r#"{"chart": {"result": []}}"#).await;
        let err = provider(&mock_server).current_price(&t("GONE")).await.unwrap_err();
        assert_eq!(err, PriceError::UnknownSymbol("GONE".to_string()));
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = create_mock_server("AAPL", r#"{"chart": "oops"}"#).await;

        let err = provider(&mock_server).current_price(&t("AAPL")).await.unwrap_err();
        assert!(matches!(err, PriceError::UpstreamUnavailable { .. }));
        assert!(err.to_string().contains("Failed to parse JSON response"));
    }

    #[tokio::test]
    async fn test_server_error_and_rate_limit() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/AAPL"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/TSLA"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;
        let provider = provider(&mock_server);

        let err = provider.current_price(&t("AAPL")).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Upstream unavailable for AAPL: HTTP error: 500 Internal Server Error"
        );
        let err = provider.current_price(&t("TSLA")).await.unwrap_err();
        assert!(matches!(err, PriceError::RateLimited { .. }));
    }
}
