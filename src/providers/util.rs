use crate::core::error::PriceError;
use crate::core::price::ProviderKind;
use crate::core::ticker::Ticker;
use chrono::{DateTime, Days, NaiveDate, NaiveTime};
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = concat!("stockpick/", env!("CARGO_PKG_VERSION"));

/// Days of history requested when looking up a price on or before a date.
pub const LOOKBACK_DAYS: u64 = 365;

/// Builds the HTTP client shared by an adapter. Every request is bounded by `timeout`.
pub fn build_client(timeout: Duration) -> Result<Client, PriceError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| PriceError::NotConfigured(format!("Failed to build HTTP client: {e}")))
}

/// Issues a GET and returns the body, mapping transport and status failures to typed errors.
///
/// 429 becomes [`PriceError::RateLimited`], 404 [`PriceError::UnknownSymbol`] and any other
/// non-2xx status [`PriceError::UpstreamUnavailable`].
pub async fn get_text(
    client: &Client,
    url: &str,
    provider: ProviderKind,
    ticker: &Ticker,
) -> Result<String, PriceError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| PriceError::upstream(ticker.as_str(), format!("Request error: {e}")))?;

    let status = response.status();
    debug!("{} responded {} for {}", provider, status, ticker);
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            return Err(PriceError::RateLimited {
                provider: provider.to_string(),
                ticker: ticker.to_string(),
            });
        }
        StatusCode::NOT_FOUND => return Err(PriceError::UnknownSymbol(ticker.to_string())),
        s if !s.is_success() => {
            return Err(PriceError::upstream(
                ticker.as_str(),
                format!("HTTP error: {s}"),
            ));
        }
        _ => {}
    }

    response
        .text()
        .await
        .map_err(|e| PriceError::upstream(ticker.as_str(), format!("Failed to read body: {e}")))
}

pub fn parse_json<T: serde::de::DeserializeOwned>(
    text: &str,
    ticker: &Ticker,
) -> Result<T, PriceError> {
    serde_json::from_str(text).map_err(|e| {
        PriceError::upstream(
            ticker.as_str(),
            format!("Failed to parse JSON response: {e}"),
        )
    })
}

/// Epoch-second window `[date - LOOKBACK_DAYS, end of date]` in UTC.
pub fn lookback_window(date: NaiveDate) -> (i64, i64) {
    let start = date.checked_sub_days(Days::new(LOOKBACK_DAYS)).unwrap_or(date);
    let end = date.checked_add_days(Days::new(1)).unwrap_or(date);
    (
        start.and_time(NaiveTime::MIN).and_utc().timestamp(),
        end.and_time(NaiveTime::MIN).and_utc().timestamp() - 1,
    )
}

/// UTC calendar date of an epoch-second timestamp.
pub fn utc_date(timestamp: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn t(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    #[test]
    fn test_lookback_window_covers_whole_target_day() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 15).unwrap();
        let (start, end) = lookback_window(date);

        assert_eq!(utc_date(start), NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(utc_date(end), Some(date));
        assert_eq!(utc_date(end + 1), NaiveDate::from_ymd_opt(2026, 1, 16));
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let mock_server = MockServer::start().await;
        for (status, route) in [(429, "/limited"), (404, "/missing"), (503, "/down")] {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(ResponseTemplate::new(status))
                .mount(&mock_server)
                .await;
        }
        let client = build_client(Duration::from_secs(5)).unwrap();
        let url = |route: &str| format!("{}{}", mock_server.uri(), route);

        let err = get_text(&client, &url("/limited"), ProviderKind::YahooFinance, &t("AAPL"))
            .await
            .unwrap_err();
        assert!(matches!(err, PriceError::RateLimited { .. }));

        let err = get_text(&client, &url("/missing"), ProviderKind::YahooFinance, &t("AAPL"))
            .await
            .unwrap_err();
        assert_eq!(err, PriceError::UnknownSymbol("AAPL".to_string()));

        let err = get_text(&client, &url("/down"), ProviderKind::YahooFinance, &t("AAPL"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Upstream unavailable for AAPL: HTTP error: 503 Service Unavailable"
        );
    }
}
