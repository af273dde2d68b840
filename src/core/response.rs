//! JSON payload returned to price lookups.

use crate::core::error::PriceError;
use crate::core::price::{PriceQuote, PriceSource};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Either a resolved price or an error message.
///
/// A historical quote carries the date of the data point used, which may precede the
/// requested date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceResponse {
    Price {
        price: f64,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        date: Option<NaiveDate>,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        source: Option<PriceSource>,
    },
    Error {
        error: String,
    },
}

impl PriceResponse {
    pub fn from_result(result: &Result<PriceQuote, PriceError>) -> Self {
        match result {
            Ok(quote) => PriceResponse::Price {
                price: quote.price,
                date: quote.as_of,
                source: Some(quote.source),
            },
            Err(e) => PriceResponse::Error {
                error: e.to_string(),
            },
        }
    }

    /// 200 for a price, otherwise the error's status.
    pub fn status_for(result: &Result<PriceQuote, PriceError>) -> u16 {
        match result {
            Ok(_) => 200,
            Err(e) => e.status_code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::ProviderKind;
    use serde_json::json;

    #[test]
    fn test_historical_price_payload() {
        let result = Ok(PriceQuote {
            price: 110.0,
            as_of: NaiveDate::from_ymd_opt(2026, 1, 10),
            source: PriceSource::Provider(ProviderKind::YahooFinance),
        });
        let body = serde_json::to_value(PriceResponse::from_result(&result)).unwrap();

        assert_eq!(
            body,
            json!({"price": 110.0, "date": "2026-01-10", "source": "yahoo_finance"})
        );
        assert!(body["source"].is_string());
        assert_eq!(PriceResponse::status_for(&result), 200);
    }

    #[test]
    fn test_manual_current_price_payload() {
        let result = Ok(PriceQuote {
            price: 150.0,
            as_of: None,
            source: PriceSource::Manual,
        });
        let body = serde_json::to_value(PriceResponse::from_result(&result)).unwrap();
        assert_eq!(body, json!({"price": 150.0, "source": "manual"}));
    }

    #[test]
    fn test_price_payload_reads_back() {
        let body = r#"{"price": 231.45, "source": "alpha_vantage"}"#;
        let response: PriceResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            response,
            PriceResponse::Price {
                price: 231.45,
                date: None,
                source: Some(PriceSource::Provider(ProviderKind::AlphaVantage)),
            }
        );
    }

    #[test]
    fn test_error_payload_and_status() {
        let invalid: Result<PriceQuote, PriceError> =
            Err(PriceError::InvalidInput("Ticker is required".to_string()));
        assert_eq!(
            serde_json::to_value(PriceResponse::from_result(&invalid)).unwrap(),
            json!({"error": "Invalid input: Ticker is required"})
        );
        assert_eq!(PriceResponse::status_for(&invalid), 400);

        let upstream: Result<PriceQuote, PriceError> =
            Err(PriceError::upstream("AAPL", "HTTP error: 503"));
        assert_eq!(PriceResponse::status_for(&upstream), 500);
    }
}
