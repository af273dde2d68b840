//! Pricing abstractions and core types

use crate::core::error::PriceError;
use crate::core::ticker::Ticker;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

/// Closed set of upstream market-data sources a competition can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    AlphaVantage,
    YahooFinance,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::AlphaVantage => "alpha_vantage",
            ProviderKind::YahooFinance => "yahoo_finance",
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "alpha_vantage" => Ok(ProviderKind::AlphaVantage),
            "yahoo_finance" => Ok(ProviderKind::YahooFinance),
            _ => Err(PriceError::InvalidInput(format!(
                "Unknown price provider: {s}"
            ))),
        }
    }
}

/// Where a resolved price came from.
///
/// Serialized as a flat string: `"manual"` or the provider name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum PriceSource {
    Manual,
    Provider(ProviderKind),
}

impl Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceSource::Manual => f.write_str("manual"),
            PriceSource::Provider(kind) => write!(f, "{kind}"),
        }
    }
}

impl FromStr for PriceSource {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("manual") {
            return Ok(PriceSource::Manual);
        }
        s.parse().map(PriceSource::Provider)
    }
}

impl From<PriceSource> for String {
    fn from(source: PriceSource) -> String {
        source.to_string()
    }
}

impl TryFrom<String> for PriceSource {
    type Error = PriceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub price: f64,
    /// Date of the data point for historical lookups, `None` for current prices.
    pub as_of: Option<NaiveDate>,
    pub source: PriceSource,
}

impl PriceQuote {
    /// Builds a quote, rejecting prices that must never reach valuation math.
    pub fn validated(
        ticker: &Ticker,
        price: f64,
        as_of: Option<NaiveDate>,
        source: PriceSource,
    ) -> Result<Self, PriceError> {
        if !price.is_finite() || price <= 0.0 {
            return Err(PriceError::InvalidPrice {
                ticker: ticker.to_string(),
                price,
            });
        }
        Ok(PriceQuote {
            price,
            as_of,
            source,
        })
    }
}

#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Waits until the provider may take another request.
    ///
    /// Callers await this before the timed part of each request, so queueing behind a
    /// rate limit never counts against the request timeout.
    async fn wait_turn(&self) {}

    async fn current_price(&self, ticker: &Ticker) -> Result<PriceQuote, PriceError>;

    /// Latest data point dated on or before `date`.
    async fn price_on_or_before(
        &self,
        ticker: &Ticker,
        date: NaiveDate,
    ) -> Result<PriceQuote, PriceError>;
}

/// Picks the latest `(date, price)` pair dated on or before `date`.
///
/// The series may be in any order; points after `date` are never selected.
pub fn latest_on_or_before<I>(series: I, date: NaiveDate) -> Option<(NaiveDate, f64)>
where
    I: IntoIterator<Item = (NaiveDate, f64)>,
{
    series
        .into_iter()
        .filter(|(point_date, _)| *point_date <= date)
        .max_by_key(|(point_date, _)| *point_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    #[test]
    fn test_latest_on_or_before_picks_previous_point() {
        let series = vec![(d(1, 1), 100.0), (d(1, 10), 110.0), (d(2, 1), 120.0)];
        assert_eq!(
            latest_on_or_before(series.clone(), d(1, 15)),
            Some((d(1, 10), 110.0))
        );
        assert_eq!(
            latest_on_or_before(series.clone(), d(2, 1)),
            Some((d(2, 1), 120.0))
        );
        assert_eq!(latest_on_or_before(series, d(12, 31)), Some((d(2, 1), 120.0)));
    }

    #[test]
    fn test_latest_on_or_before_never_returns_future_point() {
        let series = vec![(d(2, 1), 120.0), (d(1, 10), 110.0)];
        assert_eq!(latest_on_or_before(series, d(1, 5)), None);
    }

    #[test]
    fn test_validated_rejects_non_positive() {
        let ticker = Ticker::parse("AAPL").unwrap();
        let source = PriceSource::Provider(ProviderKind::YahooFinance);
        for price in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                PriceQuote::validated(&ticker, price, None, source),
                Err(PriceError::InvalidPrice { .. })
            ));
        }
        assert!(PriceQuote::validated(&ticker, 1.5, None, source).is_ok());
    }

    #[test]
    fn test_provider_kind_round_trip_names() {
        assert_eq!(
            "yahoo_finance".parse::<ProviderKind>().unwrap(),
            ProviderKind::YahooFinance
        );
        assert_eq!(ProviderKind::AlphaVantage.to_string(), "alpha_vantage");
        assert_eq!(PriceSource::Manual.to_string(), "manual");
        assert!("bloomberg".parse::<ProviderKind>().is_err());
        assert_eq!(
            "manual".parse::<PriceSource>().unwrap(),
            PriceSource::Manual
        );
        assert!("bloomberg".parse::<PriceSource>().is_err());
    }
}
