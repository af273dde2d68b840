use crate::core::error::PriceError;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::str::FromStr;

const MAX_TICKER_LEN: usize = 10;

/// Canonical uppercase ticker symbol.
///
/// Construction trims and uppercases the input, so `aapl` and ` AAPL ` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    pub fn parse(raw: &str) -> Result<Self, PriceError> {
        let symbol = raw.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(PriceError::InvalidInput("Ticker is required".to_string()));
        }
        if symbol.len() > MAX_TICKER_LEN {
            return Err(PriceError::InvalidInput(format!(
                "Ticker too long: {symbol}"
            )));
        }
        if !symbol
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
        {
            return Err(PriceError::InvalidInput(format!(
                "Invalid ticker: {symbol}"
            )));
        }
        Ok(Ticker(symbol))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Ticker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Ticker {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ticker::parse(s)
    }
}

impl<'de> Deserialize<'de> for Ticker {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ticker::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticker_is_canonicalized() {
        assert_eq!(Ticker::parse(" aapl ").unwrap().as_str(), "AAPL");
        assert_eq!(Ticker::parse("brk.b").unwrap().as_str(), "BRK.B");
        assert_eq!(Ticker::parse("aapl").unwrap(), Ticker::parse("AAPL").unwrap());
    }

    #[test]
    fn test_invalid_tickers_are_rejected() {
        for raw in ["", "   ", "AA PL", "TOOLONGTICKER", "$AAPL"] {
            assert!(
                matches!(Ticker::parse(raw), Err(PriceError::InvalidInput(_))),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_deserialize_uppercases() {
        let ticker: Ticker = serde_yaml::from_str("msft").unwrap();
        assert_eq!(ticker.as_str(), "MSFT");
        assert!(serde_yaml::from_str::<Ticker>("\"\"").is_err());
    }
}
