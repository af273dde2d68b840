//! Typed errors surfaced by providers, the resolver and the override store.

use chrono::NaiveDate;
use thiserror::Error;

/// Errors raised while resolving a price.
///
/// Every variant is cheap to clone so a failed resolution can be reported per position
/// without losing the original reason.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PriceError {
    /// Empty ticker, unparsable date or similar caller mistakes.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Non-2xx status, timeout, transport failure or malformed payload.
    #[error("Upstream unavailable for {ticker}: {reason}")]
    UpstreamUnavailable { ticker: String, reason: String },

    /// The upstream explicitly signalled a rate limit.
    #[error("Rate limited by {provider} while fetching {ticker}. Please try again in a moment.")]
    RateLimited { provider: String, ticker: String },

    /// The ticker is valid but the series has nothing on or before the requested date.
    #[error("No price data available for {ticker} on or before {date}")]
    NoDataForDate { ticker: String, date: NaiveDate },

    /// The upstream does not know the symbol.
    #[error("Unknown symbol: {0}")]
    UnknownSymbol(String),

    /// A source produced a zero, negative or non-finite price.
    #[error("Invalid price {price} for {ticker}")]
    InvalidPrice { ticker: String, price: f64 },

    /// Missing credentials or missing competition setup.
    #[error("Not configured: {0}")]
    NotConfigured(String),

    /// A manual price already exists for this competition and ticker.
    #[error("Price for {ticker} already exists in competition {competition_id}. Use update to modify.")]
    AlreadyExists {
        competition_id: String,
        ticker: String,
    },
}

impl PriceError {
    pub fn upstream(ticker: &str, reason: impl ToString) -> Self {
        PriceError::UpstreamUnavailable {
            ticker: ticker.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Systemic errors make every valuation in the pass impossible.
    pub fn is_systemic(&self) -> bool {
        matches!(self, PriceError::NotConfigured(_))
    }

    /// HTTP-style status used by the price response payload.
    pub fn status_code(&self) -> u16 {
        match self {
            PriceError::InvalidInput(_) => 400,
            PriceError::AlreadyExists { .. } => 409,
            _ => 500,
        }
    }
}

/// Errors raised when recording a stock pick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PickError {
    #[error("You can only pick {0} stocks")]
    TooManyPicks(usize),

    #[error("You already picked {0}")]
    DuplicateTicker(String),

    #[error("Could not resolve entry price: {0}")]
    Price(#[from] PriceError),
}
