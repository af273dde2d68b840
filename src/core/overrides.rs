//! Access to administrator-entered prices.

use crate::core::error::PriceError;
use crate::core::ticker::Ticker;
use async_trait::async_trait;

/// Manual prices keyed by `(competition_id, ticker)`.
///
/// Lookups are a direct read; callers do not cache them. A stored price outranks every
/// provider for that ticker in that competition, whatever date is being asked for.
#[async_trait]
pub trait ManualPriceStore: Send + Sync {
    async fn lookup(&self, competition_id: &str, ticker: &Ticker)
    -> Result<Option<f64>, PriceError>;

    /// Fails with [`PriceError::AlreadyExists`] if the pair is already present.
    async fn insert(&self, competition_id: &str, ticker: &Ticker, price: f64)
    -> Result<(), PriceError>;

    async fn update(&self, competition_id: &str, ticker: &Ticker, price: f64)
    -> Result<(), PriceError>;

    async fn delete(&self, competition_id: &str, ticker: &Ticker) -> Result<bool, PriceError>;
}
