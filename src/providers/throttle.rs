use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

use crate::core::error::PriceError;
use crate::core::price::{PriceProvider, PriceQuote, ProviderKind};
use crate::core::ticker::Ticker;

/// Alpha Vantage's free tier allows 5 calls per minute.
pub const ALPHA_VANTAGE_MIN_INTERVAL: Duration = Duration::from_secs(12);

/// Spaces the starts of calls to an inner provider at least `min_interval` apart.
///
/// The spacing is enforced in [`PriceProvider::wait_turn`], which callers await before each
/// request; the fetch methods themselves go straight to the inner provider.
pub struct ThrottledProvider<P> {
    inner: P,
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl<P: PriceProvider> ThrottledProvider<P> {
    pub fn new(inner: P, min_interval: Duration) -> Self {
        ThrottledProvider {
            inner,
            min_interval,
            last_call: Mutex::new(None),
        }
    }
}

#[async_trait]
impl<P: PriceProvider> PriceProvider for ThrottledProvider<P> {
    fn kind(&self) -> ProviderKind {
        self.inner.kind()
    }

    // The lock is held across the sleep so waiters queue in arrival order
    async fn wait_turn(&self) {
        let mut last_call = self.last_call.lock().await;
        if let Some(last) = *last_call {
            let ready_at = last + self.min_interval;
            if ready_at > Instant::now() {
                debug!(
                    "Throttling {} for {:?}",
                    self.inner.kind(),
                    ready_at - Instant::now()
                );
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_call = Some(Instant::now());
        drop(last_call);
        self.inner.wait_turn().await;
    }

    async fn current_price(&self, ticker: &Ticker) -> Result<PriceQuote, PriceError> {
        self.inner.current_price(ticker).await
    }

    async fn price_on_or_before(
        &self,
        ticker: &Ticker,
        date: NaiveDate,
    ) -> Result<PriceQuote, PriceError> {
        self.inner.price_on_or_before(ticker, date).await
    }
}
