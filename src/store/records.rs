//! In-memory stand-ins for the competition's record store.

use crate::core::error::PriceError;
use crate::core::holding::{Participant, ParticipantStore};
use crate::core::overrides::ManualPriceStore;
use crate::core::ticker::Ticker;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

fn check_price(ticker: &Ticker, price: f64) -> Result<(), PriceError> {
    if !price.is_finite() || price <= 0.0 {
        return Err(PriceError::InvalidPrice {
            ticker: ticker.to_string(),
            price,
        });
    }
    Ok(())
}

/// Manual prices unique per `(competition_id, ticker)`.
#[derive(Default)]
pub struct InMemoryManualPrices {
    prices: RwLock<HashMap<(String, Ticker), f64>>,
}

impl InMemoryManualPrices {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ManualPriceStore for InMemoryManualPrices {
    async fn lookup(
        &self,
        competition_id: &str,
        ticker: &Ticker,
    ) -> Result<Option<f64>, PriceError> {
        let prices = self.prices.read().await;
        Ok(prices
            .get(&(competition_id.to_string(), ticker.clone()))
            .copied())
    }

    async fn insert(
        &self,
        competition_id: &str,
        ticker: &Ticker,
        price: f64,
    ) -> Result<(), PriceError> {
        check_price(ticker, price)?;
        let mut prices = self.prices.write().await;
        let key = (competition_id.to_string(), ticker.clone());
        if prices.contains_key(&key) {
            return Err(PriceError::AlreadyExists {
                competition_id: competition_id.to_string(),
                ticker: ticker.to_string(),
            });
        }
        debug!("Manual price INSERT {competition_id}/{ticker}: {price}");
        prices.insert(key, price);
        Ok(())
    }

    async fn update(
        &self,
        competition_id: &str,
        ticker: &Ticker,
        price: f64,
    ) -> Result<(), PriceError> {
        check_price(ticker, price)?;
        let mut prices = self.prices.write().await;
        match prices.get_mut(&(competition_id.to_string(), ticker.clone())) {
            Some(existing) => {
                debug!("Manual price UPDATE {competition_id}/{ticker}: {price}");
                *existing = price;
                Ok(())
            }
            None => Err(PriceError::InvalidInput(format!(
                "No manual price for {ticker} in competition {competition_id}"
            ))),
        }
    }

    async fn delete(&self, competition_id: &str, ticker: &Ticker) -> Result<bool, PriceError> {
        let mut prices = self.prices.write().await;
        Ok(prices
            .remove(&(competition_id.to_string(), ticker.clone()))
            .is_some())
    }
}

/// Participants grouped by competition.
#[derive(Default)]
pub struct InMemoryParticipants {
    by_competition: RwLock<HashMap<String, Vec<Participant>>>,
}

impl InMemoryParticipants {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add(&self, competition_id: &str, participant: Participant) {
        self.by_competition
            .write()
            .await
            .entry(competition_id.to_string())
            .or_default()
            .push(participant);
    }
}

#[async_trait]
impl ParticipantStore for InMemoryParticipants {
    async fn participants(&self, competition_id: &str) -> Result<Vec<Participant>, PriceError> {
        Ok(self
            .by_competition
            .read()
            .await
            .get(competition_id)
            .cloned()
            .unwrap_or_default())
    }
}
