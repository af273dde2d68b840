//! Participants and their stock picks.

use crate::core::competition::CompetitionContext;
use crate::core::error::{PickError, PriceError};
use crate::core::price::PriceSource;
use crate::core::resolver::PriceResolver;
use crate::core::ticker::Ticker;
use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Fixed amount every pick invests, in currency units.
pub const PICK_ALLOCATION: f64 = 1000.0;

/// Most picks a participant may hold in one competition.
pub const MAX_PICKS: usize = 10;

/// Decimal places kept for share quantities.
pub const QUANTITY_DP: u32 = 4;

/// Shares bought by one allocation at `entry_price`, rounded half away from zero.
pub fn quantity_for(ticker: &Ticker, entry_price: f64) -> Result<f64, PriceError> {
    let invalid = || PriceError::InvalidPrice {
        ticker: ticker.to_string(),
        price: entry_price,
    };
    if !entry_price.is_finite() || entry_price <= 0.0 {
        return Err(invalid());
    }
    let price = Decimal::from_f64(entry_price).ok_or_else(invalid)?;
    Decimal::from(PICK_ALLOCATION as i64)
        .checked_div(price)
        .map(|q| q.round_dp_with_strategy(QUANTITY_DP, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|q| q.to_f64())
        .filter(|q| *q > 0.0)
        .ok_or_else(invalid)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Holding {
    pub ticker: Ticker,
    pub entry_price: f64,
    pub quantity: f64,
}

impl Holding {
    pub fn new(ticker: Ticker, entry_price: f64) -> Result<Self, PriceError> {
        let quantity = quantity_for(&ticker, entry_price)?;
        Ok(Holding {
            ticker,
            entry_price,
            quantity,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub holdings: Vec<Holding>,
}

impl Participant {
    pub fn new(id: &str, display_name: &str) -> Self {
        Participant {
            id: id.to_string(),
            display_name: display_name.to_string(),
            holdings: Vec::new(),
        }
    }

    /// Checks the pick limit and duplicate rule without touching any price source.
    pub fn check_can_pick(&self, ticker: &Ticker) -> Result<(), PickError> {
        if self.holdings.len() >= MAX_PICKS {
            return Err(PickError::TooManyPicks(MAX_PICKS));
        }
        if self.holdings.iter().any(|h| &h.ticker == ticker) {
            return Err(PickError::DuplicateTicker(ticker.to_string()));
        }
        Ok(())
    }

    pub fn add_holding(&mut self, holding: Holding) -> Result<(), PickError> {
        self.check_can_pick(&holding.ticker)?;
        self.holdings.push(holding);
        Ok(())
    }

    /// Records a pick at the competition's entry-price date.
    ///
    /// The caller persists the returned holding; its entry price is never re-resolved.
    pub async fn pick(
        &mut self,
        ctx: &CompetitionContext,
        resolver: &PriceResolver,
        raw_ticker: &str,
    ) -> Result<(Holding, PriceSource), PickError> {
        let ticker = Ticker::parse(raw_ticker)?;
        self.check_can_pick(&ticker)?;

        let quote = resolver
            .resolve_as_of(ctx, ticker.as_str(), ctx.entry_price_date)
            .await?;
        let holding = Holding::new(ticker, quote.price)?;
        info!(
            participant = %self.id,
            ticker = %holding.ticker,
            entry_price = holding.entry_price,
            quantity = holding.quantity,
            source = %quote.source,
            "Recorded pick"
        );
        self.add_holding(holding.clone())?;
        Ok((holding, quote.source))
    }
}

/// Read access to the participants of a competition.
#[async_trait]
pub trait ParticipantStore: Send + Sync {
    async fn participants(&self, competition_id: &str) -> Result<Vec<Participant>, PriceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> Ticker {
        Ticker::parse(s).unwrap()
    }

    #[test]
    fn test_quantity_rounding() {
        assert_eq!(quantity_for(&t("AAPL"), 150.0).unwrap(), 6.6667);
        assert_eq!(quantity_for(&t("MSFT"), 400.0).unwrap(), 2.5);
        assert_eq!(quantity_for(&t("X"), 3.0).unwrap(), 333.3333);
    }

    #[test]
    fn test_quantity_rejects_invalid_price() {
        assert!(matches!(
            quantity_for(&t("AAPL"), 0.0),
            Err(PriceError::InvalidPrice { .. })
        ));
        assert!(quantity_for(&t("AAPL"), -10.0).is_err());
    }

    #[test]
    fn test_pick_limit_and_duplicates() {
        let mut participant = Participant::new("p1", "Alice");
        for symbol in ["A", "B", "C", "D", "E", "F", "G", "H", "I", "J"] {
            participant
                .add_holding(Holding::new(t(symbol), 10.0).unwrap())
                .unwrap();
        }
        assert_eq!(
            participant.add_holding(Holding::new(t("K"), 10.0).unwrap()),
            Err(PickError::TooManyPicks(MAX_PICKS))
        );

        let mut participant = Participant::new("p2", "Bob");
        participant
            .add_holding(Holding::new(t("aapl"), 150.0).unwrap())
            .unwrap();
        assert_eq!(
            participant.check_can_pick(&t("AAPL")),
            Err(PickError::DuplicateTicker("AAPL".to_string()))
        );
    }

    #[tokio::test]
    async fn test_pick_uses_entry_date_price() {
        use crate::core::competition::test_context;
        use crate::core::overrides::ManualPriceStore;
        use crate::core::price::ProviderKind;
        use crate::core::resolver::tests::StubProvider;
        use crate::store::memory::MemoryCache;
        use crate::store::records::InMemoryManualPrices;
        use chrono::NaiveDate;
        use std::sync::Arc;

        let ctx = test_context(ProviderKind::YahooFinance);
        let mut stub = StubProvider::new(ProviderKind::YahooFinance);
        stub.series.insert(
            "AAPL".to_string(),
            vec![
                (NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(), 150.0),
                (NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(), 170.0),
            ],
        );
        let overrides = Arc::new(InMemoryManualPrices::new());
        overrides.insert(&ctx.id, &t("TSLA"), 250.0).await.unwrap();
        let resolver = PriceResolver::new(overrides, Arc::new(MemoryCache::new()))
            .with_provider(Arc::new(stub));

        let mut participant = Participant::new("p1", "Alice");
        let (holding, source) = participant.pick(&ctx, &resolver, "aapl").await.unwrap();
        assert_eq!(holding.entry_price, 150.0);
        assert_eq!(holding.quantity, 6.6667);
        assert_eq!(source, PriceSource::Provider(ProviderKind::YahooFinance));

        let (holding, source) = participant.pick(&ctx, &resolver, "TSLA").await.unwrap();
        assert_eq!(holding.entry_price, 250.0);
        assert_eq!(holding.quantity, 4.0);
        assert_eq!(source, PriceSource::Manual);

        assert_eq!(
            participant.pick(&ctx, &resolver, "AAPL").await,
            Err(PickError::DuplicateTicker("AAPL".to_string()))
        );
        assert!(matches!(
            participant.pick(&ctx, &resolver, "MSFT").await,
            Err(PickError::Price(PriceError::NoDataForDate { .. }))
        ));
        assert_eq!(participant.holdings.len(), 2);
    }
}
