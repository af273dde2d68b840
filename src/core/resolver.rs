//! Mediates manual overrides, the quote cache and the active provider into one price.

use crate::core::cache::{CURRENT_PRICE_TTL, Cache, QuoteKey};
use crate::core::competition::CompetitionContext;
use crate::core::error::PriceError;
use crate::core::overrides::ManualPriceStore;
use crate::core::price::{PriceProvider, PriceQuote, PriceSource, ProviderKind};
use crate::core::ticker::Ticker;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// How long a resolved quote may be served from cache.
    pub ttl: Duration,
    /// Upper bound on a single provider call, excluding time queued behind a rate limit.
    pub timeout: Duration,
    /// Simultaneous provider calls issued by [`PriceResolver::resolve_many`].
    pub concurrency: usize,
    /// Whether manual prices also short-circuit current-price lookups.
    pub overrides_apply_to_current: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        ResolverOptions {
            ttl: CURRENT_PRICE_TTL,
            timeout: Duration::from_secs(10),
            concurrency: 4,
            overrides_apply_to_current: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Query {
    Current,
    AsOf(NaiveDate),
}

pub struct PriceResolver {
    alpha_vantage: Option<Arc<dyn PriceProvider>>,
    yahoo_finance: Option<Arc<dyn PriceProvider>>,
    overrides: Arc<dyn ManualPriceStore>,
    cache: Arc<dyn Cache<QuoteKey, PriceQuote>>,
    options: ResolverOptions,
}

impl PriceResolver {
    pub fn new(
        overrides: Arc<dyn ManualPriceStore>,
        cache: Arc<dyn Cache<QuoteKey, PriceQuote>>,
    ) -> Self {
        PriceResolver {
            alpha_vantage: None,
            yahoo_finance: None,
            overrides,
            cache,
            options: ResolverOptions::default(),
        }
    }

    /// Registers an adapter in the slot matching its [`ProviderKind`].
    pub fn with_provider(mut self, provider: Arc<dyn PriceProvider>) -> Self {
        match provider.kind() {
            ProviderKind::AlphaVantage => self.alpha_vantage = Some(provider),
            ProviderKind::YahooFinance => self.yahoo_finance = Some(provider),
        }
        self
    }

    pub fn with_options(mut self, options: ResolverOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &ResolverOptions {
        &self.options
    }

    pub fn overrides(&self) -> &Arc<dyn ManualPriceStore> {
        &self.overrides
    }

    fn provider_for(&self, kind: ProviderKind) -> Result<&Arc<dyn PriceProvider>, PriceError> {
        let slot = match kind {
            ProviderKind::AlphaVantage => &self.alpha_vantage,
            ProviderKind::YahooFinance => &self.yahoo_finance,
        };
        slot.as_ref().ok_or_else(|| {
            PriceError::NotConfigured(format!("No price provider registered for {kind}"))
        })
    }

    pub async fn resolve_current(
        &self,
        ctx: &CompetitionContext,
        raw_ticker: &str,
    ) -> Result<PriceQuote, PriceError> {
        let ticker = Ticker::parse(raw_ticker)?;
        self.resolve(ctx, &ticker, Query::Current).await
    }

    pub async fn resolve_as_of(
        &self,
        ctx: &CompetitionContext,
        raw_ticker: &str,
        date: NaiveDate,
    ) -> Result<PriceQuote, PriceError> {
        let ticker = Ticker::parse(raw_ticker)?;
        self.resolve(ctx, &ticker, Query::AsOf(date)).await
    }

    /// Resolves current prices for many tickers with bounded concurrency.
    ///
    /// Duplicate tickers are resolved once; results are keyed by ticker.
    pub async fn resolve_many<I>(
        &self,
        ctx: &CompetitionContext,
        tickers: I,
    ) -> HashMap<Ticker, Result<PriceQuote, PriceError>>
    where
        I: IntoIterator<Item = Ticker>,
    {
        let mut unique: Vec<Ticker> = tickers.into_iter().collect();
        unique.sort();
        unique.dedup();
        debug!("Resolving {} tickers", unique.len());

        stream::iter(unique)
            .map(|ticker| async move {
                let result = self.resolve(ctx, &ticker, Query::Current).await;
                (ticker, result)
            })
            .buffer_unordered(self.options.concurrency.max(1))
            .collect()
            .await
    }

    #[instrument(
        name = "ResolvePrice",
        skip(self, ctx, ticker),
        fields(competition = %ctx.id, ticker = %ticker)
    )]
    async fn resolve(
        &self,
        ctx: &CompetitionContext,
        ticker: &Ticker,
        query: Query,
    ) -> Result<PriceQuote, PriceError> {
        let consult_overrides = match query {
            Query::AsOf(_) => true,
            Query::Current => self.options.overrides_apply_to_current,
        };
        if consult_overrides {
            if let Some(price) = self.overrides.lookup(&ctx.id, ticker).await? {
                info!("Using manual price for {}: {}", ticker, price);
                let as_of = match query {
                    Query::AsOf(date) => Some(date),
                    Query::Current => None,
                };
                return PriceQuote::validated(ticker, price, as_of, PriceSource::Manual);
            }
        }

        let key = match query {
            Query::Current => QuoteKey::Current(ticker.clone()),
            Query::AsOf(date) => QuoteKey::AsOf(ticker.clone(), date),
        };
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(cached);
        }

        let provider = self.provider_for(ctx.price_provider)?;
        provider.wait_turn().await;
        let fetch = async {
            match query {
                Query::Current => provider.current_price(ticker).await,
                Query::AsOf(date) => provider.price_on_or_before(ticker, date).await,
            }
        };
        let quote = tokio::time::timeout(self.options.timeout, fetch)
            .await
            .map_err(|_| {
                PriceError::upstream(
                    ticker.as_str(),
                    format!("timed out after {:?}", self.options.timeout),
                )
            })??;

        let quote = PriceQuote::validated(
            ticker,
            quote.price,
            quote.as_of,
            PriceSource::Provider(provider.kind()),
        )?;
        info!("Got price for {} from {}: {}", ticker, provider.kind(), quote.price);

        self.cache.put(key, quote.clone(), Some(self.options.ttl)).await;
        Ok(quote)
    }
}
