//! Turns a participant's holdings and current prices into gains.
use crate::core::error::PriceError;
use crate::core::holding::{Holding, PICK_ALLOCATION};
use crate::core::price::{PriceQuote, PriceSource};
use crate::core::ticker::Ticker;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::collections::HashMap;
use std::future::Future;
use tracing::{debug, warn};

/// Value of one resolved holding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PositionValue {
    pub ticker: Ticker,
    pub entry_price: f64,
    pub quantity: f64,
    pub current_price: f64,
    pub invested: f64,
    pub current_value: f64,
    pub gain: f64,
    pub percent_gain: f64,
    pub source: PriceSource,
}

/// A holding left out of this pass because its price could not be resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MissingPosition {
    pub ticker: Ticker,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct ParticipantValuation {
    pub invested: f64,
    pub current: f64,
    pub gain: f64,
    pub percent_gain: f64,
    pub positions: Vec<PositionValue>,
    pub missing: Vec<MissingPosition>,
}

impl ParticipantValuation {
    pub fn is_partial(&self) -> bool {
        !self.missing.is_empty()
    }
}

/// Percentage of `gain` over `invested`, 0 when nothing was invested.
pub fn percent_of(gain: f64, invested: f64) -> f64 {
    if invested > 0.0 {
        (gain / invested) * 100.0
    } else {
        0.0
    }
}

/// Folds pre-fetched prices into a valuation.
///
/// Holdings whose price failed are excluded from both totals and listed in `missing`.
/// A systemic failure for any holding aborts the valuation.
pub fn calculate_valuation(
    holdings: &[Holding],
    prices: &HashMap<Ticker, Result<PriceQuote, PriceError>>,
) -> Result<ParticipantValuation, PriceError> {
    let mut valuation = ParticipantValuation::default();

    for holding in holdings {
        let quote = match prices.get(&holding.ticker) {
            Some(Ok(quote)) => quote,
            Some(Err(e)) if e.is_systemic() => return Err(e.clone()),
            Some(Err(e)) => {
                warn!("Skipping {} in valuation: {}", holding.ticker, e);
                valuation.missing.push(MissingPosition {
                    ticker: holding.ticker.clone(),
                    error: e.to_string(),
                });
                continue;
            }
            None => {
                warn!("No price resolved for {}", holding.ticker);
                valuation.missing.push(MissingPosition {
                    ticker: holding.ticker.clone(),
                    error: format!("Price data not available for {}", holding.ticker),
                });
                continue;
            }
        };

        let current_value = quote.price * holding.quantity;
        let gain = current_value - PICK_ALLOCATION;
        valuation.invested += PICK_ALLOCATION;
        valuation.current += current_value;
        valuation.positions.push(PositionValue {
            ticker: holding.ticker.clone(),
            entry_price: holding.entry_price,
            quantity: holding.quantity,
            current_price: quote.price,
            invested: PICK_ALLOCATION,
            current_value,
            gain,
            percent_gain: percent_of(gain, PICK_ALLOCATION),
            source: quote.source,
        });
    }

    valuation.gain = valuation.current - valuation.invested;
    valuation.percent_gain = percent_of(valuation.gain, valuation.invested);
    debug!(
        "Valued {} positions ({} missing): invested {:.2}, current {:.2}",
        valuation.positions.len(),
        valuation.missing.len(),
        valuation.invested,
        valuation.current
    );
    Ok(valuation)
}

/// Values holdings by resolving each ticker through `resolve_current`.
///
/// At most `concurrency` resolutions are in flight at once.
pub async fn value_holdings<F, Fut>(
    holdings: &[Holding],
    concurrency: usize,
    resolve_current: F,
) -> Result<ParticipantValuation, PriceError>
where
    F: Fn(Ticker) -> Fut,
    Fut: Future<Output = Result<PriceQuote, PriceError>>,
{
    let prices: HashMap<Ticker, Result<PriceQuote, PriceError>> = stream::iter(holdings)
        .map(|holding| {
            let ticker = holding.ticker.clone();
            let fut = resolve_current(ticker.clone());
            async move { (ticker, fut.await) }
        })
        .buffer_unordered(concurrency.max(1))
        .collect()
        .await;

    calculate_valuation(holdings, &prices)
}
