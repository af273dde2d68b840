//! Time-bounded memoization of resolved values.

use crate::core::ticker::Ticker;
use async_trait::async_trait;
use chrono::NaiveDate;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

/// TTL for current-price entries.
pub const CURRENT_PRICE_TTL: Duration = Duration::from_secs(60);

/// TTL for ticker logos. Kept in its own cache instance.
pub const LOGO_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[async_trait]
pub trait Cache<K, V>: Send + Sync
where
    K: Eq + Hash + Send + Sync + Debug + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Returns the value if present and not yet expired.
    async fn get(&self, key: &K) -> Option<V>;

    async fn put(&self, key: K, value: V, ttl: Option<Duration>);

    async fn remove(&self, key: &K);

    async fn clear(&self);
}

/// Cache key for resolved quotes.
///
/// Historical lookups carry their date so distinct entry-date quotes never share a slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QuoteKey {
    Current(Ticker),
    AsOf(Ticker, NaiveDate),
}
