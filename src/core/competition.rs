use crate::core::error::PriceError;
use crate::core::price::ProviderKind;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const MIN_REFRESH_INTERVAL_SECS: u64 = 5;
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 300;

fn default_refresh_interval() -> u64 {
    60
}

/// The trading round every resolution and valuation runs against.
///
/// Passed explicitly to the resolver and aggregator so several competitions can be
/// served side by side.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompetitionContext {
    pub id: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub entry_price_date: NaiveDate,
    #[serde(default)]
    pub price_provider: ProviderKind,
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

impl CompetitionContext {
    pub fn validate(&self) -> Result<(), PriceError> {
        if self.id.trim().is_empty() {
            return Err(PriceError::NotConfigured(
                "Competition id is missing".to_string(),
            ));
        }
        if !(MIN_REFRESH_INTERVAL_SECS..=MAX_REFRESH_INTERVAL_SECS)
            .contains(&self.refresh_interval_secs)
        {
            return Err(PriceError::InvalidInput(format!(
                "Refresh interval must be between {MIN_REFRESH_INTERVAL_SECS} and {MAX_REFRESH_INTERVAL_SECS} seconds, got {}",
                self.refresh_interval_secs
            )));
        }
        if self.end_date < self.start_date {
            return Err(PriceError::InvalidInput(format!(
                "Competition ends ({}) before it starts ({})",
                self.end_date, self.start_date
            )));
        }
        Ok(())
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }
}

#[cfg(test)]
pub(crate) fn test_context(provider: ProviderKind) -> CompetitionContext {
    CompetitionContext {
        id: "comp-2026".to_string(),
        name: "Spring 2026".to_string(),
        start_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
        entry_price_date: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        price_provider: provider,
        refresh_interval_secs: 60,
    }
}
