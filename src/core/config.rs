use crate::core::competition::CompetitionContext;
use crate::core::holding::MAX_PICKS;
use crate::core::resolver::ResolverOptions;
use crate::core::ticker::Ticker;
use crate::providers::{alpha_vantage, logo_dev, yahoo_finance};
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

/// One pick as written in the config.
///
/// Without an `entry_price` the pick is resolved at the competition's entry-price date
/// when the app starts. Without a `quantity` it is derived from the entry price.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HoldingConfig {
    pub ticker: Ticker,
    pub entry_price: Option<f64>,
    pub quantity: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ParticipantConfig {
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub holdings: Vec<HoldingConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ManualPriceConfig {
    pub ticker: Ticker,
    pub price: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

impl Default for YahooProviderConfig {
    fn default() -> Self {
        YahooProviderConfig {
            base_url: yahoo_finance::DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// A provider that authenticates with a key read from the environment.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct KeyedProviderConfig {
    pub base_url: String,
    /// Name of the environment variable holding the key, never the key itself.
    pub api_key_env: String,
}

impl KeyedProviderConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

fn default_alpha_vantage() -> KeyedProviderConfig {
    KeyedProviderConfig {
        base_url: alpha_vantage::DEFAULT_BASE_URL.to_string(),
        api_key_env: alpha_vantage::API_KEY_ENV.to_string(),
    }
}

fn default_logo_dev() -> KeyedProviderConfig {
    KeyedProviderConfig {
        base_url: logo_dev::DEFAULT_BASE_URL.to_string(),
        api_key_env: logo_dev::API_KEY_ENV.to_string(),
    }
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_concurrency() -> usize {
    4
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub yahoo: YahooProviderConfig,
    #[serde(default = "default_alpha_vantage")]
    pub alpha_vantage: KeyedProviderConfig,
    #[serde(default = "default_logo_dev")]
    pub logo_dev: KeyedProviderConfig,
    /// Upper bound on a single upstream request.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Simultaneous price lookups per leaderboard pass.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Skip the 12 s spacing between Alpha Vantage calls (paid plans).
    #[serde(default)]
    pub unthrottled: bool,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: YahooProviderConfig::default(),
            alpha_vantage: default_alpha_vantage(),
            logo_dev: default_logo_dev(),
            timeout_secs: default_timeout_secs(),
            concurrency: default_concurrency(),
            unthrottled: false,
        }
    }
}

impl ProvidersConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub competition: CompetitionContext,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub participants: Vec<ParticipantConfig>,
    #[serde(default)]
    pub manual_prices: Vec<ManualPriceConfig>,
    /// Let manual prices also answer current-price lookups.
    #[serde(default)]
    pub overrides_apply_to_current: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "stockpick", "stockpick")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.competition.validate()?;

        if self.providers.timeout_secs == 0 {
            bail!("Provider timeout must be at least 1 second");
        }

        let mut ids = HashSet::new();
        for participant in &self.participants {
            if !ids.insert(participant.id.as_str()) {
                bail!("Duplicate participant id: {}", participant.id);
            }
            if participant.holdings.len() > MAX_PICKS {
                bail!(
                    "Participant {} has {} picks, the limit is {}",
                    participant.id,
                    participant.holdings.len(),
                    MAX_PICKS
                );
            }
            let mut tickers = HashSet::new();
            for holding in &participant.holdings {
                if !tickers.insert(&holding.ticker) {
                    bail!(
                        "Participant {} picked {} twice",
                        participant.id,
                        holding.ticker
                    );
                }
                for (field, value) in [
                    ("entry_price", holding.entry_price),
                    ("quantity", holding.quantity),
                ] {
                    if value.is_some_and(|v| !v.is_finite() || v <= 0.0) {
                        bail!(
                            "Participant {} has a non-positive {} for {}",
                            participant.id,
                            field,
                            holding.ticker
                        );
                    }
                }
            }
        }

        let mut manual = HashSet::new();
        for entry in &self.manual_prices {
            if !entry.price.is_finite() || entry.price <= 0.0 {
                bail!("Manual price for {} must be positive", entry.ticker);
            }
            if !manual.insert(&entry.ticker) {
                bail!("Duplicate manual price for {}", entry.ticker);
            }
        }
        Ok(())
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            timeout: self.providers.timeout(),
            concurrency: self.providers.concurrency.max(1),
            overrides_apply_to_current: self.overrides_apply_to_current,
            ..ResolverOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::price::ProviderKind;

    const MINIMAL: &str = r#"
competition:
  id: "spring-2026"
  name: "Spring 2026"
  start_date: 2026-01-05
  end_date: 2026-06-30
  entry_price_date: 2026-01-02
"#;

    #[test]
    fn test_config_defaults() {
        let config: AppConfig = serde_yaml::from_str(MINIMAL).expect("Failed to deserialize");
        assert!(config.validate().is_ok());

        assert_eq!(config.competition.price_provider, ProviderKind::AlphaVantage);
        assert_eq!(config.competition.refresh_interval_secs, 60);
        assert_eq!(
            config.providers.yahoo.base_url,
            "https://query1.finance.yahoo.com"
        );
        assert_eq!(
            config.providers.alpha_vantage.api_key_env,
            "ALPHA_VANTAGE_API_KEY"
        );
        assert_eq!(config.providers.logo_dev.api_key_env, "LOGO_DEV_API_KEY");
        assert!(!config.overrides_apply_to_current);
        assert!(config.participants.is_empty());

        let options = config.resolver_options();
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.concurrency, 4);
    }

    #[test]
    fn test_config_deserialization() {
        let yaml_str = format!(
            r#"{MINIMAL}
  price_provider: yahoo_finance
  refresh_interval_secs: 30
providers:
  yahoo:
    base_url: "http://example.com/yahoo"
  timeout_secs: 3
participants:
  - id: alice
    display_name: "Alice"
    holdings:
      - ticker: aapl
        entry_price: 150.0
      - ticker: MSFT
manual_prices:
  - ticker: tsla
    price: 250.0
"#
        );

        let config: AppConfig = serde_yaml::from_str(&yaml_str).expect("Failed to deserialize");
        assert!(config.validate().is_ok());
        assert_eq!(config.competition.price_provider, ProviderKind::YahooFinance);
        assert_eq!(config.competition.refresh_interval_secs, 30);
        assert_eq!(config.providers.yahoo.base_url, "http://example.com/yahoo");
        assert_eq!(config.providers.timeout(), Duration::from_secs(3));

        let holdings = &config.participants[0].holdings;
        assert_eq!(holdings[0].ticker.as_str(), "AAPL");
        assert_eq!(holdings[0].entry_price, Some(150.0));
        assert_eq!(holdings[1].entry_price, None);
        assert_eq!(config.manual_prices[0].ticker.as_str(), "TSLA");
    }

    #[test]
    fn test_invalid_ticker_fails_to_parse() {
        let yaml_str = format!(
            r#"{MINIMAL}
participants:
  - id: alice
    display_name: "Alice"
    holdings:
      - ticker: "  "
"#
        );
        assert!(serde_yaml::from_str::<AppConfig>(&yaml_str).is_err());
    }

    #[test]
    fn test_validation_errors() {
        let base: AppConfig = serde_yaml::from_str(MINIMAL).unwrap();

        let mut config = base.clone();
        config.competition.refresh_interval_secs = 301;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.manual_prices.push(ManualPriceConfig {
            ticker: Ticker::parse("AAPL").unwrap(),
            price: 0.0,
        });
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("must be positive")
        );

        let mut config = base.clone();
        let holding = HoldingConfig {
            ticker: Ticker::parse("AAPL").unwrap(),
            entry_price: None,
            quantity: None,
        };
        config.participants.push(ParticipantConfig {
            id: "alice".to_string(),
            display_name: "Alice".to_string(),
            holdings: vec![holding.clone(), holding],
        });
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("picked AAPL twice")
        );

        let mut config = base;
        config.participants.push(ParticipantConfig {
            id: "bob".to_string(),
            display_name: "Bob".to_string(),
            holdings: (0..11)
                .map(|i| HoldingConfig {
                    ticker: Ticker::parse(&format!("T{i}")).unwrap(),
                    entry_price: Some(10.0),
                    quantity: None,
                })
                .collect(),
        });
        assert!(
            config
                .validate()
                .unwrap_err()
                .to_string()
                .contains("the limit is 10")
        );
    }
}
