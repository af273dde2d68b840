pub mod cli;
pub mod core;
pub mod providers;
pub mod store;

use crate::core::config::{AppConfig, HoldingConfig};
use crate::core::error::PickError;
use crate::core::holding::{Holding, Participant, quantity_for};
use crate::core::leaderboard::LeaderboardBoard;
use crate::core::overrides::ManualPriceStore;
use crate::core::price::PriceProvider;
use crate::core::resolver::PriceResolver;
use crate::providers::throttle::ALPHA_VANTAGE_MIN_INTERVAL;
use crate::providers::{AlphaVantageProvider, LogoProvider, ThrottledProvider, YahooFinanceProvider};
use crate::store::{InMemoryManualPrices, InMemoryParticipants, MemoryCache};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub enum AppCommand {
    Price {
        ticker: String,
        date: Option<NaiveDate>,
        json: bool,
    },
    EntryPrice {
        ticker: String,
    },
    Portfolio {
        participant: String,
    },
    Leaderboard {
        watch: bool,
        participant: Option<String>,
    },
    Logo {
        ticker: String,
        out: PathBuf,
    },
}

/// Everything a command needs, wired from one config.
pub struct App {
    pub config: AppConfig,
    pub resolver: PriceResolver,
    pub participants: InMemoryParticipants,
    pub board: LeaderboardBoard,
    pub logos: LogoProvider,
}

impl App {
    pub async fn from_config(config: AppConfig) -> Result<Self> {
        let ctx = &config.competition;
        let timeout = config.providers.timeout();

        let overrides = Arc::new(InMemoryManualPrices::new());
        for entry in &config.manual_prices {
            overrides
                .insert(&ctx.id, &entry.ticker, entry.price)
                .await
                .with_context(|| format!("Failed to load manual price for {}", entry.ticker))?;
        }

        let yahoo = YahooFinanceProvider::new(&config.providers.yahoo.base_url, timeout)?;
        let alpha_vantage = AlphaVantageProvider::new(
            &config.providers.alpha_vantage.base_url,
            config.providers.alpha_vantage.api_key(),
            timeout,
        )?;
        let alpha_vantage: Arc<dyn PriceProvider> = if config.providers.unthrottled {
            Arc::new(alpha_vantage)
        } else {
            Arc::new(ThrottledProvider::new(
                alpha_vantage,
                ALPHA_VANTAGE_MIN_INTERVAL,
            ))
        };

        let resolver = PriceResolver::new(overrides, Arc::new(MemoryCache::new()))
            .with_provider(Arc::new(yahoo))
            .with_provider(alpha_vantage)
            .with_options(config.resolver_options());

        let participants = InMemoryParticipants::new();
        for entry in &config.participants {
            let mut participant = Participant::new(&entry.id, &entry.display_name);
            for holding in &entry.holdings {
                add_configured_holding(&config, &resolver, &mut participant, holding).await?;
            }
            debug!(
                "Loaded participant {} with {} picks",
                participant.id,
                participant.holdings.len()
            );
            participants.add(&ctx.id, participant).await;
        }

        let logos = LogoProvider::new(
            &config.providers.logo_dev.base_url,
            config.providers.logo_dev.api_key(),
            timeout,
        )?;

        info!(
            "Competition {} ready with {} participants using {}",
            ctx.id,
            config.participants.len(),
            ctx.price_provider
        );
        Ok(App {
            config,
            resolver,
            participants,
            board: LeaderboardBoard::new(),
            logos,
        })
    }
}

async fn add_configured_holding(
    config: &AppConfig,
    resolver: &PriceResolver,
    participant: &mut Participant,
    holding: &HoldingConfig,
) -> Result<()> {
    let Some(entry_price) = holding.entry_price else {
        return match participant
            .pick(&config.competition, resolver, holding.ticker.as_str())
            .await
        {
            Ok(_) => Ok(()),
            Err(PickError::Price(e)) if !e.is_systemic() => {
                warn!(
                    "Skipping pick {} for {}: {}",
                    holding.ticker, participant.id, e
                );
                Ok(())
            }
            Err(e) => Err(e).with_context(|| {
                format!("Failed to pick {} for {}", holding.ticker, participant.id)
            }),
        };
    };

    let quantity = match holding.quantity {
        Some(quantity) => quantity,
        None => quantity_for(&holding.ticker, entry_price)?,
    };
    participant.add_holding(Holding {
        ticker: holding.ticker.clone(),
        entry_price,
        quantity,
    })?;
    Ok(())
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Stock pick starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let app = App::from_config(config).await?;

    match command {
        AppCommand::Price { ticker, date, json } => {
            cli::price::show_price(&app, &ticker, date, json).await
        }
        AppCommand::EntryPrice { ticker } => cli::price::show_entry_price(&app, &ticker).await,
        AppCommand::Portfolio { participant } => {
            cli::portfolio::show_portfolio(&app, &participant).await
        }
        AppCommand::Leaderboard { watch, participant } => {
            cli::leaderboard::show_leaderboard(&app, watch, participant.as_deref()).await
        }
        AppCommand::Logo { ticker, out } => cli::logo::save_logo(&app, &ticker, &out).await,
    }
}
