//! Price resolution, valuation and ranking.

pub mod cache;
pub mod competition;
pub mod config;
pub mod error;
pub mod holding;
pub mod leaderboard;
pub mod log;
pub mod overrides;
pub mod price;
pub mod resolver;
pub mod response;
pub mod ticker;
pub mod valuation;

// Re-export main types for cleaner imports
pub use competition::CompetitionContext;
pub use error::{PickError, PriceError};
pub use holding::{Holding, Participant, ParticipantStore};
pub use leaderboard::{Leaderboard, LeaderboardBoard, LeaderboardEntry};
pub use overrides::ManualPriceStore;
pub use price::{PriceProvider, PriceQuote, PriceSource, ProviderKind};
pub use resolver::{PriceResolver, ResolverOptions};
pub use ticker::Ticker;
pub use valuation::ParticipantValuation;
