//! Ranks every participant of a competition by percentage return.
//!
//! Ordering is total: percent gain descending, then dollar gain descending, then
//! participant id ascending. Participants with identical gains therefore still get
//! distinct, sequential ranks; shared ranks are never assigned.

use crate::core::competition::CompetitionContext;
use crate::core::error::PriceError;
use crate::core::holding::{Participant, ParticipantStore};
use crate::core::resolver::PriceResolver;
use crate::core::valuation::{ParticipantValuation, calculate_valuation};
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    pub participant_id: String,
    pub display_name: String,
    pub valuation: ParticipantValuation,
    pub rank: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Leaderboard {
    pub competition_id: String,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<LeaderboardEntry>,
}

impl Leaderboard {
    pub fn rank_of(&self, participant_id: &str) -> Option<&LeaderboardEntry> {
        self.entries
            .iter()
            .find(|entry| entry.participant_id == participant_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// -0.0 and 0.0 must compare equal under total_cmp
fn normalized(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

fn compare_entries(a: &LeaderboardEntry, b: &LeaderboardEntry) -> Ordering {
    normalized(b.valuation.percent_gain)
        .total_cmp(&normalized(a.valuation.percent_gain))
        .then_with(|| normalized(b.valuation.gain).total_cmp(&normalized(a.valuation.gain)))
        .then_with(|| a.participant_id.cmp(&b.participant_id))
}

/// Sorts valuations into ranked entries.
pub fn assign_ranks(valued: Vec<(Participant, ParticipantValuation)>) -> Vec<LeaderboardEntry> {
    let mut entries: Vec<LeaderboardEntry> = valued
        .into_iter()
        .map(|(participant, valuation)| LeaderboardEntry {
            participant_id: participant.id,
            display_name: participant.display_name,
            valuation,
            rank: 0,
        })
        .collect();

    entries.sort_by(compare_entries);
    for (index, entry) in entries.iter_mut().enumerate() {
        entry.rank = index + 1;
    }
    entries
}

/// Values every participant of `ctx` and ranks them.
///
/// Prices are resolved once per distinct ticker across all participants, then each
/// participant is valued independently. Per-ticker failures only mark positions as
/// missing; a systemic failure aborts the pass.
pub async fn rank(
    ctx: &CompetitionContext,
    participants: &dyn ParticipantStore,
    resolver: &PriceResolver,
) -> Result<Leaderboard, PriceError> {
    let participants = participants.participants(&ctx.id).await?;
    debug!(
        "Ranking {} participants in competition {}",
        participants.len(),
        ctx.id
    );

    let tickers = participants
        .iter()
        .flat_map(|p| p.holdings.iter().map(|h| h.ticker.clone()));
    let prices = resolver.resolve_many(ctx, tickers).await;

    let valuations = join_all(participants.into_iter().map(|participant| {
        let prices = &prices;
        async move {
            let valuation = calculate_valuation(&participant.holdings, prices)?;
            Ok::<_, PriceError>((participant, valuation))
        }
    }))
    .await
    .into_iter()
    .collect::<Result<Vec<_>, _>>()?;

    let entries = assign_ranks(valuations);
    info!(
        "Ranked {} participants in competition {}",
        entries.len(),
        ctx.id
    );
    Ok(Leaderboard {
        competition_id: ctx.id.clone(),
        generated_at: Utc::now(),
        entries,
    })
}

struct Published {
    pass: u64,
    board: Option<Arc<Leaderboard>>,
}

/// The currently visible leaderboard.
///
/// Each refresh pass takes a ticket from [`LeaderboardBoard::begin_pass`]; a pass only
/// replaces the view if no later pass has already published.
pub struct LeaderboardBoard {
    next_pass: AtomicU64,
    published: RwLock<Published>,
}

impl Default for LeaderboardBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl LeaderboardBoard {
    pub fn new() -> Self {
        LeaderboardBoard {
            next_pass: AtomicU64::new(1),
            published: RwLock::new(Published {
                pass: 0,
                board: None,
            }),
        }
    }

    pub fn begin_pass(&self) -> u64 {
        self.next_pass.fetch_add(1, AtomicOrdering::SeqCst)
    }

    /// Returns false when the pass was superseded and its result discarded.
    pub fn publish(&self, pass: u64, board: Leaderboard) -> bool {
        let mut published = self
            .published
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if pass <= published.pass {
            debug!(
                "Discarding leaderboard from pass {} (already at {})",
                pass, published.pass
            );
            return false;
        }
        published.pass = pass;
        published.board = Some(Arc::new(board));
        true
    }

    pub fn current(&self) -> Option<Arc<Leaderboard>> {
        self.published
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .board
            .clone()
    }

    /// Runs one ranking pass and publishes it.
    pub async fn refresh(
        &self,
        ctx: &CompetitionContext,
        participants: &dyn ParticipantStore,
        resolver: &PriceResolver,
    ) -> Result<Option<Arc<Leaderboard>>, PriceError> {
        let pass = self.begin_pass();
        let board = rank(ctx, participants, resolver).await?;
        if self.publish(pass, board) {
            Ok(self.current())
        } else {
            Ok(None)
        }
    }
}
