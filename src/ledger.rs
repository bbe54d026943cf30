//! Shared house ledger: the one piece of truly shared mutable state.
//!
//! The ledger is a singleton document holding the pooled payout currency,
//! the RPS resource stock, cumulative statistics and the persisted
//! maintenance schedule. Every mutation goes through atomic store
//! primitives; callers never read-modify-write the pool in process memory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::games::types::{GameType, HandShape};

/// Errors surfaced by the ledger and account stores
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("conflicting concurrent update: {0}")]
    Conflict(String),
}

/// Per-shape stock the house draws RPS responses from.
///
/// The same struct doubles as a signed delta bundle in
/// [`LedgerDelta::resources`]; applied counters saturate at zero.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResourceCounts {
    pub rock: i64,
    pub paper: i64,
    pub scissors: i64,
    pub wildcard: i64,
}

impl ResourceCounts {
    /// Stock the weekly refill restores the house to.
    pub fn default_stock() -> Self {
        Self {
            rock: 10,
            paper: 10,
            scissors: 10,
            wildcard: 1,
        }
    }

    pub fn of_shape(&self, shape: HandShape) -> i64 {
        match shape {
            HandShape::Rock => self.rock,
            HandShape::Paper => self.paper,
            HandShape::Scissors => self.scissors,
        }
    }

    /// Combined stock of the three ordinary shapes.
    pub fn ordinary_total(&self) -> i64 {
        self.rock + self.paper + self.scissors
    }

    fn apply(&mut self, delta: &ResourceCounts) {
        self.rock = (self.rock + delta.rock).max(0);
        self.paper = (self.paper + delta.paper).max(0);
        self.scissors = (self.scissors + delta.scissors).max(0);
        self.wildcard = (self.wildcard + delta.wildcard).max(0);
    }
}

/// Cumulative per-game counters, monotonically non-decreasing.
///
/// Wins and losses are counted from the player's perspective. Also used
/// as the increment bundle in [`LedgerDelta::stats`].
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HouseStats {
    pub card_wins: u64,
    pub card_losses: u64,
    pub blackjack_wins: u64,
    pub blackjack_losses: u64,
    pub rps_wins: u64,
    pub rps_losses: u64,
    pub total_bets: u64,
    pub total_payouts: u64,
}

impl HouseStats {
    pub fn add(&mut self, delta: &HouseStats) {
        self.card_wins += delta.card_wins;
        self.card_losses += delta.card_losses;
        self.blackjack_wins += delta.blackjack_wins;
        self.blackjack_losses += delta.blackjack_losses;
        self.rps_wins += delta.rps_wins;
        self.rps_losses += delta.rps_losses;
        self.total_bets += delta.total_bets;
        self.total_payouts += delta.total_payouts;
    }

    pub fn record_win(&mut self, game: GameType) {
        match game {
            GameType::Card => self.card_wins += 1,
            GameType::Blackjack => self.blackjack_wins += 1,
            GameType::Rps => self.rps_wins += 1,
        }
    }

    pub fn record_loss(&mut self, game: GameType) {
        match game {
            GameType::Card => self.card_losses += 1,
            GameType::Blackjack => self.blackjack_losses += 1,
            GameType::Rps => self.rps_losses += 1,
        }
    }
}

/// The singleton ledger document. Round-trips exactly through serde.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerDoc {
    /// Pooled payout currency; never negative.
    pub pooled_currency: i64,
    pub resources: ResourceCounts,
    pub stats: HouseStats,
    pub next_daily_reset_at: DateTime<Utc>,
    pub next_redistribution_at: DateTime<Utc>,
    /// Backs the redistribution minimum-interval guard.
    pub last_redistribution_at: Option<DateTime<Utc>>,
}

impl LedgerDoc {
    /// Freshly seeded house: small starter pool, full shape stock.
    pub fn seeded(
        seed_pool: i64,
        resources: ResourceCounts,
        next_daily_reset_at: DateTime<Utc>,
        next_redistribution_at: DateTime<Utc>,
    ) -> Self {
        Self {
            pooled_currency: seed_pool.max(0),
            resources,
            stats: HouseStats::default(),
            next_daily_reset_at,
            next_redistribution_at,
            last_redistribution_at: None,
        }
    }
}

/// A bundle of signed increments applied to the ledger as one atomic
/// write. Two sequential `apply_delta` calls are *not* combined
/// atomically; resolution logic must tolerate interleaving.
#[derive(Debug, Clone, Copy, Default)]
pub struct LedgerDelta {
    pub pool: i64,
    pub resources: ResourceCounts,
    pub stats: HouseStats,
}

/// Partial update of the persisted maintenance schedule; `None` fields
/// are left untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScheduleUpdate {
    pub next_daily_reset_at: Option<DateTime<Utc>>,
    pub next_redistribution_at: Option<DateTime<Utc>>,
    pub last_redistribution_at: Option<DateTime<Utc>>,
}

/// Atomic access to the shared ledger document.
///
/// The durable backing store is an external collaborator; the in-memory
/// implementation below is the single-process reference used by the
/// engine and its tests.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Current state of the document.
    async fn snapshot(&self) -> Result<LedgerDoc, StoreError>;

    /// Apply a delta bundle as one atomic increment.
    async fn apply_delta(&self, delta: &LedgerDelta) -> Result<(), StoreError>;

    /// Guarded pool decrement: debit at most `amount`, never below
    /// zero, and return what was actually debited. This is the payout
    /// cap; the applied amount equals `min(amount, pool)` at the
    /// instant of the operation.
    async fn debit_pool_clamped(&self, amount: i64) -> Result<i64, StoreError>;

    /// Atomically compute and withdraw the redistribution share:
    /// `share = pool / player_count` (integer division), debiting
    /// `share * player_count` and leaving the remainder pooled.
    /// Returns the per-player share and the remainder, both read out
    /// of the same operation so later settlements cannot skew them.
    async fn take_redistribution_share(
        &self,
        player_count: i64,
    ) -> Result<(i64, i64), StoreError>;

    /// Reset the shape stock to the given counts.
    async fn refill_resources(&self, stock: &ResourceCounts) -> Result<(), StoreError>;

    /// Persist maintenance schedule fields.
    async fn set_schedule(&self, update: ScheduleUpdate) -> Result<(), StoreError>;
}

/// Single-process reference implementation backed by an `RwLock`.
pub struct InMemoryLedgerStore {
    doc: RwLock<LedgerDoc>,
}

impl InMemoryLedgerStore {
    pub fn new(doc: LedgerDoc) -> Self {
        Self {
            doc: RwLock::new(doc),
        }
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn snapshot(&self) -> Result<LedgerDoc, StoreError> {
        Ok(self.doc.read().await.clone())
    }

    async fn apply_delta(&self, delta: &LedgerDelta) -> Result<(), StoreError> {
        let mut doc = self.doc.write().await;
        doc.pooled_currency = (doc.pooled_currency + delta.pool).max(0);
        doc.resources.apply(&delta.resources);
        doc.stats.add(&delta.stats);
        Ok(())
    }

    async fn debit_pool_clamped(&self, amount: i64) -> Result<i64, StoreError> {
        let mut doc = self.doc.write().await;
        let applied = amount.clamp(0, doc.pooled_currency);
        doc.pooled_currency -= applied;
        Ok(applied)
    }

    async fn take_redistribution_share(
        &self,
        player_count: i64,
    ) -> Result<(i64, i64), StoreError> {
        let mut doc = self.doc.write().await;
        if player_count <= 0 || doc.pooled_currency <= 0 {
            return Ok((0, doc.pooled_currency));
        }
        let share = doc.pooled_currency / player_count;
        doc.pooled_currency -= share * player_count;
        Ok((share, doc.pooled_currency))
    }

    async fn refill_resources(&self, stock: &ResourceCounts) -> Result<(), StoreError> {
        let mut doc = self.doc.write().await;
        doc.resources = *stock;
        Ok(())
    }

    async fn set_schedule(&self, update: ScheduleUpdate) -> Result<(), StoreError> {
        let mut doc = self.doc.write().await;
        if let Some(at) = update.next_daily_reset_at {
            doc.next_daily_reset_at = at;
        }
        if let Some(at) = update.next_redistribution_at {
            doc.next_redistribution_at = at;
        }
        if let Some(at) = update.last_redistribution_at {
            doc.last_redistribution_at = Some(at);
        }
        Ok(())
    }
}
